#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for crate digger.
//!
//! Generates a collection report from a local CSV export, inspects how a
//! CSV's columns are recognized, or starts the web server. Run without a
//! subcommand to pick one interactively.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input, Select};

#[derive(Parser)]
#[command(name = "crate_digger", about = "Music collection report generator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a report from a CSV export
    Report {
        /// Path to the CSV file
        #[arg(long)]
        csv: PathBuf,
        /// Print the narrative exactly as returned instead of formatted sections
        #[arg(long)]
        raw: bool,
    },
    /// Show how a CSV export's columns are recognized, without calling the LLM
    Inspect {
        /// Path to the CSV file
        #[arg(long)]
        csv: PathBuf,
        /// Number of normalized entries to print
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Start the web server
    Serve {
        /// Prompt for the bind address, port and missing credentials
        #[arg(long)]
        interactive: bool,
    },
}

/// Actions offered when no subcommand is given.
enum Tool {
    Report,
    Inspect,
    Server,
}

impl Tool {
    const ALL: &[Self] = &[Self::Report, Self::Inspect, Self::Server];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Report => "Generate a report from a CSV export",
            Self::Inspect => "Inspect a CSV export",
            Self::Server => "Start server",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let command = match cli.command {
        Some(command) => command,
        None => prompt_command()?,
    };

    match command {
        Commands::Report { csv, raw } => commands::report(&csv, raw).await?,
        Commands::Inspect { csv, limit } => commands::inspect(&csv, limit)?,
        Commands::Serve { interactive } => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new().block_on(async move {
                    if interactive {
                        crate_digger_server::interactive::run().await
                    } else {
                        crate_digger_server::run_server().await
                    }
                })
            })
            .await??;
        }
    }

    Ok(())
}

fn prompt_command() -> Result<Commands, dialoguer::Error> {
    println!("Crate Digger");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(match Tool::ALL[idx] {
        Tool::Report => Commands::Report {
            csv: prompt_path()?,
            raw: !Confirm::new()
                .with_prompt("Format the report into sections?")
                .default(true)
                .interact()?,
        },
        Tool::Inspect => Commands::Inspect {
            csv: prompt_path()?,
            limit: Input::new()
                .with_prompt("Entries to show")
                .default(10)
                .interact_text()?,
        },
        Tool::Server => Commands::Serve { interactive: true },
    })
}

fn prompt_path() -> Result<PathBuf, dialoguer::Error> {
    let path: String = Input::new()
        .with_prompt("Path to CSV export")
        .interact_text()?;
    Ok(PathBuf::from(path.trim()))
}
