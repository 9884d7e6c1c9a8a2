//! Implementations of the CLI subcommands.

use std::fmt::Write as _;
use std::path::Path;

use crate_digger_collection_models::CollectionReport;
use crate_digger_normalize::{CsvInspection, Field};
use crate_digger_report::{ReportSections, format_entry};
use strum::IntoEnumIterator as _;

/// Generates a report from the CSV at `path` and prints it.
///
/// # Errors
///
/// * If the file cannot be read
/// * If no LLM provider is configured
/// * If the CSV cannot be parsed or the LLM call fails
pub async fn report(path: &Path, raw: bool) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    log::info!("Read {} bytes from {}", bytes.len(), path.display());

    let provider = crate_digger_ai::create_provider_from_env()?;
    let report = crate_digger_report::generate_from_csv(provider.as_ref(), &bytes).await?;

    print!("{}", render_report(&report, raw));
    Ok(())
}

/// Prints how the CSV at `path` is interpreted.
///
/// # Errors
///
/// * If the file cannot be read or is not delimited text
pub fn inspect(path: &Path, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    let inspection = crate_digger_normalize::inspect_csv(&bytes)?;

    print!("{}", render_inspection(&inspection, limit));
    Ok(())
}

fn render_report(report: &CollectionReport, raw: bool) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "Analyzed {} of {} albums ({})",
        report.sample_size, report.total_count, report.source
    )
    .unwrap();
    out.push('\n');

    match (raw, ReportSections::parse(&report.narrative_text)) {
        (false, Some(sections)) => {
            writeln!(out, "{}", sections.vibe_summary).unwrap();
            push_list(&mut out, "Strengths", &sections.strengths);
            push_list(&mut out, "Room to grow", &sections.improvements);
            push_list(&mut out, "Dig for next", &sections.recommendations);
        }
        _ => {
            writeln!(out, "{}", report.narrative_text.trim_end()).unwrap();
        }
    }

    out
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    writeln!(out, "\n{heading}:").unwrap();
    for item in items {
        writeln!(out, "  - {item}").unwrap();
    }
}

fn render_inspection(inspection: &CsvInspection, limit: usize) -> String {
    let mut out = String::new();
    writeln!(out, "Headers: {}", inspection.headers.join(", ")).unwrap();
    out.push('\n');

    for field in Field::iter() {
        let column = inspection
            .mapping
            .column(field)
            .and_then(|idx| inspection.headers.get(idx))
            .map_or("(not found)", String::as_str);
        writeln!(out, "{:<8} <- {column}", field.as_ref()).unwrap();
    }

    if !inspection.mapping.has_required() {
        out.push_str("\nNo artist or title column was recognized; every row will be dropped.\n");
    }

    writeln!(
        out,
        "\n{} rows, {} entries, {} dropped",
        inspection.row_count,
        inspection.entries.len(),
        inspection.dropped()
    )
    .unwrap();

    for entry in inspection.entries.iter().take(limit) {
        writeln!(out, "  {}", format_entry(entry)).unwrap();
    }

    out
}
