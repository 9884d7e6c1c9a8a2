//! LLM provider abstraction and implementations.
//!
//! Supports Anthropic Claude and `OpenAI` (or compatible servers) via a
//! common trait.

pub mod anthropic;
pub mod openai;

use strum_macros::{AsRefStr, Display, EnumString};

use crate::AiError;

/// Default response length bound for a completion.
pub const DEFAULT_MAX_TOKENS: u32 = 1500;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// One completion call: a system prompt, a user prompt and sampling bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Instructions that frame the model's role.
    pub system: String,
    /// The user message.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Ask the provider to constrain output to a JSON object, where
    /// supported.
    pub json_output: bool,
}

impl CompletionRequest {
    /// Creates a request with the default bounds.
    #[must_use]
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            json_output: false,
        }
    }

    /// Sets the token bound.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Requests JSON-object output.
    #[must_use]
    pub const fn with_json_output(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }
}

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier used for completions.
    fn model(&self) -> &str;

    /// Sends one completion request and returns the generated text.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails, the provider reports an
    /// error, or the completion is blank.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AiError>;
}

/// Which provider backs completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum ProviderKind {
    /// `OpenAI` chat completions, or an `OpenAI`-compatible server.
    #[strum(to_string = "openai", serialize = "gpt")]
    OpenAi,
    /// Anthropic messages API.
    #[strum(to_string = "anthropic", serialize = "claude")]
    Anthropic,
}

impl ProviderKind {
    /// Model used when `AI_MODEL` is not set.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-sonnet-4-20250514",
        }
    }

    /// Environment variable holding the API key.
    #[must_use]
    pub const fn api_key_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Resolved provider configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Provider to use.
    pub kind: ProviderKind,
    /// API key. May be empty for a self-hosted `OpenAI`-compatible server.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Base URL override for `OpenAI`-compatible servers.
    pub base_url: Option<String>,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("kind", &self.kind)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ProviderSettings {
    /// Resolves settings from a variable lookup.
    ///
    /// If `AI_PROVIDER` is set, uses that provider. Otherwise auto-detects
    /// from available credentials: `OPENAI_API_KEY` first, then
    /// `ANTHROPIC_API_KEY`, then a bare `AI_BASE_URL` (a local
    /// `OpenAI`-compatible server).
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if no credentials are found, the provider
    /// name is unknown, or the requested provider has no key.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AiError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let base_url = var("AI_BASE_URL");

        let kind = match var("AI_PROVIDER") {
            Some(name) => name.trim().parse().map_err(|_| AiError::Config {
                message: format!("Unknown AI provider: {name}. Use 'openai' or 'anthropic'."),
            })?,
            None => detect_provider(&var, base_url.is_some())?,
        };

        let api_key = match (var(kind.api_key_var()), kind) {
            (Some(key), _) => key,
            (None, ProviderKind::OpenAi) if base_url.is_some() => String::new(),
            (None, _) => {
                return Err(AiError::Config {
                    message: format!("{} environment variable not set", kind.api_key_var()),
                });
            }
        };

        let model = var("AI_MODEL").unwrap_or_else(|| kind.default_model().to_owned());

        Ok(Self {
            kind,
            api_key,
            model,
            base_url,
        })
    }

    /// Builds the provider these settings describe.
    #[must_use]
    pub fn build(self) -> Box<dyn LlmProvider> {
        log::info!("Using {} provider with model {}", self.kind, self.model);

        match self.kind {
            ProviderKind::OpenAi => {
                let provider = openai::OpenAiProvider::new(self.api_key, self.model);
                Box::new(match self.base_url {
                    Some(url) => provider.with_base_url(&url),
                    None => provider,
                })
            }
            ProviderKind::Anthropic => Box::new(anthropic::AnthropicProvider::new(
                self.api_key,
                self.model,
            )),
        }
    }
}

/// Creates an LLM provider based on environment variables.
///
/// See [`ProviderSettings::resolve`] for the variables consulted.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, AiError> {
    ProviderSettings::resolve(|name| std::env::var(name).ok()).map(ProviderSettings::build)
}

/// Auto-detects which provider to use based on available credentials.
fn detect_provider(
    var: &impl Fn(&str) -> Option<String>,
    has_base_url: bool,
) -> Result<ProviderKind, AiError> {
    if var("OPENAI_API_KEY").is_some() {
        log::info!("Auto-detected AI provider: OpenAI (OPENAI_API_KEY found)");
        return Ok(ProviderKind::OpenAi);
    }

    if var("ANTHROPIC_API_KEY").is_some() {
        log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
        return Ok(ProviderKind::Anthropic);
    }

    if has_base_url {
        log::info!("Auto-detected AI provider: OpenAI-compatible server (AI_BASE_URL found)");
        return Ok(ProviderKind::OpenAi);
    }

    Err(AiError::Config {
        message: "No AI credentials detected. Set OPENAI_API_KEY or ANTHROPIC_API_KEY \
                  (or AI_BASE_URL for a local OpenAI-compatible server)."
            .to_owned(),
    })
}
