use serde::{Deserialize, Serialize};

pub mod prompt;
pub mod remote;
pub mod summarizer;

/// Transport seam for the content-generation endpoint (real HTTP or a test double)
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one generation request. Exactly one attempt, no retries.
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, ProviderError>;
}

/// Request structure for LLM generation
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub model: String,
    pub api_key: String,
    pub generation: GenerationConfig,
}

/// Sampling parameters sent as `generationConfig`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 1024,
        }
    }
}

impl GenerationConfig {
    /// Apply any overrides from the `[llm]` config section
    pub fn from_config(cfg: &common::LlmConfig) -> Self {
        let defaults = Self::default();
        Self {
            temperature: cfg.temperature.unwrap_or(defaults.temperature),
            top_p: cfg.top_p.unwrap_or(defaults.top_p),
            top_k: cfg.top_k.unwrap_or(defaults.top_k),
            max_output_tokens: cfg.max_output_tokens.unwrap_or(defaults.max_output_tokens),
        }
    }
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub model: String,
}

/// Why a remote generation did not produce text.
///
/// `Transport` means the request never got an HTTP answer and the caller may
/// fall back to local summarization; the other variants are answers from the
/// remote side and are reported to the user as-is.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("API returned status {status}")]
    Api { status: u16, message: Option<String> },

    #[error("malformed response: {0}")]
    Parse(String),
}

pub const API_ERROR_PREFIX: &str = "API Error:";
pub const STATUS_ERROR_PREFIX: &str = "Error from API";
pub const NETWORK_ERROR_PREFIX: &str = "Network error:";
pub const PARSE_ERROR_PREFIX: &str = "Error parsing";

const FAILURE_PREFIXES: [&str; 4] = [
    API_ERROR_PREFIX,
    STATUS_ERROR_PREFIX,
    NETWORK_ERROR_PREFIX,
    PARSE_ERROR_PREFIX,
];

/// Outcome handed back to the caller for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryResult {
    Success { text: String },
    Failure { message: String },
}

impl SummaryResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SummaryResult::Success { .. })
    }

    /// Flatten to the single display string; failures keep their prefix.
    pub fn into_display(self) -> String {
        match self {
            SummaryResult::Success { text } => text,
            SummaryResult::Failure { message } => message,
        }
    }

    pub fn as_display(&self) -> &str {
        match self {
            SummaryResult::Success { text } => text,
            SummaryResult::Failure { message } => message,
        }
    }

    /// Classify a display string by its failure prefix
    pub fn from_display(s: impl Into<String>) -> Self {
        let s = s.into();
        if FAILURE_PREFIXES.iter().any(|p| s.starts_with(p)) {
            SummaryResult::Failure { message: s }
        } else {
            SummaryResult::Success { text: s }
        }
    }
}

impl From<ProviderError> for SummaryResult {
    /// Render a remote-side error with its display prefix. Transport errors
    /// only reach here when a caller chooses not to fall back.
    fn from(error: ProviderError) -> Self {
        let message = match error {
            ProviderError::Api {
                message: Some(message),
                ..
            } => format!("{} {}", API_ERROR_PREFIX, message),
            ProviderError::Api { status, message: None } => {
                format!("{} (status {})", STATUS_ERROR_PREFIX, status)
            }
            ProviderError::Parse(detail) => format!("{} API response: {}", PARSE_ERROR_PREFIX, detail),
            ProviderError::Transport(detail) => format!("{} {}", NETWORK_ERROR_PREFIX, detail),
        };
        SummaryResult::Failure { message }
    }
}
