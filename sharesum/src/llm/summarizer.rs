// Summarizer module
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use common::UserSettings;

use super::prompt::{build_prompt, LengthProfile};
use super::{GenerationConfig, LlmProvider, LlmRequest, ProviderError, SummaryResult};

/// One summarization request, built per user action and dropped afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub raw_text: String,
    /// Always within 1-5
    pub length_level: u8,
    pub model_id: String,
    /// Blank means "no key configured"
    pub api_key: String,
    /// Blank means "use the built-in template"
    pub prompt_template: String,
}

impl SummaryRequest {
    /// Out-of-range levels are stored as 3.
    pub fn new(
        raw_text: impl Into<String>,
        length_level: i64,
        model_id: impl Into<String>,
        api_key: impl Into<String>,
        prompt_template: impl Into<String>,
    ) -> Self {
        Self {
            raw_text: raw_text.into(),
            length_level: LengthProfile::for_level(length_level).level(),
            model_id: model_id.into(),
            api_key: api_key.into(),
            prompt_template: prompt_template.into(),
        }
    }

    pub fn from_settings(raw_text: impl Into<String>, settings: &UserSettings) -> Self {
        Self::new(
            raw_text,
            i64::from(settings.summary_length),
            settings.selected_model.id(),
            settings.api_key.clone(),
            settings.summary_prompt.clone(),
        )
    }

    pub fn with_length_level(mut self, length_level: i64) -> Self {
        self.length_level = LengthProfile::for_level(length_level).level();
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn prompt(&self) -> String {
        build_prompt(
            &self.raw_text,
            i64::from(self.length_level),
            &self.prompt_template,
        )
    }
}

/// Produces summaries through a remote provider, falling back to local extraction
pub struct SummarizationClient {
    /// None when no key is configured; every request is answered locally
    provider: Option<Arc<dyn LlmProvider>>,
    generation: GenerationConfig,
}

impl SummarizationClient {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider: Some(provider),
            generation: GenerationConfig::default(),
        }
    }

    /// A client that never contacts a remote service
    pub fn offline() -> Self {
        Self {
            provider: None,
            generation: GenerationConfig::default(),
        }
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Summarize with exactly one remote attempt.
    ///
    /// No key or a transport failure yields the extractive summary as a
    /// success; errors reported by the remote side come back as failures.
    pub async fn summarize(&self, request: &SummaryRequest) -> SummaryResult {
        let span = info_span!(
            "summarize",
            request_id = %uuid::Uuid::new_v4(),
            model = %request.model_id,
            length_level = request.length_level,
        );
        self.summarize_inner(request).instrument(span).await
    }

    /// String-boundary form: failures carry their display prefix.
    pub async fn summarize_text(
        &self,
        text: &str,
        length_level: i64,
        api_key: &str,
        model_id: &str,
        prompt_template: &str,
    ) -> String {
        let request = SummaryRequest::new(text, length_level, model_id, api_key, prompt_template);
        self.summarize(&request).await.into_display()
    }

    async fn summarize_inner(&self, request: &SummaryRequest) -> SummaryResult {
        let Some(provider) = self.provider.as_ref().filter(|_| request.has_api_key()) else {
            info!("no API key configured, using extractive summary");
            return SummaryResult::Success {
                text: extractive_summary(&request.raw_text, i64::from(request.length_level)),
            };
        };

        let llm_request = LlmRequest {
            prompt: request.prompt(),
            model: request.model_id.clone(),
            api_key: request.api_key.clone(),
            generation: self.generation,
        };

        match provider.generate(llm_request).await {
            Ok(response) => {
                info!(
                    "LLM summarization successful: {} chars from {}",
                    response.text.chars().count(),
                    response.model
                );
                SummaryResult::Success {
                    text: response.text,
                }
            }
            Err(ProviderError::Transport(e)) => {
                warn!("LLM request failed: {}, falling back to extractive summary", e);
                SummaryResult::Success {
                    text: extractive_summary(&request.raw_text, i64::from(request.length_level)),
                }
            }
            Err(e) => {
                warn!(error = %e, "LLM summarization returned an error");
                e.into()
            }
        }
    }
}

/// Offline summary: the leading sentences, as many as the length level allows.
///
/// Sentences are split on `.`, `!` and `?`, trimmed, and blanks dropped. The
/// kept ones are joined with `". "` and a final `.` is appended. Text with no
/// sentence at all yields an empty string.
pub fn extractive_summary(text: &str, length_level: i64) -> String {
    let sentences: Vec<&str> = text
        .split(['.', '!', '?'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if sentences.is_empty() {
        return String::new();
    }

    let count = LengthProfile::for_level(length_level).sentence_count(sentences.len());
    let mut summary = sentences[..count.min(sentences.len())].join(". ");
    summary.push('.');
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractive_summary_example() {
        assert_eq!(extractive_summary("A. B. C. D.", 1), "A.");
    }

    #[test]
    fn test_extractive_summary_keeps_leading_sentences_in_order() {
        let text = "One. Two! Three? Four. Five. Six. Seven. Eight.";
        // 8 sentences at 25% -> 2
        assert_eq!(extractive_summary(text, 5), "One. Two.");
        // 8 sentences at 15% -> floor(1.2) = 1
        assert_eq!(extractive_summary(text, 3), "One.");
    }

    #[test]
    fn test_extractive_summary_single_sentence() {
        assert_eq!(
            extractive_summary("The build is green.", 2),
            "The build is green."
        );
        assert_eq!(extractive_summary("No terminator here", 4), "No terminator here.");
    }

    #[test]
    fn test_extractive_summary_drops_blank_sentences() {
        let text = "  First point...   !! Second point?  ";
        assert_eq!(extractive_summary(text, 3), "First point.");
    }

    #[test]
    fn test_extractive_summary_out_of_range_level_is_medium() {
        let text: String = (1..=20).map(|i| format!("Sentence {}. ", i)).collect();
        // 20 sentences at 15% -> 3
        let expected = "Sentence 1. Sentence 2. Sentence 3.";
        assert_eq!(extractive_summary(&text, 0), expected);
        assert_eq!(extractive_summary(&text, 7), expected);
        assert_eq!(extractive_summary(&text, 3), expected);
    }

    #[test]
    fn test_extractive_summary_blank_input() {
        assert_eq!(extractive_summary("   ", 3), "");
        assert_eq!(extractive_summary("...!?", 3), "");
    }

    #[tokio::test]
    async fn test_offline_client_ignores_key() {
        let client = SummarizationClient::offline();
        let text = "One. Two. Three. Four. Five.";
        let request = SummaryRequest::new(text, 5, "gemini-2.0-flash", "real-key", "");
        assert_eq!(
            client.summarize(&request).await,
            SummaryResult::Success {
                text: "One.".to_string()
            }
        );
    }

    #[test]
    fn test_request_normalizes_level() {
        let request = SummaryRequest::new("text", 11, "gemini-2.0-flash", "", "");
        assert_eq!(request.length_level, 3);
        assert!(!request.has_api_key());

        let request = SummaryRequest::new("text", 5, "gemini-2.0-flash", "  \t", "");
        assert_eq!(request.length_level, 5);
        assert!(!request.has_api_key());
        assert_eq!(request.with_length_level(-1).length_level, 3);
    }

    #[test]
    fn test_request_from_settings() {
        let settings = UserSettings {
            api_key: "k".to_string(),
            summary_length: 1,
            selected_model: common::KnownModel::Gemini15Pro,
            summary_prompt: String::new(),
        };
        let request = SummaryRequest::from_settings("Shared text.", &settings);
        assert_eq!(request.model_id, "gemini-1.5-pro");
        assert_eq!(request.length_level, 1);
        assert!(request.has_api_key());
        assert!(request.prompt().contains("very short, about 5%"));
    }
}
