use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{GenerationConfig, LlmProvider, LlmRequest, LlmResponse, ProviderError};

/// Remote provider speaking the Gemini `generateContent` HTTP API
pub struct GeminiProvider {
    api_base: Url,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Build a provider with the default phase timeouts (connect 30s, read 60s, write 30s).
    pub fn new(api_base: impl Into<String>) -> Result<Self> {
        Self::with_timeouts(
            api_base,
            Duration::from_secs(30),
            Duration::from_secs(60),
            Duration::from_secs(30),
        )
    }

    pub fn from_config(cfg: &common::LlmConfig) -> Result<Self> {
        Self::with_timeouts(
            cfg.api_base(),
            Duration::from_secs(cfg.connect_timeout_seconds()),
            Duration::from_secs(cfg.read_timeout_seconds()),
            Duration::from_secs(cfg.write_timeout_seconds()),
        )
    }

    /// reqwest has no write timeout of its own; the overall request deadline
    /// is the sum of the three phases, so a stalled upload still ends.
    pub fn with_timeouts(
        api_base: impl Into<String>,
        connect: Duration,
        read: Duration,
        write: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect)
            .read_timeout(read)
            .timeout(connect + read + write)
            .build()
            .context("failed to build reqwest client")?;

        let api_base: String = api_base.into();
        let api_base = Url::parse(&api_base)
            .with_context(|| format!("invalid LLM api_base: {}", api_base))?;
        if api_base.cannot_be_a_base() {
            anyhow::bail!("LLM api_base cannot hold a path: {}", api_base);
        }

        Ok(Self { api_base, client })
    }

    /// `{api_base}/models/{model}:generateContent`, key excluded.
    /// The model id is one percent-encoded path segment.
    pub fn endpoint(&self, model: &str) -> Url {
        let mut url = self.api_base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("models")
                .push(&format!("{}:generateContent", model));
        }
        url
    }
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, ProviderError> {
        let url = self.endpoint(&request.model);
        let req_body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.prompt,
                }],
            }],
            generation_config: request.generation,
        };

        debug!(url = %url, model = %request.model, "sending generateContent request");
        let response = self
            .client
            .post(url.clone())
            .query(&[("key", request.api_key.as_str())])
            .json(&req_body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        // A body cut off mid-read is still a transport problem, not a parse one
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.without_url().to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|env| env.error.message)
                .filter(|m| !m.trim().is_empty());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = extract_text(&body)?;
        Ok(LlmResponse {
            text,
            model: request.model,
        })
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a success body
pub fn extract_text(body: &str) -> Result<String, ProviderError> {
    let resp: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    resp.candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("response has no candidates".to_string()))?
        .content
        .ok_or_else(|| ProviderError::Parse("first candidate has no content".to_string()))?
        .parts
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("first candidate has no parts".to_string()))?
        .text
        .ok_or_else(|| ProviderError::Parse("first part has no text".to_string()))
}

// Gemini API request/response structures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_model() {
        let provider = GeminiProvider::new("https://example.invalid/v1beta/").unwrap();
        assert_eq!(
            provider.endpoint("gemini-2.0-flash").as_str(),
            "https://example.invalid/v1beta/models/gemini-2.0-flash:generateContent"
        );

        let provider = GeminiProvider::new("http://127.0.0.1:8080").unwrap();
        assert_eq!(
            provider.endpoint("gemini-1.5-pro").as_str(),
            "http://127.0.0.1:8080/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn endpoint_escapes_model_ids() {
        let provider = GeminiProvider::new("https://example.invalid/v1beta").unwrap();
        let url = provider.endpoint("../evil?key=x#frag/more");

        assert_eq!(url.host_str(), Some("example.invalid"));
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        let segments: Vec<&str> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], "v1beta");
        assert_eq!(segments[1], "models");
        assert!(segments[2].ends_with(":generateContent"));
        assert!(!segments[2].contains('/'));
    }

    #[test]
    fn invalid_api_base_is_rejected() {
        assert!(GeminiProvider::new("not a url").is_err());
        assert!(GeminiProvider::new("mailto:someone@example.invalid").is_err());
    }

    #[test]
    fn request_body_matches_wire_format() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "hello".to_string(),
                }],
            }],
            generation_config: GenerationConfig::default(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{"parts": [{"text": "hello"}]}],
                "generationConfig": {
                    "temperature": 0.2,
                    "topP": 0.8,
                    "topK": 40,
                    "maxOutputTokens": 1024
                }
            })
        );
    }

    #[test]
    fn extract_text_reads_first_candidate_part() {
        let body = r#"{"candidates":[
            {"content":{"parts":[{"text":"first"},{"text":"second"}]}},
            {"content":{"parts":[{"text":"other"}]}}
        ]}"#;
        assert_eq!(extract_text(body).unwrap(), "first");
    }

    #[test]
    fn extract_text_reports_missing_paths() {
        for body in [
            r#"{}"#,
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{"finishReason":"SAFETY"}]}"#,
            r#"{"candidates":[{"content":{"parts":[]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{}}]}}]}"#,
            "not json",
        ] {
            assert!(
                matches!(extract_text(body), Err(ProviderError::Parse(_))),
                "{}",
                body
            );
        }
    }
}
