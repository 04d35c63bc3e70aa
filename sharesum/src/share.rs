use anyhow::{Context, Result};
use reqwest::Client;
use std::io::Cursor;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use common::ShareConfig;

/// Payload of a share event: optional subject line plus the shared text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedContent {
    pub subject: Option<String>,
    pub text: String,
}

impl SharedContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            subject: None,
            text: text.into(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Combined text handed to the summarizer. The subject is prepended on
    /// its own line unless it is blank or already part of the text.
    pub fn into_text(self) -> String {
        let text = self.text.trim();
        match self.subject.as_deref().map(str::trim) {
            Some(subject) if !subject.is_empty() && !text.contains(subject) => {
                if text.is_empty() {
                    subject.to_string()
                } else {
                    format!("{}\n\n{}", subject, text)
                }
            }
            _ => text.to_string(),
        }
    }
}

/// The text is nothing but a single http(s) link
pub fn shared_link(text: &str) -> Option<Url> {
    let candidate = text.trim();
    if candidate.is_empty() || candidate.contains(char::is_whitespace) {
        return None;
    }
    Url::parse(candidate)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}

/// Turn a share event into summarizer input.
///
/// With `fetch_links` on, a bare link is replaced by the link followed by
/// the extracted article. Fetch problems keep the bare link.
pub async fn resolve_shared_text(content: SharedContent, cfg: &ShareConfig) -> String {
    let text = content.into_text();

    let text = match shared_link(&text).filter(|_| cfg.fetch_links()) {
        Some(link) => match fetch_article_text(&link, cfg.fetch_timeout_seconds()).await {
            Ok(article) if !article.trim().is_empty() => {
                format!("{}\n\n{}", link, article.trim())
            }
            Ok(_) => {
                warn!("share: no article text extracted from {}, keeping link", link);
                text
            }
            Err(e) => {
                warn!("share: failed to fetch {}: {:#}, keeping link", link, e);
                text
            }
        },
        None => text,
    };

    match cfg.max_chars {
        Some(max) => truncate_chars(&text, max),
        None => text,
    }
}

/// Fetch a page and extract the readable article as plain text.
pub async fn fetch_article_text(url: &Url, timeout_secs: u64) -> Result<String> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("sharesum/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build reqwest client")?;

    let response = client
        .get(url.as_str())
        .send()
        .await
        .context("failed to fetch shared page")?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("shared page fetch failed with status: {}", status));
    }

    // Readability requires a Reader, so we fetch bytes
    let bytes = response.bytes().await.context("failed to read response body")?;
    let mut reader = Cursor::new(bytes);

    let product = readability::extractor::extract(&mut reader, url)
        .map_err(|e| anyhow::anyhow!("readability failed: {}", e))?;

    let mut text = String::new();
    if !product.title.trim().is_empty() {
        text.push_str(product.title.trim());
        text.push_str("\n\n");
    }
    match html2text::from_read(product.content.as_bytes(), 100) {
        Ok(body) => text.push_str(&body),
        Err(e) => {
            warn!("share: failed to convert extracted HTML to text: {}", e);
            text.push_str(&product.text);
        }
    }
    info!("share: extracted {} chars from {}", text.len(), url);
    Ok(text)
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
