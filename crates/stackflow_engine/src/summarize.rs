use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use stackflow_logging::{flow_debug, flow_warn};
use thiserror::Error;

/// Environment variable holding the summarizer credential.
pub const API_KEY_ENV: &str = "API_KEY";

/// Returned when the service answers successfully with no text.
pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "No content generated.";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("API key not found (set API_KEY)")]
    MissingCredential,
    #[error("could not build http client: {0}")]
    Client(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unreadable response: {0}")]
    Decode(String),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, input: &str) -> Result<String, SummarizeError>;
}

#[derive(Debug, Clone)]
pub struct SummarizerSettings {
    /// Checked when a summary is requested, not at construction.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub connect_timeout: Duration,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl SummarizerSettings {
    /// Defaults with the credential taken from [`API_KEY_ENV`]. A blank value
    /// counts as missing.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty()),
            ..Self::default()
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Instruction sent with every job. The input is embedded as-is.
pub fn build_prompt(input: &str) -> String {
    format!(
        "You are an intelligent content processor.\n\
         The user has provided the following input (which may be a URL or a topic): \"{input}\".\n\
         \n\
         1. If it is a URL, use Google Search to find the content of that page.\n\
         2. If it is a topic, search for the latest information on it.\n\
         3. Provide a comprehensive summary of the content.\n\
         4. Extract 3-5 key takeaways.\n\
         5. Format the output in clean Markdown.\n"
    )
}

/// Client for the Gemini `generateContent` endpoint with search grounding.
#[derive(Debug, Clone)]
pub struct GeminiSummarizer {
    settings: SummarizerSettings,
    client: reqwest::Client,
}

impl GeminiSummarizer {
    pub fn new(settings: SummarizerSettings) -> Result<Self, SummarizeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| SummarizeError::Client(err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

#[async_trait::async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, input: &str) -> Result<String, SummarizeError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(SummarizeError::MissingCredential)?;

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": build_prompt(input) }],
            }],
            "tools": [{ "google_search": {} }],
        });

        flow_debug!(
            "generateContent model={} input_len={}",
            self.settings.model,
            input.len()
        );
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|err| SummarizeError::Transport(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| SummarizeError::Transport(err.to_string()))?;

        if !status.is_success() {
            let message = error_message(&text).unwrap_or_else(|| status.to_string());
            flow_warn!("generateContent failed status={} message={}", status, message);
            return Err(SummarizeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|err| SummarizeError::Decode(err.to_string()))?;
        let summary = parsed.text();
        if summary.is_empty() {
            return Ok(EMPTY_RESPONSE_PLACEHOLDER.to_string());
        }
        Ok(summary)
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Text parts of the first candidate, joined.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
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

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
}
