use super::error::SuggestError;
use super::models::{ModelOptions, Usage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// OpenRouter direct API URL
pub(crate) const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Sent as `HTTP-Referer` when no front-end origin is configured: the
/// storefront dev server.
pub const DEFAULT_REFERER: &str = "http://localhost:5173";

/// Sent as `X-Title` so calls are attributed to this app on OpenRouter.
const APP_TITLE: &str = "AI Product Tag Generator";

/// Reasoning models can sit on a prompt for a long time before answering.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// Upstream text kept in an error message, in characters.
const ERROR_EXCERPT_CHARS: usize = 200;

/// Markers of key material. Upstream errors sometimes echo the request's
/// Authorization header back.
const KEY_MARKERS: &[&str] = &[
    "sk-", "bearer", "api_key", "apikey", "secret", "password", "credential",
];

/// Short, key-free excerpt of an upstream body for errors and logs.
fn sanitize_api_response(content: &str) -> String {
    let excerpt = truncate_str(content, ERROR_EXCERPT_CHARS);
    let lower = excerpt.to_lowercase();
    if KEY_MARKERS.iter().any(|marker| lower.contains(marker)) {
        "(upstream message withheld: it may echo the API key)".to_string()
    } else {
        excerpt.to_string()
    }
}

/// One chat turn. Assistant turns are echoed back verbatim on the repair
/// call, so `reasoning_details` is kept as opaque JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_details: Option<serde_json::Value>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
            reasoning_details: None,
        }
    }

    /// Same turn, with the role forced to `assistant`.
    pub fn into_assistant(self) -> Self {
        Self {
            role: "assistant".to_string(),
            ..self
        }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Bare request: model and messages only.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            reasoning: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_sampling(mut self, options: &ModelOptions) -> Self {
        self.temperature = Some(options.temperature);
        self.max_tokens = Some(options.max_tokens);
        if options.reasoning {
            self.reasoning = Some(ReasoningConfig { enabled: true });
        }
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: Option<ChatMessage>,
}

impl ChatResponse {
    pub fn first_message(&self) -> Option<&ChatMessage> {
        self.choices.first().and_then(|c| c.message.as_ref())
    }
}

/// OpenRouter error response (can come with 200 status for upstream errors)
#[derive(Deserialize)]
pub(crate) struct OpenRouterError {
    pub error: OpenRouterApiError,
}

#[derive(Deserialize)]
pub(crate) struct OpenRouterApiError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<u16>,
}

/// Upstream `error.message`, or a generic placeholder.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<OpenRouterError>(body)
        .ok()
        .and_then(|e| e.error.message)
        .map(|m| sanitize_api_response(&m))
        .unwrap_or_else(|| "Unknown error".to_string())
}

/// Anything that can carry a chat completion request.
///
/// The HTTP implementation is [`OpenRouterTransport`]; tests swap in
/// scripted transports.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, api_key: &str, request: &ChatRequest)
        -> Result<ChatResponse, SuggestError>;
}

/// Create a configured HTTP client for OpenRouter requests
pub(crate) fn create_http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))
}

/// Chat completions over HTTPS.
#[derive(Debug, Clone)]
pub struct OpenRouterTransport {
    client: reqwest::Client,
    url: String,
    referer: String,
}

impl OpenRouterTransport {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_url(OPENROUTER_URL, REQUEST_TIMEOUT)
    }

    pub fn with_url(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: create_http_client(timeout)?,
            url: url.into(),
            referer: DEFAULT_REFERER.to_string(),
        })
    }

    /// Origin reported in `HTTP-Referer`, normally the front end's.
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }
}

#[async_trait]
impl ChatTransport for OpenRouterTransport {
    async fn send(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse, SuggestError> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending OpenRouter request"
        );

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", self.referer.as_str())
            .header("X-Title", APP_TITLE)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let message = upstream_message(&text);
            error!(status = status.as_u16(), error = %message, "OpenRouter API error");
            return Err(SuggestError::from_status(status.as_u16(), message));
        }

        // OpenRouter sometimes returns errors with 200 status (upstream provider issues)
        if let Ok(err_resp) = serde_json::from_str::<OpenRouterError>(&text) {
            let code = err_resp.error.code.unwrap_or(status.as_u16());
            let message = err_resp
                .error
                .message
                .map(|m| sanitize_api_response(&m))
                .unwrap_or_else(|| "Unknown error".to_string());
            error!(code, error = %message, "OpenRouter returned an error body");
            return Err(SuggestError::from_status(code, message));
        }

        serde_json::from_str::<ChatResponse>(&text).map_err(|e| {
            SuggestError::Parse(format!(
                "Failed to parse OpenRouter response: {} ({})",
                e,
                sanitize_api_response(&text)
            ))
        })
    }
}

fn map_transport_error(err: reqwest::Error) -> SuggestError {
    if err.is_timeout() {
        SuggestError::Network("OpenRouter request timed out".to_string())
    } else if err.is_connect() {
        SuggestError::Network("Could not connect to OpenRouter".to_string())
    } else {
        SuggestError::Network(err.to_string())
    }
}

/// Truncate a string for display (Unicode-safe)
pub(crate) fn truncate_str(s: &str, max_chars: usize) -> &str {
    if s.chars().count() <= max_chars {
        s
    } else {
        let byte_idx = s
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        &s[..byte_idx]
    }
}
