use super::client::{ChatMessage, ChatRequest, ChatTransport};
use super::error::SuggestError;
use super::models::ModelOptions;
use super::parse::{extract_json_object, parse_suggestions, strip_markdown_fences};
use super::prompts::{tag_prompt, JSON_ONLY_INSTRUCTION};
use super::rate_limit::RateLimiter;
use crate::suggest::{Product, Suggestions};
use std::sync::Arc;
use tracing::{info, warn};

/// Where the OpenRouter key comes from. Asked on every call, so a key stored
/// after startup is picked up without a restart.
pub trait ApiKeySource: Send + Sync {
    fn api_key(&self) -> Option<String>;
}

impl<F> ApiKeySource for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn api_key(&self) -> Option<String> {
        self()
    }
}

/// Tags and keywords from an OpenRouter model.
///
/// At most two calls per product: the suggestion call, and one repair call
/// if the first answer contained no JSON object. Only the first call goes
/// through the rate limiter.
pub struct RemoteSuggester {
    transport: Arc<dyn ChatTransport>,
    limiter: Arc<RateLimiter>,
    keys: Arc<dyn ApiKeySource>,
    model: ModelOptions,
}

impl RemoteSuggester {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        limiter: Arc<RateLimiter>,
        keys: Arc<dyn ApiKeySource>,
    ) -> Self {
        Self {
            transport,
            limiter,
            keys,
            model: ModelOptions::default(),
        }
    }

    pub fn with_model(mut self, model: ModelOptions) -> Self {
        self.model = model;
        self
    }

    fn api_key(&self) -> Result<String, SuggestError> {
        self.keys
            .api_key()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(SuggestError::Config)
    }

    pub async fn suggest_remote(&self, product: &Product) -> Result<Suggestions, SuggestError> {
        let api_key = self.api_key()?;

        self.limiter.acquire().await;

        let prompt = tag_prompt(product);
        let request = ChatRequest::new(self.model.id.clone(), vec![ChatMessage::user(&prompt)])
            .with_sampling(&self.model);
        let response = self.transport.send(&api_key, &request).await?;

        let assistant = response
            .first_message()
            .cloned()
            .ok_or_else(|| SuggestError::Parse("No response from AI model".to_string()))?;
        info!(
            model = response.model.as_deref().unwrap_or(&self.model.id),
            total_tokens = response.usage.as_ref().map(|u| u.total_tokens),
            "OpenRouter call succeeded"
        );

        let text = strip_markdown_fences(assistant.text());
        let json = match extract_json_object(&text) {
            Some(json) => json.to_string(),
            None => {
                warn!("No JSON found in response, asking for a JSON-only answer");
                self.request_json_only(&api_key, prompt, assistant).await?
            }
        };

        parse_suggestions(&json)
    }

    /// Replay the conversation, including the assistant's reasoning trace,
    /// and ask for the bare object.
    async fn request_json_only(
        &self,
        api_key: &str,
        prompt: String,
        assistant: ChatMessage,
    ) -> Result<String, SuggestError> {
        let messages = vec![
            ChatMessage::user(prompt),
            assistant.into_assistant(),
            ChatMessage::user(JSON_ONLY_INSTRUCTION),
        ];
        let request = ChatRequest::new(self.model.id.clone(), messages);
        let response = self.transport.send(api_key, &request).await?;

        let refined = response
            .first_message()
            .map(|m| strip_markdown_fences(m.text()))
            .unwrap_or_default();
        extract_json_object(&refined)
            .map(str::to_string)
            .ok_or_else(|| SuggestError::Parse("No JSON found even after refinement".to_string()))
    }
}
