use serde::{Deserialize, Serialize};

/// Free reasoning model the tag prompt was tuned against.
const DEFAULT_MODEL_ID: &str = "openai/gpt-oss-20b:free";
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Sampling options sent with the first suggestion call.
///
/// The repair call only sends the model id; see `RemoteSuggester`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    pub id: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask OpenRouter to run the model's reasoning pass.
    pub reasoning: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            id: DEFAULT_MODEL_ID.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            reasoning: true,
        }
    }
}

/// API usage information from OpenRouter
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}
