use thiserror::Error;

/// Every way the remote suggestion path can fail.
///
/// None of these reach an API caller: the orchestrator catches them and
/// falls back to the local heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuggestError {
    #[error("OpenRouter API key is not configured")]
    Config,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Payment required")]
    PaymentRequired,
    #[error("Service temporarily unavailable")]
    ServiceUnavailable,
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("No response from API: {0}")]
    Network(String),
    #[error("{0}")]
    Parse(String),
}

impl SuggestError {
    /// Map an upstream status (HTTP or OpenRouter's embedded `error.code`).
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            429 => SuggestError::RateLimited,
            402 => SuggestError::PaymentRequired,
            503 => SuggestError::ServiceUnavailable,
            _ => SuggestError::Api {
                status,
                message: message.into(),
            },
        }
    }

    /// Short stable label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            SuggestError::Config => "config",
            SuggestError::RateLimited => "rate_limit",
            SuggestError::PaymentRequired => "payment",
            SuggestError::ServiceUnavailable => "service_unavailable",
            SuggestError::Api { .. } => "api",
            SuggestError::Network(_) => "network",
            SuggestError::Parse(_) => "parse",
        }
    }
}
