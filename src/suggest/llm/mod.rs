pub mod client;
pub mod error;
pub mod models;
pub mod parse;
pub mod prompts;
pub mod rate_limit;
pub mod remote;

pub use client::{ChatTransport, OpenRouterTransport};
pub use error::SuggestError;
pub use models::ModelOptions;
pub use rate_limit::{RateLimitPolicy, RateLimiter};
pub use remote::{ApiKeySource, RemoteSuggester};
