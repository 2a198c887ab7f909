//! taggenie library crate
//!
//! Marketing tags and SEO keyword phrases for a product listing: an
//! OpenRouter model when it answers, deterministic rules when it does not.

pub mod config;
pub mod server;
pub mod suggest;

use config::Config;
use std::sync::Arc;
use suggest::llm::client::DEFAULT_REFERER;
use suggest::llm::{OpenRouterTransport, RateLimiter, RemoteSuggester};
use suggest::TagSuggester;
use tracing::warn;

/// Wire the suggestion pipeline from config.
///
/// A missing API key is not an error here. The key is looked up again on
/// every request; until one is set, requests are answered by the static rules.
pub fn build_suggester(config: &Config, local_only: bool) -> anyhow::Result<TagSuggester> {
    if local_only {
        return Ok(TagSuggester::local_only());
    }

    if config.get_api_key().is_none() {
        warn!("No OpenRouter API key configured yet. Using local suggest until one is set.");
    }

    let referer = config.cors_origin.as_deref().unwrap_or(DEFAULT_REFERER);
    let transport = Arc::new(OpenRouterTransport::new()?.with_referer(referer));
    let limiter = Arc::new(RateLimiter::new(config.rate_limit));
    let remote = RemoteSuggester::new(transport, limiter, Arc::new(config.clone()))
        .with_model(config.model.clone());
    Ok(TagSuggester::new(remote))
}
