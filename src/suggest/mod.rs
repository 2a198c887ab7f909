//! Tag suggestion engine
//!
//! Asks OpenRouter first and falls back to the static rules on any failure,
//! so callers always get tags. Which path produced a result is recorded in
//! [`SuggestionResult::source`] and nowhere else.

pub mod llm;
pub mod static_rules;

use llm::RemoteSuggester;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

pub use static_rules::suggest_local;

/// Maximum tags returned for one product
pub const MAX_TAGS: usize = 12;
/// Maximum keyword phrases returned for one product
pub const MAX_KEYWORDS: usize = 8;

/// `null` and missing both read as an empty string.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// What we know about the product being tagged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

impl Product {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Tags and keywords before provenance is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suggestions {
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
}

/// Which path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestionSource {
    /// OpenRouter model answer
    #[serde(rename = "openrouter-ai")]
    OpenRouter,
    /// Static rules, no network
    #[serde(rename = "local-suggest")]
    Local,
}

impl SuggestionSource {
    pub fn label(&self) -> &'static str {
        match self {
            SuggestionSource::OpenRouter => "openrouter-ai",
            SuggestionSource::Local => "local-suggest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionResult {
    pub source: SuggestionSource,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
}

impl SuggestionResult {
    fn new(source: SuggestionSource, suggestions: Suggestions) -> Self {
        Self {
            source,
            tags: suggestions.tags,
            keywords: suggestions.keywords,
        }
    }
}

/// Drop repeats, keeping the first occurrence of each entry.
pub(crate) fn dedup_in_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Remote first, static rules on failure.
pub struct TagSuggester {
    remote: Option<RemoteSuggester>,
}

impl TagSuggester {
    pub fn new(remote: RemoteSuggester) -> Self {
        Self {
            remote: Some(remote),
        }
    }

    /// Never calls out; every result comes from the static rules.
    pub fn local_only() -> Self {
        Self { remote: None }
    }

    pub async fn suggest(&self, product: &Product) -> SuggestionResult {
        let result = match &self.remote {
            None => SuggestionResult::new(SuggestionSource::Local, suggest_local(product)),
            Some(remote) => match remote.suggest_remote(product).await {
                Ok(suggestions) => SuggestionResult::new(SuggestionSource::OpenRouter, suggestions),
                Err(err) => {
                    warn!(
                        kind = err.kind(),
                        error = %err,
                        fallback = SuggestionSource::Local.label(),
                        "OpenRouter failed, falling back to local suggest"
                    );
                    SuggestionResult::new(SuggestionSource::Local, suggest_local(product))
                }
            },
        };
        debug!(
            source = result.source.label(),
            tags = result.tags.len(),
            keywords = result.keywords.len(),
            "Suggestions ready"
        );
        result
    }
}
