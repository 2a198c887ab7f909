//! Configuration management for taggenie
//!
//! Stores settings in ~/.config/taggenie/config.json. The API key never
//! lives in that file: it comes from the environment or the system keychain.

use crate::suggest::llm::{ApiKeySource, ModelOptions, RateLimitPolicy};
use anyhow::Context;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Checked in order; the second name is what older deployments used.
const API_KEY_ENV_VARS: &[&str] = &["OPENROUTER_API_KEY", "OPEN_AI_API_KEY"];
const PORT_ENV: &str = "PORT";
const CORS_ORIGIN_ENV: &str = "TAGGENIE_CORS_ORIGIN";

const KEYRING_SERVICE: &str = "taggenie";
const KEYRING_USERNAME: &str = "openrouter_api_key";

fn default_port() -> u16 {
    5000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Model and sampling for the first suggestion call
    #[serde(default)]
    pub model: ModelOptions,
    /// Outbound throttling for OpenRouter calls
    #[serde(default)]
    pub rate_limit: RateLimitPolicy,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Browser origin allowed to call the API. Any origin when unset.
    #[serde(default)]
    pub cors_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelOptions::default(),
            rate_limit: RateLimitPolicy::default(),
            port: default_port(),
            cors_origin: None,
        }
    }
}

fn keyring_entry() -> Result<Entry, keyring::Error> {
    Entry::new(KEYRING_SERVICE, KEYRING_USERNAME)
}

fn read_keyring_key() -> Result<Option<String>, keyring::Error> {
    let entry = keyring_entry()?;
    match entry.get_password() {
        Ok(key) => Ok(Some(key)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(err),
    }
}

fn write_keyring_key(key: &str) -> Result<(), keyring::Error> {
    keyring_entry()?.set_password(key)
}

/// First non-blank value among `names`, as returned by `lookup`.
fn first_set(names: &[&str], lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    names
        .iter()
        .filter_map(|&name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

impl Config {
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("taggenie"))
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk with environment overrides applied
    pub fn load() -> Self {
        let mut config = Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();
        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Load from a specific file. Missing means defaults; a corrupt file is
    /// moved aside and defaults are used.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                preserve_corrupt_config(path, &content);
                warn!(
                    path = %path.display(),
                    error = %err,
                    "Config file was corrupted. A backup was saved and defaults were loaded."
                );
                Self::default()
            }
        }
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = first_set(&[PORT_ENV], &lookup) {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
        if let Some(origin) = first_set(&[CORS_ORIGIN_ENV], &lookup) {
            self.cors_origin = Some(origin);
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path().context("Could not determine config directory")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        write_config_atomic(path, &content)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Get the OpenRouter API key (from environment or keychain)
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(key) = first_set(API_KEY_ENV_VARS, |name| std::env::var(name).ok()) {
            return Some(key);
        }

        match read_keyring_key() {
            Ok(key) => key.filter(|k| !k.trim().is_empty()),
            Err(err) => {
                warn!(
                    error = %err,
                    "Failed to read API key from system keychain; set OPENROUTER_API_KEY instead"
                );
                None
            }
        }
    }

    /// Store the API key in the system keychain and read it back.
    pub fn set_api_key(&self, key: &str) -> anyhow::Result<()> {
        write_keyring_key(key).context(
            "Failed to store API key in system keychain. \
             You can set the OPENROUTER_API_KEY environment variable instead.",
        )?;

        match read_keyring_key() {
            Ok(Some(stored)) if stored == key => Ok(()),
            Ok(_) => Err(anyhow::anyhow!(
                "API key verification failed: key was not persisted to keychain. \
                 You can set the OPENROUTER_API_KEY environment variable instead."
            )),
            Err(err) => Err(anyhow::anyhow!(
                "API key verification failed: couldn't read back from keychain ({}).",
                err
            )),
        }
    }

    /// Validate API key format (should start with sk-)
    pub fn validate_api_key_format(key: &str) -> bool {
        key.starts_with("sk-")
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/taggenie/config.json".to_string())
    }
}

/// Resolved again on every remote call, so `taggenie setup` or a newly
/// exported variable takes effect in a running server.
impl ApiKeySource for Config {
    fn api_key(&self) -> Option<String> {
        self.get_api_key()
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

fn write_config_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, content)?;
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}
