//! Configuration
//!
//! [`ActivationConfig`] is the host-supplied switch that turns the capture
//! layer on and seeds the worker. [`DeliveryConfig`] is the open key/value
//! record the delivery agent owns and merges configuration messages into.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::ConfigError;
use crate::message::CONFIG_TYPE;

/// Default HTTP method for deliveries
pub const DEFAULT_METHOD: &str = "POST";

/// Host-supplied activation config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationConfig {
    /// Background program to start
    pub worker_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Anything else, passed to the worker verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActivationConfig {
    pub fn new(worker_path: impl Into<String>) -> Self {
        Self {
            worker_path: worker_path.into(),
            api_url: None,
            method: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Parse from TOML
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Apply `PASSIVE_WORKER_PATH`, `PASSIVE_API_URL` and `PASSIVE_METHOD`
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`, keyed by environment variable name
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("PASSIVE_WORKER_PATH") {
            self.worker_path = path;
        }
        if let Some(url) = lookup("PASSIVE_API_URL") {
            self.api_url = Some(url);
        }
        if let Some(method) = lookup("PASSIVE_METHOD") {
            self.method = Some(method);
        }
        tracing::debug!(
            worker_path = %self.worker_path,
            api_url = ?self.api_url,
            method = ?self.method,
            "ActivationConfig resolved"
        );
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_path.trim().is_empty() {
            return Err(ConfigError::Invalid("worker_path is empty".to_string()));
        }
        Ok(())
    }

    /// The configuration message pushed to the worker at activation
    pub fn to_config_message(&self) -> Value {
        json!({
            "type": CONFIG_TYPE,
            "payload": self,
        })
    }
}

/// Mutable delivery settings held by the delivery agent
///
/// Open schema: every key of a configuration payload is kept, with
/// `method` seeded to POST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryConfig {
    entries: Map<String, Value>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        let mut entries = Map::new();
        entries.insert("method".to_string(), Value::from(DEFAULT_METHOD));
        Self { entries }
    }
}

impl DeliveryConfig {
    /// Per-key last-write-wins merge
    pub fn merge(&mut self, payload: &Map<String, Value>) {
        for (key, value) in payload {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Destination endpoint; absent until set to a non-empty string
    pub fn api_url(&self) -> Option<&str> {
        self.entries
            .get("api_url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
    }

    pub fn method(&self) -> &str {
        self.entries
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_METHOD)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> &Map<String, Value> {
        &self.entries
    }
}
