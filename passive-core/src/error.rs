//! Error types for passive-core

use thiserror::Error;

/// Top-level error type for passive-core
#[derive(Error, Debug)]
pub enum PassiveError {
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to start worker {worker_path}: {reason}")]
    WorkerSpawn { worker_path: String, reason: String },
}

/// Errors from a single outbound delivery call
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Collector failure: {0}")]
    Collector(String),
}

/// Errors from the transport channel
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Channel closed: receiving context is gone")]
    Closed,
}

/// Errors loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_error_invalid_method_displays_correctly() {
        let error = DeliveryError::InvalidMethod("BAD METHOD".to_string());
        assert!(error.to_string().contains("Invalid HTTP method"));
        assert!(error.to_string().contains("BAD METHOD"));
    }

    #[test]
    fn delivery_error_decode_displays_correctly() {
        let error = DeliveryError::Decode("expected value at line 1".to_string());
        assert!(error.to_string().contains("decode response"));
    }

    #[test]
    fn channel_error_closed_displays_correctly() {
        assert!(ChannelError::Closed.to_string().contains("Channel closed"));
    }

    #[test]
    fn config_error_invalid_displays_correctly() {
        let error = ConfigError::Invalid("worker_path is empty".to_string());
        assert!(error.to_string().contains("worker_path is empty"));
    }

    #[test]
    fn passive_error_worker_spawn_displays_correctly() {
        let error = PassiveError::WorkerSpawn {
            worker_path: "/w.js".to_string(),
            reason: "no runtime".to_string(),
        };
        let text = error.to_string();
        assert!(text.contains("/w.js"));
        assert!(text.contains("no runtime"));
    }

    #[test]
    fn passive_error_converts_from_delivery_error() {
        let error: PassiveError = DeliveryError::Collector("down".to_string()).into();
        assert!(matches!(error, PassiveError::Delivery(_)));
    }

    #[test]
    fn passive_error_converts_from_channel_error() {
        let error: PassiveError = ChannelError::Closed.into();
        assert!(matches!(error, PassiveError::Channel(ChannelError::Closed)));
    }

    #[test]
    fn passive_error_converts_from_config_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: PassiveError = ConfigError::Read(io_error).into();
        assert!(error.to_string().contains("Configuration error"));
    }
}
