//! Session configuration.
//!
//! Loaded from a TOML file or built in code. Every field has a default, so
//! an empty file is a valid configuration.

use feed_core::DecodePolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration for one feed session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Remote collection holding the feed (default: `chats`).
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Text of the sentinel record created for an empty collection.
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
    /// Whether to check for and create the sentinel before subscribing
    /// (default: true).
    #[serde(default = "default_bootstrap_sentinel")]
    pub bootstrap_sentinel: bool,
    /// What to do with malformed records in a delivery (default: skip them).
    #[serde(default)]
    pub decode_policy: DecodePolicy,
}

// Default value functions
fn default_collection() -> String {
    "chats".to_string()
}

fn default_welcome_message() -> String {
    "Welcome to the chat! 🎉".to_string()
}

fn default_bootstrap_sentinel() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            welcome_message: default_welcome_message(),
            bootstrap_sentinel: default_bootstrap_sentinel(),
            decode_policy: DecodePolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Set the collection name.
    pub fn with_collection(mut self, collection: &str) -> Self {
        self.collection = collection.to_string();
        self
    }

    /// Set the sentinel text.
    pub fn with_welcome_message(mut self, message: &str) -> Self {
        self.welcome_message = message.to_string();
        self
    }

    /// Set the malformed-record policy.
    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    /// Skip the sentinel check entirely.
    pub fn without_bootstrap(mut self) -> Self {
        self.bootstrap_sentinel = false;
        self
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
