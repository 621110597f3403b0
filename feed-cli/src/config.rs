//! Identity storage for feed-cli.

use anyhow::{Context, Result};
use feed_types::AuthorId;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEVICE_FILE: &str = "device.json";

/// Author identity stored locally, stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Author ID stamped on every message this terminal sends.
    pub author_id: AuthorId,
}

impl DeviceConfig {
    /// Create a configuration with a freshly generated author ID.
    pub fn generate() -> Self {
        Self {
            author_id: AuthorId::random(),
        }
    }

    /// Create a configuration with a chosen author ID.
    pub fn with_author(author: &str) -> Result<Self> {
        let author_id = AuthorId::new(author).context("Author ID must not be empty")?;
        if author_id.is_welcome() {
            anyhow::bail!("'{}' is reserved for the welcome message", author);
        }
        Ok(Self { author_id })
    }

    /// Load the identity from a directory.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(DEVICE_FILE);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .context("No identity yet. Run 'feed-cli init' first.")?;
        serde_json::from_str(&contents).context("Invalid identity file")
    }

    /// Save the identity to a directory.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(DEVICE_FILE);
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save identity")?;
        Ok(())
    }

    /// Check if an identity exists.
    pub async fn exists(data_dir: &Path) -> bool {
        tokio::fs::try_exists(data_dir.join(DEVICE_FILE))
            .await
            .unwrap_or(false)
    }
}
