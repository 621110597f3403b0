//! Create this terminal's author identity.

use anyhow::Result;
use std::path::Path;

use crate::config::DeviceConfig;

/// Run the init command.
pub async fn run(data_dir: &Path, author: Option<&str>) -> Result<()> {
    if DeviceConfig::exists(data_dir).await {
        anyhow::bail!(
            "Identity already exists. Delete {} to reinitialize.",
            data_dir.join("device.json").display()
        );
    }

    let config = match author {
        Some(author) => DeviceConfig::with_author(author)?,
        None => DeviceConfig::generate(),
    };
    config.save(data_dir).await?;

    println!("Identity created!");
    println!();
    println!("  Author ID: {}", config.author_id);
    println!("  Data dir:  {}", data_dir.display());
    println!();
    println!("Next step: feed-cli chat --peer alice");

    Ok(())
}
