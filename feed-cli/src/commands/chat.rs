//! Interactive chat over the in-process backend.

use anyhow::{Context, Result};
use feed_client::{FeedPublisher, FeedSession, MemoryCollection, RemoteCollection, SessionConfig};
use feed_types::AuthorId;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::config::DeviceConfig;
use crate::presenter::TerminalPresenter;

/// How long to wait for sent messages to come back before leaving.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Run the chat command.
pub async fn run(data_dir: &Path, config_path: Option<&Path>, peers: &[String]) -> Result<()> {
    let device = DeviceConfig::load(data_dir).await?;
    let config = match config_path {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };

    let remote = Arc::new(MemoryCollection::new());
    let session = FeedSession::new(Arc::clone(&remote), config, device.author_id.clone());

    println!(
        "Chatting in '{}' as {}. Type a message and press Enter; /quit to leave.",
        session.config().collection,
        session.identity()
    );

    session
        .start(TerminalPresenter::new(device.author_id))
        .await
        .context("Failed to start live feed")?;

    greet_peers(&remote, &session.config().collection, peers).await?;

    let stdin = BufReader::new(tokio::io::stdin());
    let sent = chat_loop(&session, stdin).await?;

    settle(&session, &remote).await;
    session.stop();

    println!(
        "Left the chat: sent {}, {} message(s) in feed.",
        sent,
        session.entries().len()
    );
    Ok(())
}

/// Send every non-blank input line until EOF or `/quit`.
///
/// Each line is committed before the next is read, so the feed keeps the
/// typed order. A failed send is logged and the loop goes on.
///
/// Returns the number of messages committed.
async fn chat_loop<R, I>(session: &FeedSession<R>, input: I) -> Result<usize>
where
    R: RemoteCollection + 'static,
    I: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut sent = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        if line.is_empty() {
            continue;
        }
        match session.send_and_wait(line).await {
            Ok(_) => sent += 1,
            Err(e) => tracing::warn!("Failed to send message: {}", e),
        }
    }

    Ok(sent)
}

/// Each simulated peer posts one greeting.
async fn greet_peers(remote: &Arc<MemoryCollection>, collection: &str, peers: &[String]) -> Result<()> {
    let publisher = FeedPublisher::new(Arc::clone(remote), collection);
    for name in peers {
        let author = AuthorId::new(name.as_str()).context("Peer name must not be empty")?;
        if author.is_welcome() {
            anyhow::bail!("'{}' is reserved for the welcome message", name);
        }
        publisher
            .submit(&author, &format!("Hi, I'm {}!", name))
            .await
            .with_context(|| format!("Peer {} failed to join", name))?;
    }
    Ok(())
}

/// Wait until every committed record has reached the local feed.
///
/// Returns at once if the live feed has already stopped.
async fn settle(session: &FeedSession<MemoryCollection>, remote: &MemoryCollection) {
    let collection = session.config().collection.clone();
    let caught_up = tokio::time::timeout(SETTLE_TIMEOUT, async {
        while session.is_live() && session.entries().len() < remote.records(&collection).len() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    if caught_up.is_err() {
        tracing::debug!("Leaving before the feed caught up with {}", collection);
    }
}
