//! TCP transport boundary.
//!
//! Wire format: one JSON object per line, both directions. Each accepted
//! connection gets a reader task (validates payloads into [`ClientEvent`]s
//! and forwards them as commands) and a writer task (drains the session's
//! outbound queue). The transport is reliable and ordered per connection;
//! the game loop stays the only writer of world state.

use crate::dispatcher::Command;
use crate::registry::SESSION_QUEUE_DEPTH;
use log::{debug, error, info, warn};
use shared::ClientEvent;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Duration};

/// Accept loop. Runs until the process exits; individual connection failures
/// never take the listener down.
pub async fn run_listener(listener: TcpListener, commands: mpsc::Sender<Command>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("Connection from {}", addr);
                let commands = commands.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, commands).await {
                        debug!("Connection {} closed: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
                sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    commands: mpsc::Sender<Command>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    stream.set_nodelay(true).ok();
    let (read_half, mut write_half) = stream.into_split();

    // The game loop allocates the player id and registers the outbound queue.
    let (line_tx, mut line_rx) = mpsc::channel::<String>(SESSION_QUEUE_DEPTH);
    let (ack_tx, ack_rx) = oneshot::channel();
    commands
        .send(Command::Connect {
            sender: line_tx,
            ack: ack_tx,
        })
        .await?;
    let id = ack_rx.await?;

    let writer = tokio::spawn(async move {
        while let Some(line) = line_rx.recv().await {
            if write_half.write_all(line.as_bytes()).await.is_err()
                || write_half.write_all(b"\n").await.is_err()
            {
                break;
            }
        }
    });

    let mut lines = BufReader::new(read_half).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // Malformed payloads are dropped; the connection stays up.
        match serde_json::from_str::<ClientEvent>(line) {
            Ok(event) => commands.send(Command::Event { id, event }).await?,
            Err(e) => warn!("Dropping malformed payload from player {}: {}", id, e),
        }
    }

    commands.send(Command::Disconnect { id }).await?;
    writer.abort();
    Ok(())
}
