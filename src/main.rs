//! TETRS Arena - versus server over stdio
//!
//! Reads one JSON command per line on stdin, `{"from": "c1", "command": {...}}`,
//! and writes one JSON event per line on stdout, `{"to": "c1", "event": {...}}`.

use std::io;
use std::path::PathBuf;
use tetrs_arena::driver;
use tetrs_arena::error::{GameError, codes};
use tetrs_arena::protocol::{Inbound, Outbound, ServerEvent};
use tetrs_arena::settings::Settings;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Get the arena temp directory, creating it if needed
fn arena_temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join("tetrs-arena");
    let _ = std::fs::create_dir_all(&dir);
    dir
}

fn main() -> io::Result<()> {
    // Generate session ID for this instance
    let session_id: u32 = rand::random();

    let settings = Settings::load();

    // Setup tracing to log file
    let arena_dir = arena_temp_dir();
    let log_file = format!("{:08x}.log", session_id);
    let file_appender = tracing_appender::rolling::never(&arena_dir, &log_file);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let filter = match settings.logging.filter.parse::<Directive>() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(e) => {
            eprintln!("Warning: Ignoring log filter '{}': {}", settings.logging.filter, e);
            EnvFilter::from_default_env()
        }
    };
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .with_ansi(false)
        .init();

    info!(
        "TETRS Arena starting up, session={:08x}, log={}",
        session_id,
        arena_dir.join(&log_file).display()
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(serve(settings));

    info!("TETRS Arena shutting down");
    result
}

/// Pump stdin into the driver and driver events onto stdout until stdin
/// closes
async fn serve(settings: Settings) -> io::Result<()> {
    let (driver, commands, mut events) = driver::spawn(settings.gameplay.clone());
    let (rejects_tx, mut rejects) = mpsc::channel::<Outbound>(16);

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        loop {
            let event = tokio::select! {
                Some(event) = events.recv() => event,
                Some(event) = rejects.recv() => event,
                else => break,
            };
            write_event(&mut stdout, &event).await?;
        }
        Ok::<_, io::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match decode(line) {
            Ok(inbound) => {
                if commands.send(inbound).await.is_err() {
                    warn!("Driver stopped, dropping input");
                    break;
                }
            }
            Err(reject) => {
                if rejects_tx.send(reject).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(commands);
    drop(rejects_tx);
    driver.await.map_err(io::Error::other)?;
    writer.await.map_err(io::Error::other)?
}

/// Parse one input line, or build the error event for its sender
fn decode(line: &str) -> Result<Inbound, Outbound> {
    serde_json::from_str::<Inbound>(line).map_err(|e| {
        warn!("Malformed input: {}", e);
        // Best effort at finding who sent it
        let from = serde_json::from_str::<serde_json::Value>(line)
            .ok()
            .and_then(|value| value.get("from")?.as_str().map(str::to_string))
            .unwrap_or_default();
        let err = GameError::network(codes::MALFORMED_MESSAGE, format!("Malformed message: {}", e));
        Outbound::new(from, ServerEvent::error(&err))
    })
}

async fn write_event<W: AsyncWrite + Unpin>(writer: &mut W, event: &Outbound) -> io::Result<()> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await
}
