//! mhactl - line console for a running openMHA instance.
//!
//! Reads one command per line from stdin (e.g. `mha.gain.gains?val`,
//! `cmd=start`), sends it over a single control connection and prints one
//! JSON object per reply on stdout. The connection is configured through
//! `MHA_HOST`, `MHA_PORT` and `MHA_TIMEOUT_MS`; logs go to stderr and are
//! filtered by `RUST_LOG`.

use anyhow::{Context, Result};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mha_control::{Connection, ConnectionConfig, ConnectionError};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "mha_control=info".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    tracing::info!("Starting mhactl v{}", env!("CARGO_PKG_VERSION"));

    let config = ConnectionConfig::from_env()?;
    let mut connection = Connection::connect(&config)
        .await
        .with_context(|| format!("Failed to connect to MHA at {}", config.address()))?;

    // Close on every exit path before reporting
    let result = run_console(&mut connection).await;
    connection.close().await;

    if let Err(e) = result {
        tracing::error!("Console error: {}", e);
        return Err(e);
    }

    tracing::info!("mhactl exited cleanly");
    Ok(())
}

/// Forward stdin lines until EOF or a transport failure.
async fn run_console(connection: &mut Connection) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match connection.send_raw(line).await {
            Ok(response) => json!({ "command": line, "ok": true, "response": response }),
            Err(ConnectionError::RemoteRejected { code, payload, .. }) => {
                json!({ "command": line, "ok": false, "response": payload, "code": code })
            }
            Err(e) => return Err(e).with_context(|| format!("Command {:?} failed", line)),
        };
        println!("{}", reply);
    }

    Ok(())
}
