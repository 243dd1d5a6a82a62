use std::sync::Arc;

use departure_relay::backend::{BackendClient, BackendConfig};
use departure_relay::bridge::{format_message, parse_line};
use departure_relay::device::OutboundMessage;
use departure_relay::router::{RequestRouter, Trigger};
use departure_relay::settings::FileSettingsStore;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Where settings are persisted.
const SETTINGS_PATH_VAR: &str = "RELAY_SETTINGS_PATH";
const DEFAULT_SETTINGS_PATH: &str = "relay-settings.json";

/// Optional request timeout in seconds; unset keeps the transport default.
const TIMEOUT_VAR: &str = "RELAY_TIMEOUT_SECS";

/// How many host events may wait while a request is in flight.
const TRIGGER_QUEUE_DEPTH: usize = 32;

#[tokio::main]
async fn main() {
    // stdout carries device messages, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings_path =
        std::env::var(SETTINGS_PATH_VAR).unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
    let store = Arc::new(FileSettingsStore::new(settings_path));
    info!(path = %store.path().display(), "settings file");

    let mut backend_config = BackendConfig::new();
    if let Some(secs) = std::env::var(TIMEOUT_VAR)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
    {
        backend_config = backend_config.with_timeout(secs);
    }
    let backend = BackendClient::new(backend_config).expect("Failed to create backend client");

    let (message_tx, mut message_rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (trigger_tx, trigger_rx) = mpsc::channel::<Trigger>(TRIGGER_QUEUE_DEPTH);

    // Device side: one JSON object per line on stdout
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(message) = message_rx.recv().await {
            let line = match format_message(&message) {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "could not format message");
                    continue;
                }
            };
            if stdout.write_all(line.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
                error!("stdout closed");
                break;
            }
        }
    });

    // Host side: one JSON event per line on stdin
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match parse_line(&line) {
                    Ok(trigger) => {
                        if trigger_tx.send(trigger).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "ignoring unreadable host event"),
                },
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "stdin read failed");
                    break;
                }
            }
        }
    });

    let mut router = RequestRouter::new(backend, message_tx, store);
    if let Err(e) = router.run(trigger_rx).await {
        error!(error = %e, "relay stopped");
    }

    // Dropping the router closes the message channel and lets the writer finish.
    drop(router);
    if let Err(e) = writer.await {
        error!(error = %e, "writer task failed");
    }
}
