//! Fungi listener
//!
//! Connects with the configuration from the environment, subscribes to the
//! channels given as arguments and logs every event until Ctrl-C.
//!
//! Run with:
//! ```bash
//! FUNGI_WS_ENDPOINT=ws://localhost:6001 cargo run -p fungi-client -- room-1 private-room-2
//! ```

use anyhow::Context;
use fungi_client::{ClientConfig, FungiClient};
use fungi_common::try_init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Listener failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let channels: Vec<String> = std::env::args().skip(1).collect();
    if channels.is_empty() {
        anyhow::bail!("usage: fungi-listen <channel>...");
    }

    let config = ClientConfig::from_env().context("Failed to load configuration")?;
    info!(
        endpoint = %config.ws_endpoint,
        auth = config.auth_endpoint().unwrap_or("none"),
        "Configuration loaded"
    );

    let closed = Arc::new(Notify::new());
    let on_closed = Arc::clone(&closed);

    let client = FungiClient::builder(config)
        .on_connection_established(|| info!("Connected"))
        .on_close(move |event| {
            info!(code = event.code, reason = %event.reason, "Connection closed");
            on_closed.notify_one();
        })
        .on_error(|message, code| error!(code, message, "Server error"))
        .on_transport_error(|message| error!(error = message, "Transport error"))
        .build()
        .context("Failed to create client")?;

    loop {
        // Deferred clients and dropped connections both need a socket here
        client.connect()?;
        listen(&client, &channels);

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
            () = closed.notified() => {
                warn!(retry_in = ?RECONNECT_DELAY, "Connection lost, reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }

    info!("Shutting down");
    client.disconnect();

    Ok(())
}

/// Register the channels again; a closed connection forgets them
fn listen(client: &FungiClient, channels: &[String]) {
    for name in channels {
        let channel = client.subscribe(name);
        if channel.handler_count() == 0 {
            channel.on_any(|channel, event, data| {
                info!(channel, event, data = %data, "Event");
            });
        }
    }
}
