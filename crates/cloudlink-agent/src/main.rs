//! cloudlink agent: keeps a subscribed MQTT connection to a cloud broker.
//!
//! Connects with the device certificate, re-subscribes after every
//! reconnect and logs what arrives.

use tracing_subscriber::EnvFilter;

use cloudlink_agent::config::AgentConfig;
use cloudlink_agent::monitor;
use cloudlink_mqtt::resubscribe_on_connect;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "cloudlink-agent starting"
    );

    // ── Load config ─────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/cloudlink/agent.toml".to_string());

    let config = AgentConfig::from_file(&config_path)?;
    let subscriptions = config.subscriptions()?;
    tracing::info!(
        client_id = %config.mqtt.client_id,
        broker = %config.mqtt.broker_url,
        tls = config.mqtt.tls_folder().is_some(),
        subscriptions = subscriptions.len(),
        "config loaded"
    );

    // ── MQTT connection ─────────────────────────────────────────
    let (mut client, reconnects) = cloudlink_mqtt::connect(&config.mqtt).await?;
    let messages = client
        .take_messages()
        .ok_or_else(|| anyhow::anyhow!("message stream already taken"))?;

    tracing::info!("cloudlink-agent ready");

    tokio::select! {
        // Replay subscriptions on every (re)connect
        () = resubscribe_on_connect(&client, &subscriptions, reconnects) => {
            tracing::error!("connection closed unexpectedly");
        }
        // Log incoming messages
        count = monitor::log_messages(messages) => {
            tracing::error!(count, "message stream closed unexpectedly");
        }
        // Graceful shutdown on SIGINT
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            if let Err(e) = client.disconnect().await {
                tracing::warn!(error = %e, "failed to send disconnect");
            }
        }
    }

    tracing::info!("cloudlink-agent stopped");
    Ok(())
}
