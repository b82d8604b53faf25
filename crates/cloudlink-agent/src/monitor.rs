//! Logs incoming publishes until the message stream closes.

use rumqttc::Publish;
use tokio::sync::mpsc;

/// Drain the message stream, logging each publish. Returns how many were seen.
pub async fn log_messages(mut messages: mpsc::Receiver<Publish>) -> usize {
    let mut count = 0;
    while let Some(publish) = messages.recv().await {
        count += 1;
        match serde_json::from_slice::<serde_json::Value>(&publish.payload) {
            Ok(json) => tracing::info!(topic = %publish.topic, payload = %json, "message received"),
            Err(_) => tracing::info!(
                topic = %publish.topic,
                bytes = publish.payload.len(),
                "binary message received"
            ),
        }
    }
    tracing::debug!(count, "message stream closed");
    count
}
