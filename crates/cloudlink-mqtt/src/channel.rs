//! Cloud MQTT client: connection builder and publish/subscribe handle.
//!
//! Wraps `rumqttc::AsyncClient`. The event loop is driven by a background
//! task spawned in [`connect`]; every CONNACK it sees is reported on the
//! returned notification channel so callers can re-subscribe.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, QoS, Transport};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::broker::BrokerAddress;
use crate::config::ClientConfig;
use crate::error::{CloudError, CloudResult};
use crate::event_loop::{ConnectNotifier, EventLoopDriver};
use crate::{tls, will};

// ── Channel trait ─────────────────────────────────────────────

/// Abstraction for MQTT message publishing and subscribing.
///
/// Enables mocking in tests without a real MQTT broker.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Publish a raw payload to a topic.
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> CloudResult<()>;

    /// Subscribe to a topic filter.
    async fn subscribe(&self, filter: &str, qos: QoS) -> CloudResult<()>;
}

/// Publish a value serialized as JSON with QoS 1 on any channel.
pub async fn publish_json<C: Channel + ?Sized, T: Serialize>(
    channel: &C,
    topic: &str,
    payload: &T,
) -> CloudResult<()> {
    let bytes =
        serde_json::to_vec(payload).map_err(|e| CloudError::Serialization(e.to_string()))?;
    channel.publish(topic, &bytes, QoS::AtLeastOnce).await
}

// ── Connection builder ────────────────────────────────────────

/// Connect to the broker described by `config`.
///
/// Blocks until the broker acknowledges the first connection. Returns the
/// client handle and a channel receiving `true` on that connection and on
/// every reconnect afterwards. The broker keeps no session state, so each
/// value means all subscriptions have to be made again.
pub async fn connect(config: &ClientConfig) -> CloudResult<(CloudClient, mpsc::Receiver<bool>)> {
    let options = build_options(config)?;
    let broker = format!("{}:{}", options.broker_address().0, options.broker_address().1);

    tracing::info!(client_id = %config.client_id, broker = %broker, "connecting to MQTT broker");

    let (client, mut eventloop) = AsyncClient::new(options, config.request_capacity.max(1));
    wait_for_connack(&mut eventloop).await.map_err(|e| {
        tracing::error!(client_id = %config.client_id, broker = %broker, error = ?e, "MQTT connect failed");
        e
    })?;

    tracing::info!(client_id = %config.client_id, broker = %broker, "MQTT connected");

    let (notify_tx, notify_rx) = mpsc::channel(config.notify_capacity.max(1));
    // No message sender until someone takes the stream.
    let (message_slot, message_rx) = watch::channel(None);

    let mut notifier = ConnectNotifier::new(notify_tx);
    notifier.notify();

    let driver = EventLoopDriver::new(
        eventloop,
        notifier,
        message_rx,
        Duration::from_secs(config.reconnect_delay_secs),
    );
    let task = tokio::spawn(driver.run());

    Ok((
        CloudClient {
            client,
            client_id: config.client_id.clone(),
            message_slot,
            message_capacity: config.message_capacity.max(1),
            task,
        },
        notify_rx,
    ))
}

/// Assemble rumqttc options: address, client ID, last will and transport.
pub fn build_options(config: &ClientConfig) -> CloudResult<MqttOptions> {
    if config.client_id.is_empty() || config.client_id.starts_with(' ') {
        return Err(CloudError::InvalidConfig(format!(
            "invalid client_id '{}'",
            config.client_id
        )));
    }
    let address = BrokerAddress::parse(&config.broker_url)?;

    let mut options = MqttOptions::new(&config.client_id, &address.host, address.port);
    // Zero disables keep-alive.
    options.set_keep_alive(Duration::from_secs(config.keepalive_secs.into()));
    options.set_clean_session(true);
    options.set_last_will(will::last_will(&config.client_id)?);

    let transport = match config.tls_folder() {
        Some(folder) => tls::load_tls_transport(folder)?,
        None if address.secure => {
            tracing::debug!(broker = %address, "TLS without client certificate");
            Transport::tls_with_default_config()
        }
        None => Transport::Tcp,
    };
    options.set_transport(transport);

    Ok(options)
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> CloudResult<()> {
    loop {
        match eventloop.poll().await? {
            Event::Incoming(Packet::ConnAck(_)) => return Ok(()),
            event => tracing::trace!(?event, "event before CONNACK"),
        }
    }
}

// ── CloudClient ───────────────────────────────────────────────

/// Connected cloud MQTT client.
///
/// Dropping it together with every other `AsyncClient` clone stops the
/// event loop task.
pub struct CloudClient {
    client: AsyncClient,
    client_id: String,
    message_slot: watch::Sender<Option<mpsc::Sender<Publish>>>,
    message_capacity: usize,
    task: JoinHandle<()>,
}

impl CloudClient {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Take the stream of incoming publishes. Returns `None` after the first call.
    ///
    /// Publishes arriving before this is called are dropped. Once taken, the
    /// event loop waits when the stream is full, so the caller must keep
    /// reading it. Dropping the receiver makes the event loop discard
    /// publishes again.
    pub fn take_messages(&mut self) -> Option<mpsc::Receiver<Publish>> {
        if self.message_slot.borrow().is_some() {
            return None;
        }
        let (tx, rx) = mpsc::channel(self.message_capacity);
        self.message_slot.send_replace(Some(tx));
        Some(rx)
    }

    /// Whether the event loop task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Publish a value serialized as JSON with QoS 1.
    pub async fn publish_json<T: Serialize>(&self, topic: &str, payload: &T) -> CloudResult<()> {
        publish_json(self, topic, payload).await
    }

    pub async fn unsubscribe(&self, filter: &str) -> CloudResult<()> {
        self.client
            .unsubscribe(filter)
            .await
            .map_err(|e| CloudError::Subscribe(e.to_string()))
    }

    /// Send DISCONNECT. The event loop task stops afterwards and the
    /// notification channel closes.
    pub async fn disconnect(&self) -> CloudResult<()> {
        tracing::info!(client_id = %self.client_id, "disconnecting from MQTT broker");
        self.client
            .disconnect()
            .await
            .map_err(|e| CloudError::Publish(e.to_string()))
    }
}

#[async_trait]
impl Channel for CloudClient {
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> CloudResult<()> {
        self.client
            .publish(topic, qos, false, payload)
            .await
            .map_err(|e| CloudError::Publish(e.to_string()))
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> CloudResult<()> {
        self.client
            .subscribe(filter, qos)
            .await
            .map_err(|e| CloudError::Subscribe(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_carry_client_id_and_address() {
        let config = ClientConfig::new("tcp://broker.example.com:1884", "gateway-01");
        let options = build_options(&config).unwrap();
        assert_eq!(options.client_id(), "gateway-01");
        assert_eq!(
            options.broker_address(),
            ("broker.example.com".to_string(), 1884)
        );
        assert!(options.clean_session());
    }

    #[test]
    fn options_register_last_will() {
        let config = ClientConfig::new("tcp://localhost", "gateway-01");
        let options = build_options(&config).unwrap();
        let will = options.last_will().expect("last will set");
        assert_eq!(will.topic, "last_will/gateway-01");
        assert_eq!(will.qos, QoS::AtLeastOnce);
        assert!(!will.retain);
    }

    #[test]
    fn zero_keepalive_disables_pings() {
        let mut config = ClientConfig::new("tcp://localhost:1883", "gateway-01");
        config.keepalive_secs = 0;
        let options = build_options(&config).unwrap();
        assert_eq!(options.keep_alive(), Duration::ZERO);

        config.keepalive_secs = 2;
        let options = build_options(&config).unwrap();
        assert_eq!(options.keep_alive(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn publish_json_sends_serialized_value_at_least_once() {
        let mock = crate::mock::MockChannel::new();
        publish_json(&mock, "status/gateway-01", &serde_json::json!({"online": true}))
            .await
            .unwrap();

        let published = mock.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "status/gateway-01");
        assert_eq!(published[0].payload, br#"{"online":true}"#);
        assert_eq!(published[0].qos, QoS::AtLeastOnce);
    }

    #[tokio::test]
    async fn publish_json_rejects_unserializable_value() {
        let mock = crate::mock::MockChannel::new();
        let mut bad = std::collections::HashMap::new();
        bad.insert((1, 2), "tuple keys are not JSON");
        let err = publish_json(&mock, "status/gateway-01", &bad)
            .await
            .err()
            .expect("should fail");
        assert!(matches!(err, CloudError::Serialization(_)), "{err}");
        assert!(mock.published().is_empty());
    }

    #[test]
    fn empty_certs_folder_uses_plain_tcp() {
        let config = ClientConfig::new("tcp://localhost:1883", "gateway-01").with_certs_folder("");
        let options = build_options(&config).unwrap();
        assert!(matches!(options.transport(), Transport::Tcp));
    }

    #[test]
    fn missing_certificates_fail_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            ClientConfig::new("ssl://localhost:8883", "gateway-01").with_certs_folder(dir.path());
        let err = build_options(&config).err().expect("should fail");
        assert!(matches!(err, CloudError::TlsConfig(_)), "{err}");
    }

    #[test]
    fn empty_client_id_rejected() {
        let config = ClientConfig::new("tcp://localhost:1883", "");
        let err = build_options(&config).err().expect("should fail");
        assert!(matches!(err, CloudError::InvalidConfig(_)));
    }

    #[test]
    fn bad_broker_url_rejected() {
        let config = ClientConfig::new("localhost", "gateway-01");
        let err = build_options(&config).err().expect("should fail");
        assert!(matches!(err, CloudError::InvalidBrokerUrl { .. }));
    }
}
