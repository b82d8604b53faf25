//! MQTT event loop driver.
//!
//! Polls the rumqttc event loop in a background task, reporting every
//! CONNACK on the connect notification channel and forwarding incoming
//! publishes. rumqttc reconnects on the next poll after an error.

use std::time::Duration;

use rumqttc::{ConnectionError, Event, EventLoop, Outgoing, Packet, Publish};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;

/// Sends `true` on the connect notification channel without ever waiting.
///
/// A full channel already holds an unread signal, so the new one is
/// coalesced into it. The event is still logged since a reader that falls
/// that far behind is probably stuck.
pub struct ConnectNotifier {
    tx: mpsc::Sender<bool>,
    closed: bool,
}

impl ConnectNotifier {
    pub fn new(tx: mpsc::Sender<bool>) -> Self {
        Self { tx, closed: false }
    }

    /// Report a (re)connection. Returns whether a signal was queued.
    pub fn notify(&mut self) -> bool {
        match self.tx.try_send(true) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("connect notification pending and unread, coalescing");
                false
            }
            Err(TrySendError::Closed(_)) => {
                if !self.closed {
                    tracing::warn!("connect notification receiver dropped");
                    self.closed = true;
                }
                false
            }
        }
    }
}

/// Hands incoming publishes to the message stream, if anyone took it.
///
/// The sender is installed by `CloudClient::take_messages`. Until then, or
/// once the receiver is gone, publishes are dropped so the event loop keeps
/// answering pings and noticing reconnects.
pub struct MessageForwarder {
    slot: watch::Receiver<Option<mpsc::Sender<Publish>>>,
}

impl MessageForwarder {
    pub fn new(slot: watch::Receiver<Option<mpsc::Sender<Publish>>>) -> Self {
        Self { slot }
    }

    /// Returns whether the publish reached the stream.
    pub async fn forward(&self, publish: Publish) -> bool {
        let tx = self.slot.borrow().clone();
        let Some(tx) = tx else {
            tracing::trace!(topic = %publish.topic, "message stream not taken, dropping publish");
            return false;
        };
        if tx.send(publish).await.is_err() {
            tracing::trace!("message receiver dropped");
            return false;
        }
        true
    }
}

/// Owns the rumqttc event loop once the first connection is up.
pub struct EventLoopDriver {
    eventloop: EventLoop,
    notifier: ConnectNotifier,
    messages: MessageForwarder,
    reconnect_delay: Duration,
}

impl EventLoopDriver {
    pub fn new(
        eventloop: EventLoop,
        notifier: ConnectNotifier,
        messages: watch::Receiver<Option<mpsc::Sender<Publish>>>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            eventloop,
            notifier,
            messages: MessageForwarder::new(messages),
            reconnect_delay,
        }
    }

    /// Drive the event loop until the client disconnects or is dropped.
    pub async fn run(mut self) {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    tracing::info!(session_present = ack.session_present, "MQTT reconnected");
                    self.notifier.notify();
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    tracing::debug!(topic = %publish.topic, bytes = publish.payload.len(), "incoming publish");
                    self.messages.forward(publish).await;
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    tracing::info!("MQTT disconnect sent, stopping event loop");
                    break;
                }
                Ok(_) => {}
                Err(ConnectionError::RequestsDone) => {
                    tracing::info!("MQTT client dropped, stopping event loop");
                    break;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        delay_ms = self.reconnect_delay.as_millis() as u64,
                        "MQTT event loop error, reconnecting"
                    );
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }
}
