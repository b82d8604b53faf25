//! In-memory `Channel` for tests of code that publishes or subscribes.

use async_trait::async_trait;
use rumqttc::QoS;
use std::sync::Mutex;

use crate::channel::Channel;
use crate::error::{CloudError, CloudResult};

/// One `publish` call as seen by [`MockChannel`].
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
}

#[derive(Default)]
struct Recorded {
    published: Vec<PublishedMessage>,
    subscriptions: Vec<(String, QoS)>,
    subscribe_attempts: usize,
    reject_subscribe: bool,
}

/// Channel that records calls instead of talking to a broker.
///
/// A subscribe can be switched to fail, standing in for a SUBACK refusal
/// or a request queue that is gone.
#[derive(Default)]
pub struct MockChannel {
    recorded: Mutex<Recorded>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn fail_subscriptions(&self, fail: bool) {
        self.recorded().reject_subscribe = fail;
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.recorded().published.clone()
    }

    /// Accepted subscriptions in call order.
    pub fn subscriptions(&self) -> Vec<(String, QoS)> {
        self.recorded().subscriptions.clone()
    }

    /// Subscribe calls so far, rejected ones included.
    pub fn subscribe_attempts(&self) -> usize {
        self.recorded().subscribe_attempts
    }

    pub fn is_subscribed_to(&self, filter: &str) -> bool {
        self.recorded()
            .subscriptions
            .iter()
            .any(|(f, _)| f == filter)
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> CloudResult<()> {
        self.recorded().published.push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
        });
        Ok(())
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> CloudResult<()> {
        let mut recorded = self.recorded();
        recorded.subscribe_attempts += 1;
        if recorded.reject_subscribe {
            return Err(CloudError::Subscribe(format!("rejected '{filter}'")));
        }
        recorded.subscriptions.push((filter.to_string(), qos));
        Ok(())
    }
}
