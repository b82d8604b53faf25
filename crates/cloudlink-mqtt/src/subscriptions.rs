//! Subscription replay on (re)connect.
//!
//! The broker drops subscriptions with the session, so every connect
//! notification has to be followed by subscribing to everything again.

use rumqttc::QoS;
use tokio::sync::mpsc;

use crate::channel::Channel;
use crate::error::CloudResult;

/// Ordered set of topic filters with their QoS.
#[derive(Debug, Clone, Default)]
pub struct Subscriptions {
    filters: Vec<(String, QoS)>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter. Adding an existing filter replaces its QoS.
    pub fn add(&mut self, filter: impl Into<String>, qos: QoS) {
        let filter = filter.into();
        match self.filters.iter_mut().find(|(f, _)| *f == filter) {
            Some(entry) => entry.1 = qos,
            None => self.filters.push((filter, qos)),
        }
    }

    pub fn remove(&mut self, filter: &str) -> bool {
        let before = self.filters.len();
        self.filters.retain(|(f, _)| f != filter);
        self.filters.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, QoS)> {
        self.filters.iter().map(|(f, q)| (f.as_str(), *q))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Subscribe to every filter, stopping at the first failure.
    pub async fn subscribe_all<C: Channel + ?Sized>(&self, channel: &C) -> CloudResult<()> {
        for (filter, qos) in &self.filters {
            channel.subscribe(filter, *qos).await?;
        }
        Ok(())
    }
}

/// Re-subscribe on each connect notification until the channel closes.
pub async fn resubscribe_on_connect<C: Channel + ?Sized>(
    channel: &C,
    subscriptions: &Subscriptions,
    mut reconnects: mpsc::Receiver<bool>,
) {
    while let Some(connected) = reconnects.recv().await {
        if !connected {
            continue;
        }
        match subscriptions.subscribe_all(channel).await {
            Ok(()) => tracing::info!(count = subscriptions.len(), "MQTT subscriptions active"),
            Err(e) => tracing::warn!(error = %e, "failed to re-subscribe"),
        }
    }
    tracing::debug!("connect notification channel closed");
}
