//! MQTT connection builder for cloud brokers such as AWS IoT Core.
//!
//! - `connect` builds a client with mTLS, a last will and a connect
//!   notification channel signalling every (re)connection
//! - `Channel` trait for publish/subscribe (mockable in tests)
//! - `Subscriptions` to replay topic filters after each reconnect
//! - `MockChannel` for testing without a broker

pub mod broker;
pub mod channel;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod mock;
pub mod subscriptions;
pub mod tls;
pub mod will;

// Re-exports for convenience.
pub use broker::BrokerAddress;
pub use channel::{Channel, CloudClient, build_options, connect, publish_json};
pub use config::ClientConfig;
pub use error::{CertificateError, CloudError, CloudResult};
pub use mock::MockChannel;
pub use rumqttc::{Publish, QoS};
pub use subscriptions::{Subscriptions, resubscribe_on_connect};
