//! Agent configuration, loadable from TOML.

use anyhow::{Context, bail};
use rumqttc::QoS;
use serde::Deserialize;

use cloudlink_mqtt::{ClientConfig, Subscriptions};

/// Top-level configuration for the agent.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// MQTT connection settings.
    pub mqtt: ClientConfig,
    /// Topic filters subscribed on every (re)connect.
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    pub topic: String,
    #[serde(default = "default_qos")]
    pub qos: u8,
}

fn default_qos() -> u8 {
    1
}

impl AgentConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("can't read config '{path}'"))?;
        let config: Self =
            toml::from_str(&contents).with_context(|| format!("can't parse config '{path}'"))?;
        Ok(config)
    }

    /// Subscription set built from the configured filters.
    pub fn subscriptions(&self) -> anyhow::Result<Subscriptions> {
        let mut subs = Subscriptions::new();
        for sub in &self.subscriptions {
            let qos = match sub.qos {
                0 => QoS::AtMostOnce,
                1 => QoS::AtLeastOnce,
                2 => QoS::ExactlyOnce,
                other => bail!("invalid qos {other} for topic '{}'", sub.topic),
            };
            subs.add(sub.topic.clone(), qos);
        }
        Ok(subs)
    }
}
