use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Cloud MQTT connection configuration, loadable from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Folder holding `certificate.pem.crt`, `private.pem.key` and
    /// `root-CA.crt`. Absent or empty disables client-certificate TLS.
    #[serde(default)]
    pub certs_folder: Option<PathBuf>,
    /// Broker URL, e.g. `ssl://a1b2c3-ats.iot.eu-west-1.amazonaws.com:8883`.
    /// Schemes: `tcp`, `mqtt`, `ssl`, `tls`, `mqtts`, `tcps`. WebSocket
    /// URLs (`ws://`, `wss://`) are rejected.
    pub broker_url: String,
    /// MQTT client ID. Also names the last-will topic and payload.
    pub client_id: String,
    /// Keep-alive interval in seconds. 0 disables keep-alive.
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u16,
    /// Pause between event loop errors before polling again.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    /// Capacity of the connect notification channel.
    #[serde(default = "default_notify_capacity")]
    pub notify_capacity: usize,
    /// Capacity of the incoming message channel.
    #[serde(default = "default_message_capacity")]
    pub message_capacity: usize,
    /// Capacity of the rumqttc request queue.
    #[serde(default = "default_request_capacity")]
    pub request_capacity: usize,
}

fn default_keepalive() -> u16 {
    30
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_notify_capacity() -> usize {
    1
}

fn default_message_capacity() -> usize {
    64
}

fn default_request_capacity() -> usize {
    64
}

impl ClientConfig {
    pub fn new(broker_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            certs_folder: None,
            broker_url: broker_url.into(),
            client_id: client_id.into(),
            keepalive_secs: default_keepalive(),
            reconnect_delay_secs: default_reconnect_delay(),
            notify_capacity: default_notify_capacity(),
            message_capacity: default_message_capacity(),
            request_capacity: default_request_capacity(),
        }
    }

    pub fn with_certs_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.certs_folder = Some(folder.into());
        self
    }

    /// The certificate folder, if one was given and it is not empty.
    pub fn tls_folder(&self) -> Option<&Path> {
        self.certs_folder
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal_config() {
        let toml = r#"
broker_url = "ssl://a1b2c3-ats.iot.us-east-1.amazonaws.com:8883"
client_id = "gateway-01"
"#;
        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.client_id, "gateway-01");
        assert!(config.certs_folder.is_none());
        assert_eq!(config.keepalive_secs, 30);
        assert_eq!(config.reconnect_delay_secs, 5);
        assert_eq!(config.notify_capacity, 1);
        assert_eq!(config.message_capacity, 64);
    }

    #[test]
    fn deserialize_full_config() {
        let toml = r#"
certs_folder = "/etc/cloudlink/certs"
broker_url = "tcp://localhost:1883"
client_id = "gateway-02"
keepalive_secs = 60
reconnect_delay_secs = 1
notify_capacity = 4
message_capacity = 16
request_capacity = 8
"#;
        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.tls_folder(), Some(Path::new("/etc/cloudlink/certs")));
        assert_eq!(config.keepalive_secs, 60);
        assert_eq!(config.reconnect_delay_secs, 1);
        assert_eq!(config.notify_capacity, 4);
        assert_eq!(config.request_capacity, 8);
    }

    #[test]
    fn empty_certs_folder_disables_tls() {
        let config = ClientConfig::new("tcp://localhost:1883", "dev").with_certs_folder("");
        assert!(config.certs_folder.is_some());
        assert!(config.tls_folder().is_none());
    }
}
