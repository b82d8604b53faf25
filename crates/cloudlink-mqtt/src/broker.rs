//! Broker URL parsing.
//!
//! Accepts `scheme://host[:port]` where the scheme selects the transport:
//! `tcp` / `mqtt` for plain TCP and `ssl` / `tls` / `mqtts` / `tcps` for TLS.
//! WebSocket brokers (`ws` / `wss`) are not supported.

use url::Url;

use crate::error::{CloudError, CloudResult};

const PLAIN_PORT: u16 = 1883;
const TLS_PORT: u16 = 8883;

/// Host, port and transport security resolved from a broker URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl BrokerAddress {
    pub fn parse(broker_url: &str) -> CloudResult<Self> {
        let invalid = |reason: String| CloudError::InvalidBrokerUrl {
            url: broker_url.to_string(),
            reason,
        };

        let url = Url::parse(broker_url).map_err(|e| invalid(e.to_string()))?;

        let secure = match url.scheme() {
            "tcp" | "mqtt" => false,
            "ssl" | "tls" | "mqtts" | "tcps" => true,
            other => return Err(invalid(format!("unsupported scheme '{other}'"))),
        };

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.trim_start_matches('[').trim_end_matches(']'),
            _ => return Err(invalid("missing host".to_string())),
        };

        let port = url
            .port()
            .unwrap_or(if secure { TLS_PORT } else { PLAIN_PORT });

        Ok(Self {
            host: host.to_string(),
            port,
            secure,
        })
    }
}

impl std::fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = if self.secure { "ssl" } else { "tcp" };
        write!(f, "{scheme}://{}:{}", self.host, self.port)
    }
}
