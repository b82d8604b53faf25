//! Error types for building and using a cloud MQTT connection.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while connecting to or talking with the broker.
///
/// Wrapped causes are reachable through `source()` only, so chain printers
/// such as anyhow's `{:#}` show each one once.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("error while encoding last will")]
    Encoding(#[source] serde_json::Error),

    #[error("can't create a tls config")]
    TlsConfig(#[from] CertificateError),

    #[error("can't connect")]
    Connect(#[from] rumqttc::ConnectionError),

    #[error("invalid broker url '{url}': {reason}")]
    InvalidBrokerUrl { url: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("subscribe error: {0}")]
    Subscribe(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Failure to load one of the certificate folder files.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("can't read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed '{}': {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },
}

impl CertificateError {
    /// Path of the file that failed to load.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Read { path, .. } | Self::Malformed { path, .. } => path,
        }
    }
}

/// Convenience alias for cloud MQTT results.
pub type CloudResult<T> = Result<T, CloudError>;
