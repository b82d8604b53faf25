//! Last-will message published by the broker when the client drops.

use rumqttc::{LastWill, QoS};
use serde::Serialize;

use crate::error::{CloudError, CloudResult};

const TOPIC_PREFIX: &str = "last_will";

#[derive(Serialize)]
struct WillPayload<'a> {
    #[serde(rename = "clientID")]
    client_id: &'a str,
}

/// `last_will/{client_id}`
pub fn topic(client_id: &str) -> String {
    format!("{TOPIC_PREFIX}/{client_id}")
}

/// JSON object `{"clientID": client_id}`.
pub fn payload(client_id: &str) -> CloudResult<Vec<u8>> {
    serde_json::to_vec(&WillPayload { client_id }).map_err(CloudError::Encoding)
}

/// Last will with QoS 1 and no retain.
pub fn last_will(client_id: &str) -> CloudResult<LastWill> {
    Ok(LastWill::new(
        topic(client_id),
        payload(client_id)?,
        QoS::AtLeastOnce,
        false,
    ))
}
