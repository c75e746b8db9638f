//! etcd v3 KV client over the gRPC JSON gateway.
//!
//! Keys and values travel base64-encoded; int64 fields are JSON strings and
//! zero-valued fields are omitted entirely.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use sieve_storage::{FlatStore, KeyValue, StorageError};
use tracing::{debug, warn};

use crate::config::{ClientConfig, ConfigError};
use crate::transport::{Reply, Transport};

/// `range_end` value meaning "every key >= key".
const FROM_KEY_RANGE_END: &[u8] = b"\0";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RangeRequest {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_end: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub keys_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RangeResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kvs: Vec<WireKeyValue>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct WireKeyValue {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DeleteRangeRequest {
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DeleteRangeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<String>,
}

pub(crate) fn encode_key(key: &[u8]) -> String {
    BASE64.encode(key)
}

pub(crate) fn decode_bytes(encoded: &str) -> Result<Vec<u8>, StorageError> {
    BASE64
        .decode(encoded)
        .map_err(|e| StorageError::Decode(format!("invalid base64 '{encoded}': {e}")))
}

impl RangeRequest {
    pub(crate) fn from_key(start_key: &[u8]) -> Self {
        Self {
            key: encode_key(start_key),
            range_end: Some(encode_key(FROM_KEY_RANGE_END)),
            keys_only: true,
        }
    }
}

impl RangeResponse {
    /// Decode keys (and values, if present). Keys stay raw bytes, UTF-8 or
    /// not.
    pub(crate) fn into_key_values(self) -> Result<Vec<KeyValue>, StorageError> {
        if self.more {
            warn!("v3 range response is truncated; listing is incomplete");
        }
        self.kvs
            .into_iter()
            .map(|kv| {
                Ok(KeyValue {
                    key: decode_bytes(&kv.key)?,
                    value: kv.value.as_deref().map(decode_bytes).transpose()?,
                })
            })
            .collect()
    }
}

/// Flat store backed by the etcd v3 KV API.
#[derive(Debug, Clone)]
pub struct EtcdV3Client {
    transport: Transport,
}

impl EtcdV3Client {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn connect(config: &ClientConfig) -> Result<Self, ConfigError> {
        Transport::connect(config).map(Self::new)
    }

    fn path(&self, method: &str) -> String {
        format!("{}/kv/{method}", self.transport.v3_prefix())
    }
}

fn status_error(status: u16, message: String) -> StorageError {
    StorageError::Status { status, message }
}

#[async_trait]
impl FlatStore for EtcdV3Client {
    async fn list_from_key(&self, start_key: &[u8]) -> Result<Vec<KeyValue>, StorageError> {
        let request = RangeRequest::from_key(start_key);
        debug!(start_key = %String::from_utf8_lossy(start_key), "listing v3 keys");

        let reply = self
            .transport
            .execute::<RangeResponse, _>("list flat keys", self.path("range"), move |agent, url| {
                agent.post(url).send_json(&request)
            })
            .await?;

        match reply {
            Reply::Ok(response) => response.into_key_values(),
            Reply::Status { status, message } => Err(status_error(status, message)),
        }
    }

    async fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        let request = DeleteRangeRequest {
            key: encode_key(key),
        };

        let reply = self
            .transport
            .execute::<DeleteRangeResponse, _>("delete key", self.path("deleterange"), move |agent, url| {
                agent.post(url).send_json(&request)
            })
            .await?;

        match reply {
            Reply::Ok(response) => {
                let deleted = response.deleted.as_deref().unwrap_or("0");
                if deleted == "0" {
                    debug!(key = %String::from_utf8_lossy(key), "key was already gone");
                }
                Ok(())
            }
            Reply::Status { status, message } => Err(status_error(status, message)),
        }
    }
}
