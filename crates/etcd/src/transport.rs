use serde::de::DeserializeOwned;
use sieve_storage::StorageError;
use tracing::debug;
use ureq::http::Response;
use ureq::{Agent, Body};

use crate::config::{ClientConfig, ConfigError};

/// A configured HTTP(S) agent bound to one etcd member.
///
/// Cloning is cheap; clones share the agent's connection pool.
#[derive(Debug, Clone)]
pub struct Transport {
    agent: Agent,
    base_url: String,
    v3_prefix: String,
    max_response_bytes: u64,
}

/// A decoded success body, or a non-success status with its raw body.
pub(crate) enum Reply<T> {
    Ok(T),
    Status { status: u16, message: String },
}

impl Transport {
    /// Validate the endpoint, load TLS material and build the agent.
    ///
    /// No request is sent; an unreachable member surfaces on first use.
    pub fn connect(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base_url = config.base_url()?;
        let tls = config.tls.load()?;

        let mut builder = Agent::config_builder()
            .timeout_global(Some(config.request_timeout))
            .http_status_as_error(false);
        if let Some(tls) = tls {
            builder = builder.tls_config(tls);
        }
        let agent: Agent = builder.build().into();

        debug!(
            endpoint = %base_url,
            tls = config.tls.is_enabled(),
            timeout = ?config.request_timeout,
            "configured etcd transport"
        );

        Ok(Self {
            agent,
            base_url,
            v3_prefix: config.v3_prefix(),
            max_response_bytes: config.max_response_bytes,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn v3_prefix(&self) -> &str {
        &self.v3_prefix
    }

    /// Run one blocking exchange on tokio's blocking pool.
    ///
    /// `request` receives the agent and the absolute URL for `path`.
    pub(crate) async fn execute<T, F>(
        &self,
        operation: &'static str,
        path: String,
        request: F,
    ) -> Result<Reply<T>, StorageError>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(&Agent, &str) -> Result<Response<Body>, ureq::Error> + Send + 'static,
    {
        let agent = self.agent.clone();
        let endpoint = self.base_url.clone();
        let url = format!("{}{}", self.base_url, path);
        let limit = self.max_response_bytes;

        tokio::task::spawn_blocking(move || {
            let response = request(&agent, &url).map_err(|e| classify(e, &endpoint, operation))?;
            let status = response.status();
            let mut body = response.into_body();

            if !status.is_success() {
                let message = body
                    .with_config()
                    .limit(limit)
                    .read_to_string()
                    .unwrap_or_default();
                return Ok(Reply::Status {
                    status: status.as_u16(),
                    message: message.trim().to_string(),
                });
            }

            body.with_config()
                .limit(limit)
                .read_json::<T>()
                .map(Reply::Ok)
                .map_err(|e| classify(e, &endpoint, operation))
        })
        .await
        .map_err(|e| StorageError::Backend(format!("task join error: {e}")))?
    }
}

/// Map a ureq failure onto the store error taxonomy.
fn classify(err: ureq::Error, endpoint: &str, operation: &str) -> StorageError {
    match err {
        ureq::Error::StatusCode(status) => StorageError::Status {
            status,
            message: String::new(),
        },
        ureq::Error::Timeout(_) => StorageError::Timeout {
            operation: operation.to_string(),
        },
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => StorageError::Unreachable {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        },
        ureq::Error::Io(e) => StorageError::Unreachable {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        },
        ureq::Error::Json(e) => StorageError::Decode(e.to_string()),
        other => StorageError::Backend(format!("{operation}: {other}")),
    }
}

/// Percent-encode a key path for use in a URL, keeping `/` separators.
pub(crate) fn encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
