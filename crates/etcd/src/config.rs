use std::path::PathBuf;
use std::time::Duration;

use crate::tls::TlsFiles;

/// Path prefix of the v3 gRPC gateway (etcd 3.4 and later).
pub const DEFAULT_V3_API_PREFIX: &str = "/v3";

/// Largest response body the clients will read: 512 MiB.
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 512 * 1024 * 1024;

/// Connection settings shared by the v2 and v3 clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Cluster member address, e.g. `https://10.0.0.1:2379`. A bare
    /// `host:port` gets `https://` when TLS material is configured and
    /// `http://` otherwise.
    pub endpoint: String,
    pub tls: TlsFiles,
    /// Ceiling for a single HTTP exchange, connect through body.
    pub request_timeout: Duration,
    /// Gateway prefix; `/v3beta` for etcd 3.3, `/v3alpha` for 3.2.
    pub v3_api_prefix: String,
    pub max_response_bytes: u64,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            tls: TlsFiles::default(),
            request_timeout: Duration::from_secs(30),
            v3_api_prefix: DEFAULT_V3_API_PREFIX.to_string(),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Validated base URL without a trailing slash.
    pub fn base_url(&self) -> Result<String, ConfigError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        if endpoint.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "contains whitespace".to_string(),
            });
        }

        let url = match endpoint.split_once("://") {
            Some(("http" | "https", rest)) if !rest.trim_matches('/').is_empty() => {
                endpoint.to_string()
            }
            Some((scheme, rest)) if rest.trim_matches('/').is_empty() => {
                return Err(ConfigError::InvalidEndpoint {
                    endpoint: endpoint.to_string(),
                    reason: format!("no host after '{scheme}://'"),
                })
            }
            Some((scheme, _)) => {
                return Err(ConfigError::InvalidEndpoint {
                    endpoint: endpoint.to_string(),
                    reason: format!("unsupported scheme '{scheme}', expected http or https"),
                })
            }
            None if self.tls.is_enabled() => format!("https://{endpoint}"),
            None => format!("http://{endpoint}"),
        };
        Ok(url.trim_end_matches('/').to_string())
    }

    /// Gateway prefix normalized to `/segment` form.
    pub(crate) fn v3_prefix(&self) -> String {
        let trimmed = self.v3_api_prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }
}

/// Problems with client settings, detected before any request is sent.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("etcd endpoint address is required")]
    MissingEndpoint,

    #[error("invalid etcd endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// A client certificate was given without its key, or vice versa.
    #[error("TLS client {present} was given without a {missing}")]
    IncompleteClientIdentity {
        present: &'static str,
        missing: &'static str,
    },

    #[error("could not read TLS file '{}': {source}", .path.display())]
    ReadTls {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TLS file '{}': {reason}", .path.display())]
    InvalidTls { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_endpoint_is_missing() {
        assert!(matches!(
            ClientConfig::new("  ").base_url(),
            Err(ConfigError::MissingEndpoint)
        ));
    }

    #[test]
    fn bare_host_defaults_to_http() {
        assert_eq!(
            ClientConfig::new("127.0.0.1:2379").base_url().unwrap(),
            "http://127.0.0.1:2379"
        );
    }

    #[test]
    fn bare_host_with_tls_defaults_to_https() {
        let mut config = ClientConfig::new("etcd.local:2379");
        config.tls.ca = Some(PathBuf::from("/etc/etcd/ca.pem"));
        assert_eq!(config.base_url().unwrap(), "https://etcd.local:2379");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(
            ClientConfig::new("https://etcd:2379/").base_url().unwrap(),
            "https://etcd:2379"
        );
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let err = ClientConfig::new("unix:///var/run/etcd.sock")
            .base_url()
            .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme 'unix'"), "{err}");
    }

    #[test]
    fn scheme_without_host_is_rejected() {
        assert!(matches!(
            ClientConfig::new("http://").base_url(),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn v3_prefix_is_normalized() {
        let mut config = ClientConfig::new("http://etcd:2379");
        assert_eq!(config.v3_prefix(), "/v3");
        config.v3_api_prefix = "v3beta/".into();
        assert_eq!(config.v3_prefix(), "/v3beta");
        config.v3_api_prefix = "/".into();
        assert_eq!(config.v3_prefix(), "");
    }
}
