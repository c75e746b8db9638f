//! etcd clients for the two key namespaces being reconciled.
//!
//! - [`EtcdV2Client`] lists the v2 keys API tree (`/v2/keys`) and implements
//!   [`HierarchicalStore`](sieve_storage::HierarchicalStore).
//! - [`EtcdV3Client`] lists and deletes through the v3 gRPC gateway
//!   (`/v3/kv/*`) and implements [`FlatStore`](sieve_storage::FlatStore).
//!
//! Both talk HTTP(S) JSON via a shared [`Transport`] built from a
//! [`ClientConfig`]. Requests are blocking `ureq` calls moved onto tokio's
//! blocking pool.

mod config;
mod tls;
mod transport;
mod v2;
mod v3;

#[cfg(feature = "fake-server")]
pub mod fake;

pub use config::{ClientConfig, ConfigError, DEFAULT_MAX_RESPONSE_BYTES, DEFAULT_V3_API_PREFIX};
pub use tls::TlsFiles;
pub use transport::Transport;
pub use v2::EtcdV2Client;
pub use v3::EtcdV3Client;
