//! Run settings: command-line flags merged over an optional TOML file.
//!
//! # Example
//!
//! ```toml
//! [etcd]
//! address = "https://10.0.0.1:2379"
//! cert = "/etc/kubernetes/pki/etcd/client.crt"
//! key = "/etc/kubernetes/pki/etcd/client.key"
//! cacert = "/etc/kubernetes/pki/etcd/ca.crt"
//! v3_api_prefix = "/v3"
//!
//! [run]
//! dry_run = true
//! timeout_secs = 60
//! from_key = "/registry/"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use serde::Deserialize;
use sieve_core::{ReconcileConfig, DEFAULT_OPERATION_TIMEOUT, SMALLEST_KEY};
use sieve_etcd::{ClientConfig, ConfigError, TlsFiles, DEFAULT_V3_API_PREFIX};

/// Added on top of the HTTP timeout for each store call's deadline, so a
/// request that times out reports the transport error rather than racing it.
const DEADLINE_GRACE: Duration = Duration::from_secs(2);

// ── Flags ─────────────────────────────────────────────────────────────────────

/// Connection and run flags. Unset flags fall back to the config file, then
/// to built-in defaults.
#[derive(Debug, Clone, Default, Args)]
pub(crate) struct RunArgs {
    /// etcd member address, e.g. https://127.0.0.1:2379
    #[arg(long, value_name = "URL")]
    pub etcd_address: Option<String>,

    /// TLS client certificate (PEM)
    #[arg(long, value_name = "PEM")]
    pub cert: Option<PathBuf>,

    /// TLS client private key (PEM)
    #[arg(long, value_name = "PEM")]
    pub key: Option<PathBuf>,

    /// CA bundle used to verify the server (PEM)
    #[arg(long, value_name = "PEM")]
    pub cacert: Option<PathBuf>,

    /// List the keys that would be deleted without deleting them
    #[arg(long)]
    pub dry_run: bool,

    /// Deadline in seconds for each etcd request [default: 30]
    #[arg(long, value_name = "N")]
    pub timeout_secs: Option<u64>,

    /// First v3 key to consider [default: the smallest key]
    #[arg(long, value_name = "KEY")]
    pub from_key: Option<String>,

    /// Path prefix of the v3 JSON gateway [default: /v3]
    #[arg(long, value_name = "PATH")]
    pub v3_api_prefix: Option<String>,

    /// Read settings from a TOML file; flags take precedence
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,
}

// ── File ──────────────────────────────────────────────────────────────────────

/// Top-level config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    #[serde(default)]
    pub etcd: EtcdSection,
    #[serde(default)]
    pub run: RunSection,
}

/// `[etcd]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EtcdSection {
    pub address: Option<String>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub cacert: Option<PathBuf>,
    pub v3_api_prefix: Option<String>,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RunSection {
    pub dry_run: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub from_key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum SettingsError {
    #[error("could not read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("timeout must be at least one second")]
    ZeroTimeout,

    #[error(transparent)]
    Client(#[from] ConfigError),
}

pub(crate) fn read_file_config(path: &Path) -> Result<FileConfig, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ── Resolution ────────────────────────────────────────────────────────────────

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub client: ClientConfig,
    pub run: ReconcileConfig,
}

impl Settings {
    /// Read the config file named by `args`, if any, and merge.
    pub fn load(args: &RunArgs) -> Result<Self, SettingsError> {
        let file = match &args.config {
            Some(path) => read_file_config(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    /// Flags win over file values; file values win over defaults.
    ///
    /// The endpoint is validated here so that a missing or malformed address
    /// is reported before any runtime or client is built.
    pub fn merge(args: &RunArgs, file: FileConfig) -> Result<Self, SettingsError> {
        let FileConfig { etcd, run } = file;

        let timeout = match args.timeout_secs.or(run.timeout_secs) {
            Some(0) => return Err(SettingsError::ZeroTimeout),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_OPERATION_TIMEOUT,
        };

        let mut client = ClientConfig::new(
            args.etcd_address
                .clone()
                .or(etcd.address)
                .unwrap_or_default(),
        );
        client.tls = TlsFiles {
            cert: args.cert.clone().or(etcd.cert),
            key: args.key.clone().or(etcd.key),
            ca: args.cacert.clone().or(etcd.cacert),
        };
        client.request_timeout = timeout;
        client.v3_api_prefix = args
            .v3_api_prefix
            .clone()
            .or(etcd.v3_api_prefix)
            .unwrap_or_else(|| DEFAULT_V3_API_PREFIX.to_string());
        client.base_url()?;

        let run = ReconcileConfig {
            dry_run: args.dry_run || run.dry_run.unwrap_or(false),
            start_key: args
                .from_key
                .clone()
                .or(run.from_key)
                .unwrap_or_else(|| SMALLEST_KEY.to_string()),
            list_timeout: timeout + DEADLINE_GRACE,
            delete_timeout: timeout + DEADLINE_GRACE,
            ..ReconcileConfig::default()
        };

        Ok(Self { client, run })
    }
}
