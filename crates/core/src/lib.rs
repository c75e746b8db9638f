//! sieve-core: finds flat-namespace keys with no counterpart in a
//! hierarchical namespace, and optionally deletes them.
//!
//! # Public API
//!
//! - [`flatten()`] -- tree listing to ordered leaf key paths
//! - [`FlatKey`] -- raw flat key with escaped and quoted display forms
//! - [`KeySet`] / [`difference()`] -- exact-match set difference
//! - [`reconcile()`] -- list both stores, diff, and apply deletions
//! - [`Report`] -- per-run summary and per-key outcomes
//!
//! Store access goes through the [`sieve_storage`] traits, so the pipeline
//! runs unchanged against etcd clients or in-memory stores.

pub mod diff;
pub mod error;
pub mod flatten;
pub mod key;
pub mod reconcile;
pub mod report;

pub use diff::{convention_mismatches, difference, KeySet, OrphanSet};
pub use error::ReconcileError;
pub use flatten::flatten;
pub use key::{FlatKey, Quoted};
pub use reconcile::{reconcile, ReconcileConfig, DEFAULT_OPERATION_TIMEOUT, SMALLEST_KEY};
pub use report::{DeletionResult, KeyOutcome, Report};
