use std::time::Duration;

use sieve_storage::StorageError;

/// Fatal reconciliation errors.
///
/// Both inventories must be complete before anything is diffed, so any
/// listing failure ends the run. Per-key delete failures are not errors at
/// this level; they are recorded in the [`Report`](crate::Report).
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The hierarchical store could not be listed.
    #[error("listing hierarchical keys failed: {0}")]
    ListTree(#[source] StorageError),

    /// The flat store could not be listed.
    #[error("listing flat keys failed: {0}")]
    ListFlat(#[source] StorageError),

    /// A listing exceeded its deadline.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}
