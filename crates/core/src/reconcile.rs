//! The reconciliation pipeline:
//! list tree -> flatten -> list flat -> diff -> (delete) -> report.

use std::future::Future;
use std::time::Duration;

use sieve_storage::{FlatStore, HierarchicalStore, StorageError, TreeListOptions};
use tracing::{debug, info, warn};

use crate::diff::{convention_mismatches, difference, KeySet};
use crate::error::ReconcileError;
use crate::flatten::flatten;
use crate::report::{DeletionResult, KeyOutcome, Report};

/// Default ceiling for every individual store call.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// The smallest possible key: listing from here covers the whole flat
/// key space.
pub const SMALLEST_KEY: &str = "\0";

/// Immutable settings for one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Report orphans without deleting them.
    pub dry_run: bool,
    /// Hierarchical path to list; empty for the namespace root.
    pub tree_path: String,
    pub tree_options: TreeListOptions,
    /// First flat key to consider.
    pub start_key: String,
    /// Deadline for each listing call. Exceeding it is fatal.
    ///
    /// Set it above any timeout the store enforces itself, so the store's
    /// own error is what gets reported.
    pub list_timeout: Duration,
    /// Deadline for each delete call. Exceeding it fails only that key; the
    /// abandoned request may still complete on the server.
    pub delete_timeout: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            tree_path: String::new(),
            tree_options: TreeListOptions::default(),
            start_key: SMALLEST_KEY.to_string(),
            list_timeout: DEFAULT_OPERATION_TIMEOUT,
            delete_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

impl ReconcileConfig {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }
}

enum Bounded<T> {
    Done(Result<T, StorageError>),
    TimedOut,
}

async fn bounded<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, StorageError>>,
) -> Bounded<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => Bounded::Done(result),
        Err(_) => Bounded::TimedOut,
    }
}

/// Find flat keys with no matching hierarchical leaf and, unless
/// `config.dry_run` is set, delete them.
///
/// Listing failures abort the run. Delete failures (including timeouts) are
/// recorded per key and never stop the remaining deletions.
pub async fn reconcile<H, F>(
    hierarchical: &H,
    flat: &F,
    config: &ReconcileConfig,
) -> Result<Report, ReconcileError>
where
    H: HierarchicalStore + ?Sized,
    F: FlatStore + ?Sized,
{
    // 1. Hierarchical inventory
    let tree = match bounded(
        config.list_timeout,
        hierarchical.list_tree(&config.tree_path, &config.tree_options),
    )
    .await
    {
        Bounded::Done(result) => result.map_err(ReconcileError::ListTree)?,
        Bounded::TimedOut => {
            return Err(ReconcileError::Timeout {
                operation: "list tree",
                timeout: config.list_timeout,
            })
        }
    };
    let leaves = flatten(&tree);
    let reference_count = leaves.len();
    let reference: KeySet = leaves.into_iter().collect();
    debug!(
        leaves = reference_count,
        distinct = reference.len(),
        "flattened hierarchical listing"
    );

    // 2. Flat inventory
    let listing = match bounded(
        config.list_timeout,
        flat.list_from_key(config.start_key.as_bytes()),
    )
    .await
    {
        Bounded::Done(result) => result.map_err(ReconcileError::ListFlat)?,
        Bounded::TimedOut => {
            return Err(ReconcileError::Timeout {
                operation: "list flat keys",
                timeout: config.list_timeout,
            })
        }
    };
    let flat_count = listing.len();
    let candidate: KeySet = listing.into_iter().map(|kv| kv.key).collect();

    // 3. Diff
    let orphans = difference(&reference, &candidate);
    let mismatches = convention_mismatches(&reference, &orphans);
    if !mismatches.is_empty() {
        warn!(
            count = mismatches.len(),
            example = %mismatches[0],
            "orphan keys match hierarchical keys up to a leading '/'; \
             verify both namespaces use the same key convention"
        );
    }
    info!(
        reference = reference_count,
        flat = flat_count,
        orphans = orphans.len(),
        dry_run = config.dry_run,
        "computed orphan set"
    );

    // 4. Apply
    let orphans = orphans.into_vec();
    let mut outcomes = Vec::new();
    if !config.dry_run {
        outcomes.reserve(orphans.len());
        for key in &orphans {
            let result = match bounded(config.delete_timeout, flat.delete(key.as_bytes())).await {
                Bounded::Done(Ok(())) => {
                    info!(key = %key, "deleted orphan key");
                    DeletionResult::Deleted
                }
                Bounded::Done(Err(e)) => {
                    warn!(key = %key, error = %e, "failed to delete orphan key");
                    DeletionResult::Failed {
                        reason: e.to_string(),
                    }
                }
                Bounded::TimedOut => {
                    warn!(key = %key, timeout = ?config.delete_timeout, "delete timed out");
                    DeletionResult::Failed {
                        reason: format!("delete timed out after {:?}", config.delete_timeout),
                    }
                }
            };
            outcomes.push(KeyOutcome {
                key: key.clone(),
                result,
            });
        }
    }

    Ok(Report {
        dry_run: config.dry_run,
        reference_count,
        flat_count,
        orphans,
        outcomes,
        convention_mismatches: mismatches.len(),
    })
}
