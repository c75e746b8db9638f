//! End-to-end reconciliation against in-memory stores.

use std::time::Duration;

use async_trait::async_trait;
use sieve_core::{
    reconcile, DeletionResult, FlatKey, KeyOutcome, ReconcileConfig, ReconcileError,
};
use sieve_storage::{
    FlatStore, HierarchicalStore, KeyValue, MemoryFlatStore, MemoryTreeStore, StorageError,
    TreeListOptions, TreeNode,
};

fn v2(paths: &[&str]) -> MemoryTreeStore {
    MemoryTreeStore::from_leaf_paths(paths)
}

fn v3(keys: &[&str]) -> MemoryFlatStore {
    MemoryFlatStore::with_keys(keys.iter().copied())
}

fn deleted(key: &str) -> KeyOutcome {
    KeyOutcome {
        key: key.into(),
        result: DeletionResult::Deleted,
    }
}

/// A hierarchical store that never answers in time.
struct StalledTree;

#[async_trait]
impl HierarchicalStore for StalledTree {
    async fn list_tree(
        &self,
        _path: &str,
        _options: &TreeListOptions,
    ) -> Result<TreeNode, StorageError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(TreeNode::root(vec![]))
    }
}

/// A flat store whose listing always fails.
struct UnreachableFlat;

#[async_trait]
impl FlatStore for UnreachableFlat {
    async fn list_from_key(&self, _start_key: &[u8]) -> Result<Vec<KeyValue>, StorageError> {
        Err(StorageError::Unreachable {
            endpoint: "http://127.0.0.1:2379".into(),
            message: "connection refused".into(),
        })
    }

    async fn delete(&self, _key: &[u8]) -> Result<(), StorageError> {
        panic!("delete must not be reached when listing fails");
    }
}

// ──────────────────────────────────────────────
// Dry-run
// ──────────────────────────────────────────────

#[tokio::test]
async fn dry_run_reports_orphans_without_deleting() {
    let tree = v2(&["/registry/pods/a", "/registry/pods/b", "/registry/ns/default"]);
    let flat = v3(&[
        "/registry/pods/a",
        "/registry/pods/b",
        "/registry/ns/default",
        "/registry/leases/x",
        "/compact_rev_key",
    ]);

    let report = reconcile(&tree, &flat, &ReconcileConfig::dry_run())
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.reference_count, 3);
    assert_eq!(report.flat_count, 5);
    assert_eq!(report.orphans, vec!["/compact_rev_key", "/registry/leases/x"]);
    assert!(report.outcomes.is_empty());

    assert_eq!(flat.keys().len(), 5);
    assert!(flat.delete_attempts().is_empty());
}

// ──────────────────────────────────────────────
// Live mode
// ──────────────────────────────────────────────

#[tokio::test]
async fn live_run_deletes_every_orphan() {
    let tree = v2(&["/a", "/b"]);
    let flat = v3(&["/a", "/b", "/c", "/d"]);

    let report = reconcile(&tree, &flat, &ReconcileConfig::default())
        .await
        .unwrap();

    assert_eq!(report.outcomes, vec![deleted("/c"), deleted("/d")]);
    assert_eq!(flat.keys(), vec!["/a", "/b"]);
}

#[tokio::test]
async fn second_live_run_finds_nothing() {
    let tree = v2(&["/keep/1", "/keep/2"]);
    let flat = v3(&["/keep/1", "/keep/2", "/stale/1", "/stale/2"]);
    let config = ReconcileConfig::default();

    let first = reconcile(&tree, &flat, &config).await.unwrap();
    assert_eq!(first.orphan_count(), 2);

    let second = reconcile(&tree, &flat, &config).await.unwrap();
    assert_eq!(second.orphan_count(), 0);
    assert!(second.outcomes.is_empty());
    assert_eq!(second.flat_count, 2);
}

#[tokio::test]
async fn failed_delete_does_not_stop_remaining_keys() {
    let tree = v2(&[]);
    let flat = v3(&["k1", "k2", "k3"]);
    flat.fail_delete("k2", "etcdserver: permission denied");

    let report = reconcile(&tree, &flat, &ReconcileConfig::default())
        .await
        .unwrap();

    assert_eq!(
        report.outcomes,
        vec![
            deleted("k1"),
            KeyOutcome {
                key: "k2".into(),
                result: DeletionResult::Failed {
                    reason: "storage backend error: etcdserver: permission denied".into(),
                },
            },
            deleted("k3"),
        ]
    );
    assert_eq!(flat.delete_attempts(), vec!["k1", "k2", "k3"]);
    assert_eq!(flat.keys(), vec!["k2"]);
    assert_eq!(report.deleted_count(), 2);
    assert_eq!(report.failed_count(), 1);
}

#[tokio::test]
async fn delete_timeout_fails_only_that_key() {
    let tree = v2(&["/a"]);
    let flat = v3(&["/a", "/slow"]);
    flat.delay_deletes(Duration::from_millis(500));
    let config = ReconcileConfig {
        delete_timeout: Duration::from_millis(20),
        ..ReconcileConfig::default()
    };

    let report = reconcile(&tree, &flat, &config).await.unwrap();

    assert_eq!(report.outcomes.len(), 1);
    match &report.outcomes[0].result {
        DeletionResult::Failed { reason } => assert!(reason.contains("timed out"), "{reason}"),
        other => panic!("expected a timeout failure, got {other:?}"),
    }
}

// ──────────────────────────────────────────────
// Fatal listing failures
// ──────────────────────────────────────────────

#[tokio::test]
async fn tree_listing_timeout_is_fatal() {
    let flat = v3(&["/a"]);
    let config = ReconcileConfig {
        list_timeout: Duration::from_millis(20),
        ..ReconcileConfig::default()
    };

    let err = reconcile(&StalledTree, &flat, &config).await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Timeout {
            operation: "list tree",
            ..
        }
    ));
    assert_eq!(flat.keys(), vec!["/a"]);
}

#[tokio::test]
async fn tree_listing_error_is_fatal() {
    let tree = v2(&["/a"]);
    let flat = v3(&["/b"]);
    let config = ReconcileConfig {
        tree_path: "/missing".into(),
        ..ReconcileConfig::default()
    };

    let err = reconcile(&tree, &flat, &config).await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::ListTree(StorageError::NotFound { .. })
    ));
    assert!(flat.delete_attempts().is_empty());
}

#[tokio::test]
async fn flat_listing_error_is_fatal() {
    let tree = v2(&["/a"]);

    let err = reconcile(&tree, &UnreachableFlat, &ReconcileConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::ListFlat(StorageError::Unreachable { .. })
    ));
    assert!(err.to_string().starts_with("listing flat keys failed"));
}

// ──────────────────────────────────────────────
// Key matching
// ──────────────────────────────────────────────

#[tokio::test]
async fn leading_separator_mismatch_is_reported_not_normalized() {
    let tree = MemoryTreeStore::new(TreeNode::root(vec![TreeNode::dir(
        "a",
        vec![TreeNode::leaf("a/b")],
    )]));
    let flat = v3(&["/a/b"]);

    let report = reconcile(&tree, &flat, &ReconcileConfig::dry_run())
        .await
        .unwrap();

    assert_eq!(report.orphans, vec!["/a/b"]);
    assert_eq!(report.convention_mismatches, 1);
}

#[tokio::test]
async fn start_key_limits_flat_inventory() {
    let tree = v2(&[]);
    let flat = v3(&["!internal", "/a", "/b"]);
    let config = ReconcileConfig {
        start_key: "/".into(),
        ..ReconcileConfig::dry_run()
    };

    let report = reconcile(&tree, &flat, &config).await.unwrap();

    assert_eq!(report.flat_count, 2);
    assert_eq!(report.orphans, vec!["/a", "/b"]);
}

#[tokio::test]
async fn non_utf8_key_is_counted_reported_and_deleted() {
    let raw = vec![b'/', 0xff];
    let tree = v2(&["/a"]);
    let flat = MemoryFlatStore::with_keys([b"/a".to_vec(), raw.clone()]);

    let report = reconcile(&tree, &flat, &ReconcileConfig::default())
        .await
        .unwrap();

    assert_eq!(report.flat_count, 2);
    assert_eq!(report.orphans, vec![FlatKey::from(raw.clone())]);
    assert_eq!(
        report.outcomes,
        vec![KeyOutcome {
            key: FlatKey::from(raw.clone()),
            result: DeletionResult::Deleted,
        }]
    );
    assert!(report.to_string().ends_with("\"/\\xff\" key deleted\n"));
    assert!(!flat.contains_key(&raw));
    assert_eq!(flat.keys(), vec!["/a"]);
}
