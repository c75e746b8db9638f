//! Conformance test suite for store implementations.
//!
//! This module provides backend-agnostic checks that any
//! [`HierarchicalStore`](crate::HierarchicalStore) or
//! [`FlatStore`](crate::FlatStore) implementation can run to verify that it
//! honors the listing and delete contracts the reconciler relies on:
//!
//! - **Tree listing**: root shape, subtree scoping, sorting, recursion, not-found
//! - **Flat listing**: ascending byte order, inclusive start key, non-UTF-8 keys
//! - **Delete**: removes exactly one key, missing keys are not an error
//!
//! # Usage
//!
//! Each suite takes a factory that receives the seed keys for one test and
//! returns a fresh store holding exactly those keys:
//!
//! ```ignore
//! use sieve_storage::conformance::run_flat_conformance_suite;
//!
//! #[tokio::test]
//! async fn etcd_v3_conformance() {
//!     let report = run_flat_conformance_suite(|keys| async move {
//!         start_seeded_etcd(keys).await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod flat;
mod tree;

use std::fmt;
use std::future::Future;

use crate::{FlatStore, HierarchicalStore, TreeNode};

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "tree", "flat").
    pub category: String,
    /// Test name (e.g. "delete_removes_only_that_key").
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: result.is_ok(),
            message: result.err(),
        }
    }
}

/// Aggregated report from a conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl ConformanceReport {
    fn from_results(results: Vec<TestResult>) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        let total = results.len();
        Self {
            results,
            passed,
            failed: total - passed,
            total,
        }
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the tree-listing conformance checks against a hierarchical store.
///
/// `factory` receives absolute leaf paths (e.g. `/a/b`) and must return a
/// store whose namespace holds exactly those leaves.
pub async fn run_tree_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: HierarchicalStore,
    F: Fn(Vec<String>) -> Fut,
    Fut: Future<Output = S>,
{
    ConformanceReport::from_results(tree::run_tree_tests(&factory).await)
}

/// Run the listing and delete conformance checks against a flat store.
///
/// `factory` receives the raw keys to seed and must return a store holding
/// exactly those keys.
pub async fn run_flat_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: FlatStore,
    F: Fn(Vec<Vec<u8>>) -> Fut,
    Fut: Future<Output = S>,
{
    ConformanceReport::from_results(flat::run_flat_tests(&factory).await)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn seed(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

fn seed_bytes(keys: &[&[u8]]) -> Vec<Vec<u8>> {
    keys.iter().map(|k| k.to_vec()).collect()
}

fn leaf_keys(node: &TreeNode) -> Vec<String> {
    node.leaves().map(str::to_string).collect()
}

fn child_keys(node: &TreeNode) -> Vec<Option<String>> {
    match node {
        TreeNode::Directory { nodes, .. } => {
            nodes.iter().map(|n| n.key().map(str::to_string)).collect()
        }
        TreeNode::Leaf { .. } => Vec::new(),
    }
}
