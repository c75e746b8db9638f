//! Tree listing -> leaf key paths.

use sieve_storage::TreeNode;

/// Collect the key path of every leaf under `root`, depth-first, in child
/// order. Directories contribute only their leaves; duplicates are kept.
///
/// Tree depth is bounded by memory rather than by the thread's call stack.
pub fn flatten(root: &TreeNode) -> Vec<String> {
    root.leaves().map(str::to_string).collect()
}
