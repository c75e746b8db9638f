use async_trait::async_trait;

use crate::error::StorageError;
use crate::tree::{KeyValue, TreeListOptions, TreeNode};

/// A key-value store organized as a tree of directories and leaf keys
/// (the etcd v2 keys model).
///
/// ## Listing Semantics
///
/// `list_tree` returns the node at `path` with its children populated. The
/// empty path (or `"/"`) addresses the namespace root, which comes back as a
/// [`TreeNode::Directory`] with no key. When `options.recursive` is false
/// only the immediate children are returned; nested directories appear with
/// no children of their own.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` so a store can be driven from any
/// tokio runtime flavor.
#[async_trait]
pub trait HierarchicalStore: Send + Sync {
    /// List the subtree rooted at `path`.
    ///
    /// Returns `Err(StorageError::NotFound)` if nothing exists at `path`.
    async fn list_tree(
        &self,
        path: &str,
        options: &TreeListOptions,
    ) -> Result<TreeNode, StorageError>;
}

/// A key-value store with a single, lexicographically ordered space of
/// byte-string keys (the etcd v3 KV model).
#[async_trait]
pub trait FlatStore: Send + Sync {
    /// Return every key greater than or equal to `start_key`, in ascending
    /// byte order. Values may be omitted.
    async fn list_from_key(&self, start_key: &[u8]) -> Result<Vec<KeyValue>, StorageError>;

    /// Delete a single key.
    ///
    /// Deleting a key that does not exist is not an error.
    async fn delete(&self, key: &[u8]) -> Result<(), StorageError>;
}
