//! In-memory store implementations.
//!
//! Both stores mirror the observable behavior of etcd closely enough to be
//! used as reconciliation fixtures and to back the fake etcd server.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::traits::{FlatStore, HierarchicalStore};
use crate::tree::{KeyValue, TreeListOptions, TreeNode};

// ── Hierarchical ──────────────────────────────────────────────────────────────

/// A hierarchical store holding a fixed tree.
#[derive(Debug, Clone)]
pub struct MemoryTreeStore {
    root: TreeNode,
}

impl MemoryTreeStore {
    /// Wrap an existing tree. The root should be a keyless directory.
    pub fn new(root: TreeNode) -> Self {
        Self { root }
    }

    /// Build a tree from `/`-separated leaf paths.
    ///
    /// Intermediate directories are created on demand with absolute keys
    /// (`a/b/c` becomes `/a`, `/a/b` and the leaf `/a/b/c`). Children keep
    /// first-insertion order. A path that runs through an existing leaf is
    /// skipped, since a key cannot be both a leaf and a directory.
    pub fn from_leaf_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut nodes = Vec::new();
        for path in paths {
            let segments: Vec<&str> = path
                .as_ref()
                .split('/')
                .filter(|s| !s.is_empty())
                .collect();
            if !segments.is_empty() {
                insert_leaf(&mut nodes, &segments);
            }
        }
        Self::new(TreeNode::root(nodes))
    }

    fn find(&self, path: &str) -> Option<&TreeNode> {
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            return Some(&self.root);
        }
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            if node.key() == Some(path) {
                return Some(node);
            }
            if let TreeNode::Directory { nodes, .. } = node {
                stack.extend(nodes.iter());
            }
        }
        None
    }
}

fn insert_leaf(root: &mut Vec<TreeNode>, segments: &[&str]) {
    let mut nodes = root;
    let mut prefix = String::new();
    for (i, segment) in segments.iter().enumerate() {
        prefix.push('/');
        prefix.push_str(segment);

        if nodes
            .iter()
            .any(|n| !n.is_dir() && n.key() == Some(prefix.as_str()))
        {
            return;
        }

        if i + 1 == segments.len() {
            if !nodes.iter().any(|n| n.key() == Some(prefix.as_str())) {
                nodes.push(TreeNode::leaf(prefix));
            }
            return;
        }

        let pos = match nodes.iter().position(|n| n.key() == Some(prefix.as_str())) {
            Some(pos) => pos,
            None => {
                nodes.push(TreeNode::dir(prefix.clone(), Vec::new()));
                nodes.len() - 1
            }
        };
        let TreeNode::Directory { nodes: children, .. } = &mut nodes[pos] else {
            return;
        };
        nodes = children;
    }
}

fn sort_children(root: &mut TreeNode) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let TreeNode::Directory { nodes, .. } = node {
            nodes.sort_by(|a, b| a.key().cmp(&b.key()));
            stack.extend(nodes.iter_mut());
        }
    }
}

fn truncate_grandchildren(node: &mut TreeNode) {
    if let TreeNode::Directory { nodes, .. } = node {
        for child in nodes.iter_mut() {
            if let TreeNode::Directory { nodes, .. } = child {
                nodes.clear();
            }
        }
    }
}

#[async_trait]
impl HierarchicalStore for MemoryTreeStore {
    async fn list_tree(
        &self,
        path: &str,
        options: &TreeListOptions,
    ) -> Result<TreeNode, StorageError> {
        let mut node = self
            .find(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: path.to_string(),
            })?;
        if !options.recursive {
            truncate_grandchildren(&mut node);
        }
        if options.sorted {
            sort_children(&mut node);
        }
        Ok(node)
    }
}

// ── Flat ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct FlatInner {
    keys: BTreeMap<Vec<u8>, Vec<u8>>,
    failing: HashMap<Vec<u8>, String>,
    delete_delay: Option<Duration>,
    delete_attempts: Vec<Vec<u8>>,
}

/// A flat store backed by an ordered map, with optional fault injection for
/// deletes.
#[derive(Debug, Default)]
pub struct MemoryFlatStore {
    inner: Mutex<FlatInner>,
}

impl MemoryFlatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the given keys, each with an empty value.
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for key in keys {
                inner.keys.insert(key.into(), Vec::new());
            }
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, FlatInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.lock().keys.insert(key.into(), value.into());
    }

    /// Current keys in ascending order, decoded lossily for assertions.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys.keys().map(|k| lossy(k)).collect()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.lock().keys.contains_key(key)
    }

    /// Make every delete of `key` fail with a backend error carrying `reason`.
    pub fn fail_delete(&self, key: impl Into<Vec<u8>>, reason: impl Into<String>) {
        self.lock().failing.insert(key.into(), reason.into());
    }

    /// Sleep for `delay` before every delete.
    pub fn delay_deletes(&self, delay: Duration) {
        self.lock().delete_delay = Some(delay);
    }

    /// Keys passed to `delete`, in call order, whether or not they succeeded.
    pub fn delete_attempts(&self) -> Vec<String> {
        self.lock().delete_attempts.iter().map(|k| lossy(k)).collect()
    }
}

fn lossy(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

#[async_trait]
impl FlatStore for MemoryFlatStore {
    async fn list_from_key(&self, start_key: &[u8]) -> Result<Vec<KeyValue>, StorageError> {
        let inner = self.lock();
        Ok(inner
            .keys
            .range::<[u8], _>((Bound::Included(start_key), Bound::Unbounded))
            .map(|(key, value)| KeyValue {
                key: key.clone(),
                value: Some(value.clone()),
            })
            .collect())
    }

    async fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        let delay = {
            let mut inner = self.lock();
            inner.delete_attempts.push(key.to_vec());
            inner.delete_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        if let Some(reason) = inner.failing.get(key) {
            return Err(StorageError::Backend(reason.clone()));
        }
        inner.keys.remove(key);
        Ok(())
    }
}
