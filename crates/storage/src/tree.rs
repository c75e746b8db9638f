use serde::{Deserialize, Serialize};

/// A node of a hierarchical namespace listing.
///
/// Children keep the order in which the store returned them. A listing of
/// the namespace root comes back as a `Directory` with no key of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Directory {
        key: Option<String>,
        nodes: Vec<TreeNode>,
    },
    Leaf {
        key: String,
    },
}

impl TreeNode {
    /// A directory node with the given key and children.
    pub fn dir(key: impl Into<String>, nodes: Vec<TreeNode>) -> Self {
        TreeNode::Directory {
            key: Some(key.into()),
            nodes,
        }
    }

    /// A synthetic root directory without a key.
    pub fn root(nodes: Vec<TreeNode>) -> Self {
        TreeNode::Directory { key: None, nodes }
    }

    pub fn leaf(key: impl Into<String>) -> Self {
        TreeNode::Leaf { key: key.into() }
    }

    /// The node's own key path, `None` for a synthetic root.
    pub fn key(&self) -> Option<&str> {
        match self {
            TreeNode::Directory { key, .. } => key.as_deref(),
            TreeNode::Leaf { key } => Some(key),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, TreeNode::Directory { .. })
    }

    /// Leaf keys below (or at) this node, depth-first in child order.
    ///
    /// The walk keeps its own stack, so arbitrarily deep trees are safe.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }

    /// Number of leaves below (or at) this node.
    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }
}

/// Iterator returned by [`TreeNode::leaves`].
#[derive(Debug, Clone)]
pub struct Leaves<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while let Some(node) = self.stack.pop() {
            match node {
                TreeNode::Directory { nodes, .. } => self.stack.extend(nodes.iter().rev()),
                TreeNode::Leaf { key } => return Some(key),
            }
        }
        None
    }
}

/// Read consistency requested from a hierarchical store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    /// Served by the cluster leader after a quorum read.
    #[default]
    Quorum,
    /// Served by whichever member answers, possibly stale.
    Local,
}

/// Options for [`HierarchicalStore::list_tree`](crate::HierarchicalStore::list_tree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeListOptions {
    /// Ask the store to order children by key.
    pub sorted: bool,
    /// Include the whole subtree instead of only the immediate children.
    pub recursive: bool,
    pub consistency: Consistency,
}

impl Default for TreeListOptions {
    fn default() -> Self {
        Self {
            sorted: true,
            recursive: true,
            consistency: Consistency::Quorum,
        }
    }
}

/// One entry of a flat namespace listing.
///
/// Flat keys are arbitrary byte strings; nothing requires them to be UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: Vec<u8>,
    /// `None` when the listing was requested keys-only.
    pub value: Option<Vec<u8>>,
}

impl KeyValue {
    pub fn key_only(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}
