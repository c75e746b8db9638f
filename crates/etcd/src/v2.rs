//! etcd v2 keys API client.
//!
//! `GET /v2/keys/<path>?recursive=true&sorted=true&quorum=true` returns the
//! whole subtree as nested JSON nodes:
//!
//! ```json
//! {"action": "get",
//!  "node": {"dir": true, "nodes": [
//!     {"key": "/registry", "dir": true, "nodes": [
//!        {"key": "/registry/a", "value": "...", "modifiedIndex": 7, "createdIndex": 7}]}]}}
//! ```
//!
//! Every directory level costs two levels of JSON nesting (the node object
//! and its `nodes` array). With `serde_json`'s recursion limit of 128, a
//! listing decodes up to about 61 directory levels below the listed path;
//! anything deeper fails with [`StorageError::Decode`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sieve_storage::{Consistency, HierarchicalStore, StorageError, TreeListOptions, TreeNode};
use tracing::debug;

use crate::config::{ClientConfig, ConfigError};
use crate::transport::{encode_path, Reply, Transport};

/// Response envelope of a v2 `get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct V2Response {
    pub action: String,
    pub node: V2Node,
}

/// A node in the v2 JSON tree. Extra fields (indexes, TTLs) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct V2Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dir: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<V2Node>,
}

impl V2Node {
    /// Render a tree in v2 wire form. Leaves carry an empty value.
    #[cfg_attr(not(feature = "fake-server"), allow(dead_code))]
    pub(crate) fn from_tree(node: &TreeNode) -> Self {
        match node {
            TreeNode::Directory { key, nodes } => V2Node {
                key: key.clone(),
                dir: true,
                value: None,
                nodes: nodes.iter().map(V2Node::from_tree).collect(),
            },
            TreeNode::Leaf { key } => V2Node {
                key: Some(key.clone()),
                dir: false,
                value: Some(String::new()),
                nodes: Vec::new(),
            },
        }
    }

    pub(crate) fn into_tree(self) -> Result<TreeNode, StorageError> {
        if self.dir {
            let nodes = self
                .nodes
                .into_iter()
                .map(V2Node::into_tree)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(TreeNode::Directory {
                key: self.key,
                nodes,
            });
        }
        match self.key {
            Some(key) => Ok(TreeNode::Leaf { key }),
            None => Err(StorageError::Decode(
                "v2 leaf node without a key".to_string(),
            )),
        }
    }
}

/// Hierarchical store backed by the etcd v2 keys API.
#[derive(Debug, Clone)]
pub struct EtcdV2Client {
    transport: Transport,
}

impl EtcdV2Client {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn connect(config: &ClientConfig) -> Result<Self, ConfigError> {
        Transport::connect(config).map(Self::new)
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[async_trait]
impl HierarchicalStore for EtcdV2Client {
    async fn list_tree(
        &self,
        path: &str,
        options: &TreeListOptions,
    ) -> Result<TreeNode, StorageError> {
        let url_path = format!("/v2/keys/{}", encode_path(path.trim_start_matches('/')));
        let recursive = flag(options.recursive);
        let sorted = flag(options.sorted);
        let quorum = flag(options.consistency == Consistency::Quorum);

        debug!(path, recursive, sorted, quorum, "listing v2 tree");
        let reply = self
            .transport
            .execute::<V2Response, _>("list tree", url_path, move |agent, url| {
                agent
                    .get(url)
                    .query("recursive", recursive)
                    .query("sorted", sorted)
                    .query("quorum", quorum)
                    .call()
            })
            .await?;

        match reply {
            Reply::Ok(response) => {
                debug!(action = %response.action, "decoded v2 listing");
                response.node.into_tree()
            }
            Reply::Status { status: 404, .. } => Err(StorageError::NotFound {
                key: path.to_string(),
            }),
            Reply::Status { status, message } => Err(StorageError::Status { status, message }),
        }
    }
}
