pub mod conformance;
mod error;
mod memory;
mod traits;
mod tree;

pub use error::StorageError;
pub use memory::{MemoryFlatStore, MemoryTreeStore};
pub use traits::{FlatStore, HierarchicalStore};
pub use tree::{Consistency, KeyValue, Leaves, TreeListOptions, TreeNode};
