use std::future::Future;

use super::{child_keys, leaf_keys, seed, TestResult};
use crate::{HierarchicalStore, StorageError, TreeListOptions, TreeNode};

pub(super) async fn run_tree_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: HierarchicalStore,
    F: Fn(Vec<String>) -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "tree",
            "root_listing_contains_every_leaf",
            root_listing_contains_every_leaf(factory).await,
        ),
        TestResult::from_result(
            "tree",
            "root_listing_is_keyless_directory",
            root_listing_is_keyless_directory(factory).await,
        ),
        TestResult::from_result(
            "tree",
            "empty_namespace_lists_empty_root",
            empty_namespace_lists_empty_root(factory).await,
        ),
        TestResult::from_result(
            "tree",
            "sorted_listing_orders_children_by_key",
            sorted_listing_orders_children_by_key(factory).await,
        ),
        TestResult::from_result(
            "tree",
            "subtree_listing_is_scoped_to_path",
            subtree_listing_is_scoped_to_path(factory).await,
        ),
        TestResult::from_result(
            "tree",
            "non_recursive_listing_omits_grandchildren",
            non_recursive_listing_omits_grandchildren(factory).await,
        ),
        TestResult::from_result(
            "tree",
            "missing_path_returns_not_found",
            missing_path_returns_not_found(factory).await,
        ),
    ]
}

async fn list_root<S: HierarchicalStore>(store: &S) -> Result<TreeNode, String> {
    store
        .list_tree("", &TreeListOptions::default())
        .await
        .map_err(|e| format!("list_tree(\"\") failed: {e}"))
}

async fn root_listing_contains_every_leaf<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HierarchicalStore,
    F: Fn(Vec<String>) -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory(seed(&["/a/x", "/a/y/z", "/b"])).await;
    let tree = list_root(&store).await?;

    let mut leaves = leaf_keys(&tree);
    leaves.sort();
    if leaves != ["/a/x", "/a/y/z", "/b"] {
        return Err(format!("expected three leaves, got {leaves:?}"));
    }
    Ok(())
}

async fn root_listing_is_keyless_directory<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HierarchicalStore,
    F: Fn(Vec<String>) -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory(seed(&["/a"])).await;
    let tree = list_root(&store).await?;

    if !tree.is_dir() || tree.key().is_some() {
        return Err(format!("root should be a keyless directory, got {tree:?}"));
    }
    Ok(())
}

async fn empty_namespace_lists_empty_root<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HierarchicalStore,
    F: Fn(Vec<String>) -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory(Vec::new()).await;
    let tree = list_root(&store).await?;

    if tree.leaf_count() != 0 || !child_keys(&tree).is_empty() {
        return Err(format!("expected an empty root, got {tree:?}"));
    }
    Ok(())
}

async fn sorted_listing_orders_children_by_key<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HierarchicalStore,
    F: Fn(Vec<String>) -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory(seed(&["/z", "/m/1", "/a"])).await;
    let tree = list_root(&store).await?;

    let keys = child_keys(&tree);
    let expected = [Some("/a"), Some("/m"), Some("/z")].map(|k| k.map(str::to_string));
    if keys != expected {
        return Err(format!("expected children [/a, /m, /z], got {keys:?}"));
    }
    Ok(())
}

async fn subtree_listing_is_scoped_to_path<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HierarchicalStore,
    F: Fn(Vec<String>) -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory(seed(&["/a/x", "/a/y", "/b/z"])).await;
    let tree = store
        .list_tree("/a", &TreeListOptions::default())
        .await
        .map_err(|e| format!("list_tree(\"/a\") failed: {e}"))?;

    if tree.key() != Some("/a") {
        return Err(format!("expected node /a, got key {:?}", tree.key()));
    }
    let leaves = leaf_keys(&tree);
    if leaves != ["/a/x", "/a/y"] {
        return Err(format!("expected [/a/x, /a/y], got {leaves:?}"));
    }
    Ok(())
}

async fn non_recursive_listing_omits_grandchildren<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HierarchicalStore,
    F: Fn(Vec<String>) -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory(seed(&["/d/e/f", "/g"])).await;
    let opts = TreeListOptions {
        recursive: false,
        ..TreeListOptions::default()
    };
    let tree = store
        .list_tree("", &opts)
        .await
        .map_err(|e| format!("non-recursive list_tree failed: {e}"))?;

    let leaves = leaf_keys(&tree);
    if leaves != ["/g"] {
        return Err(format!("expected only the /g leaf, got {leaves:?}"));
    }
    Ok(())
}

async fn missing_path_returns_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HierarchicalStore,
    F: Fn(Vec<String>) -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory(seed(&["/a"])).await;
    match store
        .list_tree("/missing", &TreeListOptions::default())
        .await
    {
        Err(StorageError::NotFound { .. }) => Ok(()),
        Err(other) => Err(format!("expected NotFound, got {other:?}")),
        Ok(tree) => Err(format!("expected NotFound, got {tree:?}")),
    }
}
