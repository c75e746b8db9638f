use std::future::Future;

use super::{seed_bytes, TestResult};
use crate::FlatStore;

/// Smallest possible start key; lists the whole key space.
const FROM_START: &[u8] = b"\0";

pub(super) async fn run_flat_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: FlatStore,
    F: Fn(Vec<Vec<u8>>) -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "flat",
            "listing_from_smallest_key_returns_all_in_order",
            listing_from_smallest_key_returns_all_in_order(factory).await,
        ),
        TestResult::from_result(
            "flat",
            "start_key_is_inclusive_lower_bound",
            start_key_is_inclusive_lower_bound(factory).await,
        ),
        TestResult::from_result(
            "flat",
            "empty_store_lists_nothing",
            empty_store_lists_nothing(factory).await,
        ),
        TestResult::from_result(
            "flat",
            "non_utf8_key_is_listed_and_deletable",
            non_utf8_key_is_listed_and_deletable(factory).await,
        ),
        TestResult::from_result(
            "flat",
            "delete_removes_only_that_key",
            delete_removes_only_that_key(factory).await,
        ),
        TestResult::from_result(
            "flat",
            "delete_of_missing_key_succeeds",
            delete_of_missing_key_succeeds(factory).await,
        ),
    ]
}

async fn list_keys<S: FlatStore>(store: &S, start: &[u8]) -> Result<Vec<Vec<u8>>, String> {
    store
        .list_from_key(start)
        .await
        .map(|kvs| kvs.into_iter().map(|kv| kv.key).collect())
        .map_err(|e| format!("list_from_key({start:?}) failed: {e}"))
}

async fn listing_from_smallest_key_returns_all_in_order<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: FlatStore,
    F: Fn(Vec<Vec<u8>>) -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory(seed_bytes(&[b"/b", b"/a/1", b"/c", b"/a"])).await;
    let keys = list_keys(&store, FROM_START).await?;
    if keys != [&b"/a"[..], b"/a/1", b"/b", b"/c"] {
        return Err(format!("expected ascending order, got {keys:?}"));
    }
    Ok(())
}

async fn start_key_is_inclusive_lower_bound<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FlatStore,
    F: Fn(Vec<Vec<u8>>) -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory(seed_bytes(&[b"/a", b"/b", b"/c"])).await;
    let keys = list_keys(&store, b"/b").await?;
    if keys != [&b"/b"[..], b"/c"] {
        return Err(format!("expected [/b, /c], got {keys:?}"));
    }
    Ok(())
}

async fn empty_store_lists_nothing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FlatStore,
    F: Fn(Vec<Vec<u8>>) -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory(Vec::new()).await;
    let keys = list_keys(&store, FROM_START).await?;
    if !keys.is_empty() {
        return Err(format!("expected no keys, got {keys:?}"));
    }
    Ok(())
}

async fn delete_removes_only_that_key<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FlatStore,
    F: Fn(Vec<Vec<u8>>) -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory(seed_bytes(&[b"/a", b"/a/b", b"/ab"])).await;
    store
        .delete(b"/a")
        .await
        .map_err(|e| format!("delete(/a) failed: {e}"))?;

    let keys = list_keys(&store, FROM_START).await?;
    if keys != [&b"/a/b"[..], b"/ab"] {
        return Err(format!("expected [/a/b, /ab] after delete, got {keys:?}"));
    }
    Ok(())
}

async fn delete_of_missing_key_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FlatStore,
    F: Fn(Vec<Vec<u8>>) -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory(seed_bytes(&[b"/a"])).await;
    store
        .delete(b"/missing")
        .await
        .map_err(|e| format!("delete of a missing key should succeed: {e}"))?;

    let keys = list_keys(&store, FROM_START).await?;
    if keys != [b"/a"] {
        return Err(format!("unrelated key disturbed: {keys:?}"));
    }
    Ok(())
}

async fn non_utf8_key_is_listed_and_deletable<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: FlatStore,
    F: Fn(Vec<Vec<u8>>) -> Fut,
    Fut: Future<Output = S>,
{
    let raw: &[u8] = &[b'/', 0xff];
    let store = factory(seed_bytes(&[raw, b"/a"])).await;

    let keys = list_keys(&store, FROM_START).await?;
    if keys != [&b"/a"[..], raw] {
        return Err(format!("expected [/a, /\\xff], got {keys:?}"));
    }

    store
        .delete(raw)
        .await
        .map_err(|e| format!("delete of a non-UTF-8 key failed: {e}"))?;
    let keys = list_keys(&store, FROM_START).await?;
    if keys != [b"/a"] {
        return Err(format!("expected [/a] after delete, got {keys:?}"));
    }
    Ok(())
}
