//! A minimal etcd look-alike served over HTTP, for integration tests.
//!
//! Serves the two API surfaces the clients use, backed by the in-memory
//! stores from `sieve-storage`:
//!
//! - GET  /v2/keys/{*path}        - v2 tree listing (`recursive`, `sorted`, `quorum`)
//! - POST /v3/kv/range            - v3 range from a key to the end of the key space
//! - POST /v3/kv/deleterange      - v3 single-key delete
//!
//! Errors use etcd's JSON error shapes: `{"errorCode": 100, ...}` for a
//! missing v2 key and `{"error", "code", "message"}` for the v3 gateway.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use sieve_storage::{
    Consistency, FlatStore, HierarchicalStore, MemoryFlatStore, MemoryTreeStore, StorageError,
    TreeListOptions,
};
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::v2::{V2Node, V2Response};
use crate::v3::{
    decode_bytes, encode_key, DeleteRangeRequest, DeleteRangeResponse, RangeRequest,
    RangeResponse, WireKeyValue,
};

/// gRPC status code `Internal`, as reported by the gateway.
const GRPC_INTERNAL: u16 = 13;
/// gRPC status code `InvalidArgument`.
const GRPC_INVALID_ARGUMENT: u16 = 3;
/// v2 `EcodeKeyNotFound`.
const V2_KEY_NOT_FOUND: u16 = 100;

struct FakeState {
    tree: MemoryTreeStore,
    flat: Arc<MemoryFlatStore>,
}

/// A running fake etcd member. Shuts down when dropped.
pub struct FakeEtcd {
    addr: SocketAddr,
    flat: Arc<MemoryFlatStore>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl FakeEtcd {
    /// Bind an ephemeral localhost port and serve `tree` as the v2 namespace
    /// and `flat` as the v3 key space.
    pub fn start(tree: MemoryTreeStore, flat: MemoryFlatStore) -> std::io::Result<Self> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let flat = Arc::new(flat);
        let state = Arc::new(FakeState {
            tree,
            flat: Arc::clone(&flat),
        });
        let app = router(state);
        let (tx, rx) = oneshot::channel::<()>();

        std::thread::Builder::new()
            .name(format!("fake-etcd-{}", addr.port()))
            .spawn(move || {
                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::from_std(listener) {
                        Ok(listener) => listener,
                        Err(e) => {
                            error!("fake etcd could not adopt listener: {e}");
                            return;
                        }
                    };
                    let shutdown = async {
                        let _ = rx.await;
                    };
                    if let Err(e) = axum::serve(listener, app)
                        .with_graceful_shutdown(shutdown)
                        .await
                    {
                        error!("fake etcd stopped: {e}");
                    }
                });
            })?;

        debug!(%addr, "fake etcd listening");
        Ok(Self {
            addr,
            flat,
            shutdown: Some(tx),
        })
    }

    /// `http://127.0.0.1:<port>`
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The v3 key space, for fault injection and inspection.
    pub fn flat(&self) -> &MemoryFlatStore {
        &self.flat
    }
}

impl Drop for FakeEtcd {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

fn router(state: Arc<FakeState>) -> Router {
    Router::new()
        .route("/v2/keys", get(handle_v2_root))
        .route("/v2/keys/", get(handle_v2_root))
        .route("/v2/keys/{*path}", get(handle_v2_get))
        .route("/v3/kv/range", post(handle_range))
        .route("/v3/kv/deleterange", post(handle_delete_range))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct V2Query {
    #[serde(default)]
    recursive: bool,
    #[serde(default)]
    sorted: bool,
    #[serde(default)]
    quorum: bool,
}

impl V2Query {
    fn options(&self) -> TreeListOptions {
        TreeListOptions {
            sorted: self.sorted,
            recursive: self.recursive,
            consistency: if self.quorum {
                Consistency::Quorum
            } else {
                Consistency::Local
            },
        }
    }
}

fn v2_error(status: StatusCode, code: u16, message: &str, cause: &str) -> Response {
    let body = serde_json::json!({
        "errorCode": code,
        "message": message,
        "cause": cause,
        "index": 0,
    });
    (status, Json(body)).into_response()
}

fn v3_error(status: StatusCode, code: u16, message: &str) -> Response {
    let body = serde_json::json!({
        "error": message,
        "code": code,
        "message": message,
    });
    (status, Json(body)).into_response()
}

async fn handle_v2_root(
    State(state): State<Arc<FakeState>>,
    Query(query): Query<V2Query>,
) -> Response {
    list_v2(&state, "/", &query).await
}

async fn handle_v2_get(
    State(state): State<Arc<FakeState>>,
    Path(path): Path<String>,
    Query(query): Query<V2Query>,
) -> Response {
    list_v2(&state, &format!("/{path}"), &query).await
}

async fn list_v2(state: &FakeState, path: &str, query: &V2Query) -> Response {
    match state.tree.list_tree(path, &query.options()).await {
        Ok(node) => {
            let body = V2Response {
                action: "get".to_string(),
                node: V2Node::from_tree(&node),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(StorageError::NotFound { key }) => {
            v2_error(StatusCode::NOT_FOUND, V2_KEY_NOT_FOUND, "Key not found", &key)
        }
        Err(e) => v2_error(StatusCode::INTERNAL_SERVER_ERROR, 300, &e.to_string(), path),
    }
}

fn decode_key(encoded: &str) -> Result<Vec<u8>, Response> {
    decode_bytes(encoded)
        .map_err(|e| v3_error(StatusCode::BAD_REQUEST, GRPC_INVALID_ARGUMENT, &e.to_string()))
}

async fn handle_range(
    State(state): State<Arc<FakeState>>,
    Json(request): Json<RangeRequest>,
) -> Response {
    let start = match decode_key(&request.key) {
        Ok(key) => key,
        Err(response) => return response,
    };

    let listed = match state.flat.list_from_key(&start).await {
        Ok(listed) => listed,
        Err(e) => return v3_error(StatusCode::INTERNAL_SERVER_ERROR, GRPC_INTERNAL, &e.to_string()),
    };

    // Only the "from key" form (range_end = "\0") and single-key gets are served.
    let from_key = request.range_end.as_deref() == Some(encode_key(b"\0").as_str());
    let kvs: Vec<WireKeyValue> = listed
        .into_iter()
        .filter(|kv| from_key || kv.key == start)
        .map(|kv| WireKeyValue {
            key: encode_key(&kv.key),
            value: if request.keys_only {
                None
            } else {
                kv.value.map(|v| BASE64.encode(v))
            },
        })
        .collect();

    let count = (!kvs.is_empty()).then(|| kvs.len().to_string());
    let body = RangeResponse {
        kvs,
        more: false,
        count,
    };
    (StatusCode::OK, Json(body)).into_response()
}

async fn handle_delete_range(
    State(state): State<Arc<FakeState>>,
    Json(request): Json<DeleteRangeRequest>,
) -> Response {
    let key = match decode_key(&request.key) {
        Ok(key) => key,
        Err(response) => return response,
    };

    let existed = state.flat.contains_key(&key);
    match state.flat.delete(&key).await {
        Ok(()) => {
            let body = DeleteRangeResponse {
                deleted: existed.then(|| "1".to_string()),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => v3_error(StatusCode::INTERNAL_SERVER_ERROR, GRPC_INTERNAL, &e.to_string()),
    }
}
