//! DSM API Handlers
//!
//! Inbound half of the transport adapter: HTTP endpoints that feed
//! incoming RPCs into the engine's entry points, plus the public object
//! API and the stats report.
//!
//! The engine is blocking (lock acquisition parks the calling thread), so
//! every handler crosses from the async server onto a worker thread with
//! `spawn_blocking`. That is exactly the scheduling model the core
//! expects: one worker thread per in-flight RPC.

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post, put},
};
use std::sync::Arc;

use super::protocol::{
    Ack, ENDPOINT_DSM_CACHE_REMOVE, ENDPOINT_DSM_CACHE_UPDATE, ENDPOINT_DSM_FETCH,
    ENDPOINT_DSM_REMOVE, ENDPOINT_DSM_WRITE, ENDPOINT_LOCK_ACQUIRE, ENDPOINT_LOCK_RELEASE,
    ENDPOINT_OBJECT, ENDPOINT_STATS, FetchReply, FetchRequest, LockRequest, ObjectGetResponse,
    ObjectPutRequest, ObjectStat, RemoveMsg, StatsResponse, UpdateMsg,
};
use crate::cluster::node::DsmNode;
use crate::cluster::types::NodeId;
use crate::dsm::error::DsmError;
use crate::dsm::object_id::ObjectId;

/// Routes for one node: internal coherence/lock RPCs, the public object
/// API, and stats.
pub fn router(node: Arc<DsmNode>) -> Router {
    Router::new()
        .route(ENDPOINT_DSM_FETCH, post(handle_dsm_fetch))
        .route(ENDPOINT_DSM_WRITE, post(handle_dsm_write))
        .route(ENDPOINT_DSM_CACHE_UPDATE, post(handle_cache_update))
        .route(ENDPOINT_DSM_REMOVE, post(handle_dsm_remove))
        .route(ENDPOINT_DSM_CACHE_REMOVE, post(handle_cache_remove))
        .route(ENDPOINT_LOCK_ACQUIRE, post(handle_lock_acquire))
        .route(ENDPOINT_LOCK_RELEASE, post(handle_lock_release))
        .route(ENDPOINT_OBJECT, put(handle_object_put))
        .route(
            &format!("{}/:key", ENDPOINT_OBJECT),
            get(handle_object_get).delete(handle_object_delete),
        )
        .route(ENDPOINT_STATS, get(handle_stats))
        .layer(Extension(node))
}

// ----------------------- Internal RPC handlers ----------------------- //

async fn handle_dsm_fetch(
    Extension(node): Extension<Arc<DsmNode>>,
    Json(req): Json<FetchRequest>,
) -> (StatusCode, Json<FetchReply>) {
    let object_name = req.object_name.clone();
    let result = tokio::task::spawn_blocking(move || {
        let id = ObjectId::new(req.object_name);
        node.core()
            .on_fetch_from_home(NodeId(req.requester_node_id), &id)
    })
    .await;

    match result {
        Ok(data) => {
            let found = !data.is_empty();
            (
                StatusCode::OK,
                Json(FetchReply {
                    found,
                    object_name,
                    data,
                }),
            )
        }
        Err(e) => {
            tracing::error!("fetch handler panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FetchReply {
                    found: false,
                    object_name,
                    data: Vec::new(),
                }),
            )
        }
    }
}

async fn handle_dsm_write(
    Extension(node): Extension<Arc<DsmNode>>,
    Json(req): Json<UpdateMsg>,
) -> (StatusCode, Json<Ack>) {
    run_blocking(move || {
        let id = ObjectId::new(req.object_name);
        node.core()
            .on_write_to_home(NodeId(req.sender_node_id), &id, &req.data);
    })
    .await
}

async fn handle_cache_update(
    Extension(node): Extension<Arc<DsmNode>>,
    Json(req): Json<UpdateMsg>,
) -> (StatusCode, Json<Ack>) {
    run_blocking(move || {
        let id = ObjectId::new(req.object_name);
        node.core().on_cache_update(&id, &req.data);
    })
    .await
}

async fn handle_dsm_remove(
    Extension(node): Extension<Arc<DsmNode>>,
    Json(req): Json<RemoveMsg>,
) -> (StatusCode, Json<Ack>) {
    run_blocking(move || {
        let id = ObjectId::new(req.object_name);
        node.core().on_remove_to_home(NodeId(req.sender_node_id), &id);
    })
    .await
}

async fn handle_cache_remove(
    Extension(node): Extension<Arc<DsmNode>>,
    Json(req): Json<RemoveMsg>,
) -> (StatusCode, Json<Ack>) {
    run_blocking(move || {
        let id = ObjectId::new(req.object_name);
        node.core().on_cache_remove(&id);
    })
    .await
}

/// Blocks until the local lock manager grants the lock; the caller's HTTP
/// request stays pending exactly that long.
async fn handle_lock_acquire(
    Extension(node): Extension<Arc<DsmNode>>,
    Json(req): Json<LockRequest>,
) -> (StatusCode, Json<Ack>) {
    run_blocking(move || {
        let id = ObjectId::new(req.object_id);
        node.core()
            .on_lock_acquire(NodeId(req.client_id), &id, req.is_write_lock);
    })
    .await
}

async fn handle_lock_release(
    Extension(node): Extension<Arc<DsmNode>>,
    Json(req): Json<LockRequest>,
) -> (StatusCode, Json<Ack>) {
    run_blocking(move || {
        let id = ObjectId::new(req.object_id);
        node.core()
            .on_lock_release(NodeId(req.client_id), &id, req.is_write_lock);
    })
    .await
}

async fn run_blocking<F>(task: F) -> (StatusCode, Json<Ack>)
where
    F: FnOnce() + Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(()) => (StatusCode::OK, Json(Ack { success: true })),
        Err(e) => {
            tracing::error!("rpc handler panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Ack { success: false }),
            )
        }
    }
}

// ------------------------ Public object API -------------------------- //

async fn handle_object_get(
    Extension(node): Extension<Arc<DsmNode>>,
    Path(key): Path<String>,
) -> (StatusCode, Json<ObjectGetResponse>) {
    let result =
        tokio::task::spawn_blocking(move || node.read::<String>(ObjectId::new(key))).await;

    match result {
        Ok(Ok(value)) => (
            StatusCode::OK,
            Json(ObjectGetResponse {
                found: true,
                value: Some(value),
            }),
        ),
        Ok(Err(DsmError::NotFound(_))) => (
            StatusCode::NOT_FOUND,
            Json(ObjectGetResponse {
                found: false,
                value: None,
            }),
        ),
        Ok(Err(e)) => {
            tracing::error!("object read failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ObjectGetResponse {
                    found: false,
                    value: None,
                }),
            )
        }
        Err(e) => {
            tracing::error!("object read panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ObjectGetResponse {
                    found: false,
                    value: None,
                }),
            )
        }
    }
}

async fn handle_object_put(
    Extension(node): Extension<Arc<DsmNode>>,
    Json(req): Json<ObjectPutRequest>,
) -> (StatusCode, Json<Ack>) {
    let result =
        tokio::task::spawn_blocking(move || node.write(ObjectId::new(req.key), req.value)).await;

    match result {
        Ok(Ok(())) => (StatusCode::OK, Json(Ack { success: true })),
        Ok(Err(e)) => {
            tracing::error!("object write failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Ack { success: false }),
            )
        }
        Err(e) => {
            tracing::error!("object write panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Ack { success: false }),
            )
        }
    }
}

async fn handle_object_delete(
    Extension(node): Extension<Arc<DsmNode>>,
    Path(key): Path<String>,
) -> (StatusCode, Json<Ack>) {
    let result = tokio::task::spawn_blocking(move || node.remove(&ObjectId::new(key))).await;

    match result {
        Ok(Ok(())) => (StatusCode::OK, Json(Ack { success: true })),
        Ok(Err(e)) => {
            tracing::error!("object remove failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Ack { success: false }),
            )
        }
        Err(e) => {
            tracing::error!("object remove panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Ack { success: false }),
            )
        }
    }
}

// ------------------------------ Stats -------------------------------- //

async fn handle_stats(Extension(node): Extension<Arc<DsmNode>>) -> Json<StatsResponse> {
    let identity = *node.identity();
    let mut objects: Vec<ObjectStat> = node
        .snapshot()
        .into_iter()
        .map(|(key, bytes)| {
            let role = node.role_for(&ObjectId::new(key.as_str()));
            ObjectStat {
                key,
                role: role.to_string(),
                size_bytes: bytes.len(),
            }
        })
        .collect();
    objects.sort_by(|a, b| a.key.cmp(&b.key));

    Json(StatsResponse {
        node_id: identity.my_id.0,
        total_nodes: identity.total_nodes,
        object_count: objects.len(),
        objects,
    })
}
