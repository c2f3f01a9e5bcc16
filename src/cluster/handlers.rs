//! Cluster API Handlers
//!
//! HTTP endpoints of a partition node. The internal handlers translate
//! protocol DTOs into engine calls; the public handlers front the
//! orchestrator so any node can accept client traffic. They bridge the Axum
//! web framework and the logic in `partition::engine` / `orchestrator`.

use axum::Json;
use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use std::sync::Arc;
use sysinfo::System;
use tokio::sync::Notify;

use super::orchestrator::Orchestrator;
use super::protocol::{
    AckResponse, AdminKind, AdminRequest, CreateIndexRequest, DeleteIndexRequest, ErrorResponse,
    QueryRequest, QueryResponse, SearchParams, SearchResponse,
};
use super::transport::HttpTransport;
use crate::partition::engine::PartitionEngine;

type ErrorReply = (StatusCode, Json<ErrorResponse>);

fn internal_error(message: String) -> ErrorReply {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { message }),
    )
}

// --- Internal partition API ---

/// Indexes one triple on this node's partition.
pub async fn handle_internal_create(
    Extension(engine): Extension<Arc<PartitionEngine>>,
    Json(req): Json<CreateIndexRequest>,
) -> Json<AckResponse> {
    engine.insert(&req.key, &req.value, req.object_id).await;
    Json(AckResponse { ok: true })
}

/// Retracts one triple from this node's partition.
pub async fn handle_internal_delete(
    Extension(engine): Extension<Arc<PartitionEngine>>,
    Json(req): Json<DeleteIndexRequest>,
) -> Json<AckResponse> {
    engine.delete(&req.key, &req.value, req.object_id).await;
    Json(AckResponse { ok: true })
}

/// Evaluates a query on this node's partition. The can-handle check runs
/// here so the orchestrator never has to ask twice.
pub async fn handle_internal_query(
    Extension(engine): Extension<Arc<PartitionEngine>>,
    Json(req): Json<QueryRequest>,
) -> Json<QueryResponse> {
    if !engine.can_handle(&req.query).await {
        return Json(QueryResponse {
            ok: false,
            object_ids: Vec::new(),
        });
    }
    let object_ids = engine.execute(&req.query).await;
    Json(QueryResponse {
        ok: true,
        object_ids,
    })
}

/// Administrative operations on this node's partition. Shutdown acknowledges
/// first, then releases the serve loop.
pub async fn handle_internal_admin(
    Extension(engine): Extension<Arc<PartitionEngine>>,
    Extension(shutdown): Extension<Arc<Notify>>,
    Json(req): Json<AdminRequest>,
) -> Result<Json<AckResponse>, ErrorReply> {
    let result = match req.kind {
        AdminKind::Checkpoint => engine.checkpoint().await,
        AdminKind::Recover => engine.recover().await,
        AdminKind::Shutdown => {
            tracing::info!("shutdown requested via admin message");
            shutdown.notify_one();
            Ok(())
        }
    };

    match result {
        Ok(()) => Ok(Json(AckResponse { ok: true })),
        Err(e) => {
            tracing::error!("admin {:?} failed: {}", req.kind, e);
            Err(internal_error(e.to_string()))
        }
    }
}

// --- Public client API ---

/// Client-facing write: routed through the orchestrator to the owning
/// partitions, wherever they live.
pub async fn handle_md_create(
    Extension(orchestrator): Extension<Arc<Orchestrator<HttpTransport>>>,
    Json(req): Json<CreateIndexRequest>,
) -> Json<AckResponse> {
    orchestrator
        .create_md_index(&req.key, &req.value, req.object_id)
        .await;
    Json(AckResponse { ok: true })
}

/// Client-facing delete; same routing as create.
pub async fn handle_md_delete(
    Extension(orchestrator): Extension<Arc<Orchestrator<HttpTransport>>>,
    Json(req): Json<DeleteIndexRequest>,
) -> Json<AckResponse> {
    orchestrator
        .delete_md_index(&req.key, &req.value, req.object_id)
        .await;
    Json(AckResponse { ok: true })
}

/// Client-facing search: `GET /md/search?q=K%3DV`.
pub async fn handle_md_search(
    Extension(orchestrator): Extension<Arc<Orchestrator<HttpTransport>>>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let object_ids = orchestrator.md_search(&params.q).await;
    Json(SearchResponse {
        query: params.q,
        count: object_ids.len(),
        object_ids,
    })
}

/// Broadcasts a checkpoint across the cluster; `ok` aggregates all replies.
pub async fn handle_admin_checkpoint(
    Extension(orchestrator): Extension<Arc<Orchestrator<HttpTransport>>>,
) -> Json<AckResponse> {
    Json(AckResponse {
        ok: orchestrator.checkpoint_all().await,
    })
}

/// Broadcasts a recover across the cluster.
pub async fn handle_admin_recover(
    Extension(orchestrator): Extension<Arc<Orchestrator<HttpTransport>>>,
) -> Json<AckResponse> {
    Json(AckResponse {
        ok: orchestrator.recover_all().await,
    })
}

/// Broadcasts a shutdown across the cluster.
pub async fn handle_admin_shutdown(
    Extension(orchestrator): Extension<Arc<Orchestrator<HttpTransport>>>,
) -> Json<AckResponse> {
    Json(AckResponse {
        ok: orchestrator.shutdown_all().await,
    })
}

// --- Health ---

#[derive(Debug, serde::Serialize)]
pub struct NodeStatsResponse {
    pub server_id: usize,
    pub suffix_mode: bool,
    pub indexed_keys: usize,
    pub objects: usize,
    pub has_checkpoint: bool,
    pub cpu_usage: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
}

/// Local node statistics: index sizes plus host CPU/memory.
pub async fn handle_stats(
    Extension(engine): Extension<Arc<PartitionEngine>>,
) -> Json<NodeStatsResponse> {
    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    // sysinfo returns bytes for memory values.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(NodeStatsResponse {
        server_id: engine.server_id(),
        suffix_mode: engine.suffix_mode(),
        indexed_keys: engine.indexed_key_count().await,
        objects: engine.object_count().await,
        has_checkpoint: engine.has_checkpoint(),
        cpu_usage: sys.global_cpu_info().cpu_usage(),
        mem_used_mb,
        mem_total_mb,
    })
}

#[derive(Debug, serde::Serialize)]
pub struct RoutesResponse {
    pub routes: Vec<&'static str>,
}

pub async fn handle_routes() -> Json<RoutesResponse> {
    Json(RoutesResponse {
        routes: vec![
            "/health/routes",
            "/health/stats",
            "/internal/create",
            "/internal/delete",
            "/internal/query",
            "/internal/admin",
            "/md/create",
            "/md/delete",
            "/md/search",
            "/admin/checkpoint",
            "/admin/recover",
            "/admin/shutdown",
        ],
    })
}
