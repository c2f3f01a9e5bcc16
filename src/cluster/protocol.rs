//! Cluster Wire Protocol
//!
//! Defines the API endpoints and Data Transfer Objects (DTOs) for the
//! orchestrator-to-partition protocol and the public client surface.
//!
//! The logical envelope is fixed (create/delete carry a triple, query carries
//! the raw query string, admin carries an operation kind; replies are an
//! acknowledgement, a result list, or an error message). The encoding is JSON
//! over HTTP.

use serde::{Deserialize, Serialize};

// --- Internal partition API ---

/// Index a triple on the receiving partition.
pub const ENDPOINT_INTERNAL_CREATE: &str = "/internal/create";
/// Remove a triple from the receiving partition's bookkeeping.
pub const ENDPOINT_INTERNAL_DELETE: &str = "/internal/delete";
/// Evaluate a query on the receiving partition (can-handle + execute).
pub const ENDPOINT_INTERNAL_QUERY: &str = "/internal/query";
/// Administrative operations (checkpoint, recover, shutdown).
pub const ENDPOINT_INTERNAL_ADMIN: &str = "/internal/admin";

// --- Public client API ---

/// Client write entry point; fans out through the router.
pub const ENDPOINT_MD_CREATE: &str = "/md/create";
/// Client delete entry point; routed like create.
pub const ENDPOINT_MD_DELETE: &str = "/md/delete";
/// Client search entry point (`?q=K=V`).
pub const ENDPOINT_MD_SEARCH: &str = "/md/search";
/// Broadcast a checkpoint to every partition.
pub const ENDPOINT_ADMIN_CHECKPOINT: &str = "/admin/checkpoint";
/// Broadcast a recover to every partition.
pub const ENDPOINT_ADMIN_RECOVER: &str = "/admin/recover";
/// Broadcast a shutdown to every partition.
pub const ENDPOINT_ADMIN_SHUTDOWN: &str = "/admin/shutdown";

// --- Data Transfer Objects ---

/// Payload asserting that `object_id` carries metadata `key=value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIndexRequest {
    pub key: String,
    pub value: String,
    pub object_id: i64,
}

/// Payload retracting a previously asserted triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteIndexRequest {
    pub key: String,
    pub value: String,
    pub object_id: i64,
}

/// A raw `K=V` query string, parsed on the receiving partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Reply to a query: the matching object ids, sorted ascending. `ok` is
/// false when the partition declined the query (its index cannot contribute).
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub ok: bool,
    pub object_ids: Vec<i64>,
}

/// The administrative operations a partition accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminKind {
    Checkpoint,
    Recover,
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminRequest {
    pub kind: AdminKind,
}

/// Standard acknowledgement for writes and admin operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
}

/// Reply variant substituted for an acknowledgement when the operation
/// failed on the receiving partition.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Query parameters of the public search endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

/// Reply of the public search endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub count: usize,
    pub object_ids: Vec<i64>,
}
