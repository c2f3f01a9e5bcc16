//! Cluster Coordination Module
//!
//! Binds the index, the partitions and the router into the query execution
//! protocol: typed messages travel from the orchestrator to the partitions
//! computed by the DART router, each partition decides whether it can handle
//! the query before executing it, and the orchestrator unions the answers.
//!
//! ## Layers
//! - **`protocol`**: the message envelope (create/delete/query/admin plus the
//!   response and error replies) as serde DTOs, and the HTTP endpoint table.
//! - **`transport`**: the abstract send/receive contract the orchestrator
//!   speaks, with an in-process implementation for tests and embedding and an
//!   HTTP implementation for real deployments.
//! - **`orchestrator`**: the client-side core (`create_md_index`,
//!   `delete_md_index`, `md_search`, admin broadcast).
//! - **`handlers`**: the axum endpoints a partition node serves.
//!
//! ## Consistency
//! Writes fan out without an all-or-nothing guarantee and reads return the
//! union of whatever the visited partitions answered: a partition failure
//! reduces recall instead of failing the query.

pub mod handlers;
pub mod orchestrator;
pub mod protocol;
pub mod transport;

#[cfg(test)]
mod tests;
