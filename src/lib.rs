//! Distributed Metadata Indexing Service
//!
//! This library crate defines the core modules of the indexing cluster.
//! It serves as the foundation for the binary executable (`main.rs`), which
//! runs one partition node.
//!
//! ## Architecture Modules
//! The system is composed of five loosely coupled subsystems:
//!
//! - **`query`**: The `K=V` pattern grammar. Splits a query into a key-side
//!   and a value-side pattern, each classified as exact, prefix, suffix,
//!   infix or wildcard.
//! - **`index`**: The two-level trie index. A byte trie over keys whose
//!   accepting nodes each own a second trie over that key's values, with an
//!   optional suffix-mode that indexes every suffix for cheap suffix/infix
//!   lookups.
//! - **`partition`**: One shard of the index. Wraps a key trie and per-object
//!   bookkeeping behind a single-writer lock, executes whole queries, and
//!   checkpoints to / recovers from its data directory.
//! - **`routing`**: The DART distribution layer. A consistent-hash ring plus
//!   a fixed directory of prefix-bearing virtual nodes maps keys to
//!   partitions and computes the minimal partition set each query shape must
//!   visit, with optional popularity-driven adaptive replication.
//! - **`cluster`**: The query execution protocol. Typed messages, the
//!   transport abstraction (in-process and HTTP), the orchestrator that fans
//!   out writes and queries, and the axum handlers a node serves.

pub mod cluster;
pub mod index;
pub mod partition;
pub mod query;
pub mod routing;
