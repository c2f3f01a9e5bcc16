//! Partition Engine Module
//!
//! One partition of the distributed index: a [`engine::PartitionEngine`] wraps
//! a single key trie plus a per-object reverse map and executes whole `K=V`
//! queries against them.
//!
//! ## Concurrency
//! All state sits behind one single-writer / multi-reader lock. `insert`,
//! `delete`, `checkpoint` and `recover` take the writer side; `can_handle`
//! and `execute` run concurrently on the reader side. Writes within a
//! partition are therefore totally ordered; the orchestrator makes no
//! ordering promise across partitions.
//!
//! ## Durability
//! Individual writes are not durable. The engine checkpoints its contents to
//! `${data_dir}/server_${id}/index.dat` in a line-oriented text format and
//! recovers by replaying the recorded triples through `insert`.

pub mod engine;

#[cfg(test)]
mod tests;
