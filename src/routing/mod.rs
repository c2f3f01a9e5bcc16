//! DART Distribution Module
//!
//! Decides which partitions hold which keys and which partitions a query must
//! visit. It ensures a deterministic distribution that every node computes
//! identically from the partition count alone.
//!
//! ## Mechanism
//! - **Hashing**: a seeded 64-bit FNV-1a ring with a fixed number of virtual
//!   positions per partition gives each key a primary partition and an ordered
//!   replica walk.
//! - **Virtual nodes**: a fixed directory of 256 prefix-bearing virtual nodes
//!   mediates key placement, so prefix-shaped queries can be routed to the
//!   partitions whose prefixes are compatible instead of broadcast.
//! - **Replication**: each write lands on `replication_factor + 1` distinct
//!   partitions (primary first), capped at the partition count.
//! - **Adaptivity**: an optional wrapper scales the replica count of hot key
//!   patterns from decaying popularity scores.

pub mod adaptive;
pub mod dart;
pub mod ring;
