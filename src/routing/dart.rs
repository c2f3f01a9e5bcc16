use anyhow::{Context, Result, bail};
use dashmap::DashMap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use super::ring::{ConsistentHashRing, fnv1a32};
use crate::query::pattern::Pattern;

/// Fixed size of the virtual-node directory.
pub const NUM_VIRTUAL_NODES: usize = 256;

/// Default ratio of partitions that act as replicas for each key.
pub const DEFAULT_REPLICATION_RATIO: f64 = 0.1;

const MAPPING_FILE_HEADER: &str = "DART_MAPPING_V1";

/// A directory slot carrying a key prefix. The id doubles as the scan order;
/// the prefix is fixed for the router's lifetime, only the partition
/// assignment changes on remap.
#[derive(Debug, Clone)]
pub struct VirtualNode {
    pub id: u32,
    pub prefix: String,
}

impl VirtualNode {
    pub fn contains_key(&self, key: &str) -> bool {
        key.starts_with(&self.prefix)
    }
}

/// The fixed prefix alphabet, in the order the directory cycles through it:
/// single letters, digits, special characters, twenty common two-character
/// openings, and the catch-all empty prefix.
fn prefix_alphabet() -> Vec<String> {
    let mut prefixes: Vec<String> = Vec::new();
    prefixes.extend(('a'..='z').map(String::from));
    prefixes.extend(('A'..='Z').map(String::from));
    prefixes.extend(('0'..='9').map(String::from));
    prefixes.extend("_-./,:;!@#$%^&*()".chars().map(String::from));
    prefixes.extend(
        [
            "St", "Fi", "Da", "Ti", "Us", "Pr", "Sp", "Ke", "Va", "Ex", "Co", "In", "Re", "De",
            "Tr", "Lo", "Po", "Pa", "Mo", "Se",
        ]
        .into_iter()
        .map(String::from),
    );
    prefixes.push(String::new());
    prefixes
}

/// The DART router: maps keys to partitions through the virtual-node
/// directory and computes the set of partitions each query shape must visit.
///
/// Immutable after construction except for [`remap`](Self::remap) (exclusive
/// access) and the partition exclusion hook, which the external fault module
/// drives through shared references.
pub struct DartRouter {
    num_partitions: usize,
    replication_factor: usize,
    ring: ConsistentHashRing,
    virtual_nodes: Vec<VirtualNode>,
    vnode_to_partition: HashMap<u32, usize>,
    partition_to_vnodes: HashMap<usize, Vec<u32>>,
    excluded: DashMap<usize, ()>,
}

impl DartRouter {
    pub fn new(num_partitions: usize) -> Self {
        Self::with_replication_ratio(num_partitions, DEFAULT_REPLICATION_RATIO)
    }

    pub fn with_replication_ratio(num_partitions: usize, replication_ratio: f64) -> Self {
        let mut virtual_nodes = Vec::with_capacity(NUM_VIRTUAL_NODES);
        let alphabet = prefix_alphabet();
        'outer: loop {
            for prefix in &alphabet {
                if virtual_nodes.len() >= NUM_VIRTUAL_NODES {
                    break 'outer;
                }
                virtual_nodes.push(VirtualNode {
                    id: virtual_nodes.len() as u32,
                    prefix: prefix.clone(),
                });
            }
        }

        let mut router = Self {
            num_partitions,
            replication_factor: replication_factor_for(num_partitions, replication_ratio),
            ring: ConsistentHashRing::new(num_partitions),
            virtual_nodes,
            vnode_to_partition: HashMap::new(),
            partition_to_vnodes: HashMap::new(),
            excluded: DashMap::new(),
        };
        router.assign_virtual_nodes();

        tracing::info!(
            "DART router initialized with {} partitions, replication factor {}, {} virtual nodes",
            router.num_partitions,
            router.replication_factor,
            router.virtual_nodes.len()
        );
        router
    }

    fn assign_virtual_nodes(&mut self) {
        self.vnode_to_partition.clear();
        self.partition_to_vnodes.clear();
        for vnode in &self.virtual_nodes {
            let partition = self.ring.primary(&format!("vnode_{}", vnode.id));
            self.vnode_to_partition.insert(vnode.id, partition);
            self.partition_to_vnodes
                .entry(partition)
                .or_default()
                .push(vnode.id);
        }
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    pub fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    pub fn virtual_nodes(&self) -> &[VirtualNode] {
        &self.virtual_nodes
    }

    pub fn virtual_nodes_for_partition(&self, partition: usize) -> &[u32] {
        self.partition_to_vnodes
            .get(&partition)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First virtual node (in id order) whose prefix matches the key. The
    /// catch-all empty prefix sits near the end of the first alphabet cycle,
    /// so the hash fallback is only reachable if the directory were built
    /// without it.
    pub fn vnode_for_key(&self, key: &str) -> u32 {
        for vnode in &self.virtual_nodes {
            if vnode.contains_key(key) {
                return vnode.id;
            }
        }
        fnv1a32(key) % self.virtual_nodes.len() as u32
    }

    pub fn partition_for_vnode(&self, vnode_id: u32) -> usize {
        match self.vnode_to_partition.get(&vnode_id) {
            Some(&partition) => partition,
            None => fnv1a32(&vnode_id.to_string()) as usize % self.num_partitions,
        }
    }

    /// The ring's replica walk for a key, exposed for wrappers that adjust
    /// the replica count per key.
    pub fn ring_replicas(&self, key: &str, replicas: usize) -> Vec<usize> {
        self.ring.replicas(key, replicas)
    }

    /// Marks a partition as failed: it disappears from every destination set
    /// until restored. Called by the external fault-detection module.
    pub fn mark_partition_down(&self, partition: usize) {
        self.excluded.insert(partition, ());
        tracing::warn!("partition {} excluded from routing", partition);
    }

    pub fn mark_partition_up(&self, partition: usize) {
        self.excluded.remove(&partition);
        tracing::info!("partition {} restored to routing", partition);
    }

    fn retain_available(&self, mut partitions: Vec<usize>) -> Vec<usize> {
        partitions.retain(|p| !self.excluded.contains_key(p));
        partitions
    }

    /// Write/exact destinations for a key: the vnode primary followed by the
    /// ring's replica walk, deduplicated and capped at `replication_factor + 1`.
    pub fn partitions_for_key(&self, key: &str) -> Vec<usize> {
        let primary = self.partition_for_vnode(self.vnode_for_key(key));
        let mut partitions = vec![primary];
        for partition in self.ring.replicas(key, self.replication_factor) {
            if partitions.len() >= self.replication_factor + 1 {
                break;
            }
            if !partitions.contains(&partition) {
                partitions.push(partition);
            }
        }
        self.retain_available(partitions)
    }

    /// Destinations for a prefix-shaped query: every partition owning a
    /// virtual node whose prefix is compatible with the query prefix. Falls
    /// back to all partitions if nothing is compatible.
    pub fn partitions_for_prefix(&self, prefix: &str) -> Vec<usize> {
        let mut partitions = Vec::new();
        for vnode in &self.virtual_nodes {
            let np = &vnode.prefix;
            if np.starts_with(prefix) || prefix.starts_with(np.as_str()) {
                let partition = self.partition_for_vnode(vnode.id);
                if !partitions.contains(&partition) {
                    partitions.push(partition);
                }
            }
        }
        if partitions.is_empty() {
            return self.all_partitions();
        }
        self.retain_available(partitions)
    }

    /// Every available partition.
    pub fn all_partitions(&self) -> Vec<usize> {
        self.retain_available((0..self.num_partitions).collect())
    }

    /// Destination set for a parsed key-side pattern.
    ///
    /// Suffix literals are routed like exact keys: under suffix-mode every
    /// suffix is indexed separately, so the literal is itself an index key.
    /// Infix literals are routed like prefixes of those indexed suffixes.
    pub fn destinations(&self, key_pattern: &Pattern) -> Vec<usize> {
        match key_pattern {
            Pattern::Wildcard => self.all_partitions(),
            Pattern::Exact(k) => self.partitions_for_key(k),
            Pattern::Prefix(p) => self.partitions_for_prefix(p),
            Pattern::Suffix(s) => self.partitions_for_key(s),
            Pattern::Infix(x) => self.partitions_for_prefix(x),
        }
    }

    /// Rebuilds the ring and the virtual-node assignment for a new partition
    /// count. Returns how many virtual nodes changed partition, which is the
    /// summary of the migration plan (data movement itself is out of scope).
    pub fn remap(&mut self, new_num_partitions: usize) -> usize {
        if new_num_partitions == 0 {
            return 0;
        }
        let previous = self.vnode_to_partition.clone();

        self.num_partitions = new_num_partitions;
        self.replication_factor =
            replication_factor_for(new_num_partitions, DEFAULT_REPLICATION_RATIO);
        self.ring = ConsistentHashRing::new(new_num_partitions);
        self.assign_virtual_nodes();

        let migrations = self
            .virtual_nodes
            .iter()
            .filter(|vnode| {
                previous
                    .get(&vnode.id)
                    .is_some_and(|&old| old != self.vnode_to_partition[&vnode.id])
            })
            .count();

        tracing::info!(
            "remapped to {} partitions (replication factor {}): {} virtual nodes need migration",
            self.num_partitions,
            self.replication_factor,
            migrations
        );
        migrations
    }

    /// Persists the directory and its assignment:
    ///
    /// ```text
    /// DART_MAPPING_V1
    /// <num_partitions> <replication_factor>
    /// <vnode_count>
    /// <vnode_id> <prefix>     (one per vnode)
    /// <vnode_id> <partition>  (one per vnode)
    /// ```
    pub fn save_mapping(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("creating mapping {}", path.display()))?;
        let mut w = BufWriter::new(file);

        writeln!(w, "{MAPPING_FILE_HEADER}")?;
        writeln!(w, "{} {}", self.num_partitions, self.replication_factor)?;
        writeln!(w, "{}", self.virtual_nodes.len())?;
        for vnode in &self.virtual_nodes {
            writeln!(w, "{} {}", vnode.id, vnode.prefix)?;
        }
        for vnode in &self.virtual_nodes {
            writeln!(w, "{} {}", vnode.id, self.vnode_to_partition[&vnode.id])?;
        }
        w.flush()?;
        Ok(())
    }

    /// Loads a saved mapping. Refuses files written for a different partition
    /// count; the caller should remap instead.
    pub fn load_mapping(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("opening mapping {}", path.display()))?;
        let mut lines = BufReader::new(file).lines();
        let mut next = || -> Result<String> {
            lines
                .next()
                .context("mapping file ended unexpectedly")?
                .context("reading mapping line")
        };

        let header = next()?;
        if header != MAPPING_FILE_HEADER {
            bail!("unrecognized mapping header {:?}", header);
        }
        let counts = next()?;
        let mut parts = counts.split_whitespace();
        let stored_partitions: usize = parts
            .next()
            .context("missing partition count")?
            .parse()
            .context("parsing partition count")?;
        let stored_replication: usize = parts
            .next()
            .context("missing replication factor")?
            .parse()
            .context("parsing replication factor")?;
        if stored_partitions != self.num_partitions {
            bail!(
                "stored mapping is for {} partitions but the router has {}; remap required",
                stored_partitions,
                self.num_partitions
            );
        }

        let vnode_count: usize = next()?.trim().parse().context("parsing vnode count")?;
        let mut virtual_nodes = Vec::with_capacity(vnode_count);
        for _ in 0..vnode_count {
            let line = next()?;
            let (id, prefix) = line
                .split_once(' ')
                .with_context(|| format!("malformed vnode line {line:?}"))?;
            virtual_nodes.push(VirtualNode {
                id: id.parse().context("parsing vnode id")?,
                prefix: prefix.to_string(),
            });
        }

        let mut vnode_to_partition = HashMap::with_capacity(vnode_count);
        let mut partition_to_vnodes: HashMap<usize, Vec<u32>> = HashMap::new();
        for _ in 0..vnode_count {
            let line = next()?;
            let mut parts = line.split_whitespace();
            let id: u32 = parts
                .next()
                .context("missing vnode id")?
                .parse()
                .context("parsing vnode id")?;
            let partition: usize = parts
                .next()
                .context("missing partition id")?
                .parse()
                .context("parsing partition id")?;
            vnode_to_partition.insert(id, partition);
            partition_to_vnodes.entry(partition).or_default().push(id);
        }

        self.replication_factor = stored_replication;
        self.virtual_nodes = virtual_nodes;
        self.vnode_to_partition = vnode_to_partition;
        self.partition_to_vnodes = partition_to_vnodes;
        Ok(())
    }
}

fn replication_factor_for(num_partitions: usize, ratio: f64) -> usize {
    ((num_partitions as f64 * ratio) as usize).max(1)
}
