/// Number of hash positions each partition contributes to the ring.
pub const RING_SIZE: usize = 40;

const FNV64_OFFSET_BASIS: u64 = 14695981039346656037;
const FNV64_PRIME: u64 = 1099511628211;
const FNV32_OFFSET_BASIS: u32 = 2166136261;
const FNV32_PRIME: u32 = 16777619;

/// Seeded 64-bit FNV-1a. The seed is folded into the offset basis, matching
/// the ring's position hashing.
pub fn fnv1a64(data: &str, seed: u64) -> u64 {
    let mut hash = FNV64_OFFSET_BASIS.wrapping_add(seed);
    for b in data.bytes() {
        hash = (hash ^ b as u64).wrapping_mul(FNV64_PRIME);
    }
    hash
}

/// 32-bit FNV-1a, used only as the virtual-node fallback hash.
pub fn fnv1a32(data: &str) -> u32 {
    let mut hash = FNV32_OFFSET_BASIS;
    for b in data.bytes() {
        hash = (hash ^ b as u32).wrapping_mul(FNV32_PRIME);
    }
    hash
}

/// Consistent-hash ring over the partition set.
///
/// Every partition `s` contributes [`RING_SIZE`] positions hashed from the
/// stable names `server{s}_{i}`, kept sorted for lower-bound lookup. The ring
/// is immutable; rebalancing builds a fresh one.
pub struct ConsistentHashRing {
    num_partitions: usize,
    ring: Vec<(u64, usize)>,
}

impl ConsistentHashRing {
    pub fn new(num_partitions: usize) -> Self {
        let mut ring = Vec::with_capacity(num_partitions * RING_SIZE);
        for partition in 0..num_partitions {
            for i in 0..RING_SIZE {
                let position = fnv1a64(&format!("server{partition}_{i}"), 0);
                ring.push((position, partition));
            }
        }
        ring.sort_unstable();
        Self {
            num_partitions,
            ring,
        }
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    fn lower_bound(&self, hash: u64) -> usize {
        let idx = self.ring.partition_point(|&(pos, _)| pos < hash);
        if idx == self.ring.len() { 0 } else { idx }
    }

    /// The partition owning the first ring position at or after the key's
    /// hash, wrapping past the end to position zero.
    pub fn primary(&self, key: &str) -> usize {
        if self.ring.is_empty() {
            return 0;
        }
        self.ring[self.lower_bound(fnv1a64(key, 0))].1
    }

    /// The first `min(replicas + 1, N)` distinct partitions walking the ring
    /// forward from the key's position, primary first.
    pub fn replicas(&self, key: &str, replicas: usize) -> Vec<usize> {
        let target = (replicas + 1).min(self.num_partitions);
        let mut found = Vec::with_capacity(target);
        if self.ring.is_empty() || target == 0 {
            return found;
        }

        let mut idx = self.lower_bound(fnv1a64(key, 0));
        while found.len() < target {
            let partition = self.ring[idx].1;
            if !found.contains(&partition) {
                found.push(partition);
            }
            idx = (idx + 1) % self.ring.len();
        }
        found
    }

    #[cfg(test)]
    pub(crate) fn first_position_partition(&self) -> usize {
        self.ring[0].1
    }

    #[cfg(test)]
    pub(crate) fn last_position(&self) -> u64 {
        self.ring[self.ring.len() - 1].0
    }
}
