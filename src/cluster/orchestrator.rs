use std::collections::BTreeSet;

use super::protocol::AdminKind;
use super::transport::IndexTransport;
use crate::query::pattern::parse_query;
use crate::routing::dart::DartRouter;

/// The client-side core: routes writes and queries through the DART router
/// and a transport, and unions per-partition answers.
///
/// Writes carry no all-or-nothing guarantee (a failed replica is logged and
/// skipped) and `md_search` never fails: partitions that error simply
/// contribute nothing.
pub struct Orchestrator<T: IndexTransport> {
    router: DartRouter,
    transport: T,
}

impl<T: IndexTransport> Orchestrator<T> {
    pub fn new(router: DartRouter, transport: T) -> Self {
        Self { router, transport }
    }

    pub fn router(&self) -> &DartRouter {
        &self.router
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Indexes `(key, value, object_id)` on the key's primary partition and
    /// its replicas.
    pub async fn create_md_index(&self, key: &str, value: &str, object_id: i64) {
        let destinations = self.router.partitions_for_key(key);
        tracing::debug!("indexing key '{}' on partitions {:?}", key, destinations);
        for partition in destinations {
            if let Err(e) = self
                .transport
                .create_index(partition, key, value, object_id)
                .await
            {
                tracing::warn!("create_md_index failed on partition {}: {}", partition, e);
            }
        }
    }

    /// Retracts the triple from the same partitions a create would reach.
    pub async fn delete_md_index(&self, key: &str, value: &str, object_id: i64) {
        for partition in self.router.partitions_for_key(key) {
            if let Err(e) = self
                .transport
                .delete_index(partition, key, value, object_id)
                .await
            {
                tracing::warn!("delete_md_index failed on partition {}: {}", partition, e);
            }
        }
    }

    /// Evaluates a `K=V` query: fan-out to the partitions the key-side shape
    /// selects, union the answers, return them sorted ascending.
    pub async fn md_search(&self, query: &str) -> Vec<i64> {
        let condition = parse_query(query);
        let destinations = self.router.destinations(&condition.key);
        tracing::debug!("query '{}' routed to partitions {:?}", query, destinations);

        let mut results = BTreeSet::new();
        for partition in destinations {
            match self.transport.query(partition, query).await {
                Ok(object_ids) => results.extend(object_ids),
                Err(e) => {
                    tracing::warn!("query failed on partition {}: {}", partition, e);
                }
            }
        }
        results.into_iter().collect()
    }

    /// Broadcasts a checkpoint to every partition. True only if all succeed.
    pub async fn checkpoint_all(&self) -> bool {
        self.admin_broadcast(AdminKind::Checkpoint).await
    }

    /// Broadcasts a recover to every partition. True only if all succeed.
    pub async fn recover_all(&self) -> bool {
        self.admin_broadcast(AdminKind::Recover).await
    }

    /// Broadcasts a shutdown to every partition. True only if all succeed.
    pub async fn shutdown_all(&self) -> bool {
        self.admin_broadcast(AdminKind::Shutdown).await
    }

    async fn admin_broadcast(&self, kind: AdminKind) -> bool {
        let mut all_ok = true;
        for partition in 0..self.router.num_partitions() {
            if let Err(e) = self.transport.admin(partition, kind).await {
                tracing::warn!("admin {:?} failed on partition {}: {}", kind, partition, e);
                all_ok = false;
            }
        }
        all_ok
    }
}
