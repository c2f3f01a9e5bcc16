#[cfg(test)]
mod tests {
    use crate::cluster::orchestrator::Orchestrator;
    use crate::cluster::protocol::{
        AdminKind, AdminRequest, CreateIndexRequest, QueryResponse, SearchResponse,
    };
    use crate::cluster::transport::{IndexTransport, LocalTransport};
    use crate::partition::engine::PartitionEngine;
    use crate::routing::dart::DartRouter;
    use std::sync::Arc;
    use tempfile::TempDir;

    const NUM_PARTITIONS: usize = 4;

    fn cluster(dir: &TempDir, suffix_mode: bool) -> Orchestrator<LocalTransport> {
        let engines = (0..NUM_PARTITIONS)
            .map(|id| Arc::new(PartitionEngine::new(id, dir.path(), suffix_mode).expect("engine")))
            .collect();
        Orchestrator::new(DartRouter::new(NUM_PARTITIONS), LocalTransport::new(engines))
    }

    async fn insert_all(
        orchestrator: &Orchestrator<LocalTransport>,
        triples: &[(&str, &str, i64)],
    ) {
        for (key, value, object_id) in triples {
            orchestrator.create_md_index(key, value, *object_id).await;
        }
    }

    const STAGE_TRIPLES: [(&str, &str, i64); 6] = [
        ("StageX", "100.00", 1001),
        ("StageY", "200.00", 1001),
        ("StageZ", "50.00", 1001),
        ("StageX", "300.00", 1002),
        ("StageY", "400.00", 1002),
        ("StageZ", "75.00", 1002),
    ];

    const FILE_TRIPLES: [(&str, &str, i64); 2] = [
        ("FILE_PATH", "/data/488nm.tif", 1001),
        ("FILE_PATH", "/data/561nm.tif", 1002),
    ];

    // ============================================================
    // END-TO-END SCENARIOS (4 partitions, suffix-mode on)
    // ============================================================

    #[tokio::test]
    async fn test_exact_query_scenario() {
        let dir = TempDir::new().unwrap();
        let cluster = cluster(&dir, true);
        insert_all(
            &cluster,
            &[("StageX", "100.00", 1001), ("StageX", "300.00", 1002)],
        )
        .await;

        assert_eq!(cluster.md_search("StageX=300.00").await, vec![1002]);
        assert_eq!(cluster.md_search("StageX=100.00").await, vec![1001]);
        assert!(cluster.md_search("StageX=999.99").await.is_empty());
    }

    #[tokio::test]
    async fn test_prefix_query_scenario() {
        let dir = TempDir::new().unwrap();
        let cluster = cluster(&dir, true);
        insert_all(&cluster, &STAGE_TRIPLES).await;

        assert_eq!(cluster.md_search("Stage*=*").await, vec![1001, 1002]);
    }

    #[tokio::test]
    async fn test_suffix_query_scenario() {
        let dir = TempDir::new().unwrap();
        let cluster = cluster(&dir, true);
        insert_all(&cluster, &FILE_TRIPLES).await;

        assert_eq!(cluster.md_search("*PATH=*tif").await, vec![1001, 1002]);
    }

    #[tokio::test]
    async fn test_infix_query_scenario() {
        let dir = TempDir::new().unwrap();
        let cluster = cluster(&dir, true);
        insert_all(&cluster, &FILE_TRIPLES).await;
        insert_all(
            &cluster,
            &[("AUXILIARY_FILE", "/data/488nm_metadata.json", 1001)],
        )
        .await;

        assert_eq!(cluster.md_search("*FILE*=*metadata*").await, vec![1001]);
        assert_eq!(cluster.md_search("*FILE*=*").await, vec![1001, 1002]);
    }

    #[tokio::test]
    async fn test_combined_shapes_scenario() {
        let dir = TempDir::new().unwrap();
        let cluster = cluster(&dir, true);
        insert_all(&cluster, &STAGE_TRIPLES).await;

        // Every stage value ends in "00".
        assert_eq!(cluster.md_search("Stage*=*00").await, vec![1001, 1002]);
    }

    #[tokio::test]
    async fn test_wildcard_query_spans_cluster() {
        let dir = TempDir::new().unwrap();
        let cluster = cluster(&dir, true);
        insert_all(&cluster, &STAGE_TRIPLES).await;
        insert_all(&cluster, &FILE_TRIPLES).await;

        assert_eq!(cluster.md_search("*=*").await, vec![1001, 1002]);
        assert_eq!(cluster.md_search("*=*488*").await, vec![1001]);
    }

    // ============================================================
    // ROUTING COVERAGE
    // ============================================================

    #[tokio::test]
    async fn test_every_written_partition_is_reachable() {
        // Whatever partition a triple lands on, the matching exact query's
        // destination set contains it.
        let dir = TempDir::new().unwrap();
        let cluster = cluster(&dir, true);
        insert_all(&cluster, &STAGE_TRIPLES).await;
        insert_all(&cluster, &FILE_TRIPLES).await;

        for (key, value, object_id) in STAGE_TRIPLES.iter().chain(FILE_TRIPLES.iter()) {
            let query = format!("{key}={value}");
            let results = cluster.md_search(&query).await;
            assert!(
                results.contains(object_id),
                "query {query} missed object {object_id}"
            );
        }
    }

    #[tokio::test]
    async fn test_writes_replicate_to_distinct_partitions() {
        let dir = TempDir::new().unwrap();
        let cluster = cluster(&dir, true);
        cluster.create_md_index("StageX", "100.00", 1001).await;

        let expected = cluster.router().replication_factor() + 1;
        let mut holders = 0;
        for engine in cluster.transport().engines() {
            if engine.can_handle("StageX=*").await {
                holders += 1;
            }
        }
        assert_eq!(holders, expected.min(NUM_PARTITIONS));
    }

    // ============================================================
    // DELETE SEMANTICS
    // ============================================================

    #[tokio::test]
    async fn test_delete_becomes_visible_after_recovery_cycle() {
        let dir = TempDir::new().unwrap();
        let cluster = cluster(&dir, true);
        insert_all(
            &cluster,
            &[("StageX", "100.00", 1001), ("StageX", "300.00", 1002)],
        )
        .await;

        cluster.delete_md_index("StageX", "100.00", 1001).await;
        // The trie is append-only: still visible.
        assert_eq!(cluster.md_search("StageX=*").await, vec![1001, 1002]);

        assert!(cluster.checkpoint_all().await);
        assert!(cluster.recover_all().await);
        // The rebuild from bookkeeping forgets the deleted triple.
        assert_eq!(cluster.md_search("StageX=*").await, vec![1002]);
    }

    // ============================================================
    // ADMIN AGGREGATES
    // ============================================================

    #[tokio::test]
    async fn test_checkpoint_recover_round_trip_via_orchestrator() {
        let dir = TempDir::new().unwrap();
        let cluster = cluster(&dir, true);
        insert_all(&cluster, &STAGE_TRIPLES).await;

        assert!(cluster.checkpoint_all().await);
        assert!(cluster.recover_all().await);
        assert_eq!(cluster.md_search("Stage*=*").await, vec![1001, 1002]);
    }

    #[tokio::test]
    async fn test_recover_without_checkpoints_reports_failure() {
        let dir = TempDir::new().unwrap();
        let cluster = cluster(&dir, true);
        assert!(!cluster.recover_all().await);
    }

    #[tokio::test]
    async fn test_shutdown_is_acknowledged_locally() {
        let dir = TempDir::new().unwrap();
        let cluster = cluster(&dir, true);
        assert!(cluster.shutdown_all().await);
    }

    // ============================================================
    // TRANSPORT CONTRACT
    // ============================================================

    #[tokio::test]
    async fn test_local_transport_rejects_unknown_partition() {
        let dir = TempDir::new().unwrap();
        let engines = vec![Arc::new(
            PartitionEngine::new(0, dir.path(), true).expect("engine"),
        )];
        let transport = LocalTransport::new(engines);
        assert!(transport.query(7, "*=*").await.is_err());
        assert!(transport.create_index(7, "k", "v", 1).await.is_err());
        assert!(transport.admin(7, AdminKind::Checkpoint).await.is_err());
    }

    #[tokio::test]
    async fn test_local_transport_query_applies_can_handle() {
        let dir = TempDir::new().unwrap();
        let engines = vec![Arc::new(
            PartitionEngine::new(0, dir.path(), true).expect("engine"),
        )];
        let transport = LocalTransport::new(engines);
        transport.create_index(0, "k", "v", 1).await.unwrap();

        assert_eq!(transport.query(0, "k=v").await.unwrap(), vec![1]);
        // A key this partition has never seen is declined, not executed.
        assert!(transport.query(0, "other=v").await.unwrap().is_empty());
    }

    // ============================================================
    // PROTOCOL DTOS
    // ============================================================

    #[test]
    fn test_create_request_serialization() {
        let req = CreateIndexRequest {
            key: "StageX".to_string(),
            value: "300.00".to_string(),
            object_id: 1002,
        };
        let json = serde_json::to_string(&req).expect("serialize");
        let restored: CreateIndexRequest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored.key, "StageX");
        assert_eq!(restored.value, "300.00");
        assert_eq!(restored.object_id, 1002);
    }

    #[test]
    fn test_query_response_serialization() {
        let resp = QueryResponse {
            ok: true,
            object_ids: vec![1001, 1002],
        };
        let json = serde_json::to_string(&resp).unwrap();
        let restored: QueryResponse = serde_json::from_str(&json).unwrap();
        assert!(restored.ok);
        assert_eq!(restored.object_ids, vec![1001, 1002]);
    }

    #[test]
    fn test_admin_request_serialization() {
        for kind in [AdminKind::Checkpoint, AdminKind::Recover, AdminKind::Shutdown] {
            let json = serde_json::to_string(&AdminRequest { kind }).unwrap();
            let restored: AdminRequest = serde_json::from_str(&json).unwrap();
            assert_eq!(restored.kind, kind);
        }
    }

    #[test]
    fn test_search_response_serialization() {
        let resp = SearchResponse {
            query: "Stage*=*".to_string(),
            count: 2,
            object_ids: vec![1001, 1002],
        };
        let json = serde_json::to_string(&resp).unwrap();
        let restored: SearchResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.count, 2);
        assert_eq!(restored.query, "Stage*=*");
    }
}
