#[cfg(test)]
mod tests {
    use crate::partition::engine::PartitionEngine;
    use tempfile::TempDir;

    fn engine(suffix_mode: bool) -> (TempDir, PartitionEngine) {
        let dir = TempDir::new().expect("tempdir");
        let engine = PartitionEngine::new(0, dir.path(), suffix_mode).expect("engine");
        (dir, engine)
    }

    // ============================================================
    // INSERT / EXECUTE
    // ============================================================

    #[tokio::test]
    async fn test_exact_roundtrip() {
        let (_dir, engine) = engine(true);
        engine.insert("StageX", "100.00", 1001).await;
        engine.insert("StageX", "300.00", 1002).await;

        assert_eq!(engine.execute("StageX=300.00").await, vec![1002]);
        assert_eq!(engine.execute("StageX=*").await, vec![1001, 1002]);
        assert!(engine.execute("StageY=100.00").await.is_empty());
    }

    #[tokio::test]
    async fn test_insert_idempotent() {
        let (_dir, engine) = engine(true);
        engine.insert("k", "v", 1).await;
        engine.insert("k", "v", 1).await;

        assert_eq!(engine.execute("k=v").await, vec![1]);
        assert_eq!(engine.object_count().await, 1);
        assert_eq!(engine.indexed_key_count().await, 1);
    }

    #[tokio::test]
    async fn test_combined_shapes() {
        let (_dir, engine) = engine(true);
        for (k, v, oid) in [
            ("StageX", "100.00", 1001),
            ("StageY", "200.00", 1001),
            ("StageZ", "50.00", 1001),
            ("StageX", "300.00", 1002),
            ("StageY", "400.00", 1002),
            ("StageZ", "75.00", 1002),
        ] {
            engine.insert(k, v, oid).await;
        }

        assert_eq!(engine.execute("Stage*=*").await, vec![1001, 1002]);
        assert_eq!(engine.execute("Stage*=*00").await, vec![1001, 1002]);
        assert_eq!(engine.execute("Stage*=1*").await, vec![1001]);
        assert_eq!(engine.execute("*X=300.00").await, vec![1002]);
        assert_eq!(engine.execute("*tage*=50.00").await, vec![1001]);
        assert_eq!(engine.execute("*=*").await, vec![1001, 1002]);
    }

    #[tokio::test]
    async fn test_query_without_equals_means_any_value() {
        let (_dir, engine) = engine(true);
        engine.insert("microscope", "LLSM-1", 1001).await;
        assert_eq!(engine.execute("microscope").await, vec![1001]);
        assert_eq!(engine.execute("micro*").await, vec![1001]);
    }

    #[tokio::test]
    async fn test_empty_value_round_trip() {
        let (_dir, engine) = engine(false);
        engine.insert("flag", "", 42).await;
        assert_eq!(engine.execute("flag=").await, vec![42]);
    }

    #[tokio::test]
    async fn test_suffix_queries_without_suffix_mode_degrade_but_answer() {
        let (_dir, engine) = engine(false);
        engine.insert("FILE_PATH", "/data/488nm.tif", 1001).await;
        assert_eq!(engine.execute("*PATH=*tif").await, vec![1001]);
        assert_eq!(engine.execute("*ILE_*=*").await, vec![1001]);
    }

    // ============================================================
    // CAN_HANDLE
    // ============================================================

    #[tokio::test]
    async fn test_can_handle_shapes() {
        let (_dir, engine) = engine(true);
        engine.insert("FILE_PATH", "/data/488nm.tif", 1001).await;

        assert!(engine.can_handle("FILE_PATH=*").await);
        assert!(!engine.can_handle("StageX=*").await);
        assert!(engine.can_handle("FILE*=*").await);
        assert!(!engine.can_handle("Stage*=*").await);
        assert!(engine.can_handle("*PATH=*").await);
        assert!(!engine.can_handle("*X=*").await);
        assert!(engine.can_handle("*ILE*=*").await);
        assert!(engine.can_handle("*=*").await);
    }

    #[tokio::test]
    async fn test_can_handle_on_empty_partition() {
        let (_dir, engine) = engine(true);
        assert!(engine.can_handle("*=*").await);
        assert!(!engine.can_handle("k=*").await);
        assert!(!engine.can_handle("k*=*").await);
    }

    // ============================================================
    // DELETE
    // ============================================================

    #[tokio::test]
    async fn test_delete_updates_bookkeeping_not_trie() {
        let (_dir, engine) = engine(true);
        engine.insert("k", "v", 1).await;
        engine.delete("k", "v", 1).await;

        // The trie is append-only: the triple still matches until the index
        // is rebuilt from the bookkeeping.
        assert_eq!(engine.execute("k=v").await, vec![1]);
        assert_eq!(engine.object_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_keeps_remaining_entries() {
        let (_dir, engine) = engine(true);
        engine.insert("k", "v1", 1).await;
        engine.insert("k", "v2", 1).await;
        engine.delete("k", "v1", 1).await;
        assert_eq!(engine.object_count().await, 1);
    }

    // ============================================================
    // CHECKPOINT / RECOVER
    // ============================================================

    #[tokio::test]
    async fn test_checkpoint_recover_round_trip() {
        let (_dir, engine) = engine(true);
        engine.insert("StageX", "100.00", 1001).await;
        engine.insert("StageX", "300.00", 1002).await;
        engine.insert("FILE_PATH", "/data/488nm.tif", 1001).await;

        engine.checkpoint().await.expect("checkpoint");
        assert!(engine.has_checkpoint());
        engine.recover().await.expect("recover");

        assert_eq!(engine.execute("StageX=300.00").await, vec![1002]);
        assert_eq!(engine.execute("*PATH=*tif").await, vec![1001]);
        assert_eq!(engine.object_count().await, 2);
    }

    #[tokio::test]
    async fn test_recover_drops_deleted_triples() {
        let (_dir, engine) = engine(true);
        engine.insert("k", "v", 1).await;
        engine.insert("k", "w", 2).await;
        engine.delete("k", "v", 1).await;

        engine.checkpoint().await.expect("checkpoint");
        engine.recover().await.expect("recover");

        // Rebuilding from the bookkeeping finally forgets the deleted triple.
        assert_eq!(engine.execute("k=v").await, Vec::<i64>::new());
        assert_eq!(engine.execute("k=*").await, vec![2]);
    }

    #[tokio::test]
    async fn test_recover_without_checkpoint_fails() {
        let (_dir, engine) = engine(true);
        assert!(!engine.has_checkpoint());
        assert!(engine.recover().await.is_err());
    }

    #[tokio::test]
    async fn test_recover_refuses_foreign_server_id() {
        let dir = TempDir::new().expect("tempdir");
        let original = PartitionEngine::new(3, dir.path(), true).expect("engine");
        original.insert("k", "v", 1).await;
        original.checkpoint().await.expect("checkpoint");

        // Same directory, different server id: server_3/index.dat is not ours.
        std::fs::rename(
            dir.path().join("server_3"),
            dir.path().join("server_5"),
        )
        .expect("rename");
        let imposter = PartitionEngine::new(5, dir.path(), true).expect("engine");
        assert!(imposter.recover().await.is_err());
    }

    #[tokio::test]
    async fn test_checkpoint_preserves_empty_values() {
        let (_dir, engine) = engine(false);
        engine.insert("flag", "", 9).await;
        engine.checkpoint().await.expect("checkpoint");
        engine.recover().await.expect("recover");
        assert_eq!(engine.execute("flag=").await, vec![9]);
    }
}
