use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::Duration;

use super::protocol::{
    AckResponse, AdminKind, AdminRequest, CreateIndexRequest, DeleteIndexRequest,
    ENDPOINT_INTERNAL_ADMIN, ENDPOINT_INTERNAL_CREATE, ENDPOINT_INTERNAL_DELETE,
    ENDPOINT_INTERNAL_QUERY, ErrorResponse, QueryRequest, QueryResponse,
};
use crate::partition::engine::PartitionEngine;

/// The abstract send/receive contract between the orchestrator and the
/// partitions. The orchestrator core speaks this trait only; whether the
/// partitions live in-process or behind HTTP is the implementation's
/// business.
pub trait IndexTransport {
    /// Deliver a create-index message to one partition.
    fn create_index(
        &self,
        partition: usize,
        key: &str,
        value: &str,
        object_id: i64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Deliver a delete-index message to one partition.
    fn delete_index(
        &self,
        partition: usize,
        key: &str,
        value: &str,
        object_id: i64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Evaluate a query on one partition. The partition applies its own
    /// can-handle check first; a declined query answers with no ids.
    fn query(&self, partition: usize, query: &str) -> impl Future<Output = Result<Vec<i64>>> + Send;

    /// Deliver an administrative message to one partition.
    fn admin(&self, partition: usize, kind: AdminKind) -> impl Future<Output = Result<()>> + Send;
}

/// Transport over partitions hosted in this process. Used by the end-to-end
/// tests and by embeddings that run the whole cluster in one binary.
#[derive(Clone)]
pub struct LocalTransport {
    engines: Vec<Arc<PartitionEngine>>,
}

impl LocalTransport {
    pub fn new(engines: Vec<Arc<PartitionEngine>>) -> Self {
        Self { engines }
    }

    pub fn engines(&self) -> &[Arc<PartitionEngine>] {
        &self.engines
    }

    fn engine(&self, partition: usize) -> Result<&Arc<PartitionEngine>> {
        self.engines
            .get(partition)
            .ok_or_else(|| anyhow!("no local partition {}", partition))
    }
}

impl IndexTransport for LocalTransport {
    async fn create_index(
        &self,
        partition: usize,
        key: &str,
        value: &str,
        object_id: i64,
    ) -> Result<()> {
        self.engine(partition)?.insert(key, value, object_id).await;
        Ok(())
    }

    async fn delete_index(
        &self,
        partition: usize,
        key: &str,
        value: &str,
        object_id: i64,
    ) -> Result<()> {
        self.engine(partition)?.delete(key, value, object_id).await;
        Ok(())
    }

    async fn query(&self, partition: usize, query: &str) -> Result<Vec<i64>> {
        let engine = self.engine(partition)?;
        if !engine.can_handle(query).await {
            return Ok(Vec::new());
        }
        Ok(engine.execute(query).await)
    }

    async fn admin(&self, partition: usize, kind: AdminKind) -> Result<()> {
        let engine = self.engine(partition)?;
        match kind {
            AdminKind::Checkpoint => engine.checkpoint().await,
            AdminKind::Recover => engine.recover().await,
            AdminKind::Shutdown => {
                tracing::info!("shutdown requested for local partition {}", partition);
                Ok(())
            }
        }
    }
}

const REQUEST_TIMEOUT: Duration = Duration::from_millis(500);
const REQUEST_ATTEMPTS: usize = 3;

/// Transport over one HTTP peer per partition. Requests are retried with
/// jittered exponential backoff; retrying a create is safe because inserts
/// are idempotent.
#[derive(Clone)]
pub struct HttpTransport {
    peers: Vec<String>,
    client: reqwest::Client,
}

impl HttpTransport {
    /// `peers[partition]` is the base URL (`http://host:port`) of that
    /// partition's node.
    pub fn new(peers: Vec<String>) -> Self {
        Self {
            peers,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, partition: usize, endpoint: &str) -> Result<String> {
        let base = self
            .peers
            .get(partition)
            .ok_or_else(|| anyhow!("no peer configured for partition {}", partition))?;
        Ok(format!("{base}{endpoint}"))
    }

    async fn post_with_retry<T: serde::Serialize>(
        &self,
        url: String,
        payload: &T,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..REQUEST_ATTEMPTS {
            let response = self
                .client
                .post(url.clone())
                .json(payload)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == REQUEST_ATTEMPTS {
                        return Err(anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow!("retry attempts exhausted"))
    }

    async fn expect_ack(response: reqwest::Response) -> Result<()> {
        if response.status().is_success() {
            let ack: AckResponse = response.json().await?;
            if ack.ok {
                return Ok(());
            }
            return Err(anyhow!("partition declined the operation"));
        }
        let status = response.status();
        match response.json::<ErrorResponse>().await {
            Ok(err) => Err(anyhow!("partition error: {}", err.message)),
            Err(_) => Err(anyhow!("request failed with status {}", status)),
        }
    }
}

impl IndexTransport for HttpTransport {
    async fn create_index(
        &self,
        partition: usize,
        key: &str,
        value: &str,
        object_id: i64,
    ) -> Result<()> {
        let payload = CreateIndexRequest {
            key: key.to_string(),
            value: value.to_string(),
            object_id,
        };
        let url = self.url(partition, ENDPOINT_INTERNAL_CREATE)?;
        let response = self.post_with_retry(url, &payload).await?;
        Self::expect_ack(response).await
    }

    async fn delete_index(
        &self,
        partition: usize,
        key: &str,
        value: &str,
        object_id: i64,
    ) -> Result<()> {
        let payload = DeleteIndexRequest {
            key: key.to_string(),
            value: value.to_string(),
            object_id,
        };
        let url = self.url(partition, ENDPOINT_INTERNAL_DELETE)?;
        let response = self.post_with_retry(url, &payload).await?;
        Self::expect_ack(response).await
    }

    async fn query(&self, partition: usize, query: &str) -> Result<Vec<i64>> {
        let payload = QueryRequest {
            query: query.to_string(),
        };
        let url = self.url(partition, ENDPOINT_INTERNAL_QUERY)?;
        let response = self.post_with_retry(url, &payload).await?;
        if !response.status().is_success() {
            return Err(anyhow!("query failed with status {}", response.status()));
        }
        let reply: QueryResponse = response.json().await?;
        Ok(reply.object_ids)
    }

    async fn admin(&self, partition: usize, kind: AdminKind) -> Result<()> {
        let payload = AdminRequest { kind };
        let url = self.url(partition, ENDPOINT_INTERNAL_ADMIN)?;
        let response = self.post_with_retry(url, &payload).await?;
        Self::expect_ack(response).await
    }
}
