use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use idioms_cluster::cluster::handlers::{
    handle_admin_checkpoint, handle_admin_recover, handle_admin_shutdown, handle_internal_admin,
    handle_internal_create, handle_internal_delete, handle_internal_query, handle_md_create,
    handle_md_delete, handle_md_search, handle_routes, handle_stats,
};
use idioms_cluster::cluster::orchestrator::Orchestrator;
use idioms_cluster::cluster::protocol::{
    ENDPOINT_ADMIN_CHECKPOINT, ENDPOINT_ADMIN_RECOVER, ENDPOINT_ADMIN_SHUTDOWN,
    ENDPOINT_INTERNAL_ADMIN, ENDPOINT_INTERNAL_CREATE, ENDPOINT_INTERNAL_DELETE,
    ENDPOINT_INTERNAL_QUERY, ENDPOINT_MD_CREATE, ENDPOINT_MD_DELETE, ENDPOINT_MD_SEARCH,
};
use idioms_cluster::cluster::transport::HttpTransport;
use idioms_cluster::partition::engine::PartitionEngine;
use idioms_cluster::routing::dart::{DEFAULT_REPLICATION_RATIO, DartRouter};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Notify;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} --server-id <n> --bind <addr:port> --peer <url>... [--data-dir <path>] [--suffix-mode]",
            args[0]
        );
        eprintln!("One --peer per partition, in partition-id order (this node included).");
        eprintln!(
            "Example: {} --server-id 0 --bind 127.0.0.1:7000 \\",
            args[0]
        );
        eprintln!("    --peer http://127.0.0.1:7000 --peer http://127.0.0.1:7001 --suffix-mode");
        std::process::exit(1);
    }

    let mut server_id: Option<usize> = None;
    let mut bind_addr: Option<SocketAddr> = None;
    let mut peers: Vec<String> = vec![];
    let mut data_dir = "./idioms_data".to_string();
    let mut suffix_mode = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--server-id" => {
                server_id = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--bind" => {
                bind_addr = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--peer" => {
                peers.push(args[i + 1].trim_end_matches('/').to_string());
                i += 2;
            }
            "--data-dir" => {
                data_dir = args[i + 1].clone();
                i += 2;
            }
            "--suffix-mode" => {
                suffix_mode = true;
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    let server_id = server_id.expect("--server-id is required");
    let bind_addr = bind_addr.expect("--bind is required");
    if peers.is_empty() {
        anyhow::bail!("at least one --peer is required (one per partition)");
    }
    if server_id >= peers.len() {
        anyhow::bail!(
            "--server-id {} is out of range for {} peers",
            server_id,
            peers.len()
        );
    }

    tracing::info!(
        "Starting partition node {} of {} on {} (suffix-mode: {})",
        server_id,
        peers.len(),
        bind_addr,
        suffix_mode
    );

    // 1. Partition engine:
    let engine = Arc::new(PartitionEngine::new(server_id, &data_dir, suffix_mode)?);
    if engine.has_checkpoint() {
        match engine.recover().await {
            Ok(()) => tracing::info!("recovered index from checkpoint"),
            Err(e) => tracing::warn!("checkpoint present but recovery failed: {}", e),
        }
    }

    // 2. Router + orchestrator:
    let replication_ratio = std::env::var("REPLICATION_RATIO")
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .unwrap_or(DEFAULT_REPLICATION_RATIO);
    let router = DartRouter::with_replication_ratio(peers.len(), replication_ratio);
    let orchestrator = Arc::new(Orchestrator::new(router, HttpTransport::new(peers)));

    // 3. HTTP router:
    let max_body_bytes = std::env::var("MAX_BODY_BYTES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(2 * 1024 * 1024);

    let shutdown = Arc::new(Notify::new());

    let app = Router::new()
        .route("/health/routes", get(handle_routes))
        .route("/health/stats", get(handle_stats))
        // Internal partition API
        .route(ENDPOINT_INTERNAL_CREATE, post(handle_internal_create))
        .route(ENDPOINT_INTERNAL_DELETE, post(handle_internal_delete))
        .route(ENDPOINT_INTERNAL_QUERY, post(handle_internal_query))
        .route(ENDPOINT_INTERNAL_ADMIN, post(handle_internal_admin))
        // Public client API
        .route(ENDPOINT_MD_CREATE, post(handle_md_create))
        .route(ENDPOINT_MD_DELETE, post(handle_md_delete))
        .route(ENDPOINT_MD_SEARCH, get(handle_md_search))
        .route(ENDPOINT_ADMIN_CHECKPOINT, post(handle_admin_checkpoint))
        .route(ENDPOINT_ADMIN_RECOVER, post(handle_admin_recover))
        .route(ENDPOINT_ADMIN_SHUTDOWN, post(handle_admin_shutdown))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(Extension(engine.clone()))
        .layer(Extension(orchestrator.clone()))
        .layer(Extension(shutdown.clone()));

    // 4. Periodic checkpoint loop:
    let checkpoint_interval = std::env::var("CHECKPOINT_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(300);
    let checkpoint_engine = engine.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(checkpoint_interval));
        interval.tick().await; // the first tick fires immediately
        loop {
            interval.tick().await;
            if let Err(e) = checkpoint_engine.checkpoint().await {
                tracing::warn!("periodic checkpoint failed: {}", e);
            }
        }
    });

    // 5. Serve until Ctrl+C or an admin shutdown message:
    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown.notified() => {
                    tracing::info!("shutdown message received");
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received");
                }
            }
        })
        .await?;

    // Final checkpoint so a clean shutdown loses nothing since the last tick.
    if let Err(e) = engine.checkpoint().await {
        tracing::warn!("final checkpoint failed: {}", e);
    }

    Ok(())
}
