use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sensebox_temperature_service::{
    api::{self, AppState},
    cache::{KeyValueStore, MemoryStore, RedisStore, TemperatureCache},
    config::{CacheBackend, Config},
    health::{AvailabilitySampler, ReadinessEvaluator},
    metrics::Metrics,
    sensebox::OpenSenseMapClient,
    snapshot::SnapshotService,
    storage::{S3Client, SnapshotWriter},
    temperature::TemperatureService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env; env vars may also be set externally
    let _ = dotenvy::dotenv();

    // Initialise tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load config
    let config = Config::from_env()?;

    // Collaborators
    let source = Arc::new(OpenSenseMapClient::new(&config));
    let kv: Arc<dyn KeyValueStore> = match config.cache_backend {
        CacheBackend::Redis => {
            Arc::new(RedisStore::new(&config.redis_url()).context("invalid Redis address")?)
        }
        CacheBackend::Memory => {
            info!("Using in-process cache");
            Arc::new(MemoryStore::new())
        }
    };
    let cache = TemperatureCache::new(kv, config.cache_expiration);
    let metrics = Metrics::new().context("failed to register metrics")?;
    let s3 = S3Client::new(&config)?;
    let snapshots = SnapshotWriter::new(Arc::new(s3), config.minio_bucket.clone());

    // The only startup check allowed to abort the process.
    snapshots
        .ensure_bucket()
        .await
        .with_context(|| format!("failed to ensure bucket {:?}", config.minio_bucket))?;
    info!(bucket = %config.minio_bucket, "Object store ready");

    let temperature = TemperatureService::new(source.clone(), cache.clone(), metrics.clone());
    let readiness = ReadinessEvaluator::new(
        cache.clone(),
        AvailabilitySampler::new(source, config.probe_concurrency),
    );

    // Spawn snapshot loop
    let shutdown = CancellationToken::new();
    let snapshot_task = SnapshotService::new(
        temperature.clone(),
        cache,
        snapshots.clone(),
        config.snapshot_interval,
    )
    .spawn(shutdown.clone());

    // Start HTTP server
    let state = AppState { temperature, readiness, snapshots, metrics };
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    let served = axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Stop the snapshot loop whether the server exited cleanly or not.
    shutdown.cancel();
    snapshot_task.await.context("snapshot task panicked")?;
    served.context("HTTP server failed")?;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
