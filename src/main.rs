use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use album_dashboard::app_state::AppState;
use album_dashboard::config::AppConfig;
use album_dashboard::db::{self, PgQueueSource};
use album_dashboard::routes;
use album_dashboard::routes::metrics::MetricsState;
use album_dashboard::services::{
    ai_client::{AiServiceClient, TagSyncService},
    batch::{BatchCursorController, BatchQueuer},
    change_feed::{ChangeFeed, RedisChangeFeed},
    reconciler::Reconciler,
    source::QueueSource,
    tag_sync::TagSyncSession,
};

fn describe_metrics() {
    metrics::describe_counter!(
        "queue_push_events_total",
        "Change events received from the push channel"
    );
    metrics::describe_counter!("queue_poll_ticks_total", "Successful full-snapshot polls");
    metrics::describe_counter!("queue_poll_failures_total", "Polls that failed and were skipped");
    metrics::describe_gauge!("queue_jobs", "Jobs per queue and status in the reconciled view");
    metrics::describe_counter!("batch_submissions_total", "Batches accepted by the AI service");
    metrics::describe_counter!("batch_failures_total", "Batch submissions that failed");
    metrics::describe_counter!(
        "tag_matches_applied_total",
        "Face tag matches applied through tag sync"
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Initializing album-dashboard server");

    let prometheus_handle = Arc::new(PrometheusBuilder::new().install_recorder()?);
    describe_metrics();

    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url).await?;

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool).await?;

    tracing::info!("Connecting to Redis change feed");
    let feed = Arc::new(RedisChangeFeed::new(&config.redis_url)?);

    tracing::info!(url = %config.ai_service_url, "Initializing AI service client");
    let ai_client = Arc::new(AiServiceClient::new(
        &config.ai_service_url,
        config.ai_service_token.clone(),
    )?);

    let source: Arc<dyn QueueSource> = Arc::new(PgQueueSource::new(db_pool.clone()));
    let change_feed: Arc<dyn ChangeFeed> = feed.clone();
    let reconciler = Reconciler::spawn(config.reconciler(), Arc::clone(&source), Some(change_feed));

    let queuer: Arc<dyn BatchQueuer> = ai_client.clone();
    let tag_service: Arc<dyn TagSyncService> = ai_client;

    let state = AppState::new(
        db_pool,
        feed,
        source,
        reconciler.clone(),
        BatchCursorController::new(queuer, config.batch_size),
        TagSyncSession::new(tag_service),
        config.iou_threshold,
    );

    let metrics_state = MetricsState {
        handle: prometheus_handle,
        reconciler,
    };

    let app = Router::new()
        .merge(routes::api_router(state))
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(metrics_state),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1 MB limit

    tracing::info!("Starting album-dashboard on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
