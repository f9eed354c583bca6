use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use reportforge_common::Config;
use reportforge_email::{EmailClient, EmailOptions};
use reportforge_engine::ReportProcessor;
use reportforge_queue::{spawn_scheduler, JobQueue, QueueOptions, Worker};
use reportforge_registry::Registry;
use reportforge_render::RenderClient;
use tableau_client::TableauClient;

mod rest;

const QUEUE_NAME: &str = "report-export";

/// Within one job the remote view fetch is the only parallel fan-out.
const FETCH_CONCURRENCY: usize = 5;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AppState {
    pub queue: Arc<JobQueue>,
    pub registry: Arc<Registry>,
    pub worker_running: Arc<AtomicBool>,
    pub config: Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config = Config::from_env();
    config.log_redacted();

    let registry = Arc::new(Registry::load(Path::new(&config.manifest_dir))?);

    let tableau = Arc::new(TableauClient::new(
        &config.remote_base_url,
        &config.pat_name,
        &config.pat_secret,
        config.is_production(),
    ));
    let mailer = Arc::new(EmailClient::new(
        &config.notification_api_url,
        &config.api_gateway_token,
        EmailOptions {
            from: config.email_from.clone(),
            team_tag: config.email_team_tag.clone(),
            product_tag: config.email_product_tag.clone(),
        },
    ));
    let renderer = Arc::new(RenderClient::new(&config.renderer_base_url));

    let queue_options = QueueOptions {
        max_attempts: config.queue_attempts,
        ..Default::default()
    };
    let queue = Arc::new(JobQueue::connect(&config.redis_url(), QUEUE_NAME, queue_options).await?);

    let processor = Arc::new(ReportProcessor::new(
        registry.clone(),
        tableau,
        renderer,
        mailer,
        FETCH_CONCURRENCY,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = Worker::new(queue.clone(), processor, config.queue_concurrency);
    let worker_running = worker.running_flag();
    let worker_handle = worker.spawn(shutdown_rx.clone(), DRAIN_TIMEOUT);
    let scheduler_handle = spawn_scheduler(queue.clone(), shutdown_rx);

    let state = Arc::new(AppState {
        queue,
        registry,
        worker_running,
        config: config.clone(),
    });

    let app = build_router(state).layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("0.0.0.0:{}", config.port);
    info!("reportforge API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // HTTP intake has stopped; drain the worker before exiting.
    info!("HTTP listener stopped, draining worker");
    shutdown_tx.send(true).ok();
    let drained = worker_handle.await.unwrap_or(false);
    scheduler_handle.await.ok();

    if !drained {
        error!("Worker drain exceeded {DRAIN_TIMEOUT:?}, exiting dirty");
        std::process::exit(1);
    }
    info!("Shutdown complete");
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/jobs", post(rest::jobs::submit_job))
        .route("/api/v1/jobs/queue/stats", get(rest::jobs::queue_stats))
        .route("/api/v1/jobs/queue/cleanup", post(rest::jobs::queue_cleanup))
        .route("/api/v1/jobs/{job_id}", get(rest::jobs::get_job))
        .route("/api/v1/jobs/{job_id}/retry", post(rest::jobs::retry_job))
        .route("/health", get(rest::health::health))
        .route("/health/live", get(rest::health::live))
        .route("/health/ready", get(rest::health::ready))
        .with_state(state)
}

/// Resolve on SIGTERM or SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
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
