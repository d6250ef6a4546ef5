use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use fetchpack_daemon::api::{self, AppState};
use fetchpack_daemon::config::DaemonConfig;
use fetchpack_daemon::service::TaskManager;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(
    name = "fetchpack-daemon",
    version,
    about = "Batch URL download-and-archive daemon"
)]
struct Cli {
    /// Where the HTTP API will listen, e.g. 127.0.0.1:8080
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// How many tasks may be live (created but not yet finished) at once.
    #[arg(long, default_value_t = 3)]
    max_active_tasks: usize,

    /// How many files a task collects before its pipeline starts.
    #[arg(long, default_value_t = 3)]
    max_files_per_task: usize,

    /// Upper bound on one task's whole processing run, in seconds.
    #[arg(long, default_value_t = 300)]
    processing_timeout_secs: u64,

    /// Upper bound on one task's download batch, in seconds.
    #[arg(long, default_value_t = 30)]
    download_timeout_secs: u64,

    /// Allowed file extensions for attached URLs.
    #[arg(
        long = "allowed-ext",
        value_delimiter = ',',
        default_values_t = vec![String::from(".pdf"), String::from(".jpeg")]
    )]
    allowed_exts: Vec<String>,

    /// Where downloads are staged before archiving.
    #[arg(long, default_value = ".fetchpack/tmp")]
    temp_dir: PathBuf,

    /// Where finished archives are stored.
    #[arg(long, default_value = ".fetchpack/archives")]
    archive_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    std::fs::create_dir_all(&cli.temp_dir)?;
    std::fs::create_dir_all(&cli.archive_dir)?;

    let config = DaemonConfig {
        max_active_tasks: cli.max_active_tasks,
        max_files_per_task: cli.max_files_per_task,
        processing_timeout: Duration::from_secs(cli.processing_timeout_secs),
        download_timeout: Duration::from_secs(cli.download_timeout_secs),
        allowed_extensions: cli.allowed_exts,
        temp_dir: cli.temp_dir,
        archive_dir: cli.archive_dir,
    };
    info!("starting daemon with config: {:?}", config);

    let state = AppState::new(Arc::new(TaskManager::new(config)));

    let app = Router::new()
        .route("/healthz", get(api::healthz))
        .route("/v1/tasks", post(api::create_task))
        .route("/v1/tasks/{id}/files", post(api::add_file))
        .route("/v1/tasks/{id}", get(api::task_status))
        .route("/v1/tasks/{id}/archive", get(api::download_archive))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = cli.listen.parse()?;
    info!("listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("shutdown requested");
}
