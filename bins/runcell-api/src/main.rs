mod error;
mod handlers;
mod metrics;
mod routes;

use runcell_common::Config;
use runcell_engine::Executor;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<Executor>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(config.json_logs);

    info!("runcell API booting...");

    // Initialize metrics
    metrics::init_metrics();
    info!("Metrics registry initialized");

    let executor = Executor::from_config(&config);
    let enabled_langs: Vec<String> = executor
        .registry()
        .iter()
        .map(|spec| spec.language.to_string())
        .collect();
    info!(
        scratch_dir = %config.scratch_dir.display(),
        run_timeout_ms = config.run_timeout_ms,
        compile_timeout_ms = config.compile_timeout_ms,
        max_output_bytes = config.max_output_bytes,
        max_concurrent = config.max_concurrent_executions,
        "Loaded execution configuration: enabled languages = {:?}",
        enabled_langs
    );

    let state = Arc::new(AppState {
        executor: Arc::new(executor),
    });

    // Build router
    let app = routes::routes().with_state(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("HTTP server listening on {}", addr);
    info!("Ready to accept submissions");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal, draining in-flight executions...");
}
