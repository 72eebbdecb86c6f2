use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quorum_cache::cache::Cache;
use quorum_cache::config::ServerConfig;
use quorum_cache::server::{rpc_router, sidecar_router, AdmissionController, AppState};
use quorum_cache::tasks::spawn_sweeper;

/// How long in-flight handlers may drain after the shutdown signal.
const DRAIN_DEADLINE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quorum_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ServerConfig::from_env();
    let mut node_id: Option<String> = None;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--node-id" => {
                node_id = Some(args[i + 1].clone());
                i += 2;
            }
            "--rpc-port" => {
                config.rpc_port = args[i + 1].parse()?;
                i += 2;
            }
            "--http-port" => {
                config.http_port = args[i + 1].parse()?;
                i += 2;
            }
            "--cache-capacity" => {
                config.cache_capacity = args[i + 1].parse()?;
                i += 2;
            }
            "--max-concurrent" => {
                config.max_concurrent = args[i + 1].parse()?;
                i += 2;
            }
            "--cpu-threshold" => {
                config.cpu_threshold = args[i + 1].parse()?;
                i += 2;
            }
            "--cpu-window-secs" => {
                config.cpu_window = Duration::from_secs(args[i + 1].parse()?);
                i += 2;
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: {} [--node-id <id>] [--rpc-port <port>] [--http-port <port>] \
                     [--cache-capacity <n>] [--max-concurrent <n>] [--cpu-threshold <0..1>] \
                     [--cpu-window-secs <secs>]",
                    args[0]
                );
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    let node_id = node_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    info!(
        node_id,
        rpc_port = config.rpc_port,
        http_port = config.http_port,
        cache_capacity = config.cache_capacity,
        "starting cache node"
    );

    let cache = Arc::new(Cache::new(config.cache_capacity));
    let admission = Arc::new(AdmissionController::new(
        config.max_concurrent,
        config.cpu_threshold,
        config.cpu_window,
    ));

    let sampler = admission.spawn_sampler();
    let sweeper = spawn_sweeper(Arc::clone(&cache), config.sweep_interval);

    let state = AppState::new(cache, admission);

    let rpc_addr = SocketAddr::from(([0, 0, 0, 0], config.rpc_port));
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let rpc_listener = tokio::net::TcpListener::bind(rpc_addr).await?;
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    info!("RPC surface listening on {}", rpc_addr);
    info!("sidecar surface listening on {}", http_addr);

    // Both listeners share one shutdown channel so a single signal stops
    // accepting on each while in-flight handlers drain.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let rpc_server = tokio::spawn(serve(rpc_listener, rpc_router(state.clone()), shutdown_rx.clone()));
    let sidecar_server = tokio::spawn(serve(http_listener, sidecar_router(state), shutdown_rx));

    shutdown_signal().await;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let drain = async {
        rpc_server.await??;
        sidecar_server.await??;
        Ok::<(), anyhow::Error>(())
    };
    if tokio::time::timeout(DRAIN_DEADLINE, drain).await.is_err() {
        warn!("drain deadline exceeded, abandoning in-flight handlers");
    }

    sampler.abort();
    sweeper.abort();

    info!("node shutdown complete");
    Ok(())
}

async fn serve(
    listener: tokio::net::TcpListener,
    app: axum::Router,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
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
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
