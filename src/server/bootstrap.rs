use crate::config::ReplicaConfig;
use crate::server::{self, ReplicaState};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// CLI arguments forwarded from `main()`.
pub struct BootstrapArgs {
    pub config_path: std::path::PathBuf,
    pub listen: Option<String>,
    pub admin_listen: Option<String>,
    pub peers: Option<String>,
    pub verbose: bool,
}

/// Replica lifecycle: init → wire → serve → shutdown (§4.5).
///
/// 1. Load config (file → env → CLI overrides), falling back to defaults.
/// 2. Initialize structured logging.
/// 3. Construct the `AccessStore` and `GossipUpdater`, wiring the updater's
///    local-admission channel into the store.
/// 4. Spawn the broadcaster, the local-admission consumer, and the admin
///    server as background tasks.
/// 5. Run the admit/gossip listener on the main task.
/// 6. On SIGINT/SIGTERM: stop accepting new connections, signal background
///    tasks to exit, drain in-flight requests, then exit.
pub async fn run(args: BootstrapArgs) -> Result<()> {
    let mut config = ReplicaConfig::load(&args.config_path)?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(admin_listen) = args.admin_listen {
        config.admin_listen = admin_listen;
    }
    if let Some(peers) = args.peers {
        config.peers = crate::config::split_peers(&peers);
    }
    if args.verbose {
        config.verbose = true;
    }
    config.validate()?;

    init_tracing(config.verbose);

    let (state, submit_rx) = ReplicaState::new(config);
    tracing::info!(
        "server: replica configured, listen={}, admin_listen={}, window_secs={}, threshold={}, peers={}",
        state.config.listen,
        state.config.admin_listen,
        state.config.window_secs,
        state.config.threshold,
        state.config.peers.len(),
    );

    let shutdown = Arc::new(Notify::new());

    let consumer_handle = tokio::spawn({
        let updater = state.updater.clone();
        let shutdown = shutdown.clone();
        async move { updater.run_consumer(submit_rx, shutdown).await }
    });

    let broadcaster_handle = tokio::spawn({
        let updater = state.updater.clone();
        let interval = state.config.broadcast_interval();
        let shutdown = shutdown.clone();
        async move { updater.run_broadcaster(interval, shutdown).await }
    });

    let admin_handle = tokio::spawn({
        let state = state.clone();
        let admin_listen = state.config.admin_listen.clone();
        async move {
            if let Err(e) = server::run_admin_server(&admin_listen, state).await {
                tracing::error!("server: admin failed, error={}", e);
            }
        }
    });

    tracing::info!("server: starting replica, listen={}", state.config.listen);

    let request_handle = tokio::spawn({
        let listen = state.config.listen.clone();
        let state = state.clone();
        let shutdown = shutdown.clone();
        async move { server::run_request_server(&listen, state, shutdown).await }
    });

    wait_for_shutdown(&shutdown).await;

    if let Err(e) = request_handle.await {
        tracing::error!("server: request task error: {}", e);
    }
    consumer_handle.abort();
    broadcaster_handle.abort();
    admin_handle.abort();

    tracing::info!("server: shutdown complete");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };

    let (non_blocking, _guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
        .buffered_lines_limit(128_000)
        .lossy(true)
        .finish(std::io::stdout());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .json(),
        )
        .init();

    std::mem::forget(_guard);
}

async fn wait_for_shutdown(shutdown: &Arc<Notify>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("server: received SIGINT, shutting down"),
        _ = terminate => tracing::info!("server: received SIGTERM, shutting down"),
    }

    shutdown.notify_waiters();
}
