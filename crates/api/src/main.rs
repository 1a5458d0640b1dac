use std::net::SocketAddr;

use licmon_controller::ArubaClient;
use licmon_poller::{ConfigStore, StartOutcome};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use licmon_api::config::ServerConfig;
use licmon_api::router::build_app_router;
use licmon_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "licmon_api=info,licmon_poller=info,licmon_events=info,licmon_controller=info,tower_http=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- TLS ---
    // A provider may already be installed when several are compiled in.
    let _ = rustls::crypto::ring::default_provider().install_default();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        data_dir = %config.data_dir.display(),
        "Loaded server configuration"
    );

    let monitor_config = ConfigStore::new(&config.data_dir).load().await;

    // --- App state ---
    let state = AppState::new(config.clone(), monitor_config.clone(), ArubaClient::default());

    // --- Poller ---
    if monitor_config.has_controller() {
        match state.scheduler.start(monitor_config).await {
            Ok(StartOutcome::Started) => tracing::info!("Poller started"),
            Ok(StartOutcome::LockBusy) => {
                tracing::info!("Another instance is polling, this one only serves the API")
            }
            Err(e) => tracing::error!(error = %e, "Failed to start poller"),
        }
    } else {
        tracing::info!("No controller configured, poller idle until configuration is applied");
    }

    let scheduler = state.scheduler.clone();
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, stopping poller");
    scheduler.stop().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
