mod app;
mod config;
mod routes;
mod state;

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::state::{AppState, TopologyArtifact};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let topology_path = config::topology_path();
    let json = match tokio::fs::read(&topology_path).await {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, path = %topology_path.display(), "failed to read topology artifact");
            return;
        }
    };
    let topology = TopologyArtifact::from_bytes(Bytes::from(json));
    if !topology.report.problems.is_empty() {
        tracing::warn!(problems = ?topology.report.problems, "topology has problems");
    }

    let data_dir = config::data_dir();
    let static_dir = config::static_dir();
    if !static_dir.is_dir() {
        tracing::warn!(path = %static_dir.display(), "client bundle directory is missing; only data and api routes will resolve");
    }
    let state = AppState::new(topology, data_dir, static_dir);
    let app = app::build_app(state);

    let Some(listener) = bind_first_free().await else {
        return;
    };
    match listener.local_addr() {
        Ok(addr) => tracing::info!("Border painter listening on http://{addr}"),
        Err(e) => tracing::warn!(error = %e, "listener has no local address"),
    }

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

/// Walk the configured port range and take the first port that binds.
async fn bind_first_free() -> Option<TcpListener> {
    let ip = config::bind_address();
    for port in config::port_candidates() {
        let addr = SocketAddr::new(ip, port);
        match TcpListener::bind(addr).await {
            Ok(listener) => return Some(listener),
            Err(e) => tracing::debug!(error = %e, %addr, "port unavailable"),
        }
    }
    let ports = config::port_candidates();
    tracing::error!(
        %ip,
        first = ports.start(),
        last = ports.end(),
        "no free port in range"
    );
    None
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
