// Framework bootstrap for the simulation server runtime.

use crate::domain::EngineTuning;
use crate::frameworks::config;
use crate::frameworks::engine::PointMassEngine;
use crate::interface_adapters::protocol::encode_snapshot;
use crate::interface_adapters::routes::app;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{SessionHandle, SessionSettings};

use std::io::Result;
use std::net::SocketAddr;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let tuning = config::engine_tuning().map_err(|e| {
        tracing::error!(error = %e, "invalid engine tuning");
        std::io::Error::other(e.to_string())
    })?;
    let state = build_state(tuning);
    let session = state.session.clone();

    let app = app(state);
    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(session))
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "server error");
        })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::new(config::http_host(), config::http_port());

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state(tuning: EngineTuning) -> AppState {
    tracing::debug!(
        timestep = tuning.timestep,
        substeps = tuning.substeps,
        ground_enabled = tuning.ground_enabled,
        "engine tuning loaded"
    );

    // One session owns the engine; every connection talks to it through the handle.
    let session = SessionHandle::spawn(
        PointMassEngine::new(tuning),
        SessionSettings {
            command_capacity: config::COMMAND_CHANNEL_CAPACITY,
            tick_interval: config::tick_interval(),
            paused_poll: config::PAUSED_POLL_INTERVAL,
        },
        encode_snapshot,
    );

    AppState {
        session,
        frame_capacity: config::CLIENT_FRAME_CAPACITY,
    }
}

// Stops the session before the listener drains, so WebSocket clients get a close frame.
async fn shutdown_signal(session: SessionHandle) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
    session.shutdown().await;
}
