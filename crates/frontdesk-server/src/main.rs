//! Frontdesk server binary: the receptionist conversation behind an HTTP API.
//!
//! Starts an axum HTTP server with structured logging, one conversation task
//! and graceful shutdown on SIGTERM/SIGINT.

use frontdesk_server::{app, config, start_conversation, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("FRONTDESK_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration, the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        mode = %config.dialogue.mode,
        "resolved startup configuration path"
    );

    // Start the conversation
    let (session, conversation) = start_conversation(&config);
    tracing::info!(session = %session.id(), "conversation session created");

    if config.dialogue.greet_on_start {
        let session = session.clone();
        let delay = config.dialogue.greeting_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = session.greet().await {
                tracing::warn!(error = %e, "automatic greeting failed");
            }
        });
    }

    // Build application
    let app = app(AppState {
        session: session.clone(),
    });
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting frontdesk server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address, is another process using this port?");

    // Serve with graceful shutdown. Ending the conversation first closes
    // open SSE streams so the server can drain.
    let shutdown = {
        let session = session.clone();
        async move {
            shutdown_signal().await;
            session.shutdown();
        }
    };
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .expect("server error");

    if let Err(e) = conversation.await {
        tracing::error!(error = %e, "conversation task failed");
    }

    tracing::info!("frontdesk server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

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
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
