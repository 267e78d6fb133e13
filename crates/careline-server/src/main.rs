//! Careline server binary.
//!
//! Loads configuration, initializes structured logging and the transcript
//! store, then serves the call-flow webhooks until SIGINT/SIGTERM.

use careline_server::{app, config, AppState};
use careline_transcript::{MemoryTranscriptStore, SqliteTranscriptStore, TranscriptStore};
use careline_twiml::Renderer;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("CARELINE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

/// Opens the configured transcript store, running migrations for SQLite.
fn open_store(database: &config::DatabaseConfig) -> Arc<dyn TranscriptStore> {
    if database.path == ":memory:" {
        tracing::warn!("database.path is :memory:, transcripts will not survive a restart");
        return Arc::new(MemoryTranscriptStore::new());
    }

    let pool = careline_db::create_pool(&database.path, database.runtime_settings())
        .expect("failed to create database pool: check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied =
            careline_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    Arc::new(SqliteTranscriptStore::new(pool))
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration: the server cannot start without valid config");

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
        "resolved startup configuration path"
    );

    if url::Url::parse(&config.flow.base_url).is_err() {
        tracing::error!(
            base_url = %config.flow.base_url,
            "flow.base_url is not an absolute URL; gather prompts will degrade to the fallback message"
        );
    }

    let store = open_store(&config.database);
    let renderer = Renderer::new((&config.voice).into());
    let state = AppState::new(store, renderer, config.flow.clone());

    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(
        %addr,
        base_url = %config.flow.base_url,
        keypad_gate = config.flow.keypad_gate,
        "starting careline server"
    );

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address: is another process using this port?");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("careline server shut down");
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
