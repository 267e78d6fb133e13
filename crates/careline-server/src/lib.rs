//! Careline server library logic.
//!
//! Wires the call-flow webhook, the call lookup API and the health check
//! into one axum [`Router`]. Handlers reach shared state through an
//! `Extension<Arc<AppState>>` layer.

pub mod api;
pub mod config;
pub mod flow;
pub mod webhook;

use axum::{extract::DefaultBodyLimit, routing::get, Extension, Json, Router};
use careline_transcript::TranscriptStore;
use careline_twiml::Renderer;
use config::FlowConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Transcript persistence. Writes are best-effort.
    pub store: Arc<dyn TranscriptStore>,
    /// Voice document renderer.
    pub renderer: Renderer,
    /// Callback base URL and flow variant.
    pub flow: FlowConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn TranscriptStore>, renderer: Renderer, flow: FlowConfig) -> Self {
        Self {
            store,
            renderer,
            flow,
        }
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
///
/// Paths without an explicit route are treated as webhook routing keys.
/// Methods other than GET on the JSON routes fall through to the webhook
/// handler too, so a provider misconfigured onto them still gets a voice
/// document with HTTP 200.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(health).fallback(webhook::webhook_handler),
        )
        .route(
            "/api/calls/{callSid}",
            get(api::get_call_handler).fallback(webhook::webhook_handler),
        )
        .fallback(webhook::webhook_handler)
        .layer(DefaultBodyLimit::max(webhook::MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
