#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use careline_server::{app, config::FlowConfig, AppState};
use careline_transcript::{MemoryTranscriptStore, TranscriptError, TranscriptStore};
use careline_twiml::Renderer;
use careline_types::{CallRecord, TranscriptEntry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt; // for oneshot

pub const BASE_URL: &str = "https://care.example.com";

/// A store whose every write fails, counting the attempts.
#[derive(Default)]
pub struct FailingStore {
    pub attempts: AtomicUsize,
}

impl FailingStore {
    fn fail(&self) -> TranscriptError {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        TranscriptError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        ))
    }
}

impl TranscriptStore for FailingStore {
    fn create_call(&self, _call_sid: &str, _from_number: &str) -> Result<(), TranscriptError> {
        Err(self.fail())
    }

    fn append_entry(&self, _call_sid: &str, _text: &str) -> Result<TranscriptEntry, TranscriptError> {
        Err(self.fail())
    }

    fn load_call(&self, _call_sid: &str) -> Result<Option<CallRecord>, TranscriptError> {
        Err(self.fail())
    }
}

pub fn flow(keypad_gate: bool) -> FlowConfig {
    FlowConfig {
        base_url: BASE_URL.to_string(),
        keypad_gate,
    }
}

pub fn test_app(store: Arc<dyn TranscriptStore>, flow: FlowConfig) -> Router {
    app(AppState::new(store, Renderer::default(), flow))
}

pub fn memory_app() -> (Router, Arc<MemoryTranscriptStore>) {
    let store = Arc::new(MemoryTranscriptStore::new());
    (test_app(store.clone(), flow(true)), store)
}

/// Posts a form-encoded webhook and returns status, content type and body.
pub async fn post_form(app: &Router, path: &str, form: &str) -> (StatusCode, String, String) {
    let req = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    send(app, req).await
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, String, String) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

/// Extracts every `action="..."` attribute value from a document.
pub fn gather_actions(xml: &str) -> Vec<String> {
    xml.match_indices("<Gather")
        .map(|(start, _)| {
            let rest = &xml[start..];
            let attr = rest.find("action=\"").expect("gather has action") + "action=\"".len();
            let end = rest[attr..].find('"').unwrap();
            rest[attr..attr + end].replace("&amp;", "&")
        })
        .collect()
}
