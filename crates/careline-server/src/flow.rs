//! The customer-care call flow.
//!
//! Each webhook resolves to one [`Stage`]; the stage handler performs at
//! most one best-effort store write and then renders the next document.
//! A store failure is logged and dropped, so the caller hears exactly the
//! same flow whether or not the transcript was saved.

use std::sync::Arc;

use careline_transcript::{TranscriptError, TranscriptStore};
use careline_twiml::GatherSpec;
use careline_types::{CallSid, Stage, WebhookParams};

use crate::config::FlowConfig;
use crate::AppState;

pub const KEYPAD_GREETING: &str = "Thank you for calling AI pon A Time.";
pub const KEYPAD_PROMPT: &str = "Please press any key to continue.";
pub const WELCOME_MESSAGE: &str = "Hi, welcome to AI pon A Time.";
pub const DIRECT_GREETING: &str = "Hi, welcome to AI pon A Time. How can we assist you today?";
pub const CONCERN_PROMPT: &str = "Please describe your issue or request after the beep.";
pub const CONCERN_ACK: &str = "Sure, our team will work on this and get back to you. \
                               Meanwhile, kindly provide your email ID.";
pub const EMAIL_PROMPT: &str = "Please say your email address now.";
pub const CLOSING_MESSAGE: &str = "Thank you. Have a wonderful day!";
pub const FALLBACK_MESSAGE: &str =
    "Sorry, we're experiencing technical difficulties. Please try again later.";
pub const UNKNOWN_ROUTE_MESSAGE: &str = "Sorry, something went wrong. Please try again later.";

impl FlowConfig {
    /// Absolute URL the provider should post the next stage's input to.
    ///
    /// A synthesized call identifier, or one that arrived in a callback URL,
    /// is carried along as a `CallSid` query parameter so the next webhook
    /// resolves to the same call.
    pub fn callback_url(&self, stage: Stage, call_sid: &CallSid) -> String {
        let mut url = format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            stage.path().unwrap_or("/")
        );
        if call_sid.needs_threading() {
            url.push_str("?CallSid=");
            url.extend(url::form_urlencoded::byte_serialize(
                call_sid.as_str().as_bytes(),
            ));
        }
        url
    }
}

/// Runs the handler for `stage` and returns the response document.
pub async fn handle_stage(state: &AppState, stage: Stage, params: &WebhookParams) -> String {
    let call_sid = params.resolve_call_sid();
    if call_sid.is_generated() {
        tracing::debug!(stage = stage.label(), call_sid = %call_sid, "no CallSid supplied, generated one");
    }

    match stage {
        Stage::Initial => initial(state, &call_sid, params).await,
        Stage::Welcome => welcome(state, &call_sid, params),
        Stage::ConcernCapture => concern_capture(state, &call_sid, params).await,
        Stage::EmailCapture => email_capture(state, &call_sid, params).await,
        Stage::Fallback => state.renderer.render(FALLBACK_MESSAGE, None),
        Stage::Unknown => state.renderer.render(UNKNOWN_ROUTE_MESSAGE, None),
    }
}

async fn initial(state: &AppState, call_sid: &CallSid, params: &WebhookParams) -> String {
    let sid = call_sid.as_str().to_string();
    let from = params.from.clone();
    persist(state, Stage::Initial, call_sid, move |store| {
        store.create_call(&sid, &from)
    })
    .await;

    tracing::info!(call_sid = %call_sid, from = %params.from, "call started");

    if state.flow.keypad_gate {
        let gather = GatherSpec::keypad(
            state.flow.callback_url(Stage::Welcome, call_sid),
            KEYPAD_PROMPT,
            1,
        );
        state.renderer.render(KEYPAD_GREETING, Some(&gather))
    } else {
        let gather = GatherSpec::speech(
            state.flow.callback_url(Stage::ConcernCapture, call_sid),
            CONCERN_PROMPT,
        );
        state.renderer.render(DIRECT_GREETING, Some(&gather))
    }
}

fn welcome(state: &AppState, call_sid: &CallSid, params: &WebhookParams) -> String {
    tracing::debug!(call_sid = %call_sid, digits = %params.digits, "caller passed keypad gate");

    let gather = GatherSpec::speech(
        state.flow.callback_url(Stage::ConcernCapture, call_sid),
        CONCERN_PROMPT,
    );
    state.renderer.render(WELCOME_MESSAGE, Some(&gather))
}

async fn concern_capture(state: &AppState, call_sid: &CallSid, params: &WebhookParams) -> String {
    append(state, Stage::ConcernCapture, call_sid, format!("Concern: {}", params.speech_result)).await;

    let gather = GatherSpec::speech(
        state.flow.callback_url(Stage::EmailCapture, call_sid),
        EMAIL_PROMPT,
    );
    state.renderer.render(CONCERN_ACK, Some(&gather))
}

async fn email_capture(state: &AppState, call_sid: &CallSid, params: &WebhookParams) -> String {
    append(state, Stage::EmailCapture, call_sid, format!("Email: {}", params.speech_result)).await;

    tracing::info!(call_sid = %call_sid, "call flow completed");

    state.renderer.render(CLOSING_MESSAGE, None)
}

async fn append(state: &AppState, stage: Stage, call_sid: &CallSid, text: String) {
    let sid = call_sid.as_str().to_string();
    persist(state, stage, call_sid, move |store| {
        store.append_entry(&sid, &text).map(|_| ())
    })
    .await;
}

/// Runs one store operation on the blocking pool, logging any failure.
async fn persist<F>(state: &AppState, stage: Stage, call_sid: &CallSid, op: F)
where
    F: FnOnce(&dyn TranscriptStore) -> Result<(), TranscriptError> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    match tokio::task::spawn_blocking(move || op(store.as_ref())).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(
                stage = stage.label(),
                call_sid = %call_sid,
                error = %e,
                "transcript write failed, continuing call"
            );
        }
        Err(e) => {
            tracing::error!(
                stage = stage.label(),
                call_sid = %call_sid,
                error = %e,
                "transcript write task panicked or was cancelled"
            );
        }
    }
}
