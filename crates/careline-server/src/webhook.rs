//! Telephony webhook endpoint.
//!
//! Every path not claimed by another route lands here. The path selects the
//! stage; parameters come from the query string and the form-encoded body
//! (non-empty body values win). Nothing about the request is ever rejected:
//! missing or unparseable parameters default to empty values, and a body
//! over [`MAX_BODY_BYTES`] gets the generic-error document.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::Extension,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use careline_types::{Stage, WebhookParams};

use crate::flow::{handle_stage, UNKNOWN_ROUTE_MESSAGE};
use crate::AppState;

/// Content type of every webhook response.
pub const VOICE_CONTENT_TYPE: &str = "text/xml";

/// Largest webhook body read. Provider form posts are a few hundred bytes.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Handler for any webhook path and method.
pub async fn webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    method: Method,
    uri: Uri,
    body: Body,
) -> Response {
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(%method, path = uri.path(), error = %e, "unreadable webhook body");
            return voice_response(state.renderer.render(UNKNOWN_ROUTE_MESSAGE, None));
        }
    };

    let stage = Stage::from_path(uri.path());
    let params = parse_params(uri.query(), &body);

    if stage == Stage::Unknown {
        tracing::warn!(%method, path = uri.path(), "webhook for unrecognized routing key");
    } else {
        tracing::debug!(%method, stage = stage.label(), "webhook received");
    }

    voice_response(handle_stage(&state, stage, &params).await)
}

fn voice_response(document: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, VOICE_CONTENT_TYPE)],
        document,
    )
        .into_response()
}

/// Decodes query-string and body pairs into webhook parameters.
fn parse_params(query: Option<&str>, body: &[u8]) -> WebhookParams {
    let query_pairs = url::form_urlencoded::parse(query.unwrap_or_default().as_bytes());
    let body_pairs = url::form_urlencoded::parse(body);
    WebhookParams::from_query_and_body(query_pairs, body_pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlowConfig;

    #[test]
    fn body_overrides_query() {
        let params = parse_params(
            Some("CallSid=CA-query&From=%2B1000"),
            b"CallSid=CA-body&SpeechResult=my+router+is+broken",
        );
        assert_eq!(params.call_sid.as_deref(), Some("CA-body"));
        assert_eq!(params.from, "+1000");
        assert_eq!(params.speech_result, "my router is broken");
    }

    #[test]
    fn empty_body_call_sid_keeps_query_value() {
        let params = parse_params(Some("CallSid=CA-query"), b"CallSid=&SpeechResult=hi");
        assert_eq!(params.call_sid.as_deref(), Some("CA-query"));
        assert_eq!(params.speech_result, "hi");
    }

    #[test]
    fn query_call_sid_is_echoed_into_next_target() {
        let flow = FlowConfig {
            base_url: "https://care.example.com".to_string(),
            keypad_gate: true,
        };
        let params = parse_params(Some("CallSid=G-7"), b"SpeechResult=refund");
        let sid = params.resolve_call_sid();

        assert_eq!(sid.as_str(), "G-7");
        assert_eq!(
            flow.callback_url(Stage::EmailCapture, &sid),
            "https://care.example.com/gather_email?CallSid=G-7"
        );
    }

    #[test]
    fn body_call_sid_is_not_echoed() {
        let flow = FlowConfig {
            base_url: "https://care.example.com".to_string(),
            keypad_gate: true,
        };
        let sid = parse_params(None, b"CallSid=CA55").resolve_call_sid();
        assert_eq!(
            flow.callback_url(Stage::ConcernCapture, &sid),
            "https://care.example.com/gather_concern"
        );
    }

    #[test]
    fn garbage_body_yields_defaults() {
        let params = parse_params(None, b"\xff\xfe&&==&%zz");
        assert_eq!(params.call_sid, None);
        assert_eq!(params.speech_result, "");
    }

    #[test]
    fn digits_are_read() {
        let params = parse_params(None, b"Digits=7&CallSid=CA9");
        assert_eq!(params.digits, "7");
        assert_eq!(params.call_sid.as_deref(), Some("CA9"));
    }
}
