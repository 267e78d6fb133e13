//! Shared types for the Careline call-flow service.
//!
//! This crate holds the vocabulary every other Careline crate speaks: the
//! call stages the webhook router dispatches over, the inbound webhook
//! parameters, and the persisted call and transcript records.
//!
//! Nothing here performs I/O. Persistence lives in `careline-transcript`,
//! rendering in `careline-twiml`, and HTTP handling in `careline-server`.

use serde::{Deserialize, Serialize};

/// A stage of the fixed customer-care call flow.
///
/// The active stage is derived solely from the webhook path; no "current
/// stage" is persisted between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// First contact (`/voice`): records the call and greets the caller.
    Initial,
    /// Menu entry after the keypad gate (`/welcome`).
    Welcome,
    /// Caller described their concern (`/gather_concern`).
    ConcernCapture,
    /// Caller spoke their email address (`/gather_email`).
    EmailCapture,
    /// Provider-side failure callback (`/voice-fallback`).
    Fallback,
    /// Any routing key outside the recognized set.
    Unknown,
}

impl Stage {
    /// Every stage with a routing key, in flow order.
    pub const ROUTED: [Stage; 5] = [
        Stage::Initial,
        Stage::Welcome,
        Stage::ConcernCapture,
        Stage::EmailCapture,
        Stage::Fallback,
    ];

    /// Resolves the stage for a webhook path.
    ///
    /// A single trailing slash is ignored. Unrecognized paths map to
    /// [`Stage::Unknown`].
    pub fn from_path(path: &str) -> Self {
        let path = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => path,
        };
        Self::ROUTED
            .into_iter()
            .find(|stage| stage.path() == Some(path))
            .unwrap_or(Self::Unknown)
    }

    /// Returns the routing key for this stage, or `None` for `Unknown`.
    pub fn path(self) -> Option<&'static str> {
        match self {
            Self::Initial => Some("/voice"),
            Self::Welcome => Some("/welcome"),
            Self::ConcernCapture => Some("/gather_concern"),
            Self::EmailCapture => Some("/gather_email"),
            Self::Fallback => Some("/voice-fallback"),
            Self::Unknown => None,
        }
    }

    /// Returns a stable label used in log fields.
    pub fn label(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Welcome => "welcome",
            Self::ConcernCapture => "concern_capture",
            Self::EmailCapture => "email_capture",
            Self::Fallback => "fallback",
            Self::Unknown => "unknown",
        }
    }
}

/// How a gather collects caller input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMode {
    /// Speech recognition.
    Speech,
    /// Keypad (DTMF) presses.
    Keypad,
}

impl InputMode {
    /// Returns the provider's `input` attribute value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Speech => "speech",
            Self::Keypad => "dtmf",
        }
    }
}

/// Form parameters a telephony webhook may carry.
///
/// Every field is optional on the wire; missing values default to empty
/// strings and are never rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookParams {
    /// Provider-assigned call identifier (`CallSid`), if present and non-empty.
    pub call_sid: Option<String>,
    /// Whether `call_sid` was read from the URL query string.
    pub call_sid_in_query: bool,
    /// Originating phone number (`From`).
    pub from: String,
    /// Recognized speech from the previous gather (`SpeechResult`).
    pub speech_result: String,
    /// Keypad digits from the previous gather (`Digits`).
    pub digits: String,
}

impl WebhookParams {
    /// Builds parameters from decoded form-body pairs.
    ///
    /// Later pairs override earlier ones, except that an empty value never
    /// replaces an earlier one. Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        params.merge(pairs, false);
        params
    }

    /// Builds parameters from query-string pairs followed by body pairs.
    ///
    /// Non-empty body values win over query values.
    pub fn from_query_and_body<Q, B, QK, QV, BK, BV>(query: Q, body: B) -> Self
    where
        Q: IntoIterator<Item = (QK, QV)>,
        B: IntoIterator<Item = (BK, BV)>,
        QK: AsRef<str>,
        QV: Into<String>,
        BK: AsRef<str>,
        BV: Into<String>,
    {
        let mut params = Self::default();
        params.merge(query, true);
        params.merge(body, false);
        params
    }

    fn merge<I, K, V>(&mut self, pairs: I, in_query: bool)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            let value: String = value.into();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "CallSid" => {
                    self.call_sid = Some(value);
                    self.call_sid_in_query = in_query;
                }
                "From" => self.from = value,
                "SpeechResult" => self.speech_result = value,
                "Digits" => self.digits = value,
                _ => {}
            }
        }
    }

    /// Returns the call identifier, generating a fresh one if absent.
    pub fn resolve_call_sid(&self) -> CallSid {
        match &self.call_sid {
            Some(sid) if self.call_sid_in_query => CallSid::threaded(sid.clone()),
            Some(sid) => CallSid::provided(sid.clone()),
            None => CallSid::generate(),
        }
    }
}

/// Where a call identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSidOrigin {
    /// Posted by the provider in the form body.
    Provider,
    /// Read back from a callback URL's query string.
    Threaded,
    /// Synthesized because the request carried none.
    Generated,
}

/// A call identifier together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSid {
    value: String,
    origin: CallSidOrigin,
}

impl CallSid {
    /// Wraps a provider-assigned identifier.
    pub fn provided(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            origin: CallSidOrigin::Provider,
        }
    }

    /// Wraps an identifier carried in a callback URL.
    pub fn threaded(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            origin: CallSidOrigin::Threaded,
        }
    }

    /// Synthesizes a new random identifier.
    pub fn generate() -> Self {
        Self {
            value: uuid::Uuid::new_v4().to_string(),
            origin: CallSidOrigin::Generated,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn origin(&self) -> CallSidOrigin {
        self.origin
    }

    /// Whether this identifier was synthesized rather than supplied by the provider.
    pub fn is_generated(&self) -> bool {
        self.origin == CallSidOrigin::Generated
    }

    /// Whether the provider will only send this identifier back if it is
    /// part of the next callback URL.
    pub fn needs_threading(&self) -> bool {
        self.origin != CallSidOrigin::Provider
    }
}

impl std::fmt::Display for CallSid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

/// One immutable line of a call transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// ISO-8601 UTC timestamp of the append.
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    /// Label plus captured value, e.g. `Concern: billing`.
    #[serde(rename = "Text")]
    pub text: String,
}

/// A stored call and its transcript in append order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Transcript")]
    pub transcript: Vec<TranscriptEntry>,
}
