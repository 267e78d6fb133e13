//! Voice-response document rendering for Careline.
//!
//! [`Renderer::render`] turns a message and an optional [`GatherSpec`] into
//! the XML document the telephony provider executes next. Rendering never
//! fails from the caller's point of view: if a document cannot be built,
//! a fixed technical-difficulties document is returned instead.
//!
//! The two input modes differ when nothing is captured:
//!
//! | Mode | No input |
//! |------|----------|
//! | speech | says [`SPEECH_NO_INPUT_MESSAGE`] and hangs up |
//! | keypad | redirects back to the same target (the prompt repeats) |

mod document;
mod sanitize;

pub use document::VoiceSettings;
pub use sanitize::sanitize;

use careline_types::InputMode;
use document::{Document, Gather};
use thiserror::Error;

/// Spoken when a speech gather times out without a result.
pub const SPEECH_NO_INPUT_MESSAGE: &str = "We didn't catch that. Goodbye!";

/// Spoken when a document cannot be built.
pub const RENDER_FAILURE_MESSAGE: &str =
    "Thank you for calling. We're experiencing technical difficulties. Please try again later.";

/// Seconds a gather waits for the caller to start responding.
pub const GATHER_TIMEOUT_SECS: u32 = 10;

/// Keypresses collected by a keypad gather unless told otherwise.
pub const DEFAULT_DIGIT_COUNT: u32 = 1;

/// What to collect from the caller after the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherSpec {
    pub input_mode: InputMode,
    /// Absolute URL the provider posts the captured input to.
    pub target_url: String,
    /// Spoken while listening.
    pub prompt: String,
    /// Keypresses to collect in keypad mode; `None` means
    /// [`DEFAULT_DIGIT_COUNT`]. Ignored for speech.
    pub digit_count: Option<u32>,
}

impl GatherSpec {
    pub fn speech(target_url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            input_mode: InputMode::Speech,
            target_url: target_url.into(),
            prompt: prompt.into(),
            digit_count: None,
        }
    }

    pub fn keypad(target_url: impl Into<String>, prompt: impl Into<String>, digits: u32) -> Self {
        Self {
            input_mode: InputMode::Keypad,
            target_url: target_url.into(),
            prompt: prompt.into(),
            digit_count: Some(digits),
        }
    }
}

/// Reasons a document could not be built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("gather target '{url}' is not an absolute URL: {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("keypad gather must collect at least one digit")]
    ZeroDigits,

    #[error("gather prompt is empty after sanitization")]
    EmptyPrompt,
}

/// Builds voice documents with a fixed voice.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    voice: VoiceSettings,
}

impl Renderer {
    pub fn new(voice: VoiceSettings) -> Self {
        Self { voice }
    }

    /// Renders a document, substituting the fallback document on failure.
    pub fn render(&self, message: &str, gather: Option<&GatherSpec>) -> String {
        match self.try_render(message, gather) {
            Ok(xml) => xml,
            Err(e) => {
                tracing::error!(error = %e, "failed to build voice document, sending fallback");
                self.fallback()
            }
        }
    }

    /// Renders a document, reporting why it could not be built.
    ///
    /// Without a gather the message is spoken and the call ends. With a
    /// gather, a non-empty message is spoken first, then the gather runs
    /// with its prompt.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` for a non-absolute target URL, a zero digit
    /// count, or a prompt with nothing speakable in it.
    pub fn try_render(
        &self,
        message: &str,
        gather: Option<&GatherSpec>,
    ) -> Result<String, RenderError> {
        let message = sanitize(message);

        let Some(spec) = gather else {
            return Ok(Document::new().say(message).to_xml(&self.voice));
        };

        let target = validate_target(&spec.target_url)?;
        let prompt = sanitize(&spec.prompt);
        if prompt.trim().is_empty() {
            return Err(RenderError::EmptyPrompt);
        }

        let mut doc = Document::new();
        if !message.trim().is_empty() {
            doc = doc.say(message);
        }

        let doc = match spec.input_mode {
            InputMode::Speech => doc
                .gather(Gather {
                    input: InputMode::Speech,
                    action: target,
                    num_digits: None,
                    speech_timeout: Some("auto"),
                    timeout_secs: GATHER_TIMEOUT_SECS,
                    prompt,
                })
                .say(SPEECH_NO_INPUT_MESSAGE),
            InputMode::Keypad => {
                let digits = spec.digit_count.unwrap_or(DEFAULT_DIGIT_COUNT);
                if digits == 0 {
                    return Err(RenderError::ZeroDigits);
                }
                doc.gather(Gather {
                    input: InputMode::Keypad,
                    action: target.clone(),
                    num_digits: Some(digits),
                    speech_timeout: None,
                    timeout_secs: GATHER_TIMEOUT_SECS,
                    prompt,
                })
                .redirect(target)
            }
        };

        Ok(doc.to_xml(&self.voice))
    }

    /// The fixed document sent when rendering fails.
    pub fn fallback(&self) -> String {
        Document::new()
            .say(RENDER_FAILURE_MESSAGE)
            .to_xml(&self.voice)
    }
}

fn validate_target(target: &str) -> Result<String, RenderError> {
    let invalid = |reason: String| RenderError::InvalidTarget {
        url: target.to_string(),
        reason,
    };
    let url = url::Url::parse(target).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_target_is_rejected() {
        let err = Renderer::default()
            .try_render("hi", Some(&GatherSpec::speech("/gather_concern", "Speak.")))
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidTarget { .. }));
    }

    #[test]
    fn non_http_target_is_rejected() {
        let err = Renderer::default()
            .try_render("hi", Some(&GatherSpec::speech("mailto:a@b.c", "Speak.")))
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidTarget { .. }));
    }

    #[test]
    fn zero_digits_is_rejected() {
        let err = Renderer::default()
            .try_render(
                "",
                Some(&GatherSpec::keypad("https://x.test/welcome", "Press.", 0)),
            )
            .unwrap_err();
        assert_eq!(err, RenderError::ZeroDigits);
    }

    #[test]
    fn unspeakable_prompt_is_rejected() {
        let err = Renderer::default()
            .try_render(
                "",
                Some(&GatherSpec::speech("https://x.test/a", "\u{0}\u{7} ")),
            )
            .unwrap_err();
        assert_eq!(err, RenderError::EmptyPrompt);
    }

    #[test]
    fn render_substitutes_fallback() {
        let renderer = Renderer::default();
        let xml = renderer.render("hi", Some(&GatherSpec::speech("not a url", "Speak.")));
        assert_eq!(xml, renderer.fallback());
        assert!(xml.contains(RENDER_FAILURE_MESSAGE.replace('\'', "&apos;").as_str()));
        assert!(!xml.contains("<Gather"));
    }

    #[test]
    fn missing_digit_count_defaults_to_one() {
        let spec = GatherSpec {
            digit_count: None,
            ..GatherSpec::keypad("https://x.test/welcome", "Press.", 4)
        };
        let xml = Renderer::default().try_render("", Some(&spec)).unwrap();
        assert!(xml.contains(r#"numDigits="1""#));
    }

    #[test]
    fn message_precedes_gather() {
        let xml = Renderer::default()
            .try_render(
                "Hello.",
                Some(&GatherSpec::speech("https://x.test/next", "Speak.")),
            )
            .unwrap();
        let say = xml.find(">Hello.</Say>").expect("message spoken");
        let gather = xml.find("<Gather").expect("gather present");
        assert!(say < gather);
    }
}
