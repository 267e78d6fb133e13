//! Typed voice-response document and its XML serialization.
//!
//! Only the verbs the call flow uses are modelled: `Say`, `Gather` (with a
//! nested `Say`) and `Redirect`. Text is expected to be sanitized already;
//! serialization only escapes it.

use careline_types::InputMode;
use std::fmt::Write as _;

/// Voice used for every `<Say>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSettings {
    /// Provider voice name, e.g. `Polly.Niamh`.
    pub name: String,
    /// Spoken language tag, e.g. `en-US`.
    pub language: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            name: "Polly.Niamh".to_string(),
            language: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Gather {
    pub input: InputMode,
    pub action: String,
    pub num_digits: Option<u32>,
    pub speech_timeout: Option<&'static str>,
    pub timeout_secs: u32,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Verb {
    Say(String),
    Gather(Gather),
    Redirect(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Document {
    verbs: Vec<Verb>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say(text.into()));
        self
    }

    pub fn gather(mut self, gather: Gather) -> Self {
        self.verbs.push(Verb::Gather(gather));
        self
    }

    pub fn redirect(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::Redirect(url.into()));
        self
    }

    pub fn to_xml(&self, voice: &VoiceSettings) -> String {
        let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#);
        for verb in &self.verbs {
            match verb {
                Verb::Say(text) => write_say(&mut out, voice, text),
                Verb::Gather(gather) => {
                    out.push_str("<Gather");
                    write_attr(&mut out, "input", gather.input.as_str());
                    if let Some(digits) = gather.num_digits {
                        write_attr(&mut out, "numDigits", &digits.to_string());
                    }
                    write_attr(&mut out, "action", &gather.action);
                    write_attr(&mut out, "method", "POST");
                    if let Some(speech_timeout) = gather.speech_timeout {
                        write_attr(&mut out, "speechTimeout", speech_timeout);
                    }
                    write_attr(&mut out, "timeout", &gather.timeout_secs.to_string());
                    out.push('>');
                    write_say(&mut out, voice, &gather.prompt);
                    out.push_str("</Gather>");
                }
                Verb::Redirect(url) => {
                    out.push_str("<Redirect");
                    write_attr(&mut out, "method", "POST");
                    out.push('>');
                    out.push_str(&escape(url));
                    out.push_str("</Redirect>");
                }
            }
        }
        out.push_str("</Response>");
        out
    }
}

fn write_say(out: &mut String, voice: &VoiceSettings, text: &str) {
    out.push_str("<Say");
    write_attr(out, "voice", &voice.name);
    write_attr(out, "language", &voice.language);
    out.push('>');
    out.push_str(&escape(text));
    out.push_str("</Say>");
}

fn write_attr(out: &mut String, name: &str, value: &str) {
    // Writing into a String cannot fail.
    let _ = write!(out, r#" {name}="{}""#, escape(value));
}

/// Escapes the five XML special characters.
pub(crate) fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
