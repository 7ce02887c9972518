// Output renderer. Success payloads go to `out`, failures and the
// cancellation notice go to `err`; nothing is ever written to both for one
// outcome.

use crate::commands::Outcome;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::io::{self, Write};

pub const TYPES_HEADER: &str = "Available types:";

/// What a successful command hands to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
    /// Rendered as `header` followed by one item per line.
    Lines { header: String, items: Vec<String> },
}

impl Payload {
    /// Plain strings print as-is rather than as a quoted JSON string.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => Payload::Text(s),
            other => Payload::Json(other),
        }
    }
}

/// JSON with 4-space indentation; key order is whatever the value holds.
pub fn to_pretty_json(value: &Value) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub struct Renderer<O: Write, E: Write> {
    out: O,
    err: E,
}

impl Renderer<io::Stdout, io::Stderr> {
    pub fn stdio() -> Self {
        Renderer::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> Renderer<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Renderer { out, err }
    }

    pub fn render(&mut self, outcome: &Outcome) -> io::Result<()> {
        match outcome {
            Outcome::Success(payload) => self.render_payload(payload),
            Outcome::Cancelled(message) => {
                writeln!(self.err, "{}", message)?;
                self.err.flush()
            }
            Outcome::Failure(failure) => {
                let kind = failure.kind;
                if failure.detail.is_empty() {
                    writeln!(self.err, "Error [{}]: {}", kind, kind.message())?;
                } else {
                    writeln!(
                        self.err,
                        "Error [{}]: {} ({})",
                        kind,
                        kind.message(),
                        failure.detail
                    )?;
                }
                self.err.flush()
            }
        }
    }

    fn render_payload(&mut self, payload: &Payload) -> io::Result<()> {
        match payload {
            Payload::Json(value) => {
                let text = to_pretty_json(value).map_err(io::Error::other)?;
                writeln!(self.out, "{}", text)?;
            }
            Payload::Text(text) => writeln!(self.out, "{}", text)?,
            Payload::Lines { header, items } => {
                writeln!(self.out, "{}", header)?;
                for item in items {
                    writeln!(self.out, "{}", item)?;
                }
            }
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}
