//! The outcome of one remote operation, and the report built from it.

use crate::diff::Diff;
use serde::Serialize;
use serde_json::Value;

/// Status code used when no HTTP response was obtained.
pub const NO_STATUS: i32 = -1;

/// Immutable outcome of a single HTTP call or polling cycle.
///
/// Values are replaced, never mutated: helpers such as [`with_note`]
/// consume the result and return a new one.
///
/// [`with_note`]: CallResult::with_note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    /// HTTP status, or [`NO_STATUS`] for transport failures.
    pub status_code: i32,
    pub message: String,
    /// Raw response body.
    pub body: Option<Vec<u8>>,
    /// Concurrency token (ETag) returned with the response.
    pub etag: String,
    pub changed: bool,
    pub failed: bool,
}

impl Default for CallResult {
    fn default() -> Self {
        Self {
            status_code: NO_STATUS,
            message: String::new(),
            body: None,
            etag: String::new(),
            changed: false,
            failed: true,
        }
    }
}

impl CallResult {
    /// A result for a given status and classification.
    pub fn new(status_code: i32, message: impl Into<String>, changed: bool, failed: bool) -> Self {
        Self {
            status_code,
            message: message.into(),
            changed,
            failed,
            ..Self::default()
        }
    }

    /// A successful result that did not change anything.
    pub fn unchanged(status_code: i32, message: impl Into<String>) -> Self {
        Self::new(status_code, message, false, false)
    }

    /// A result for a request that never got an HTTP response.
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self::new(NO_STATUS, message, false, true)
    }

    /// Attach the raw response body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = (!body.is_empty()).then_some(body);
        self
    }

    /// Attach a concurrency token.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = etag.into();
        self
    }

    /// Append a note to the message.
    pub fn with_note(mut self, note: impl AsRef<str>) -> Self {
        let note = note.as_ref();
        if !note.is_empty() {
            if !self.message.is_empty() {
                self.message.push(' ');
            }
            self.message.push_str(note);
        }
        self
    }

    /// Prepend the message of an earlier sub-step, so a multi-step
    /// operation reports every step in order.
    pub fn after(mut self, earlier: &CallResult) -> Self {
        if !earlier.message.is_empty() {
            self.message = if self.message.is_empty() {
                earlier.message.clone()
            } else {
                format!("{} {}", earlier.message, self.message)
            };
        }
        self.changed |= earlier.changed;
        self
    }

    /// Override the changed flag.
    pub fn with_changed(mut self, changed: bool) -> Self {
        self.changed = changed;
        self
    }

    /// The body parsed as JSON, if it is JSON.
    pub fn json(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }

    /// The body as lossy UTF-8 text.
    pub fn text(&self) -> Option<String> {
        self.body
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn is_success(&self) -> bool {
        !self.failed
    }
}

/// The normalized object returned to the invoker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub changed: bool,
    pub failed: bool,
    pub msg: String,
    pub http_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub debug: Vec<String>,
}

impl Report {
    /// Build the outward report for a result and optional diff.
    pub fn new(result: &CallResult, diff: Option<Diff>) -> Self {
        let content = result
            .json()
            .or_else(|| result.text().map(Value::String));
        Self {
            changed: result.changed,
            failed: result.failed,
            msg: result.message.clone(),
            http_code: result.status_code,
            content,
            diff,
            debug: Vec::new(),
        }
    }

    /// Attach flushed log lines.
    pub fn with_debug(mut self, lines: Vec<String>) -> Self {
        self.debug = lines;
        self
    }
}
