//! HTTP status outcome tables and the dispatcher that applies them.
//!
//! Each resource type declares, per verb, which status codes mean success,
//! change, or failure. The same code means different things for different
//! verbs: a 404 on GET is "absent", a 404 on PUT is an error. A status code
//! missing from the table is always a failure.

use crate::context::RunLog;
use crate::result::CallResult;
use restkit::{Method, Request, Transport};
use serde_json::Value;

/// Longest body excerpt copied into a failure message.
const MAX_DETAIL_LEN: usize = 500;

/// Classification of one status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub changed: bool,
    pub failed: bool,
    /// Message template; `{id}` is replaced with the resource identifier.
    pub message: &'static str,
}

impl Outcome {
    pub const fn new(changed: bool, failed: bool, message: &'static str) -> Self {
        Self {
            changed,
            failed,
            message,
        }
    }

    /// Success without change.
    pub const fn ok(message: &'static str) -> Self {
        Self::new(false, false, message)
    }

    /// Success with change.
    pub const fn changed(message: &'static str) -> Self {
        Self::new(true, false, message)
    }

    pub const fn failure(message: &'static str) -> Self {
        Self::new(false, true, message)
    }

    pub fn render(&self, id: &str) -> String {
        self.message.replace("{id}", id)
    }
}

/// Failure entries shared by every endpoint of the API.
pub const API_ERRORS: &[(u16, Outcome)] = &[
    (400, Outcome::failure("Bad request: parameter problem.")),
    (401, Outcome::failure("Unauthorized: check the automation credentials.")),
    (403, Outcome::failure("Forbidden: configuration via the REST API is not allowed.")),
    (405, Outcome::failure("Method not allowed on this endpoint.")),
    (406, Outcome::failure("Not acceptable: the client sent an unsupported Accept header.")),
    (409, Outcome::failure("Conflict: the request conflicts with the current state.")),
    (412, Outcome::failure("Precondition failed: the object was changed concurrently (stale ETag).")),
    (415, Outcome::failure("Unsupported media type.")),
    (422, Outcome::failure("Unprocessable entity.")),
    (423, Outcome::failure("Locked: the configuration is being modified by another process.")),
    (428, Outcome::failure("Precondition required: the If-Match header is missing.")),
    (500, Outcome::failure("Internal server error.")),
    (503, Outcome::failure("Service unavailable.")),
];

/// A static status-code table for one verb of one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeTable {
    entries: &'static [(u16, Outcome)],
    fallback: &'static [(u16, Outcome)],
}

impl OutcomeTable {
    /// A table with only the given entries.
    pub const fn new(entries: &'static [(u16, Outcome)]) -> Self {
        Self {
            entries,
            fallback: &[],
        }
    }

    /// A table whose unmatched codes fall back to [`API_ERRORS`].
    pub const fn with_api_errors(entries: &'static [(u16, Outcome)]) -> Self {
        Self {
            entries,
            fallback: API_ERRORS,
        }
    }

    /// Look up a status code; specific entries win over the fallback.
    pub fn lookup(&self, status: u16) -> Option<Outcome> {
        self.entries
            .iter()
            .chain(self.fallback.iter())
            .find(|(code, _)| *code == status)
            .map(|(_, outcome)| *outcome)
    }

    /// Turn a status and body into a [`CallResult`].
    pub fn classify(&self, status: u16, id: &str, body: &[u8]) -> CallResult {
        let code = i32::from(status);
        match self.lookup(status) {
            Some(outcome) => {
                let mut message = outcome.render(id);
                if outcome.failed
                    && let Some(detail) = failure_detail(body)
                {
                    message = format!("{message} Details: {detail}");
                }
                CallResult::new(code, message, outcome.changed, outcome.failed)
            }
            None => {
                let mut message = format!("Unexpected HTTP status {status} for {id}.");
                if let Some(detail) = failure_detail(body) {
                    message = format!("{message} Details: {detail}");
                }
                CallResult::new(code, message, false, true)
            }
        }
    }
}

/// Outcome tables for the four verbs of a resource.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeTables {
    pub get: OutcomeTable,
    pub create: OutcomeTable,
    pub update: OutcomeTable,
    pub delete: OutcomeTable,
}

/// Issue one request and classify its response.
///
/// Transport failures yield a failed result with status `-1`. There are no
/// retries at this layer.
pub fn apply(
    transport: &dyn Transport,
    request: &Request,
    table: &OutcomeTable,
    id: &str,
    log: &mut RunLog,
) -> CallResult {
    log.debug(format!("{} {}", request.method, request.path));

    let response = match transport.send(request) {
        Ok(response) => response,
        Err(e) => {
            log.warn(format!("{} {} failed: {e}", request.method, request.path));
            return CallResult::transport_failure(format!(
                "{} {} failed before a response was received: {e}",
                request.method, request.path
            ));
        }
    };

    let result = table
        .classify(response.status, id, &response.body)
        .with_etag(response.etag.unwrap_or_default())
        .with_body(response.body);

    log.debug(format!(
        "{} {} -> {} (changed={}, failed={})",
        request.method, request.path, result.status_code, result.changed, result.failed
    ));
    if result.failed && request.method != Method::Get {
        log.warn(result.message.clone());
    }
    result
}

/// Extract a human-readable error detail from a response body.
///
/// Problem documents (`title`, `detail`, `fields`) are summarized; anything
/// else is returned as trimmed text.
pub fn failure_detail(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }

    if let Ok(Value::Object(problem)) = serde_json::from_slice::<Value>(body) {
        let mut parts = Vec::new();
        for key in ["title", "detail"] {
            if let Some(text) = problem.get(key).and_then(Value::as_str) {
                parts.push(text.to_string());
            }
        }
        if let Some(fields) = problem.get("fields").filter(|f| !f.is_null()) {
            parts.push(format!("fields: {fields}"));
        }
        if !parts.is_empty() {
            return Some(parts.join(" - "));
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(MAX_DETAIL_LEN).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use restkit::{MockTransport, Response};

    const GET: OutcomeTable = OutcomeTable::with_api_errors(&[
        (200, Outcome::ok("Host {id} found.")),
        (404, Outcome::ok("Host {id} not found.")),
    ]);

    const PUT: OutcomeTable = OutcomeTable::new(&[
        (200, Outcome::changed("Host {id} updated.")),
        (404, Outcome::failure("Host {id} not found.")),
    ]);

    #[test]
    fn test_lookup_prefers_specific_entries() {
        assert_eq!(GET.lookup(404), Some(Outcome::ok("Host {id} not found.")));
        assert!(GET.lookup(412).unwrap().failed);
        assert_eq!(PUT.lookup(412), None);
    }

    #[test]
    fn test_same_code_differs_by_verb() {
        let get = GET.classify(404, "web01", b"");
        let put = PUT.classify(404, "web01", b"");
        assert!(!get.failed);
        assert!(put.failed);
        assert_eq!(get.message, "Host web01 not found.");
    }

    #[test]
    fn test_unmapped_code_is_failure() {
        for table in [GET, PUT] {
            let result = table.classify(599, "web01", b"");
            assert!(result.failed);
            assert!(!result.changed);
            assert_eq!(result.status_code, 599);
            assert!(result.message.contains("599"));
        }
    }

    #[test]
    fn test_failure_includes_problem_detail() {
        let body = br#"{"title":"Precondition failed","status":412,"detail":"ETag mismatch"}"#;
        let result = GET.classify(412, "web01", body);
        assert!(result.failed);
        assert!(result.message.contains("stale ETag"));
        assert!(result.message.contains("Precondition failed - ETag mismatch"));
    }

    #[test]
    fn test_failure_detail_variants() {
        assert_eq!(failure_detail(b""), None);
        assert_eq!(failure_detail(b"  \n"), None);
        assert_eq!(failure_detail(b"gateway down").as_deref(), Some("gateway down"));
        let with_fields = failure_detail(br#"{"title":"Bad","fields":{"name":["required"]}}"#).unwrap();
        assert!(with_fields.contains("fields"));
        assert!(with_fields.contains("required"));
    }

    #[test]
    fn test_apply_captures_etag_and_body() {
        let mock = MockTransport::new();
        mock.reply(
            Method::Get,
            "/objects/host_config/web01",
            Response::json(200, r#"{"id":"web01"}"#).with_etag("\"v1\""),
        );
        let mut log = RunLog::new();
        let result = apply(
            &mock,
            &Request::get("/objects/host_config/web01"),
            &GET,
            "web01",
            &mut log,
        );
        assert!(!result.failed);
        assert_eq!(result.etag, "\"v1\"");
        assert_eq!(result.json().unwrap()["id"], "web01");
        assert!(!log.is_empty());
    }

    #[test]
    fn test_apply_transport_failure_has_sentinel_status() {
        let mock = MockTransport::new();
        mock.fail(Method::Get, "/x", "connection refused");
        let mut log = RunLog::new();
        let result = apply(&mock, &Request::get("/x"), &GET, "x", &mut log);
        assert_eq!(result.status_code, -1);
        assert!(result.failed);
        assert!(result.message.contains("connection refused"));
    }
}
