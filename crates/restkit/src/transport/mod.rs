//! Transport trait and implementations for issuing API calls.
//!
//! The primary implementation is [`http::UreqTransport`], which talks to a
//! live server. [`MockTransport`] replays scripted responses for tests.
//!
//! # Testing
//!
//! ```
//! use restkit::{Method, MockTransport, Request, Response, Transport};
//!
//! let mock = MockTransport::new();
//! mock.reply(Method::Get, "/version", Response::json(200, r#"{"versions":{"checkmk":"2.3.0p1.cre"}}"#));
//!
//! let response = mock.send(&Request::get("/version")).unwrap();
//! assert_eq!(response.status, 200);
//! assert_eq!(mock.requests().len(), 1);
//! ```

pub mod http;

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// HTTP verbs used by the REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Whether this verb changes remote state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Get)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single API request, relative to the transport's API root.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Path below the versioned API prefix, e.g. `/objects/host_config/web01`.
    pub path: String,
    /// JSON payload for POST/PUT.
    pub body: Option<serde_json::Value>,
    /// Value for the `If-Match` header.
    pub if_match: Option<String>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            if_match: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Attach a JSON payload.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a concurrency token. Empty tokens are ignored.
    pub fn with_if_match(mut self, etag: impl Into<String>) -> Self {
        let etag = etag.into();
        if !etag.is_empty() {
            self.if_match = Some(etag);
        }
        self
    }
}

/// An HTTP response, whatever its status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    /// Value of the `ETag` header, if any.
    pub etag: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    /// Response with a status and no body.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Response with a JSON (or any text) body.
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into().into_bytes(),
            ..Self::default()
        }
    }

    /// Set the `ETag` header.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Parse the body as JSON. An empty body yields `None`.
    pub fn json_body(&self) -> Result<Option<serde_json::Value>> {
        if self.body.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&self.body)?))
    }
}

/// Something that can deliver a [`Request`] and return the raw [`Response`].
///
/// Implementations add authentication and content headers; they never
/// interpret the status code. An `Err` means no HTTP response was obtained.
pub trait Transport {
    fn send(&self, request: &Request) -> Result<Response>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &Request) -> Result<Response> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &Request) -> Result<Response> {
        (**self).send(request)
    }
}

/// A scripted reply: either a response or a transport failure.
#[derive(Debug, Clone)]
enum Reply {
    Respond(Response),
    Fail(String),
}

/// Mock transport for testing without network access.
///
/// Replies are queued per `(method, path)` and consumed in order; the last
/// reply for a route is repeated once the queue would otherwise run dry.
/// Every request is recorded for later assertions.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<HashMap<(Method, String), VecDeque<Reply>>>>,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MockTransport {
    /// Create a new mock with no scripted replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a route.
    pub fn reply(&self, method: Method, path: impl Into<String>, response: Response) {
        self.push(method, path.into(), Reply::Respond(response));
    }

    /// Queue a transport failure for a route.
    pub fn fail(&self, method: Method, path: impl Into<String>, message: impl Into<String>) {
        self.push(method, path.into(), Reply::Fail(message.into()));
    }

    /// All requests sent so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.requests).clone()
    }

    /// Requests that would have changed remote state.
    #[must_use]
    pub fn mutating_requests(&self) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.method.is_mutating())
            .collect()
    }

    /// Number of requests sent to a route.
    #[must_use]
    pub fn count(&self, method: Method, path: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn push(&self, method: Method, path: String, reply: Reply) {
        lock(&self.replies)
            .entry((method, path))
            .or_default()
            .push_back(reply);
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        lock(&self.requests).push(request.clone());

        let mut replies = lock(&self.replies);
        let queue = replies
            .get_mut(&(request.method, request.path.clone()))
            .ok_or_else(|| {
                Error::transport(format!(
                    "no mock reply for {} {}",
                    request.method, request.path
                ))
            })?;

        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(Error::transport(message)),
            None => Err(Error::transport("mock reply queue is empty")),
        }
    }
}

// A panicking test thread must not poison every later assertion.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_unscripted_route_is_transport_error() {
        let mock = MockTransport::new();
        let err = mock.send(&Request::get("/nowhere")).unwrap_err();
        assert!(err.to_string().contains("GET /nowhere"));
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn test_mock_replies_in_order_then_repeats_last() {
        let mock = MockTransport::new();
        mock.reply(Method::Get, "/job", Response::status(302));
        mock.reply(Method::Get, "/job", Response::status(204));

        let statuses: Vec<u16> = (0..3)
            .map(|_| mock.send(&Request::get("/job")).unwrap().status)
            .collect();
        assert_eq!(statuses, vec![302, 204, 204]);
        assert_eq!(mock.count(Method::Get, "/job"), 3);
    }

    #[test]
    fn test_mock_scripted_failure() {
        let mock = MockTransport::new();
        mock.fail(Method::Post, "/x", "connection reset");
        let err = mock
            .send(&Request::new(Method::Post, "/x").with_body(serde_json::json!({})))
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(mock.mutating_requests().len(), 1);
    }

    #[test]
    fn test_request_ignores_empty_etag() {
        let request = Request::new(Method::Put, "/x").with_if_match("");
        assert_eq!(request.if_match, None);

        let request = Request::new(Method::Put, "/x").with_if_match("\"abc\"");
        assert_eq!(request.if_match.as_deref(), Some("\"abc\""));
    }

    #[test]
    fn test_response_json_body() {
        assert_eq!(Response::status(204).json_body().unwrap(), None);

        let body = Response::json(200, r#"{"id":"web01"}"#).json_body().unwrap();
        assert_eq!(body.unwrap()["id"], "web01");

        assert!(Response::json(200, "<html>").json_body().is_err());
    }

    #[test]
    fn test_method_is_mutating() {
        assert!(!Method::Get.is_mutating());
        assert!(Method::Post.is_mutating());
        assert!(Method::Put.is_mutating());
        assert!(Method::Delete.is_mutating());
    }
}
