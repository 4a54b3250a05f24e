//! # restkit
//!
//! Blocking REST transport for the Checkmk API.
//!
//! This crate provides:
//! - A [`Transport`] trait that delivers a [`Request`] and returns the raw
//!   [`Response`], whatever its HTTP status
//! - [`UreqTransport`] for live servers (auth headers, `If-Match`, no
//!   redirect following)
//! - [`MockTransport`] for tests
//! - [`Version`] parsing and ordering for feature gates
//!
//! ## Example
//!
//! ```no_run
//! use restkit::{Auth, AuthKind, HttpSettings, Request, Transport, UreqTransport};
//! use std::time::Duration;
//!
//! let transport = UreqTransport::new(&HttpSettings {
//!     server_url: "https://monitoring.example.com".to_string(),
//!     site: "mysite".to_string(),
//!     auth: Auth::from_parts(AuthKind::Bearer, "mysite", "automation", "secret")?,
//!     validate_certs: true,
//!     timeout: Duration::from_secs(30),
//! })?;
//!
//! let response = transport.send(&Request::get("/objects/host_config/web01"))?;
//! println!("HTTP {}", response.status);
//! # Ok::<(), restkit::Error>(())
//! ```

pub mod auth;
pub mod error;
pub mod transport;
pub mod version;

pub use auth::{Auth, AuthKind};
pub use error::{Error, ErrorCategory, Result};
pub use transport::http::{HttpSettings, UreqTransport};
pub use transport::{Method, MockTransport, Request, Response, Transport};
pub use version::{Stage, Version, fetch_version};
