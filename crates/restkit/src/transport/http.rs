//! Live HTTP transport built on `ureq`.
//!
//! The agent is configured so that every HTTP status comes back as a
//! [`Response`] (no status-as-error) and redirects are never followed: the
//! wait-for-completion endpoints signal "still running" with a 302 that
//! callers need to see.

use crate::auth::Auth;
use crate::error::{Error, Result};
use crate::transport::{Method, Request, Response, Transport};
use std::time::Duration;

/// Versioned API prefix below the site root.
pub const API_PREFIX: &str = "check_mk/api/1.0";

/// Maximum accepted response size.
const MAX_BODY_SIZE: u64 = 16 * 1024 * 1024;

const USER_AGENT: &str = concat!("cmk-converge/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`UreqTransport`].
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Scheme and host, e.g. `https://monitoring.example.com`.
    pub server_url: String,
    /// Site name, the first path segment below the host.
    pub site: String,
    pub auth: Auth,
    pub validate_certs: bool,
    pub timeout: Duration,
}

/// Transport that talks to a live server.
pub struct UreqTransport {
    agent: ureq::Agent,
    api_root: String,
    auth_header: (&'static str, String),
}

impl UreqTransport {
    /// Create a transport from connection settings.
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let api_root = api_root(&settings.server_url, &settings.site)?;

        let tls = ureq::tls::TlsConfig::builder()
            .disable_verification(!settings.validate_certs)
            .build();

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .timeout_global(Some(settings.timeout))
            .tls_config(tls)
            .build()
            .into();

        Ok(Self {
            agent,
            api_root,
            auth_header: settings.auth.header(),
        })
    }

    /// The absolute URL requests are resolved against.
    #[must_use]
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, path.trim_start_matches('/'))
    }

    fn decorate<B>(&self, builder: ureq::RequestBuilder<B>, request: &Request) -> ureq::RequestBuilder<B> {
        let (name, value) = &self.auth_header;
        let mut builder = builder
            .header(*name, value.as_str())
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT);
        if let Some(etag) = &request.if_match {
            builder = builder.header("If-Match", etag.as_str());
        }
        builder
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        let url = self.url(&request.path);
        let payload = match &request.body {
            Some(body) => serde_json::to_vec(body)?,
            None => Vec::new(),
        };

        log::debug!("{} {}", request.method, url);

        let result = match request.method {
            Method::Get => self.decorate(self.agent.get(&url), request).call(),
            Method::Delete => self.decorate(self.agent.delete(&url), request).call(),
            Method::Post => self
                .decorate(self.agent.post(&url), request)
                .header("Content-Type", "application/json")
                .send(payload.as_slice()),
            Method::Put => self
                .decorate(self.agent.put(&url), request)
                .header("Content-Type", "application/json")
                .send(payload.as_slice()),
        };

        let mut response = result.map_err(Error::from)?;
        let status = response.status().as_u16();
        let etag = response
            .headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .map_err(Error::from)?;

        log::trace!("{} {} -> {} ({} bytes)", request.method, url, status, body.len());

        Ok(Response {
            status,
            etag,
            body,
        })
    }
}

/// Join server URL, site and API prefix into the API root.
pub fn api_root(server_url: &str, site: &str) -> Result<String> {
    let server_url = server_url.trim_end_matches('/');
    if !(server_url.starts_with("http://") || server_url.starts_with("https://")) {
        return Err(Error::InvalidUrl(format!(
            "{server_url} (expected http:// or https://)"
        )));
    }
    let site = site.trim_matches('/');
    if site.is_empty() || site.contains('/') {
        return Err(Error::InvalidUrl(format!("site {site:?} is not a single path segment")));
    }
    Ok(format!("{server_url}/{site}/{API_PREFIX}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthKind;

    fn settings(url: &str) -> HttpSettings {
        HttpSettings {
            server_url: url.to_string(),
            site: "mysite".to_string(),
            auth: Auth::from_parts(AuthKind::Bearer, "mysite", "automation", "secret").unwrap(),
            validate_certs: true,
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_api_root() {
        assert_eq!(
            api_root("https://cmk.example.com/", "mysite").unwrap(),
            "https://cmk.example.com/mysite/check_mk/api/1.0"
        );
    }

    #[test]
    fn test_api_root_rejects_bad_input() {
        assert!(api_root("cmk.example.com", "mysite").is_err());
        assert!(api_root("https://cmk.example.com", "").is_err());
        assert!(api_root("https://cmk.example.com", "a/b").is_err());
    }

    #[test]
    fn test_url_joins_paths() {
        let transport = UreqTransport::new(&settings("http://localhost:5000")).unwrap();
        assert_eq!(
            transport.url("/objects/host_config/web01"),
            "http://localhost:5000/mysite/check_mk/api/1.0/objects/host_config/web01"
        );
        assert_eq!(transport.url("version"), format!("{}/version", transport.api_root()));
    }
}
