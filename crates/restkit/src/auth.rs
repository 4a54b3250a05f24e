//! Authentication schemes accepted by the REST API.

use crate::error::{Error, Result};
use base64::Engine;
use serde::Deserialize;

/// How requests authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// `Authorization: Bearer <user> <secret>` (automation user).
    Bearer { user: String, secret: String },
    /// `Authorization: Basic base64(<user>:<secret>)`.
    Basic { user: String, secret: String },
    /// Session cookie issued by the web UI (`auth_<site>=<value>`).
    Cookie { site: String, value: String },
}

/// Scheme selector used in configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    #[default]
    Bearer,
    Basic,
    Cookie,
}

impl Auth {
    /// Build credentials from the two configured fields.
    ///
    /// For [`AuthKind::Cookie`] the secret is the cookie value.
    pub fn from_parts(kind: AuthKind, site: &str, user: &str, secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::InvalidCredentials("secret is empty".to_string()));
        }
        if kind != AuthKind::Cookie && user.is_empty() {
            return Err(Error::InvalidCredentials("user is empty".to_string()));
        }

        Ok(match kind {
            AuthKind::Bearer => Self::Bearer {
                user: user.to_string(),
                secret: secret.to_string(),
            },
            AuthKind::Basic => Self::Basic {
                user: user.to_string(),
                secret: secret.to_string(),
            },
            AuthKind::Cookie => Self::Cookie {
                site: site.to_string(),
                value: secret.to_string(),
            },
        })
    }

    /// The header name and value carrying these credentials.
    #[must_use]
    pub fn header(&self) -> (&'static str, String) {
        match self {
            Self::Bearer { user, secret } => ("Authorization", format!("Bearer {user} {secret}")),
            Self::Basic { user, secret } => {
                let encoded =
                    base64::engine::general_purpose::STANDARD.encode(format!("{user}:{secret}"));
                ("Authorization", format!("Basic {encoded}"))
            }
            Self::Cookie { site, value } => ("Cookie", format!("auth_{site}={value}")),
        }
    }
}
