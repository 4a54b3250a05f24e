//! Server version parsing and ordering.
//!
//! Versions look like `2.2.0p12.cre`, `2.3.0b4`, `2.1.0i1` or plain `2.2.0`.
//! Within one base version, innovation (`i`) releases sort before betas
//! (`b`), betas before the stable release, and the stable release before
//! its patch releases (`p`). The trailing edition does not affect ordering.

use crate::error::{Error, Result};
use crate::transport::{Request, Transport};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:([ibp])(\d+))?(?:\.([a-z]+))?$")
        .expect("version regex is valid")
});

/// Release channel of a version, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Innovation(u32),
    Beta(u32),
    Stable,
    Patch(u32),
}

/// A parsed server version.
///
/// Equality and ordering ignore the edition.
#[derive(Debug, Clone)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub sub: u32,
    pub stage: Stage,
    /// Edition suffix such as `cre`, `cee`, `cce`, `cme`, `cse`.
    pub edition: Option<String>,
}

impl Version {
    /// A stable version without edition.
    #[must_use]
    pub fn new(major: u32, minor: u32, sub: u32) -> Self {
        Self {
            major,
            minor,
            sub,
            stage: Stage::Stable,
            edition: None,
        }
    }

    /// Whether this version is at least `minimum`.
    #[must_use]
    pub fn at_least(&self, minimum: &Version) -> bool {
        self >= minimum
    }

    /// The `major.minor.sub` part.
    #[must_use]
    pub fn base(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.sub)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base()
            .cmp(&other.base())
            .then_with(|| self.stage.cmp(&other.stage))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let caps = VERSION_RE
            .captures(trimmed)
            .ok_or_else(|| Error::InvalidVersion(s.to_string()))?;

        let number = |i: usize| -> Result<u32> {
            caps.get(i)
                .map_or(Ok(0), |m| m.as_str().parse::<u32>())
                .map_err(|_| Error::InvalidVersion(s.to_string()))
        };

        let stage = match caps.get(4).map(|m| m.as_str()) {
            Some("i") => Stage::Innovation(number(5)?),
            Some("b") => Stage::Beta(number(5)?),
            Some("p") => Stage::Patch(number(5)?),
            _ => Stage::Stable,
        };

        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            sub: number(3)?,
            stage,
            edition: caps.get(6).map(|m| m.as_str().to_string()),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.sub)?;
        match self.stage {
            Stage::Innovation(n) => write!(f, "i{n}")?,
            Stage::Beta(n) => write!(f, "b{n}")?,
            Stage::Patch(n) => write!(f, "p{n}")?,
            Stage::Stable => {}
        }
        if let Some(edition) = &self.edition {
            write!(f, ".{edition}")?;
        }
        Ok(())
    }
}

/// Ask the server which version it runs (`GET /version`).
pub fn fetch_version(transport: &dyn Transport) -> Result<Version> {
    let response = transport.send(&Request::get("/version"))?;
    if response.status != 200 {
        return Err(Error::InvalidResponse(format!(
            "GET /version returned HTTP {}",
            response.status
        )));
    }

    let body = response
        .json_body()?
        .ok_or_else(|| Error::InvalidResponse("empty /version response".to_string()))?;
    let raw = body
        .pointer("/versions/checkmk")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| Error::InvalidResponse("missing versions.checkmk".to_string()))?;

    raw.parse()
}
