//! Connection settings: config file merged with CLI flags and environment

use crate::cli::ConnectionArgs;
use crate::paths;
use anyhow::{Context, Result, bail};
use declarative::PollOptions;
use restkit::{Auth, AuthKind, HttpSettings};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Contents of `config.toml`; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server_url: Option<String>,
    pub site: Option<String>,
    pub automation_user: Option<String>,
    pub automation_secret: Option<String>,
    pub auth: AuthKind,
    pub validate_certs: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub poll_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Load the file at `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Load the explicitly given file, or the default one
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                let path = paths::expand(&path.to_string_lossy());
                if !path.exists() {
                    bail!("Config file {} does not exist", path.display());
                }
                Self::load_from(&path)
            }
            None => Self::load_from(&paths::config_file()?),
        }
    }
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub http: HttpSettings,
    pub poll: PollOptions,
}

impl Settings {
    /// Merge file values with flags; flags and environment win
    pub fn resolve(file: FileConfig, args: &ConnectionArgs) -> Result<Self> {
        let server_url = pick(&args.server_url, file.server_url)
            .context("No server URL configured (set server_url or pass --server-url)")?;
        let site = pick(&args.site, file.site)
            .context("No site configured (set site or pass --site)")?;
        let user = pick(&args.automation_user, file.automation_user).unwrap_or_default();
        let secret = pick(&args.automation_secret, file.automation_secret)
            .context("No automation secret configured (set automation_secret or CMK_AUTOMATION_SECRET)")?;

        let auth = Auth::from_parts(file.auth, &site, &user, &secret)?;
        let validate_certs = !args.insecure && file.validate_certs.unwrap_or(true);
        if !validate_certs {
            log::warn!("TLS certificate validation is disabled");
        }

        let defaults = PollOptions::default();
        let poll = PollOptions::new(
            file.poll_interval_secs
                .map_or(defaults.interval, Duration::from_secs),
            file.poll_timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
        );

        Ok(Self {
            http: HttpSettings {
                server_url: server_url.trim_end_matches('/').to_string(),
                site,
                auth,
                validate_certs,
                timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            },
            poll,
        })
    }

    /// Poll options with the timeout replaced, if given
    pub fn poll_with_timeout(&self, timeout_secs: Option<u64>) -> PollOptions {
        let mut poll = self.poll.clone();
        if let Some(secs) = timeout_secs {
            poll.timeout = Duration::from_secs(secs);
        }
        poll
    }
}

/// Load and resolve in one step
pub fn load(args: &ConnectionArgs) -> Result<Settings> {
    let file = FileConfig::load(args.config.as_deref())?;
    Settings::resolve(file, args)
}

fn pick(flag: &Option<String>, file: Option<String>) -> Option<String> {
    flag.clone()
        .filter(|v| !v.is_empty())
        .or(file.filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn full_file() -> FileConfig {
        toml::from_str(
            r#"
server_url = "https://cmk.example.com/"
site = "prod"
automation_user = "automation"
automation_secret = "s3cret"
poll_interval_secs = 1
poll_timeout_secs = 60
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
server_url = "https://cmk.example.com"
site = "prod"
auth = "basic"
validate_certs = false
timeout_secs = 10
"#,
        );
        let config = FileConfig::load_from(file.path()).unwrap();
        assert_eq!(config.site.as_deref(), Some("prod"));
        assert_eq!(config.auth, AuthKind::Basic);
        assert_eq!(config.validate_certs, Some(false));
        assert_eq!(config.timeout_secs, Some(10));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(config.server_url.is_none());
        assert_eq!(config.auth, AuthKind::Bearer);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let file = write_config("server = \"x\"\n");
        assert!(FileConfig::load_from(file.path()).is_err());
    }

    #[test]
    fn test_resolve_from_file() {
        let settings = Settings::resolve(full_file(), &ConnectionArgs::default()).unwrap();
        assert_eq!(settings.http.server_url, "https://cmk.example.com");
        assert_eq!(settings.http.site, "prod");
        assert!(settings.http.validate_certs);
        assert_eq!(settings.http.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(settings.poll.interval, Duration::from_secs(1));
        assert_eq!(settings.poll.timeout, Duration::from_secs(60));
        assert_eq!(
            settings.http.auth,
            Auth::Bearer {
                user: "automation".to_string(),
                secret: "s3cret".to_string()
            }
        );
    }

    #[test]
    fn test_flags_override_file() {
        let args = ConnectionArgs {
            site: Some("staging".to_string()),
            insecure: true,
            ..ConnectionArgs::default()
        };
        let settings = Settings::resolve(full_file(), &args).unwrap();
        assert_eq!(settings.http.site, "staging");
        assert!(!settings.http.validate_certs);
    }

    #[test]
    fn test_missing_server_url_is_error() {
        let err = Settings::resolve(FileConfig::default(), &ConnectionArgs::default()).unwrap_err();
        assert!(err.to_string().contains("server URL"));
    }

    #[test]
    fn test_poll_timeout_override() {
        let settings = Settings::resolve(full_file(), &ConnectionArgs::default()).unwrap();
        assert_eq!(settings.poll_with_timeout(Some(5)).timeout, Duration::from_secs(5));
        assert_eq!(settings.poll_with_timeout(None).timeout, Duration::from_secs(60));
    }
}
