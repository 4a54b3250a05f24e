//! Checkmk objects managed through the reconciliation engine
//!
//! Every kind is a configuration record for [`declarative::Resource`]:
//! endpoint paths, per-verb outcome tables, normalization and payload
//! builders. Discovery and activation are asynchronous jobs and live in
//! their own modules.

pub mod activation;
pub mod discovery;
pub mod folder;
pub mod group;
pub mod host;
pub mod ldap_connection;
pub mod user;

use crate::cli::ResourceKind;
use declarative::Resource;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Object names accepted by the API for hosts and groups
pub(crate) static NAME_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[-0-9a-zA-Z_.]+$").expect("name pattern is valid")
});

/// Errors reading a desired-state document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unsupported document format {extension:?} (expected .json or .toml)")]
    UnsupportedFormat { extension: String },

    #[error("could not parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("item {index} of {path}: {message}")]
    InvalidItem {
        path: PathBuf,
        index: usize,
        message: String,
    },
}

/// Load every object of one kind from a JSON or TOML document.
///
/// A document is either a single object or a table with an `items` list.
pub fn load(kind: ResourceKind, path: &Path) -> Result<Vec<Box<dyn Resource>>, DocumentError> {
    let items = read_items(path)?;
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| build(kind, item).map_err(|message| DocumentError::InvalidItem {
            path: path.to_path_buf(),
            index,
            message,
        }))
        .collect()
}

fn build(kind: ResourceKind, item: Value) -> Result<Box<dyn Resource>, String> {
    Ok(match kind {
        ResourceKind::Folder => boxed::<folder::Folder>(item)?,
        ResourceKind::Host => boxed::<host::Host>(item)?,
        ResourceKind::HostGroup => {
            Box::new(parse::<group::Group>(item)?.with_kind(group::GroupKind::Host))
        }
        ResourceKind::ServiceGroup => {
            Box::new(parse::<group::Group>(item)?.with_kind(group::GroupKind::Service))
        }
        ResourceKind::ContactGroup => {
            Box::new(parse::<group::Group>(item)?.with_kind(group::GroupKind::Contact))
        }
        ResourceKind::User => boxed::<user::User>(item)?,
        ResourceKind::LdapConnection => boxed::<ldap_connection::LdapConnection>(item)?,
    })
}

fn parse<T: DeserializeOwned>(item: Value) -> Result<T, String> {
    serde_json::from_value(item).map_err(|e| e.to_string())
}

fn boxed<T: DeserializeOwned + Resource + 'static>(item: Value) -> Result<Box<dyn Resource>, String> {
    Ok(Box::new(parse::<T>(item)?))
}

fn read_items(path: &Path) -> Result<Vec<Value>, DocumentError> {
    let content = fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document = parse_document(path, &content)?;

    Ok(match document {
        Value::Object(mut map) if map.contains_key("items") => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(DocumentError::Parse {
                    path: path.to_path_buf(),
                    message: "`items` must be a list".to_string(),
                });
            }
        },
        Value::Array(items) => items,
        other => vec![other],
    })
}

fn parse_document(path: &Path, content: &str) -> Result<Value, DocumentError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let parsed = match extension.as_str() {
        "json" => serde_json::from_str::<Value>(content).map_err(|e| e.to_string()),
        "toml" => toml::from_str::<Value>(content).map_err(|e| e.to_string()),
        _ => return Err(DocumentError::UnsupportedFormat { extension }),
    };
    parsed.map_err(|message| DocumentError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Copy of a JSON object without `null` members
pub(crate) fn without_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => other,
    }
}
