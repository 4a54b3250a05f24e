//! Resource trait: the configuration record the engine is parameterized by
//!
//! A resource is not a hand-written reconciliation routine. It only declares
//! where it lives, how its status codes are classified, how the API
//! representation is normalized, and how request payloads are built; the
//! [`executor`](crate::executor) runs the same fetch/diff/apply protocol
//! for every resource.

use crate::outcome::{OutcomeTable, OutcomeTables};
use restkit::{Method, Request};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Keys the server adds that are never user-settable
pub const SERVER_ONLY_FIELDS: &[&str] = &["meta_data", "links", "domainType"];

/// Whether the caller wants the resource to exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    #[default]
    Present,
    Absent,
}

/// How a resource signals removal of fields the caller no longer declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Omitted fields are left alone (desired state is an overlay)
    Ignore,
    /// Omitted fields are listed explicitly for removal; `scope` names the
    /// sub-object the comparison runs on (e.g. `attributes`)
    UnsetList { scope: Option<&'static str> },
}

/// A move of the resource to another container, run before any update
#[derive(Debug, Clone)]
pub struct Relocation {
    /// The move request, without concurrency token
    pub request: Request,
    pub table: OutcomeTable,
    /// Field of the normalized state that the move changes
    pub field: &'static str,
    /// Value of `field` after the move
    pub target: Value,
}

/// Local validation failure, detected before any network call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

/// Core trait for all reconciled resources
pub trait Resource: fmt::Debug {
    /// Resource type category (e.g., "host", "folder", "host_group")
    fn resource_type(&self) -> &'static str;

    /// Identifier used in paths and messages
    fn id(&self) -> String;

    fn presence(&self) -> Presence;

    /// Check the desired state before touching the network
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Path of the single object (GET/PUT/DELETE)
    fn object_path(&self) -> String;

    /// Path new objects are POSTed to
    fn collection_path(&self) -> String;

    fn outcomes(&self) -> &'static OutcomeTables;

    /// The desired state, in the same shape [`normalize`](Self::normalize)
    /// produces, restricted to what the caller declared
    fn desired(&self) -> Value;

    /// Turn an API response body into comparable current state
    ///
    /// Must be idempotent and strip exactly the server-only fields.
    fn normalize(&self, body: &Value) -> Value {
        strip_server_fields(&extensions(body))
    }

    /// Payload for creating the resource
    fn create_payload(&self) -> Value;

    /// Payload for updating the resource
    ///
    /// `current` is the normalized server state; `unset` lists fields to
    /// remove under [`RemovalPolicy::UnsetList`].
    fn update_payload(&self, current: &Value, unset: &[String]) -> Value;

    fn update_method(&self) -> Method {
        Method::Put
    }

    fn removal_policy(&self) -> RemovalPolicy {
        RemovalPolicy::Ignore
    }

    /// A move that must happen before the update, if the current state is
    /// in the wrong container
    fn relocation(&self, _current: &Value) -> Option<Relocation> {
        None
    }

    fn delete_request(&self) -> Request {
        Request::new(Method::Delete, self.object_path())
    }
}

/// The `extensions` object of a domain object, or the body itself
pub fn extensions(body: &Value) -> Value {
    body.get("extensions")
        .filter(|e| e.is_object())
        .cloned()
        .unwrap_or_else(|| body.clone())
}

/// Remove [`SERVER_ONLY_FIELDS`] at every depth
pub fn strip_server_fields(value: &Value) -> Value {
    strip_fields(value, SERVER_ONLY_FIELDS)
}

/// Remove the named keys at every depth
pub fn strip_fields(value: &Value, fields: &[&str]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !fields.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), strip_fields(v, fields)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| strip_fields(v, fields)).collect()),
        other => other.clone(),
    }
}

/// Keep only the named keys of an object
pub fn pick(value: &Value, keys: &[&str]) -> Value {
    Value::Object(
        keys.iter()
            .filter_map(|k| value.get(*k).map(|v| ((*k).to_string(), v.clone())))
            .collect(),
    )
}
