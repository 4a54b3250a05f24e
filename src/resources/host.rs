//! Hosts (`host_config`)
//!
//! A host in the wrong folder is moved first, then updated. When the
//! document declares `attributes`, that map is authoritative: attributes
//! present on the server but missing from the document are removed.

use super::NAME_PATTERN;
use super::folder::{folder_ident, normalize_path};
use declarative::{
    Outcome, OutcomeTable, OutcomeTables, Presence, Relocation, RemovalPolicy, Resource,
    ValidationError, extensions, strip_server_fields,
};
use restkit::{Method, Request};
use serde::Deserialize;
use serde_json::{Map, Value, json};

static OUTCOMES: OutcomeTables = OutcomeTables {
    get: OutcomeTable::with_api_errors(&[
        (200, Outcome::ok("Host {id} found.")),
        (404, Outcome::ok("Host {id} not found.")),
    ]),
    create: OutcomeTable::with_api_errors(&[
        (200, Outcome::changed("Host {id} created.")),
        (404, Outcome::failure("The folder for host {id} does not exist.")),
    ]),
    update: OutcomeTable::with_api_errors(&[
        (200, Outcome::changed("Host {id} updated.")),
        (404, Outcome::failure("Host {id} not found.")),
    ]),
    delete: OutcomeTable::with_api_errors(&[
        (204, Outcome::changed("Host {id} deleted.")),
        (404, Outcome::ok("Host {id} was already deleted.")),
    ]),
};

const MOVE: OutcomeTable = OutcomeTable::with_api_errors(&[
    (200, Outcome::changed("Host {id} moved.")),
    (404, Outcome::failure("Host {id} or its target folder not found.")),
]);

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Host {
    pub name: String,
    #[serde(default = "root_folder")]
    pub folder: String,
    #[serde(default)]
    pub attributes: Option<Map<String, Value>>,
    #[serde(default)]
    pub state: Presence,
}

fn root_folder() -> String {
    "/".to_string()
}

impl Resource for Host {
    fn resource_type(&self) -> &'static str {
        "host"
    }

    fn id(&self) -> String {
        self.name.clone()
    }

    fn presence(&self) -> Presence {
        self.state
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if !NAME_PATTERN.is_match(&self.name) {
            return Err(ValidationError::InvalidValue {
                field: "name",
                message: format!("{:?} contains characters a host name cannot have", self.name),
            });
        }
        Ok(())
    }

    fn object_path(&self) -> String {
        format!("/objects/host_config/{}", self.name)
    }

    fn collection_path(&self) -> String {
        "/domain-types/host_config/collections/all".to_string()
    }

    fn outcomes(&self) -> &'static OutcomeTables {
        &OUTCOMES
    }

    fn desired(&self) -> Value {
        json!({
            "folder": normalize_path(&self.folder),
            "attributes": self.attributes,
        })
    }

    fn normalize(&self, body: &Value) -> Value {
        let ext = strip_server_fields(&extensions(body));
        let folder = ext.get("folder").and_then(Value::as_str).unwrap_or("/");
        json!({
            "folder": normalize_path(folder),
            "attributes": ext.get("attributes").cloned().unwrap_or_else(|| json!({})),
        })
    }

    fn create_payload(&self) -> Value {
        json!({
            "host_name": self.name,
            "folder": folder_ident(&self.folder),
            "attributes": self.attributes.clone().unwrap_or_default(),
        })
    }

    /// Attribute changes only touch the declared keys; when keys must go,
    /// the full map replaces the server's.
    fn update_payload(&self, _current: &Value, unset: &[String]) -> Value {
        let attributes = self.attributes.clone().unwrap_or_default();
        if unset.is_empty() {
            json!({ "update_attributes": attributes })
        } else {
            json!({ "attributes": attributes })
        }
    }

    fn removal_policy(&self) -> RemovalPolicy {
        RemovalPolicy::UnsetList {
            scope: Some("attributes"),
        }
    }

    fn relocation(&self, current: &Value) -> Option<Relocation> {
        let target = normalize_path(&self.folder);
        let actual = current.get("folder").and_then(Value::as_str).unwrap_or("/");
        if actual == target {
            return None;
        }
        Some(Relocation {
            request: Request::new(
                Method::Post,
                format!("/objects/host_config/{}/actions/move/invoke", self.name),
            )
            .with_body(json!({ "target_folder": folder_ident(&target) })),
            table: MOVE,
            field: "folder",
            target: Value::String(target),
        })
    }
}
