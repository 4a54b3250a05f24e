//! Folders (`folder_config`)
//!
//! Attributes are an overlay: attributes the document does not mention are
//! left as they are on the server.

use super::without_nulls;
use declarative::{
    Outcome, OutcomeTable, OutcomeTables, Presence, Resource, ValidationError, extensions,
    strip_server_fields,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

static OUTCOMES: OutcomeTables = OutcomeTables {
    get: OutcomeTable::with_api_errors(&[
        (200, Outcome::ok("Folder {id} found.")),
        (404, Outcome::ok("Folder {id} not found.")),
    ]),
    create: OutcomeTable::with_api_errors(&[
        (200, Outcome::changed("Folder {id} created.")),
        (404, Outcome::failure("The parent folder of {id} does not exist.")),
    ]),
    update: OutcomeTable::with_api_errors(&[
        (200, Outcome::changed("Folder {id} updated.")),
        (404, Outcome::failure("Folder {id} not found.")),
    ]),
    delete: OutcomeTable::with_api_errors(&[
        (204, Outcome::changed("Folder {id} deleted.")),
        (404, Outcome::ok("Folder {id} was already deleted.")),
        (409, Outcome::failure("Folder {id} is not empty.")),
    ]),
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Folder {
    /// Slash-separated path, e.g. `/linux/web`
    pub path: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub attributes: Option<Map<String, Value>>,
    #[serde(default)]
    pub state: Presence,
}

impl Folder {
    fn normalized_path(&self) -> String {
        normalize_path(&self.path)
    }

    fn name(&self) -> String {
        self.normalized_path()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    fn parent(&self) -> String {
        let path = self.normalized_path();
        match path.rsplit_once('/') {
            Some(("", _)) | None => "/".to_string(),
            Some((parent, _)) => parent.to_string(),
        }
    }
}

impl Resource for Folder {
    fn resource_type(&self) -> &'static str {
        "folder"
    }

    fn id(&self) -> String {
        self.normalized_path()
    }

    fn presence(&self) -> Presence {
        self.state
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if !(self.path.starts_with('/') || self.path.starts_with('~')) {
            return Err(ValidationError::InvalidValue {
                field: "path",
                message: format!("{:?} must start with '/'", self.path),
            });
        }
        if self.normalized_path() == "/" && self.state == Presence::Absent {
            return Err(ValidationError::InvalidValue {
                field: "path",
                message: "the root folder cannot be removed".to_string(),
            });
        }
        Ok(())
    }

    fn object_path(&self) -> String {
        format!("/objects/folder_config/{}", folder_ident(&self.path))
    }

    fn collection_path(&self) -> String {
        "/domain-types/folder_config/collections/all".to_string()
    }

    fn outcomes(&self) -> &'static OutcomeTables {
        &OUTCOMES
    }

    fn desired(&self) -> Value {
        json!({ "title": self.title, "attributes": self.attributes })
    }

    fn normalize(&self, body: &Value) -> Value {
        let ext = strip_server_fields(&extensions(body));
        json!({
            "title": body.get("title").cloned().unwrap_or(Value::Null),
            "attributes": ext.get("attributes").cloned().unwrap_or_else(|| json!({})),
        })
    }

    fn create_payload(&self) -> Value {
        json!({
            "name": self.name(),
            "title": self.title.clone().unwrap_or_else(|| self.name()),
            "parent": folder_ident(&self.parent()),
            "attributes": self.attributes.clone().unwrap_or_default(),
        })
    }

    fn update_payload(&self, _current: &Value, _unset: &[String]) -> Value {
        without_nulls(json!({
            "title": self.title,
            "update_attributes": self.attributes,
        }))
    }
}

/// `~a~b`, `/a/b/` and `a/b` all become `/a/b`; empty becomes `/`
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split(['/', '~'])
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

/// The path form used in URLs: `/a/b` becomes `~a~b`, the root is `~`
pub fn folder_ident(path: &str) -> String {
    normalize_path(path).replace('/', "~")
}
