//! Host, service and contact groups
//!
//! The three group kinds share one shape and differ only in the endpoint.

use super::NAME_PATTERN;
use declarative::{
    Outcome, OutcomeTable, OutcomeTables, Presence, Resource, ValidationError, extensions,
};
use serde::Deserialize;
use serde_json::{Value, json};

static OUTCOMES: OutcomeTables = OutcomeTables {
    get: OutcomeTable::with_api_errors(&[
        (200, Outcome::ok("Group {id} found.")),
        (404, Outcome::ok("Group {id} not found.")),
    ]),
    create: OutcomeTable::with_api_errors(&[(200, Outcome::changed("Group {id} created."))]),
    update: OutcomeTable::with_api_errors(&[
        (200, Outcome::changed("Group {id} updated.")),
        (404, Outcome::failure("Group {id} not found.")),
    ]),
    delete: OutcomeTable::with_api_errors(&[
        (204, Outcome::changed("Group {id} deleted.")),
        (404, Outcome::ok("Group {id} was already deleted.")),
        (409, Outcome::failure("Group {id} is still in use.")),
    ]),
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupKind {
    #[default]
    Host,
    Service,
    Contact,
}

impl GroupKind {
    fn domain_type(self) -> &'static str {
        match self {
            Self::Host => "host_group_config",
            Self::Service => "service_group_config",
            Self::Contact => "contact_group_config",
        }
    }

    fn resource_type(self) -> &'static str {
        match self {
            Self::Host => "host_group",
            Self::Service => "service_group",
            Self::Contact => "contact_group",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub state: Presence,
    #[serde(skip)]
    kind: GroupKind,
}

impl Group {
    #[cfg(test)]
    pub fn new(kind: GroupKind, name: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            name: name.into(),
            alias,
            state: Presence::Present,
            kind,
        }
    }

    pub fn with_kind(mut self, kind: GroupKind) -> Self {
        self.kind = kind;
        self
    }
}

impl Resource for Group {
    fn resource_type(&self) -> &'static str {
        self.kind.resource_type()
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
                message: format!("{:?} is not a valid group name", self.name),
            });
        }
        Ok(())
    }

    fn object_path(&self) -> String {
        format!("/objects/{}/{}", self.kind.domain_type(), self.name)
    }

    fn collection_path(&self) -> String {
        format!("/domain-types/{}/collections/all", self.kind.domain_type())
    }

    fn outcomes(&self) -> &'static OutcomeTables {
        &OUTCOMES
    }

    fn desired(&self) -> Value {
        json!({ "alias": self.alias })
    }

    fn normalize(&self, body: &Value) -> Value {
        let alias = extensions(body)
            .get("alias")
            .or_else(|| body.get("title"))
            .cloned()
            .unwrap_or(Value::Null);
        json!({ "alias": alias })
    }

    fn create_payload(&self) -> Value {
        json!({
            "name": self.name,
            "alias": self.alias.clone().unwrap_or_else(|| self.name.clone()),
        })
    }

    fn update_payload(&self, _current: &Value, _unset: &[String]) -> Value {
        json!({ "alias": self.alias })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{ExecuteOptions, RunLog, reconcile};
    use restkit::{Method, MockTransport, Response};

    #[test]
    fn test_paths_follow_kind() {
        let group = Group::new(GroupKind::Service, "web", None);
        assert_eq!(group.object_path(), "/objects/service_group_config/web");
        assert_eq!(
            group.collection_path(),
            "/domain-types/service_group_config/collections/all"
        );
        assert_eq!(group.resource_type(), "service_group");
    }

    #[test]
    fn test_alias_defaults_to_name_on_create() {
        let group = Group::new(GroupKind::Host, "web", None);
        assert_eq!(group.create_payload(), json!({"name": "web", "alias": "web"}));
    }

    #[test]
    fn test_normalize_falls_back_to_title() {
        let group = Group::new(GroupKind::Contact, "ops", None);
        let body = json!({"id": "ops", "title": "Operations", "extensions": {}});
        assert_eq!(group.normalize(&body), json!({"alias": "Operations"}));
    }

    #[test]
    fn test_create_contact_group() {
        let mock = MockTransport::new();
        let path = "/objects/contact_group_config/ops";
        let collection = "/domain-types/contact_group_config/collections/all";
        mock.reply(Method::Get, path, Response::status(404));
        mock.reply(
            Method::Post,
            collection,
            Response::json(200, r#"{"id":"ops","extensions":{"alias":"Operations"}}"#),
        );

        let group = Group::new(GroupKind::Contact, "ops", Some("Operations".to_string()));
        let mut log = RunLog::new();
        let outcome = reconcile(&mock, &group, &ExecuteOptions::default(), &mut log);

        assert!(outcome.result.changed);
        assert!(!outcome.result.failed);
        assert_eq!(outcome.result.status_code, 200);
        assert_eq!(
            outcome.report().content,
            Some(json!({"id": "ops", "extensions": {"alias": "Operations"}}))
        );
    }

    #[test]
    fn test_group_in_use_cannot_be_deleted() {
        let mock = MockTransport::new();
        let path = "/objects/host_group_config/web";
        mock.reply(
            Method::Get,
            path,
            Response::json(200, r#"{"extensions":{"alias":"Web"}}"#),
        );
        mock.reply(Method::Delete, path, Response::status(409));

        let mut group = Group::new(GroupKind::Host, "web", None);
        group.state = Presence::Absent;
        let mut log = RunLog::new();
        let outcome = reconcile(&mock, &group, &ExecuteOptions::default(), &mut log);

        assert!(outcome.result.failed);
        assert!(outcome.result.message.contains("still in use"));
    }
}
