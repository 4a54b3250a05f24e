//! LDAP connections (`ldap_connection`)
//!
//! The API wraps most optional settings as `{"state": "enabled", ...}` and
//! keeps the identity under `general_properties`. Documents use the flat
//! form: `tcp_port = 636`, `connect_timeout = false`. Updates replace the
//! whole object, so the planned body is the server state with the document
//! laid over it.

use declarative::{
    Outcome, OutcomeTable, OutcomeTables, Presence, Resource, Rule, ValidationError, Wrap,
    collapse, expand, extensions, overlay, strip_fields, strip_server_fields,
};
use serde::Deserialize;
use serde_json::{Map, Value};

static OUTCOMES: OutcomeTables = OutcomeTables {
    get: OutcomeTable::with_api_errors(&[
        (200, Outcome::ok("LDAP connection {id} found.")),
        (404, Outcome::ok("LDAP connection {id} not found.")),
    ]),
    create: OutcomeTable::with_api_errors(&[(200, Outcome::changed("LDAP connection {id} created."))]),
    update: OutcomeTable::with_api_errors(&[
        (200, Outcome::changed("LDAP connection {id} updated.")),
        (404, Outcome::failure("LDAP connection {id} not found.")),
    ]),
    delete: OutcomeTable::with_api_errors(&[
        (204, Outcome::changed("LDAP connection {id} deleted.")),
        (404, Outcome::ok("LDAP connection {id} was already deleted.")),
    ]),
};

const CONNECTION: &[Rule] = &[
    ("tcp_port", Wrap::Enabled { key: "port" }),
    ("connect_timeout", Wrap::Enabled { key: "seconds" }),
    ("ldap_version", Wrap::Enabled { key: "version" }),
    ("page_size", Wrap::Enabled { key: "size" }),
    ("response_timeout", Wrap::Enabled { key: "seconds" }),
    ("connection_suffix", Wrap::Enabled { key: "suffix" }),
];

const USERS: &[Rule] = &[
    ("search_filter", Wrap::Enabled { key: "filter" }),
    ("filter_group", Wrap::Enabled { key: "filter" }),
    ("user_id_attribute", Wrap::Enabled { key: "attribute" }),
];

const GROUPS: &[Rule] = &[
    ("search_filter", Wrap::Enabled { key: "filter" }),
    ("member_attribute", Wrap::Enabled { key: "attribute" }),
];

const RULES: &[Rule] = &[
    ("id", Wrap::Nest { parent: "general_properties" }),
    ("description", Wrap::Nest { parent: "general_properties" }),
    ("comment", Wrap::Nest { parent: "general_properties" }),
    ("documentation_url", Wrap::Nest { parent: "general_properties" }),
    ("rule_activation", Wrap::Nest { parent: "general_properties" }),
    ("ldap_connection", Wrap::Table(CONNECTION)),
    ("users", Wrap::Table(USERS)),
    ("groups", Wrap::Table(GROUPS)),
];

/// Write-only secrets; the server never returns them
const SECRETS: &[&str] = &["explicit_password"];

#[derive(Debug, Clone, Deserialize)]
pub struct LdapConnection {
    pub id: String,
    #[serde(default)]
    pub state: Presence,
    /// Every other setting, in the flat document form
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl LdapConnection {
    fn document(&self) -> Value {
        let mut fields = self.settings.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(fields)
    }
}

impl Resource for LdapConnection {
    fn resource_type(&self) -> &'static str {
        "ldap_connection"
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn presence(&self) -> Presence {
        self.state
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("id"));
        }
        if self.state == Presence::Present && !self.settings.contains_key("ldap_connection") {
            return Err(ValidationError::MissingField("ldap_connection"));
        }
        Ok(())
    }

    fn object_path(&self) -> String {
        format!("/objects/ldap_connection/{}", self.id)
    }

    fn collection_path(&self) -> String {
        "/domain-types/ldap_connection/collections/all".to_string()
    }

    fn outcomes(&self) -> &'static OutcomeTables {
        &OUTCOMES
    }

    fn desired(&self) -> Value {
        strip_fields(&self.document(), SECRETS)
    }

    fn normalize(&self, body: &Value) -> Value {
        let api = strip_fields(&strip_server_fields(&extensions(body)), SECRETS);
        collapse(&api, RULES)
    }

    fn create_payload(&self) -> Value {
        expand(&self.document(), RULES)
    }

    fn update_payload(&self, current: &Value, _unset: &[String]) -> Value {
        expand(&overlay(current, &self.document()), RULES)
    }
}
