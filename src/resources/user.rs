//! Users (`user_config`)
//!
//! Contact settings are flat in the document and nested under
//! `contact_options` on the wire. The password is write-only: it is sent on
//! create and never compared.

use declarative::{
    Outcome, OutcomeTable, OutcomeTables, Presence, Resource, Rule, ValidationError, Wrap,
    collapse, expand, extensions, pick, strip_server_fields,
};
use serde::Deserialize;
use serde_json::{Value, json};

static OUTCOMES: OutcomeTables = OutcomeTables {
    get: OutcomeTable::with_api_errors(&[
        (200, Outcome::ok("User {id} found.")),
        (404, Outcome::ok("User {id} not found.")),
    ]),
    create: OutcomeTable::with_api_errors(&[(200, Outcome::changed("User {id} created."))]),
    update: OutcomeTable::with_api_errors(&[
        (200, Outcome::changed("User {id} updated.")),
        (404, Outcome::failure("User {id} not found.")),
    ]),
    delete: OutcomeTable::with_api_errors(&[
        (204, Outcome::changed("User {id} deleted.")),
        (404, Outcome::ok("User {id} was already deleted.")),
    ]),
};

const RULES: &[Rule] = &[
    ("email", Wrap::Nest { parent: "contact_options" }),
    ("fallback_contact", Wrap::Nest { parent: "contact_options" }),
];

/// Fields of the document shape, as compared against the server
const FIELDS: &[&str] = &[
    "fullname",
    "email",
    "fallback_contact",
    "pager_address",
    "contactgroups",
    "roles",
    "authorized_sites",
    "language",
    "disable_login",
];

/// Lists the server treats as sets
const SETS: &[&str] = &["contactgroups", "roles", "authorized_sites"];

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub fallback_contact: Option<bool>,
    #[serde(default)]
    pub pager_address: Option<String>,
    #[serde(default)]
    pub contactgroups: Option<Vec<String>>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    #[serde(default)]
    pub authorized_sites: Option<Vec<String>>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub disable_login: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub state: Presence,
}

impl User {
    fn fields(&self) -> Value {
        json!({
            "fullname": self.fullname,
            "email": self.email,
            "fallback_contact": self.fallback_contact,
            "pager_address": self.pager_address,
            "contactgroups": self.contactgroups,
            "roles": self.roles,
            "authorized_sites": self.authorized_sites,
            "language": self.language,
            "disable_login": self.disable_login,
        })
    }
}

impl Resource for User {
    fn resource_type(&self) -> &'static str {
        "user"
    }

    fn id(&self) -> String {
        self.username.clone()
    }

    fn presence(&self) -> Presence {
        self.state
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::MissingField("username"));
        }
        if self.username.contains(['/', ' ']) {
            return Err(ValidationError::InvalidValue {
                field: "username",
                message: format!("{:?} cannot contain '/' or spaces", self.username),
            });
        }
        if self.password.as_deref().is_some_and(str::is_empty) {
            return Err(ValidationError::InvalidValue {
                field: "password",
                message: "must not be empty when given".to_string(),
            });
        }
        Ok(())
    }

    fn object_path(&self) -> String {
        format!("/objects/user_config/{}", self.username)
    }

    fn collection_path(&self) -> String {
        "/domain-types/user_config/collections/all".to_string()
    }

    fn outcomes(&self) -> &'static OutcomeTables {
        &OUTCOMES
    }

    fn desired(&self) -> Value {
        sort_sets(self.fields())
    }

    fn normalize(&self, body: &Value) -> Value {
        let api = strip_server_fields(&extensions(body));
        sort_sets(pick(&collapse(&api, RULES), FIELDS))
    }

    fn create_payload(&self) -> Value {
        let mut payload = expand(&self.fields(), RULES);
        if let Value::Object(map) = &mut payload {
            map.insert("username".to_string(), json!(self.username));
            if !map.contains_key("fullname") {
                map.insert("fullname".to_string(), json!(self.username));
            }
            if let Some(password) = &self.password {
                map.insert(
                    "auth_option".to_string(),
                    json!({ "auth_type": "password", "password": password }),
                );
            }
        }
        payload
    }

    /// Only the declared fields are sent; the server keeps the rest.
    fn update_payload(&self, _current: &Value, _unset: &[String]) -> Value {
        expand(&self.fields(), RULES)
    }
}

fn sort_sets(mut value: Value) -> Value {
    for key in SETS {
        if let Some(Value::Array(items)) = value.get_mut(*key) {
            items.sort_by_key(|item| item.to_string());
        }
    }
    value
}
