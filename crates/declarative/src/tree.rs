//! Rule-driven transforms between caller-friendly trees and API trees.
//!
//! Some endpoints expect optional settings wrapped as
//! `{"state": "enabled", "<key>": value}` / `{"state": "disabled"}`, or expect
//! flat caller fields nested under a parent object. A [`Rule`] table names
//! the wrapping for each field; [`expand`] applies it to a desired tree and
//! [`collapse`] inverts it on a fetched tree so both sides compare in the
//! caller's shape.

use crate::diff::is_unspecified;
use serde_json::{Map, Value, json};

/// How one field is carried in the API representation.
#[derive(Debug, Clone, Copy)]
pub enum Wrap {
    /// `v` ⇒ `{"state": "enabled", key: v}`; `false` ⇒ `{"state": "disabled"}`.
    Enabled { key: &'static str },
    /// The field lives under `parent` in the API tree.
    Nest { parent: &'static str },
    /// Recurse into a sub-object with its own rules.
    Table(&'static [Rule]),
}

/// A field name and its wrapping strategy.
pub type Rule = (&'static str, Wrap);

const ENABLED: &str = "enabled";
const DISABLED: &str = "disabled";

/// Convert a caller tree into the API shape.
///
/// Fields without a rule pass through unchanged; `null` fields are dropped.
pub fn expand(tree: &Value, rules: &[Rule]) -> Value {
    let Value::Object(fields) = tree else {
        return tree.clone();
    };

    let mut out = Map::new();
    for (name, value) in fields {
        if value.is_null() {
            continue;
        }
        match rule_for(rules, name) {
            Some(Wrap::Enabled { key }) => {
                let wrapped = if *value == Value::Bool(false) {
                    json!({ "state": DISABLED })
                } else {
                    json!({ "state": ENABLED, *key: value })
                };
                out.insert(name.clone(), wrapped);
            }
            Some(Wrap::Nest { parent }) => {
                let slot = out
                    .entry(*parent)
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(parent_map) = slot {
                    parent_map.insert(name.clone(), value.clone());
                }
            }
            Some(Wrap::Table(nested)) => {
                out.insert(name.clone(), expand(value, nested));
            }
            None => {
                out.insert(name.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

/// Convert an API tree back into the caller shape. Inverse of [`expand`].
pub fn collapse(tree: &Value, rules: &[Rule]) -> Value {
    let Value::Object(fields) = tree else {
        return tree.clone();
    };

    let mut out = fields.clone();

    for (name, wrap) in rules {
        match wrap {
            Wrap::Enabled { key } => {
                if let Some(value) = out.get(*name) {
                    let unwrapped = match state_of(value) {
                        Some(ENABLED) => value.get(*key).cloned().unwrap_or(Value::Null),
                        Some(_) => Value::Bool(false),
                        None => value.clone(),
                    };
                    out.insert((*name).to_string(), unwrapped);
                }
            }
            Wrap::Nest { parent } => {
                let hoisted = out
                    .get_mut(*parent)
                    .and_then(Value::as_object_mut)
                    .and_then(|p| p.remove(*name));
                if let Some(value) = hoisted {
                    out.insert((*name).to_string(), value);
                }
            }
            Wrap::Table(nested) => {
                if let Some(value) = out.get(*name) {
                    let collapsed = collapse(value, nested);
                    out.insert((*name).to_string(), collapsed);
                }
            }
        }
    }

    // Parents emptied by hoisting carry no information of their own.
    for (_, wrap) in rules {
        if let Wrap::Nest { parent } = wrap
            && out
                .get(*parent)
                .and_then(Value::as_object)
                .is_some_and(Map::is_empty)
        {
            out.remove(*parent);
        }
    }

    Value::Object(out)
}

/// Deep-merge `top` over `base`.
///
/// Objects merge key by key; any other value in `top` replaces the one in
/// `base`, except unspecified values (`null`, `""`, `[]`), which keep it.
pub fn overlay(base: &Value, top: &Value) -> Value {
    match (base, top) {
        (Value::Object(base_map), Value::Object(top_map)) => {
            let mut out = base_map.clone();
            for (key, value) in top_map {
                if is_unspecified(value) {
                    continue;
                }
                let merged = match out.get(key) {
                    Some(existing) => overlay(existing, value),
                    None => value.clone(),
                };
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        (base, top) if is_unspecified(top) => base.clone(),
        (_, top) => top.clone(),
    }
}

fn rule_for<'a>(rules: &'a [Rule], name: &str) -> Option<&'a Wrap> {
    rules.iter().find(|(n, _)| *n == name).map(|(_, w)| w)
}

fn state_of(value: &Value) -> Option<&str> {
    value.get("state").and_then(Value::as_str)
}
