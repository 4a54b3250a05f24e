//! Structural comparison of desired and current state trees.
//!
//! Desired state is a partial overlay: only keys present in the desired tree
//! are compared, and `null`, `""` and `[]` count as "not specified". Keys the
//! caller did not declare are never reported as differences.

use serde::Serialize;
use serde_json::{Map, Value};

/// Before/after view restricted to the keys that differ.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diff {
    pub before: Value,
    /// Absent when the resource is being deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

impl Diff {
    /// Whether the diff records no change at all.
    pub fn is_empty(&self) -> bool {
        is_empty_tree(&self.before) && self.after.as_ref().is_none_or(is_empty_tree)
    }

    /// Record keys that will be unset, below `scope` (or at the top level).
    ///
    /// Removed keys appear in `before` with their current value and are
    /// missing from `after`.
    pub fn record_removals(&mut self, scope: Option<&str>, keys: &[String], current: &Value) {
        if keys.is_empty() {
            return;
        }

        let source = match scope {
            Some(scope) => current.get(scope),
            None => Some(current),
        };
        let Some(source) = source else {
            return;
        };

        let before = object_mut(&mut self.before);
        let target = match scope {
            Some(scope) => object_mut(before.entry(scope).or_insert_with(|| Value::Object(Map::new()))),
            None => before,
        };
        for key in keys {
            if let Some(value) = source.get(key) {
                target.insert(key.clone(), value.clone());
            }
        }

        if let (Some(scope), Some(after)) = (scope, self.after.as_mut()) {
            object_mut(after)
                .entry(scope)
                .or_insert_with(|| Value::Object(Map::new()));
        }
    }

    /// Record a single top-level change.
    pub fn record_change(&mut self, key: &str, before: Value, after: Value) {
        object_mut(&mut self.before).insert(key.to_string(), before);
        let target = self.after.get_or_insert_with(|| Value::Object(Map::new()));
        object_mut(target).insert(key.to_string(), after);
    }
}

/// Whether a desired value means "not specified".
pub fn is_unspecified(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Whether any declared key of `desired` differs from `current`.
pub fn needs_update(desired: &Value, current: &Value) -> bool {
    match (desired, current) {
        (Value::Object(desired), Value::Object(current)) => {
            desired.iter().any(|(key, wanted)| {
                !is_unspecified(wanted)
                    && match (wanted, current.get(key)) {
                        (_, Some(actual)) => needs_update(wanted, actual),
                        // A missing parent only matters if something below it is declared
                        (Value::Object(_), None) => needs_update(wanted, &Value::Object(Map::new())),
                        (_, None) => true,
                    }
            })
        }
        (desired, current) => !values_equal(desired, current),
    }
}

/// Compute the before/after diff for reporting.
///
/// With `deletion`, `after` is absent and `before` holds the current values
/// of the declared keys (the whole current state when nothing is declared).
pub fn generate_diff(desired: &Value, current: &Value, deletion: bool) -> Diff {
    if deletion {
        return Diff {
            before: project(desired, current),
            after: None,
        };
    }

    match (desired, current) {
        (Value::Object(desired), Value::Object(current)) => {
            let mut before = Map::new();
            let mut after = Map::new();
            walk(desired, current, &mut before, &mut after);
            Diff {
                before: Value::Object(before),
                after: Some(Value::Object(after)),
            }
        }
        (desired, current) if !values_equal(desired, current) => Diff {
            before: current.clone(),
            after: Some(desired.clone()),
        },
        _ => Diff {
            before: Value::Object(Map::new()),
            after: Some(Value::Object(Map::new())),
        },
    }
}

/// Keys present in `current` that `desired` does not declare.
///
/// Used by resources that signal removal with an explicit unset list; there a
/// desired key with an unspecified value counts as not declared.
pub fn unset_keys(desired: &Value, current: &Value) -> Vec<String> {
    let Some(current) = current.as_object() else {
        return Vec::new();
    };
    let desired = desired.as_object();

    current
        .keys()
        .filter(|key| {
            desired
                .and_then(|d| d.get(key.as_str()))
                .is_none_or(is_unspecified)
        })
        .cloned()
        .collect()
}

fn walk(
    desired: &Map<String, Value>,
    current: &Map<String, Value>,
    before: &mut Map<String, Value>,
    after: &mut Map<String, Value>,
) {
    for (key, wanted) in desired {
        if is_unspecified(wanted) {
            continue;
        }
        match (wanted, current.get(key)) {
            (Value::Object(wanted_map), Some(Value::Object(actual_map))) => {
                let mut nested_before = Map::new();
                let mut nested_after = Map::new();
                walk(wanted_map, actual_map, &mut nested_before, &mut nested_after);
                if !nested_after.is_empty() {
                    before.insert(key.clone(), Value::Object(nested_before));
                    after.insert(key.clone(), Value::Object(nested_after));
                }
            }
            (wanted, Some(actual)) => {
                if needs_update(wanted, actual) {
                    before.insert(key.clone(), actual.clone());
                    after.insert(key.clone(), wanted.clone());
                }
            }
            (Value::Object(wanted_map), None) => {
                let mut nested_before = Map::new();
                let mut nested_after = Map::new();
                walk(wanted_map, &Map::new(), &mut nested_before, &mut nested_after);
                if !nested_after.is_empty() {
                    before.insert(key.clone(), Value::Null);
                    after.insert(key.clone(), Value::Object(nested_after));
                }
            }
            (wanted, None) => {
                if needs_update(wanted, &Value::Null) {
                    before.insert(key.clone(), Value::Null);
                    after.insert(key.clone(), wanted.clone());
                }
            }
        }
    }
}

fn project(desired: &Value, current: &Value) -> Value {
    let declared: Vec<&String> = match desired {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !is_unspecified(v))
            .map(|(k, _)| k)
            .collect(),
        _ => Vec::new(),
    };

    match current {
        Value::Object(current) if !declared.is_empty() => Value::Object(
            declared
                .into_iter()
                .filter_map(|k| current.get(k).map(|v| (k.clone(), v.clone())))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Value equality that treats `1` and `1.0` as the same number.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

fn is_empty_tree(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.values().all(is_empty_tree),
        Value::Null => true,
        _ => false,
    }
}

fn object_mut(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}
