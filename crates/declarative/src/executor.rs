//! Reconciliation engine - drives any resource to its desired state
//!
//! One run is: read the current object, decide between create, update,
//! delete or no-op, then issue at most one mutating call (two when the
//! resource must be moved first). Failures are reported, never retried,
//! and completed sub-steps are not rolled back.

use crate::context::RunLog;
use crate::diff::{Diff, generate_diff, needs_update, unset_keys};
use crate::outcome::apply;
use crate::resource::{Presence, RemovalPolicy, Resource};
use crate::result::{CallResult, NO_STATUS, Report};
use restkit::{Method, Request, Transport};
use serde_json::{Map, Value};

/// Options for one reconciliation run
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Decide and report, but send no mutating request
    pub dry_run: bool,
}

/// Result of reconciling one resource
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub result: CallResult,
    pub diff: Option<Diff>,
}

impl Reconciled {
    fn new(result: CallResult, diff: Diff) -> Self {
        Self {
            result,
            diff: (!diff.is_empty()).then_some(diff),
        }
    }

    fn bare(result: CallResult) -> Self {
        Self { result, diff: None }
    }

    pub fn report(&self) -> Report {
        Report::new(&self.result, self.diff.clone())
    }
}

/// An existing object as read from the server
struct Current {
    state: Value,
    etag: String,
    read: CallResult,
}

enum Observed {
    Present(Current),
    Absent(CallResult),
}

/// Reconcile a resource against the server.
///
/// The returned result is failed when validation, the read, or any
/// mutating step fails; its message lists every step that ran.
pub fn reconcile(
    transport: &dyn Transport,
    resource: &dyn Resource,
    options: &ExecuteOptions,
    log: &mut RunLog,
) -> Reconciled {
    let id = resource.id();
    let kind = describe(resource);

    if let Err(e) = resource.validate() {
        log.warn(format!("{kind} {id} rejected before any request: {e}"));
        return Reconciled::bare(CallResult::new(
            NO_STATUS,
            format!("{kind} {id} is invalid: {e}"),
            false,
            true,
        ));
    }

    log.info(format!(
        "Reconciling {kind} {id} (desired: {:?}{})",
        resource.presence(),
        if options.dry_run { ", dry run" } else { "" }
    ));

    let observed = match observe(transport, resource, &id, log) {
        Ok(observed) => observed,
        Err(failed) => return Reconciled::bare(failed),
    };

    match (observed, resource.presence()) {
        (Observed::Absent(read), Presence::Absent) => Reconciled::bare(CallResult::unchanged(
            read.status_code,
            format!("{kind} {id} is already absent."),
        )),
        (Observed::Absent(read), Presence::Present) => {
            create(transport, resource, read, options, log)
        }
        (Observed::Present(current), Presence::Absent) => {
            remove(transport, resource, current, options, log)
        }
        (Observed::Present(current), Presence::Present) => {
            converge(transport, resource, current, options, log)
        }
    }
}

fn create(
    transport: &dyn Transport,
    resource: &dyn Resource,
    read: CallResult,
    options: &ExecuteOptions,
    log: &mut RunLog,
) -> Reconciled {
    let id = resource.id();
    let diff = Diff {
        before: Value::Object(Map::new()),
        after: Some(resource.desired()),
    };

    if options.dry_run {
        let result = CallResult::new(
            read.status_code,
            format!("{} {id} would be created.", describe(resource)),
            true,
            false,
        );
        return Reconciled::new(result, diff);
    }

    let request =
        Request::new(Method::Post, resource.collection_path()).with_body(resource.create_payload());
    let result = apply(transport, &request, &resource.outcomes().create, &id, log);
    Reconciled::new(result, diff)
}

fn remove(
    transport: &dyn Transport,
    resource: &dyn Resource,
    current: Current,
    options: &ExecuteOptions,
    log: &mut RunLog,
) -> Reconciled {
    let id = resource.id();
    let diff = generate_diff(&resource.desired(), &current.state, true);

    if options.dry_run {
        let result = CallResult::new(
            current.read.status_code,
            format!("{} {id} would be deleted.", describe(resource)),
            true,
            false,
        );
        return Reconciled::new(result, diff);
    }

    let request = resource.delete_request().with_if_match(current.etag);
    let result = apply(transport, &request, &resource.outcomes().delete, &id, log);
    Reconciled::new(result, diff)
}

fn converge(
    transport: &dyn Transport,
    resource: &dyn Resource,
    mut current: Current,
    options: &ExecuteOptions,
    log: &mut RunLog,
) -> Reconciled {
    let id = resource.id();
    let kind = describe(resource);
    let mut earlier: Option<CallResult> = None;
    let mut moved: Option<(&'static str, Value, Value)> = None;

    if let Some(relocation) = resource.relocation(&current.state) {
        let from = current
            .state
            .get(relocation.field)
            .cloned()
            .unwrap_or(Value::Null);
        moved = Some((relocation.field, from, relocation.target.clone()));

        if options.dry_run {
            if let Value::Object(state) = &mut current.state {
                state.insert(relocation.field.to_string(), relocation.target.clone());
            }
            earlier = Some(CallResult::new(
                current.read.status_code,
                format!("{kind} {id} would be moved to {}.", display(&relocation.target)),
                true,
                false,
            ));
        } else {
            let request = relocation.request.with_if_match(current.etag.clone());
            let step = apply(transport, &request, &relocation.table, &id, log);
            if step.failed {
                return Reconciled::bare(step);
            }

            // The move invalidates the token and may change the object
            current = match observe(transport, resource, &id, log) {
                Ok(Observed::Present(refetched)) => refetched,
                Ok(Observed::Absent(read)) => {
                    let vanished = CallResult::new(
                        read.status_code,
                        format!("{kind} {id} disappeared after the move."),
                        false,
                        true,
                    );
                    return Reconciled::bare(vanished.after(&step));
                }
                Err(failed) => return Reconciled::bare(failed.after(&step)),
            };
            earlier = Some(step);
        }
    }

    let desired = resource.desired();
    let (scope, unset) = match resource.removal_policy() {
        RemovalPolicy::Ignore => (None, Vec::new()),
        RemovalPolicy::UnsetList { scope } => (scope, removals(scope, &desired, &current.state)),
    };

    let (result, mut diff) = if !needs_update(&desired, &current.state) && unset.is_empty() {
        let result = CallResult::unchanged(
            current.read.status_code,
            format!("{kind} {id} is already in the desired state."),
        )
        .with_body(current.read.body.clone().unwrap_or_default());
        (result, Diff::default())
    } else {
        let mut diff = generate_diff(&desired, &current.state, false);
        diff.record_removals(scope, &unset, &current.state);
        if !unset.is_empty() {
            log.debug(format!("{kind} {id}: unsetting {}", unset.join(", ")));
        }

        let result = if options.dry_run {
            CallResult::new(
                current.read.status_code,
                format!("{kind} {id} would be updated."),
                true,
                false,
            )
        } else {
            let request = Request::new(resource.update_method(), resource.object_path())
                .with_body(resource.update_payload(&current.state, &unset))
                .with_if_match(current.etag.clone());
            apply(transport, &request, &resource.outcomes().update, &id, log)
        };
        (result, diff)
    };

    if let Some((field, from, to)) = moved {
        diff.record_change(field, from, to);
    }
    let result = match earlier {
        Some(step) => result.after(&step),
        None => result,
    };
    Reconciled::new(result, diff)
}

/// Read the object and classify it as present or absent.
fn observe(
    transport: &dyn Transport,
    resource: &dyn Resource,
    id: &str,
    log: &mut RunLog,
) -> Result<Observed, CallResult> {
    let request = Request::get(resource.object_path());
    let read = apply(transport, &request, &resource.outcomes().get, id, log);
    if read.failed {
        return Err(read);
    }

    match read.status_code {
        200 => {
            let Some(body) = read.json() else {
                return Err(CallResult::new(
                    read.status_code,
                    format!("The server returned an unreadable {} {id}.", describe(resource)),
                    false,
                    true,
                ));
            };
            Ok(Observed::Present(Current {
                state: resource.normalize(&body),
                etag: read.etag.clone(),
                read,
            }))
        }
        404 => Ok(Observed::Absent(read)),
        other => Err(CallResult::new(
            other,
            format!(
                "Unexpected HTTP status {other} while reading {} {id}.",
                describe(resource)
            ),
            false,
            true,
        )),
    }
}

/// Keys to unset below `scope`, only when the caller declared that scope
fn removals(scope: Option<&str>, desired: &Value, current: &Value) -> Vec<String> {
    match scope {
        None => unset_keys(desired, current),
        Some(scope) => match (desired.get(scope), current.get(scope)) {
            (Some(wanted @ Value::Object(_)), Some(actual)) => unset_keys(wanted, actual),
            _ => Vec::new(),
        },
    }
}

/// "host_group" becomes "Host group"
fn describe(resource: &dyn Resource) -> String {
    let words = resource.resource_type().replace('_', " ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => words,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{Outcome, OutcomeTable, OutcomeTables};
    use crate::resource::{Relocation, ValidationError, pick};
    use restkit::{MockTransport, Response};
    use serde_json::json;

    static GROUP_OUTCOMES: OutcomeTables = OutcomeTables {
        get: OutcomeTable::with_api_errors(&[
            (200, Outcome::ok("Group {id} found.")),
            (404, Outcome::ok("Group {id} not found.")),
        ]),
        create: OutcomeTable::with_api_errors(&[(200, Outcome::changed("Group {id} created."))]),
        update: OutcomeTable::with_api_errors(&[(200, Outcome::changed("Group {id} updated."))]),
        delete: OutcomeTable::with_api_errors(&[(204, Outcome::changed("Group {id} deleted."))]),
    };

    static HOST_OUTCOMES: OutcomeTables = OutcomeTables {
        get: OutcomeTable::with_api_errors(&[
            (200, Outcome::ok("Host {id} found.")),
            (404, Outcome::ok("Host {id} not found.")),
        ]),
        create: OutcomeTable::with_api_errors(&[(200, Outcome::changed("Host {id} created."))]),
        update: OutcomeTable::with_api_errors(&[(200, Outcome::changed("Host {id} updated."))]),
        delete: OutcomeTable::with_api_errors(&[(204, Outcome::changed("Host {id} deleted."))]),
    };

    const MOVE: OutcomeTable =
        OutcomeTable::with_api_errors(&[(200, Outcome::changed("Host {id} moved."))]);

    #[derive(Debug)]
    struct Group {
        name: String,
        alias: Option<String>,
        presence: Presence,
    }

    impl Group {
        fn present(name: &str, alias: &str) -> Self {
            Self {
                name: name.to_string(),
                alias: Some(alias.to_string()),
                presence: Presence::Present,
            }
        }

        fn absent(name: &str) -> Self {
            Self {
                name: name.to_string(),
                alias: None,
                presence: Presence::Absent,
            }
        }
    }

    impl Resource for Group {
        fn resource_type(&self) -> &'static str {
            "host_group"
        }
        fn id(&self) -> String {
            self.name.clone()
        }
        fn presence(&self) -> Presence {
            self.presence
        }
        fn validate(&self) -> Result<(), ValidationError> {
            if self.name.is_empty() {
                return Err(ValidationError::MissingField("name"));
            }
            Ok(())
        }
        fn object_path(&self) -> String {
            format!("/objects/host_group_config/{}", self.name)
        }
        fn collection_path(&self) -> String {
            "/domain-types/host_group_config/collections/all".to_string()
        }
        fn outcomes(&self) -> &'static OutcomeTables {
            &GROUP_OUTCOMES
        }
        fn desired(&self) -> Value {
            json!({ "alias": self.alias })
        }
        fn normalize(&self, body: &Value) -> Value {
            pick(&crate::resource::extensions(body), &["alias"])
        }
        fn create_payload(&self) -> Value {
            json!({ "name": self.name, "alias": self.alias })
        }
        fn update_payload(&self, _current: &Value, _unset: &[String]) -> Value {
            json!({ "alias": self.alias })
        }
    }

    #[derive(Debug)]
    struct Host {
        name: String,
        folder: String,
        attributes: Value,
    }

    impl Resource for Host {
        fn resource_type(&self) -> &'static str {
            "host"
        }
        fn id(&self) -> String {
            self.name.clone()
        }
        fn presence(&self) -> Presence {
            Presence::Present
        }
        fn object_path(&self) -> String {
            format!("/objects/host_config/{}", self.name)
        }
        fn collection_path(&self) -> String {
            "/domain-types/host_config/collections/all".to_string()
        }
        fn outcomes(&self) -> &'static OutcomeTables {
            &HOST_OUTCOMES
        }
        fn desired(&self) -> Value {
            json!({ "folder": self.folder, "attributes": self.attributes })
        }
        fn create_payload(&self) -> Value {
            json!({ "host_name": self.name, "folder": self.folder, "attributes": self.attributes })
        }
        fn update_payload(&self, _current: &Value, unset: &[String]) -> Value {
            if unset.is_empty() {
                json!({ "update_attributes": self.attributes })
            } else {
                json!({ "attributes": self.attributes })
            }
        }
        fn removal_policy(&self) -> RemovalPolicy {
            RemovalPolicy::UnsetList {
                scope: Some("attributes"),
            }
        }
        fn relocation(&self, current: &Value) -> Option<Relocation> {
            (current.get("folder").and_then(Value::as_str) != Some(self.folder.as_str())).then(|| {
                Relocation {
                    request: Request::new(
                        Method::Post,
                        format!("/objects/host_config/{}/actions/move/invoke", self.name),
                    )
                    .with_body(json!({ "target_folder": self.folder })),
                    table: MOVE,
                    field: "folder",
                    target: json!(self.folder),
                }
            })
        }
    }

    const GROUP_PATH: &str = "/objects/host_group_config/web";
    const GROUPS: &str = "/domain-types/host_group_config/collections/all";
    const HOST_PATH: &str = "/objects/host_config/web01";
    const MOVE_PATH: &str = "/objects/host_config/web01/actions/move/invoke";

    fn group_body(alias: &str) -> String {
        json!({
            "id": "web",
            "links": [],
            "extensions": {"alias": alias}
        })
        .to_string()
    }

    fn host_body(folder: &str, attributes: Value) -> String {
        json!({
            "id": "web01",
            "extensions": {
                "folder": folder,
                "attributes": attributes,
                "is_cluster": false
            }
        })
        .to_string()
    }

    fn run(mock: &MockTransport, resource: &dyn Resource, dry_run: bool) -> Reconciled {
        let mut log = RunLog::new();
        reconcile(mock, resource, &ExecuteOptions { dry_run }, &mut log)
    }

    #[test]
    fn test_creates_missing_resource() {
        let mock = MockTransport::new();
        mock.reply(Method::Get, GROUP_PATH, Response::status(404));
        mock.reply(Method::Post, GROUPS, Response::json(200, group_body("Web")));

        let outcome = run(&mock, &Group::present("web", "Web"), false);

        assert!(outcome.result.changed);
        assert!(!outcome.result.failed);
        assert_eq!(outcome.result.status_code, 200);
        assert_eq!(outcome.result.message, "Group web created.");
        let posts = mock.mutating_requests();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].body, Some(json!({"name": "web", "alias": "Web"})));
        assert_eq!(outcome.diff.unwrap().after, Some(json!({"alias": "Web"})));
    }

    #[test]
    fn test_updates_with_etag() {
        let mock = MockTransport::new();
        mock.reply(
            Method::Get,
            GROUP_PATH,
            Response::json(200, group_body("Old")).with_etag("\"abc\""),
        );
        mock.reply(Method::Put, GROUP_PATH, Response::json(200, group_body("Web")));

        let outcome = run(&mock, &Group::present("web", "Web"), false);

        assert!(outcome.result.changed);
        assert_eq!(outcome.result.message, "Group web updated.");
        let puts = mock.mutating_requests();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].if_match.as_deref(), Some("\"abc\""));

        let diff = outcome.diff.unwrap();
        assert_eq!(diff.before, json!({"alias": "Old"}));
        assert_eq!(diff.after, Some(json!({"alias": "Web"})));
    }

    #[test]
    fn test_matching_state_is_noop() {
        let mock = MockTransport::new();
        mock.reply(Method::Get, GROUP_PATH, Response::json(200, group_body("Web")));

        let outcome = run(&mock, &Group::present("web", "Web"), false);

        assert!(!outcome.result.changed);
        assert!(!outcome.result.failed);
        assert_eq!(outcome.result.status_code, 200);
        assert!(outcome.result.message.contains("already in the desired state"));
        assert!(outcome.diff.is_none());
        assert!(mock.mutating_requests().is_empty());
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let mock = MockTransport::new();
        mock.reply(Method::Get, GROUP_PATH, Response::status(404));
        mock.reply(Method::Get, GROUP_PATH, Response::json(200, group_body("Web")));
        mock.reply(Method::Post, GROUPS, Response::json(200, group_body("Web")));
        let group = Group::present("web", "Web");

        assert!(run(&mock, &group, false).result.changed);
        let second = run(&mock, &group, false);
        assert!(!second.result.changed);
        assert!(!second.result.failed);
        assert_eq!(mock.mutating_requests().len(), 1);
    }

    #[test]
    fn test_deletes_present_resource() {
        let mock = MockTransport::new();
        mock.reply(
            Method::Get,
            GROUP_PATH,
            Response::json(200, group_body("Web")).with_etag("\"e1\""),
        );
        mock.reply(Method::Delete, GROUP_PATH, Response::status(204));

        let outcome = run(&mock, &Group::absent("web"), false);

        assert!(outcome.result.changed);
        assert_eq!(outcome.result.status_code, 204);
        let deletes = mock.mutating_requests();
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].method, Method::Delete);
        assert_eq!(deletes[0].if_match.as_deref(), Some("\"e1\""));
        let diff = outcome.diff.unwrap();
        assert!(diff.after.is_none());
        assert_eq!(diff.before, json!({"alias": "Web"}));
    }

    #[test]
    fn test_absent_and_absent_sends_only_get() {
        let mock = MockTransport::new();
        mock.reply(Method::Get, GROUP_PATH, Response::status(404));

        let outcome = run(&mock, &Group::absent("web"), false);

        assert!(!outcome.result.changed);
        assert!(!outcome.result.failed);
        assert_eq!(outcome.result.status_code, 404);
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn test_stale_etag_fails_without_retry() {
        let mock = MockTransport::new();
        mock.reply(
            Method::Get,
            GROUP_PATH,
            Response::json(200, group_body("Old")).with_etag("\"stale\""),
        );
        mock.reply(
            Method::Put,
            GROUP_PATH,
            Response::json(412, r#"{"title":"Precondition failed"}"#),
        );

        let outcome = run(&mock, &Group::present("web", "Web"), false);

        assert!(outcome.result.failed);
        assert!(!outcome.result.changed);
        assert_eq!(outcome.result.status_code, 412);
        assert!(outcome.result.message.contains("Precondition failed"));
        assert_eq!(mock.count(Method::Put, GROUP_PATH), 1);
        assert_eq!(mock.count(Method::Get, GROUP_PATH), 1);
    }

    #[test]
    fn test_transport_failure_on_read() {
        let mock = MockTransport::new();
        mock.fail(Method::Get, GROUP_PATH, "connection refused");

        let outcome = run(&mock, &Group::present("web", "Web"), false);

        assert!(outcome.result.failed);
        assert_eq!(outcome.result.status_code, NO_STATUS);
        assert!(mock.mutating_requests().is_empty());
    }

    #[test]
    fn test_unexpected_read_status_is_terminal() {
        let mock = MockTransport::new();
        mock.reply(Method::Get, GROUP_PATH, Response::status(401));

        let outcome = run(&mock, &Group::present("web", "Web"), false);

        assert!(outcome.result.failed);
        assert_eq!(outcome.result.status_code, 401);
        assert!(mock.mutating_requests().is_empty());
    }

    #[test]
    fn test_validation_failure_sends_nothing() {
        let mock = MockTransport::new();
        let outcome = run(&mock, &Group::present("", "Web"), false);

        assert!(outcome.result.failed);
        assert!(outcome.result.message.contains("name"));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_dry_run_reports_without_mutating() {
        let mock = MockTransport::new();
        mock.reply(Method::Get, GROUP_PATH, Response::json(200, group_body("Old")));

        let outcome = run(&mock, &Group::present("web", "Web"), true);

        assert!(outcome.result.changed);
        assert!(!outcome.result.failed);
        assert!(outcome.result.message.contains("would be updated"));
        assert!(outcome.diff.is_some());
        assert!(mock.mutating_requests().is_empty());
    }

    #[test]
    fn test_move_then_update_concatenates_messages() {
        let mock = MockTransport::new();
        mock.reply(
            Method::Get,
            HOST_PATH,
            Response::json(200, host_body("/old", json!({"ipaddress": "10.0.0.1"})))
                .with_etag("\"v1\""),
        );
        mock.reply(
            Method::Get,
            HOST_PATH,
            Response::json(200, host_body("/new", json!({"ipaddress": "10.0.0.1"})))
                .with_etag("\"v2\""),
        );
        mock.reply(Method::Post, MOVE_PATH, Response::status(200));
        mock.reply(Method::Put, HOST_PATH, Response::status(200));

        let host = Host {
            name: "web01".to_string(),
            folder: "/new".to_string(),
            attributes: json!({"ipaddress": "10.0.0.2"}),
        };
        let outcome = run(&mock, &host, false);

        assert!(outcome.result.changed);
        assert!(!outcome.result.failed);
        assert_eq!(outcome.result.message, "Host web01 moved. Host web01 updated.");

        let mutating = mock.mutating_requests();
        assert_eq!(mutating.len(), 2);
        assert_eq!(mutating[0].path, MOVE_PATH);
        assert_eq!(mutating[0].if_match.as_deref(), Some("\"v1\""));
        assert_eq!(mutating[1].path, HOST_PATH);
        assert_eq!(mutating[1].if_match.as_deref(), Some("\"v2\""));
        assert_eq!(mock.count(Method::Get, HOST_PATH), 2);

        let diff = outcome.diff.unwrap();
        assert_eq!(diff.before["folder"], "/old");
        assert_eq!(diff.after.unwrap()["folder"], "/new");
    }

    #[test]
    fn test_move_only_when_attributes_match() {
        let mock = MockTransport::new();
        mock.reply(
            Method::Get,
            HOST_PATH,
            Response::json(200, host_body("/old", json!({"ipaddress": "10.0.0.1"}))),
        );
        mock.reply(
            Method::Get,
            HOST_PATH,
            Response::json(200, host_body("/new", json!({"ipaddress": "10.0.0.1"}))),
        );
        mock.reply(Method::Post, MOVE_PATH, Response::status(200));

        let host = Host {
            name: "web01".to_string(),
            folder: "/new".to_string(),
            attributes: json!({"ipaddress": "10.0.0.1"}),
        };
        let outcome = run(&mock, &host, false);

        assert!(outcome.result.changed);
        assert!(outcome.result.message.starts_with("Host web01 moved."));
        assert_eq!(mock.count(Method::Put, HOST_PATH), 0);
    }

    #[test]
    fn test_failed_move_stops_before_update() {
        let mock = MockTransport::new();
        mock.reply(
            Method::Get,
            HOST_PATH,
            Response::json(200, host_body("/old", json!({}))),
        );
        mock.reply(Method::Post, MOVE_PATH, Response::status(400));

        let host = Host {
            name: "web01".to_string(),
            folder: "/new".to_string(),
            attributes: json!({"ipaddress": "10.0.0.2"}),
        };
        let outcome = run(&mock, &host, false);

        assert!(outcome.result.failed);
        assert_eq!(mock.count(Method::Get, HOST_PATH), 1);
        assert_eq!(mock.count(Method::Put, HOST_PATH), 0);
    }

    #[test]
    fn test_update_failure_after_move_keeps_changed() {
        let mock = MockTransport::new();
        mock.reply(
            Method::Get,
            HOST_PATH,
            Response::json(200, host_body("/old", json!({}))),
        );
        mock.reply(
            Method::Get,
            HOST_PATH,
            Response::json(200, host_body("/new", json!({}))),
        );
        mock.reply(Method::Post, MOVE_PATH, Response::status(200));
        mock.reply(Method::Put, HOST_PATH, Response::status(500));

        let host = Host {
            name: "web01".to_string(),
            folder: "/new".to_string(),
            attributes: json!({"ipaddress": "10.0.0.2"}),
        };
        let outcome = run(&mock, &host, false);

        assert!(outcome.result.failed);
        assert!(outcome.result.changed);
        assert!(outcome.result.message.starts_with("Host web01 moved."));
    }

    #[test]
    fn test_undeclared_attribute_is_unset() {
        let mock = MockTransport::new();
        mock.reply(
            Method::Get,
            HOST_PATH,
            Response::json(
                200,
                host_body("/", json!({"ipaddress": "10.0.0.1", "alias": "db"})),
            ),
        );
        mock.reply(Method::Put, HOST_PATH, Response::status(200));

        let host = Host {
            name: "web01".to_string(),
            folder: "/".to_string(),
            attributes: json!({"ipaddress": "10.0.0.1"}),
        };
        let outcome = run(&mock, &host, false);

        assert!(outcome.result.changed);
        let puts = mock.mutating_requests();
        assert_eq!(puts.len(), 1);
        assert_eq!(
            puts[0].body,
            Some(json!({"attributes": {"ipaddress": "10.0.0.1"}}))
        );
        let diff = outcome.diff.unwrap();
        assert_eq!(diff.before, json!({"attributes": {"alias": "db"}}));
    }

    #[test]
    fn test_dry_run_move_reports_both_steps() {
        let mock = MockTransport::new();
        mock.reply(
            Method::Get,
            HOST_PATH,
            Response::json(200, host_body("/old", json!({"ipaddress": "10.0.0.1"}))),
        );

        let host = Host {
            name: "web01".to_string(),
            folder: "/new".to_string(),
            attributes: json!({"ipaddress": "10.0.0.1"}),
        };
        let outcome = run(&mock, &host, true);

        assert!(outcome.result.changed);
        assert_eq!(
            outcome.result.message,
            "Host web01 would be moved to /new. Host web01 is already in the desired state."
        );
        assert!(mock.mutating_requests().is_empty());
    }
}
