//! Activation of pending changes (`activation_run`)

use super::discovery::job_handle;
use declarative::{
    CallResult, Completion, JobHandle, Outcome, OutcomeTable, PollObserver, PollOptions, RunLog,
    apply, await_job, redirect_check,
};
use restkit::{Method, Request, Transport};
use serde_json::json;

const START_PATH: &str = "/domain-types/activation_run/actions/activate-changes/invoke";

const START: OutcomeTable = OutcomeTable::with_api_errors(&[
    (200, Outcome::changed("Activation on {id} started.")),
    (302, Outcome::changed("Activation on {id} started.")),
    (409, Outcome::failure("An activation is already running.")),
    (422, Outcome::ok("There are no pending changes to activate.")),
    (423, Outcome::failure("Another activation holds the configuration lock.")),
]);

const WAIT: OutcomeTable = OutcomeTable::with_api_errors(&[
    (200, Outcome::changed("Activation {id} completed.")),
    (204, Outcome::changed("Activation {id} completed.")),
    (404, Outcome::failure("Activation {id} not found.")),
]);

/// Activate pending changes on `sites` (all sites when empty) and wait
/// until the activation run completes.
pub fn activate(
    transport: &dyn Transport,
    sites: &[String],
    force_foreign_changes: bool,
    options: &PollOptions,
    observer: &mut dyn PollObserver,
    log: &mut RunLog,
) -> CallResult {
    let label = if sites.is_empty() {
        "all sites".to_string()
    } else {
        sites.join(", ")
    };

    let request = Request::new(Method::Post, START_PATH)
        .with_body(json!({
            "redirect": false,
            "sites": sites,
            "force_foreign_changes": force_foreign_changes,
        }))
        .with_if_match("*");
    let started = apply(transport, &request, &START, &label, log);
    if started.failed || !started.changed {
        return started;
    }

    let handle = job_handle(&started);
    let run_id = match &handle {
        JobHandle::Tracked(id) => id.clone(),
        JobHandle::Untracked => String::new(),
    };
    let wait = format!("/objects/activation_run/{run_id}/actions/wait-for-completion/invoke");
    let completion = await_job(
        "activation",
        &handle,
        &started,
        redirect_check(transport, wait, &WAIT, &run_id),
        options,
        observer,
        log,
    );

    match completion {
        Completion::Untracked(result) => result,
        other => other.into_result().after(&started),
    }
}
