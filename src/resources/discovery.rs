//! Service discovery, for one host or in bulk
//!
//! Servers from 2.2.0 on run discovery as a background job
//! (`service_discovery_run`) that is awaited through its
//! wait-for-completion redirect. Older servers expose a synchronous host
//! action instead. Bulk discovery always runs as a job on
//! `discovery_run/{id}`.

use super::NAME_PATTERN;
use declarative::{
    CallResult, Completion, JobHandle, NO_STATUS, Outcome, OutcomeTable, PollObserver,
    PollOptions, RunLog, apply, await_completion, await_job, job_check, redirect_check,
};
use restkit::{Method, Request, Transport, Version};
use serde_json::{Value, json};

/// First version with the `service_discovery_run` endpoints
pub const JOB_API_SINCE: (u32, u32, u32) = (2, 2, 0);

/// Hosts handed to one bulk worker
const BULK_SIZE: usize = 10;

const START: OutcomeTable = OutcomeTable::with_api_errors(&[
    (200, Outcome::changed("Service discovery of {id} started.")),
    (302, Outcome::changed("Service discovery of {id} started.")),
    (404, Outcome::failure("Host {id} not found.")),
    (409, Outcome::failure("A service discovery of {id} is already running.")),
]);

const WAIT: OutcomeTable = OutcomeTable::with_api_errors(&[
    (200, Outcome::changed("Service discovery of {id} finished.")),
    (204, Outcome::changed("Service discovery of {id} finished.")),
    (404, Outcome::failure("No service discovery of {id} was found.")),
]);

const LEGACY: OutcomeTable = OutcomeTable::with_api_errors(&[
    (200, Outcome::changed("Services of {id} discovered.")),
    (204, Outcome::changed("Services of {id} discovered.")),
    (404, Outcome::failure("Host {id} not found.")),
]);

const BULK_START: OutcomeTable = OutcomeTable::with_api_errors(&[
    (200, Outcome::changed("Bulk discovery of {id} started.")),
    (409, Outcome::failure("A bulk discovery is already running.")),
]);

const BULK_JOB: OutcomeTable = OutcomeTable::with_api_errors(&[
    (200, Outcome::ok("Bulk discovery job {id} read.")),
    (404, Outcome::failure("Bulk discovery job {id} not found.")),
]);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Add undecided services
    #[default]
    New,
    /// Remove vanished services
    Remove,
    /// Add new and remove vanished services, update labels
    FixAll,
    /// Rescan and refresh everything
    Refresh,
    OnlyHostLabels,
    /// Drop all services and discover from scratch
    TabulaRasa,
}

impl DiscoveryMode {
    pub fn api_name(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Remove => "remove",
            Self::FixAll => "fix_all",
            Self::Refresh => "refresh",
            Self::OnlyHostLabels => "only_host_labels",
            Self::TabulaRasa => "tabula_rasa",
        }
    }

    fn bulk_options(self) -> Value {
        let (undecided, vanished, service_labels, host_labels) = match self {
            Self::New => (true, false, false, false),
            Self::Remove => (false, true, false, false),
            Self::FixAll | Self::Refresh | Self::TabulaRasa => (true, true, true, true),
            Self::OnlyHostLabels => (false, false, false, true),
        };
        json!({
            "monitor_undecided_services": undecided,
            "remove_vanished_services": vanished,
            "update_service_labels": service_labels,
            "update_host_labels": host_labels,
        })
    }

    fn full_scan(self) -> bool {
        matches!(self, Self::Refresh | Self::TabulaRasa)
    }
}

/// Discover the services of one host and wait for the result.
pub fn discover_host(
    transport: &dyn Transport,
    host: &str,
    mode: DiscoveryMode,
    server: &Version,
    options: &PollOptions,
    observer: &mut dyn PollObserver,
    log: &mut RunLog,
) -> CallResult {
    if !NAME_PATTERN.is_match(host) {
        return CallResult::new(
            NO_STATUS,
            format!("{host:?} is not a valid host name."),
            false,
            true,
        );
    }

    let (major, minor, sub) = JOB_API_SINCE;
    if !server.at_least(&Version::new(major, minor, sub)) {
        return discover_legacy(transport, host, mode, server, log);
    }

    let start = Request::new(
        Method::Post,
        "/domain-types/service_discovery_run/actions/start/invoke",
    )
    .with_body(json!({ "host_name": host, "mode": mode.api_name() }));
    let started = apply(transport, &start, &START, host, log);
    if started.failed {
        return started;
    }

    let wait = format!("/objects/service_discovery_run/{host}/actions/wait-for-completion/invoke");
    await_completion(
        "service discovery",
        redirect_check(transport, wait, &WAIT, host),
        options,
        observer,
        log,
    )
    .into_result()
    .after(&started)
}

fn discover_legacy(
    transport: &dyn Transport,
    host: &str,
    mode: DiscoveryMode,
    server: &Version,
    log: &mut RunLog,
) -> CallResult {
    if mode == DiscoveryMode::TabulaRasa {
        return CallResult::new(
            NO_STATUS,
            format!("Mode tabula_rasa needs Checkmk 2.2.0 or later; the server runs {server}."),
            false,
            true,
        );
    }

    log.info(format!("Server {server} predates discovery jobs; using the host action."));
    let request = Request::new(
        Method::Post,
        format!("/objects/host/{host}/actions/discover_services/invoke"),
    )
    .with_body(json!({ "mode": mode.api_name() }));
    apply(transport, &request, &LEGACY, host, log)
}

/// Start one bulk discovery for all `hosts` and follow the job.
pub fn discover_bulk(
    transport: &dyn Transport,
    hosts: &[String],
    mode: DiscoveryMode,
    options: &PollOptions,
    observer: &mut dyn PollObserver,
    log: &mut RunLog,
) -> CallResult {
    if let Some(bad) = hosts.iter().find(|h| !NAME_PATTERN.is_match(h)) {
        return CallResult::new(
            NO_STATUS,
            format!("{bad:?} is not a valid host name."),
            false,
            true,
        );
    }
    if hosts.is_empty() {
        return CallResult::new(NO_STATUS, "No hosts given for bulk discovery.", false, true);
    }

    let label = format!("{} hosts", hosts.len());
    let request = Request::new(
        Method::Post,
        "/domain-types/discovery_run/actions/bulk-discovery-start/invoke",
    )
    .with_body(json!({
        "hostnames": hosts,
        "options": mode.bulk_options(),
        "do_full_scan": mode.full_scan(),
        "bulk_size": BULK_SIZE,
        "ignore_errors": true,
    }));
    let started = apply(transport, &request, &BULK_START, &label, log);
    if started.failed {
        return started;
    }

    let handle = job_handle(&started);
    let job_id = match &handle {
        JobHandle::Tracked(id) => id.clone(),
        JobHandle::Untracked => String::new(),
    };
    let completion = await_job(
        "bulk discovery",
        &handle,
        &started,
        job_check(
            transport,
            format!("/objects/discovery_run/{job_id}"),
            &BULK_JOB,
            &job_id,
        ),
        options,
        observer,
        log,
    );

    match completion {
        Completion::Finished(status) => job_outcome(&status, &job_id, log).after(&started),
        Completion::TimedOut(result) | Completion::Cancelled(result) => result.after(&started),
        Completion::Untracked(result) => result,
    }
}

/// The job id from a trigger response body
pub(crate) fn job_handle(trigger: &CallResult) -> JobHandle {
    trigger
        .json()
        .and_then(|body| body.get("id").and_then(Value::as_str).map(str::to_string))
        .filter(|id| !id.is_empty())
        .map_or(JobHandle::Untracked, JobHandle::Tracked)
}

/// Classify the final state of a finished bulk job.
fn job_outcome(status: &CallResult, job_id: &str, log: &mut RunLog) -> CallResult {
    if status.failed {
        return status.clone();
    }

    let body = status.json().unwrap_or(Value::Null);
    let state = body
        .pointer("/extensions/state")
        .and_then(Value::as_str)
        .unwrap_or("finished");
    if let Some(lines) = body.pointer("/extensions/logs/progress").and_then(Value::as_array) {
        for line in lines.iter().filter_map(Value::as_str) {
            log.debug(format!("bulk discovery {job_id}: {line}"));
        }
    }

    let outcome = match state {
        "exception" | "stopped" => CallResult::new(
            status.status_code,
            format!("Bulk discovery job {job_id} ended in state {state}."),
            false,
            true,
        ),
        _ => CallResult::new(
            status.status_code,
            format!("Bulk discovery job {job_id} finished."),
            true,
            false,
        ),
    };
    outcome.with_body(status.body.clone().unwrap_or_default())
}
