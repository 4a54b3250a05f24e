//! Polling of asynchronous remote jobs until completion or deadline.
//!
//! Discovery and activation runs are started by a trigger call and then
//! observed through a status endpoint. Only that read is repeated; the
//! trigger is never re-sent. A deadline that passes ends the wait locally;
//! the remote job keeps running.

use crate::context::{PollObserver, RunLog};
use crate::outcome::{OutcomeTable, apply};
use crate::result::{CallResult, NO_STATUS};
use restkit::{Request, Transport};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Default pause between status reads.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

/// Default upper bound for one wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Status code a wait-for-completion endpoint uses while the job runs.
const STILL_RUNNING: i32 = 302;

/// Polling parameters.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Fixed pause between reads; there is no backoff.
    pub interval: Duration,
    /// Measured from the start of [`await_completion`].
    pub timeout: Duration,
    /// When set to `true`, the wait ends before the next read.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            cancel: None,
        }
    }
}

impl PollOptions {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Answer of one status read.
#[derive(Debug, Clone)]
pub enum PollStatus {
    Running,
    /// The job ended; the result says whether it succeeded.
    Done(CallResult),
}

/// The job a trigger call started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobHandle {
    Tracked(String),
    /// The trigger succeeded but returned no job id.
    Untracked,
}

/// How a wait ended.
#[derive(Debug, Clone)]
pub enum Completion {
    Finished(CallResult),
    TimedOut(CallResult),
    Cancelled(CallResult),
    /// Nothing could be polled; the trigger result stands alone.
    Untracked(CallResult),
}

impl Completion {
    pub fn result(&self) -> &CallResult {
        match self {
            Self::Finished(r) | Self::TimedOut(r) | Self::Cancelled(r) | Self::Untracked(r) => r,
        }
    }

    pub fn into_result(self) -> CallResult {
        match self {
            Self::Finished(r) | Self::TimedOut(r) | Self::Cancelled(r) | Self::Untracked(r) => r,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}

/// Read a job status until it reports completion, the deadline passes,
/// or the cancellation flag is raised.
///
/// `what` names the job in messages. The check is called at least once
/// unless cancellation was requested up front.
pub fn await_completion<F>(
    what: &str,
    mut check: F,
    options: &PollOptions,
    observer: &mut dyn PollObserver,
    log: &mut RunLog,
) -> Completion
where
    F: FnMut(&mut RunLog) -> PollStatus,
{
    let started = Instant::now();
    // A timeout too large to represent means no deadline
    let deadline = started.checked_add(options.timeout);
    let mut attempt: u32 = 0;

    let completion = loop {
        if options.cancelled() {
            log.warn(format!("Stopped waiting for {what}: cancelled."));
            break Completion::Cancelled(CallResult::new(
                NO_STATUS,
                format!("Waiting for {what} was cancelled; the job may still be running."),
                false,
                true,
            ));
        }

        attempt += 1;
        observer.on_check(attempt, started.elapsed());
        match check(log) {
            PollStatus::Done(result) => break Completion::Finished(result),
            PollStatus::Running => {}
        }

        let now = Instant::now();
        let remaining = match deadline {
            Some(deadline) => deadline.saturating_duration_since(now),
            None => options.interval,
        };
        if deadline.is_some_and(|deadline| now >= deadline) {
            log.warn(format!(
                "Gave up waiting for {what} after {} checks.",
                attempt
            ));
            break Completion::TimedOut(CallResult::new(
                NO_STATUS,
                format!(
                    "Timeout reached after {}s while waiting for {what}; the job was not cancelled.",
                    options.timeout.as_secs()
                ),
                false,
                true,
            ));
        }
        thread::sleep(options.interval.min(remaining));
    };

    observer.on_finish(&completion.result().message);
    completion
}

/// Wait for a job that might not have been tracked.
pub fn await_job<F>(
    what: &str,
    handle: &JobHandle,
    trigger: &CallResult,
    check: F,
    options: &PollOptions,
    observer: &mut dyn PollObserver,
    log: &mut RunLog,
) -> Completion
where
    F: FnMut(&mut RunLog) -> PollStatus,
{
    match handle {
        JobHandle::Tracked(_) => await_completion(what, check, options, observer, log),
        JobHandle::Untracked => untracked(what, trigger, log),
    }
}

/// The completion for a trigger that returned no job id.
pub fn untracked(what: &str, trigger: &CallResult, log: &mut RunLog) -> Completion {
    log.warn(format!("{what} was started but returned no job id."));
    let result = CallResult::new(trigger.status_code, trigger.message.clone(), true, false)
        .with_note(format!(
            "The {what} job id is unknown, so completion was not awaited."
        ));
    Completion::Untracked(result)
}

/// Status read for a wait-for-completion endpoint: `302` means running,
/// anything else is classified by `table`.
pub fn redirect_check<'a>(
    transport: &'a dyn Transport,
    path: String,
    table: &'a OutcomeTable,
    id: &'a str,
) -> impl FnMut(&mut RunLog) -> PollStatus + 'a {
    move |log| {
        let result = apply(transport, &Request::get(path.clone()), table, id, log);
        if result.status_code == STILL_RUNNING {
            PollStatus::Running
        } else {
            PollStatus::Done(result)
        }
    }
}

/// Status read for a job resource: running while `extensions.active` is
/// `true`.
pub fn job_check<'a>(
    transport: &'a dyn Transport,
    path: String,
    table: &'a OutcomeTable,
    id: &'a str,
) -> impl FnMut(&mut RunLog) -> PollStatus + 'a {
    move |log| {
        let result = apply(transport, &Request::get(path.clone()), table, id, log);
        if result.failed {
            return PollStatus::Done(result);
        }
        let active = result
            .json()
            .and_then(|body| body.pointer("/extensions/active").and_then(Value::as_bool))
            .unwrap_or(false);
        if active {
            PollStatus::Running
        } else {
            PollStatus::Done(result)
        }
    }
}
