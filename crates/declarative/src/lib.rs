//! # Declarative
//!
//! Desired-state reconciliation against a REST API.
//!
//! Each managed object is described by a [`Resource`] configuration record.
//! The engine reads the object, compares it with the desired state and
//! issues the smallest set of calls that converges it, classifying every
//! response through static per-verb [`OutcomeTable`]s.
//!
//! ## Core Concepts
//!
//! - **Resource**: endpoint paths, outcome tables, normalization and
//!   payload builders for one kind of object
//! - **Differ**: structural comparison where only declared keys count
//! - **Executor**: the fetch/decide/apply protocol shared by every resource
//! - **Poller**: waits for asynchronous jobs with a fixed interval and a
//!   deadline
//! - **RunLog**: per-run messages, flushed once at the end of a run
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecuteOptions, RunLog, reconcile};
//!
//! let mut log = RunLog::new();
//! let outcome = reconcile(&transport, &host, &ExecuteOptions::default(), &mut log);
//! let report = outcome.report().with_debug(log.flush());
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```
//!
//! The transport is any [`restkit::Transport`]; tests use
//! [`restkit::MockTransport`] and never touch the network.

pub mod context;
pub mod diff;
pub mod executor;
pub mod outcome;
pub mod poller;
pub mod resource;
pub mod result;
pub mod tree;

// Re-export main types at crate root
pub use context::{Level, NoObserver, PollObserver, RunLog};
pub use diff::{Diff, generate_diff, is_unspecified, needs_update, unset_keys};
pub use executor::{ExecuteOptions, Reconciled, reconcile};
pub use outcome::{API_ERRORS, Outcome, OutcomeTable, OutcomeTables, apply};
pub use poller::{
    Completion, JobHandle, PollOptions, PollStatus, await_completion, await_job, job_check,
    redirect_check, untracked,
};
pub use resource::{
    Presence, Relocation, RemovalPolicy, Resource, ValidationError, extensions, pick,
    strip_fields, strip_server_fields,
};
pub use result::{CallResult, NO_STATUS, Report};
pub use tree::{Rule, Wrap, collapse, expand, overlay};
