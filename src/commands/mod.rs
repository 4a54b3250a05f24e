// Desired-state reconciliation
pub mod apply;

// Asynchronous jobs
pub mod activate;
pub mod discover;

// Server information
pub mod version;

use crate::Context;
use crate::cli::ConnectionArgs;
use crate::config::{self, Settings};
use crate::ui;
use anyhow::Result;
use declarative::{CallResult, Report, RunLog};
use restkit::UreqTransport;
use serde::Serialize;

/// Settings and a live transport for one command
pub(crate) fn connect(args: &ConnectionArgs) -> Result<(Settings, UreqTransport)> {
    let settings = config::load(args)?;
    log::debug!("Connecting to {} (site {})", settings.http.server_url, settings.http.site);
    let transport = UreqTransport::new(&settings.http)
        .map_err(|err| explain("Failed to set up the HTTP client", err))?;
    Ok((settings, transport))
}

/// Wrap a transport error with its category and a hint on what to check
pub(crate) fn explain(what: &str, err: restkit::Error) -> anyhow::Error {
    let category = err.category();
    anyhow::Error::new(err).context(format!("{what} ({category}). {}", category.advice()))
}

/// A report tagged with what it is about
#[derive(Debug, Serialize)]
pub(crate) struct Labeled {
    pub target: String,
    #[serde(flatten)]
    pub report: Report,
}

/// Build the report for a job result and flush the run log into it.
pub(crate) fn job_report(ctx: &Context, result: &CallResult, log: &mut RunLog) -> Report {
    let lines = log.flush();
    let report = Report::new(result, None);
    if ctx.debug_log {
        report.with_debug(lines)
    } else {
        report
    }
}

/// Print one report in the selected output mode
pub(crate) fn emit(ctx: &Context, target: &str, report: Report) -> Result<()> {
    if ctx.json {
        ui::json(&Labeled {
            target: target.to_string(),
            report,
        })
    } else {
        if !(ctx.quiet && !report.failed) {
            ui::report(target, &report);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explain_adds_category_and_advice() {
        let err = explain(
            "Failed to set up the HTTP client",
            restkit::Error::InvalidUrl("ftp://cmk".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "Failed to set up the HTTP client (Invalid client configuration). \
             Check server_url, site and credentials in your configuration"
        );
        assert!(format!("{err:#}").ends_with("invalid server URL: ftp://cmk"));
    }

    #[test]
    fn test_explain_network_failure() {
        let err = explain(
            "Failed to read the server version",
            restkit::Error::transport("connection refused"),
        );
        let text = format!("{err:#}");
        assert!(text.contains("Network connectivity issue"));
        assert!(text.contains("Check that the server URL is reachable"));
        assert!(text.contains("connection refused"));
    }
}
