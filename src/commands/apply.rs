//! `apply`: reconcile every object of a desired-state document

use super::{Labeled, connect};
use crate::Context;
use crate::cli::{ApplyArgs, ConnectionArgs};
use crate::resources;
use crate::ui;
use anyhow::{Context as _, Result};
use declarative::{ExecuteOptions, Report, Resource, RunLog, reconcile};
use restkit::Transport;
use std::process::ExitCode;

pub fn run(ctx: &Context, connection: &ConnectionArgs, args: ApplyArgs) -> Result<ExitCode> {
    let items = resources::load(args.kind, &args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    if items.is_empty() {
        if !ctx.quiet && !ctx.json {
            ui::warn(&format!("{} declares no objects", args.file.display()));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let (_, transport) = connect(connection)?;
    let options = ExecuteOptions {
        dry_run: args.dry_run,
    };

    if !ctx.quiet && !ctx.json {
        let mode = if args.dry_run { " (dry run)" } else { "" };
        ui::header(&format!("Applying {}{mode}", args.file.display()));
    }

    let reports = reconcile_all(ctx, &transport, &items, &options);
    let failed = reports.iter().filter(|r| r.report.failed).count();
    let changed = reports.iter().filter(|r| r.report.changed).count();

    if ctx.json {
        ui::json(&reports)?;
    } else {
        for item in &reports {
            if !(ctx.quiet && !item.report.failed) {
                ui::report(&item.target, &item.report);
            }
        }
        if !ctx.quiet {
            println!();
            let verb = if args.dry_run { "would change" } else { "changed" };
            ui::kv("Objects", &reports.len().to_string());
            ui::kv(verb, &changed.to_string());
            ui::kv("Failed", &failed.to_string());
        }
    }

    Ok(if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Reconcile objects one after another; a failure does not stop the rest.
fn reconcile_all(
    ctx: &Context,
    transport: &dyn Transport,
    items: &[Box<dyn Resource>],
    options: &ExecuteOptions,
) -> Vec<Labeled> {
    items
        .iter()
        .map(|item| {
            let mut log = RunLog::new();
            let outcome = reconcile(transport, item.as_ref(), options, &mut log);
            let lines = log.flush();
            let report: Report = outcome.report();
            Labeled {
                target: format!("{} {}", item.resource_type(), item.id()),
                report: if ctx.debug_log {
                    report.with_debug(lines)
                } else {
                    report
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::group::{Group, GroupKind};
    use restkit::{Method, MockTransport, Response};

    fn ctx(debug_log: bool) -> Context {
        Context {
            quiet: true,
            json: true,
            debug_log,
        }
    }

    #[test]
    fn test_failure_does_not_stop_other_objects() {
        let mock = MockTransport::new();
        mock.reply(
            Method::Get,
            "/objects/host_group_config/a",
            Response::status(500),
        );
        mock.reply(
            Method::Get,
            "/objects/host_group_config/b",
            Response::json(200, r#"{"extensions":{"alias":"B"}}"#),
        );

        let items: Vec<Box<dyn Resource>> = vec![
            Box::new(Group::new(GroupKind::Host, "a", Some("A".to_string()))),
            Box::new(Group::new(GroupKind::Host, "b", Some("B".to_string()))),
        ];
        let reports = reconcile_all(&ctx(false), &mock, &items, &ExecuteOptions::default());

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].target, "host_group a");
        assert!(reports[0].report.failed);
        assert!(!reports[1].report.failed);
        assert!(!reports[1].report.changed);
        assert!(reports[1].report.debug.is_empty());
    }

    #[test]
    fn test_debug_log_is_attached() {
        let mock = MockTransport::new();
        mock.reply(
            Method::Get,
            "/objects/host_group_config/b",
            Response::json(200, r#"{"extensions":{"alias":"B"}}"#),
        );
        let items: Vec<Box<dyn Resource>> = vec![Box::new(Group::new(
            GroupKind::Host,
            "b",
            Some("B".to_string()),
        ))];

        let reports = reconcile_all(&ctx(true), &mock, &items, &ExecuteOptions::default());

        let debug = &reports[0].report.debug;
        assert!(!debug.is_empty());
        assert!(debug.iter().any(|line| line.contains("GET /objects/host_group_config/b")));

        let value = serde_json::to_value(&reports[0]).unwrap();
        assert_eq!(value["target"], "host_group b");
        assert_eq!(value["http_code"], 200);
    }
}
