//! `activate`: activate pending changes and wait for the run

use super::{connect, emit, job_report};
use crate::Context;
use crate::cli::{ActivateArgs, ConnectionArgs};
use crate::resources::activation::activate;
use crate::ui::Spinner;
use anyhow::Result;
use declarative::RunLog;
use std::process::ExitCode;

pub fn run(ctx: &Context, connection: &ConnectionArgs, args: ActivateArgs) -> Result<ExitCode> {
    let (settings, transport) = connect(connection)?;
    let options = settings.poll_with_timeout(args.timeout);

    let mut log = RunLog::new();
    let mut spinner = Spinner::new("activation", !(ctx.json || ctx.quiet));
    let result = activate(
        &transport,
        &args.sites,
        args.force_foreign_changes,
        &options,
        &mut spinner,
        &mut log,
    );

    let target = if args.sites.is_empty() {
        settings.http.site.clone()
    } else {
        args.sites.join(", ")
    };
    let failed = result.failed;
    emit(ctx, &target, job_report(ctx, &result, &mut log))?;

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
