//! `discover`: service discovery for one host, several hosts, or in bulk

use super::{connect, emit, explain, job_report};
use crate::Context;
use crate::cli::{ConnectionArgs, DiscoverArgs, DiscoveryModeArg};
use crate::resources::discovery::{DiscoveryMode, discover_bulk, discover_host};
use crate::ui::Spinner;
use anyhow::Result;
use declarative::RunLog;
use restkit::fetch_version;
use std::process::ExitCode;

impl From<DiscoveryModeArg> for DiscoveryMode {
    fn from(arg: DiscoveryModeArg) -> Self {
        match arg {
            DiscoveryModeArg::New => Self::New,
            DiscoveryModeArg::Remove => Self::Remove,
            DiscoveryModeArg::FixAll => Self::FixAll,
            DiscoveryModeArg::Refresh => Self::Refresh,
            DiscoveryModeArg::OnlyHostLabels => Self::OnlyHostLabels,
            DiscoveryModeArg::TabulaRasa => Self::TabulaRasa,
        }
    }
}

pub fn run(ctx: &Context, connection: &ConnectionArgs, args: DiscoverArgs) -> Result<ExitCode> {
    let (settings, transport) = connect(connection)?;
    let options = settings.poll_with_timeout(args.timeout);
    let mode = DiscoveryMode::from(args.mode);
    let visible = !(ctx.json || ctx.quiet);
    let mut failed = false;

    if args.bulk {
        let mut log = RunLog::new();
        let mut spinner = Spinner::new("bulk discovery", visible);
        let result = discover_bulk(&transport, &args.hosts, mode, &options, &mut spinner, &mut log);
        failed |= result.failed;
        let report = job_report(ctx, &result, &mut log);
        emit(ctx, &args.hosts.join(", "), report)?;
    } else {
        let server = fetch_version(&transport)
            .map_err(|err| explain("Failed to read the server version", err))?;
        log::info!("Server runs Checkmk {server}");

        for host in &args.hosts {
            let mut log = RunLog::new();
            let mut spinner = Spinner::new(&format!("discovery of {host}"), visible);
            let result = discover_host(&transport, host, mode, &server, &options, &mut spinner, &mut log);
            failed |= result.failed;
            let report = job_report(ctx, &result, &mut log);
            emit(ctx, host, report)?;
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
