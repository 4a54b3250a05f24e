//! `version`: show the server version and optionally enforce a minimum

use super::{connect, explain};
use crate::Context;
use crate::cli::{ConnectionArgs, VersionArgs};
use crate::ui;
use anyhow::{Context as _, Result};
use restkit::{Version, fetch_version};
use serde::Serialize;
use std::process::ExitCode;

#[derive(Debug, Serialize, PartialEq)]
struct VersionCheck {
    version: String,
    edition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minimum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meets_minimum: Option<bool>,
}

impl VersionCheck {
    fn new(server: &Version, minimum: Option<&Version>) -> Self {
        Self {
            version: server.to_string(),
            edition: server.edition.clone(),
            minimum: minimum.map(Version::to_string),
            meets_minimum: minimum.map(|min| server.at_least(min)),
        }
    }
}

pub fn run(ctx: &Context, connection: &ConnectionArgs, args: VersionArgs) -> Result<ExitCode> {
    let minimum = args
        .min
        .as_deref()
        .map(str::parse::<Version>)
        .transpose()
        .context("Invalid --min version")?;

    let (settings, transport) = connect(connection)?;
    let server = fetch_version(&transport)
        .map_err(|err| explain("Failed to read the server version", err))?;
    let check = VersionCheck::new(&server, minimum.as_ref());

    if ctx.json {
        ui::json(&check)?;
    } else if !ctx.quiet {
        ui::kv("Site", &settings.http.site);
        ui::kv("Version", &check.version);
        if let Some(edition) = &check.edition {
            ui::kv("Edition", edition);
        }
    }

    match (check.meets_minimum, &check.minimum) {
        (Some(false), Some(min)) => {
            if !ctx.json {
                ui::error(&format!("Server {} is older than {min}", check.version));
            }
            Ok(ExitCode::FAILURE)
        }
        (Some(true), Some(min)) => {
            if !ctx.json && !ctx.quiet {
                ui::success(&format!("Server meets the minimum version {min}"));
            }
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::SUCCESS),
    }
}
