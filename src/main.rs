mod cli;
mod commands;
mod config;
mod paths;
mod resources;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
    pub json: bool,
    pub debug_log: bool,
}

/// Logger filter for the `-v` count; `-q` wins over any verbosity
fn log_level(verbose: u8, quiet: bool) -> log::LevelFilter {
    if quiet {
        return log::LevelFilter::Error;
    }
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose, cli.quiet))
        .format_timestamp(None)
        .init();

    let ctx = Context {
        quiet: cli.quiet,
        json: cli.json,
        debug_log: cli.debug_log,
    };

    match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, &cli.connection, args),
        Command::Discover(args) => commands::discover::run(&ctx, &cli.connection, args),
        Command::Activate(args) => commands::activate::run(&ctx, &cli.connection, args),
        Command::Version(args) => commands::version::run(&ctx, &cli.connection, args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "cmk-converge", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}
