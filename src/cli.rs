use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cmk-converge")]
#[command(version)]
#[command(about = "Converge a Checkmk site to a declared desired state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print the result as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Attach the run log to the result
    #[arg(long, global = true)]
    pub debug_log: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection settings that override the config file
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Settings file (default: config.toml in the config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Server URL, e.g. https://monitoring.example.com
    #[arg(long, env = "CMK_SERVER_URL", global = true)]
    pub server_url: Option<String>,

    /// Site name
    #[arg(long, env = "CMK_SITE", global = true)]
    pub site: Option<String>,

    /// Automation user
    #[arg(long, env = "CMK_AUTOMATION_USER", global = true)]
    pub automation_user: Option<String>,

    /// Automation secret
    #[arg(long, env = "CMK_AUTOMATION_SECRET", hide_env_values = true, global = true)]
    pub automation_secret: Option<String>,

    /// Skip TLS certificate validation
    #[arg(long, global = true)]
    pub insecure: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile objects from a desired-state file
    Apply(ApplyArgs),

    /// Run service discovery for one or more hosts
    Discover(DiscoverArgs),

    /// Activate pending changes
    Activate(ActivateArgs),

    /// Show the server version
    Version(VersionArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Apply
// ============================================================================

#[derive(Args)]
pub struct ApplyArgs {
    /// Kind of object described in the file
    #[arg(value_enum)]
    pub kind: ResourceKind,

    /// Desired-state document (JSON or TOML)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Show what would change without changing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ResourceKind {
    Folder,
    Host,
    HostGroup,
    ServiceGroup,
    ContactGroup,
    User,
    LdapConnection,
}

// ============================================================================
// Discover
// ============================================================================

#[derive(Args)]
pub struct DiscoverArgs {
    /// Host to discover (repeat with --bulk)
    #[arg(long = "host", required = true)]
    pub hosts: Vec<String>,

    /// Discovery mode
    #[arg(long, value_enum, default_value = "new")]
    pub mode: DiscoveryModeArg,

    /// Run one bulk discovery job for all hosts
    #[arg(long)]
    pub bulk: bool,

    /// Seconds to wait for completion (default: poll_timeout_secs)
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DiscoveryModeArg {
    New,
    Remove,
    FixAll,
    Refresh,
    OnlyHostLabels,
    TabulaRasa,
}

// ============================================================================
// Activate
// ============================================================================

#[derive(Args)]
pub struct ActivateArgs {
    /// Only activate on these sites (repeatable)
    #[arg(long = "site-filter", value_name = "SITE")]
    pub sites: Vec<String>,

    /// Also activate changes made by other users
    #[arg(long)]
    pub force_foreign_changes: bool,

    /// Seconds to wait for completion (default: poll_timeout_secs)
    #[arg(long)]
    pub timeout: Option<u64>,
}

// ============================================================================
// Version
// ============================================================================

#[derive(Args)]
pub struct VersionArgs {
    /// Fail unless the server is at least this version
    #[arg(long, value_name = "VERSION")]
    pub min: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "cmk-converge",
            "--server-url",
            "https://cmk.example.com",
            "apply",
            "host-group",
            "--file",
            "groups.toml",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(
            cli.connection.server_url.as_deref(),
            Some("https://cmk.example.com")
        );
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.kind, ResourceKind::HostGroup);
        assert!(args.dry_run);
    }

    #[test]
    fn test_parse_bulk_discovery() {
        let cli = Cli::try_parse_from([
            "cmk-converge",
            "discover",
            "--bulk",
            "--host",
            "a",
            "--host",
            "b",
            "--mode",
            "fix-all",
        ])
        .unwrap();

        let Command::Discover(args) = cli.command else {
            panic!("expected discover");
        };
        assert!(args.bulk);
        assert_eq!(args.hosts, vec!["a", "b"]);
        assert_eq!(args.mode, DiscoveryModeArg::FixAll);
    }

    #[test]
    fn test_discover_requires_host() {
        assert!(Cli::try_parse_from(["cmk-converge", "discover"]).is_err());
    }
}
