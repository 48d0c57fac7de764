//! CLI structure and command definitions

use clap::{Parser, Subcommand};
use cloudpoll_core::OperationKind;

/// Wait for long-running cloud operations to finish
#[derive(Parser, Debug)]
#[command(name = "cloudpoll")]
#[command(version, about = "Wait for long-running cloud operations to finish")]
#[command(long_about = "
Wait for long-running cloud operations to finish

cloudpoll checks an operation's state at a fixed interval until it reaches a
terminal state or the timeout is exceeded.

EXAMPLES:
    # Wait for a snapshot exposed by a status endpoint
    cloudpoll wait https://ops.internal/snapshots/snap-0abc --kind snapshot-create

    # Custom terminal states and timing
    cloudpoll wait https://ops.internal/jobs/42 --terminal done --terminal failed \\
        --timeout 600 --interval 10

    # Read the state from a nested field, with a bearer token
    cloudpoll wait https://example.cloud.databricks.com/api/2.0/clusters/get?cluster_id=0101-abc \\
        --kind cluster-create --token \"$DATABRICKS_TOKEN\"

    # Show known operation kinds and their settings
    cloudpoll kinds -o json

For more help on a specific command, run:
    cloudpoll <command> --help
")]
pub struct Cli {
    /// Path to alternate configuration file
    #[arg(long, global = true, env = "CLOUDPOLL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll a JSON status endpoint until the operation is finished
    #[command(after_help = "EXAMPLES:
    cloudpoll wait https://ops.internal/volumes/vol-0abc --kind volume-detach
    cloudpoll wait https://ops.internal/db/pg-prod --kind instance-stop \\
        --state-pointer /DBInstances/0/DBInstanceStatus
    cloudpoll wait https://ops.internal/jobs/42 --terminal done --progress-log wait.jsonl
")]
    Wait(WaitArgs),

    /// List operation kinds with their terminal states and poll settings
    Kinds,

    /// Configuration file commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Arguments for `cloudpoll wait`
#[derive(clap::Args, Debug, Clone)]
pub struct WaitArgs {
    /// Status endpoint returning the operation state as JSON
    pub url: String,

    /// Operation kind; supplies terminal states and default timing
    #[arg(long, short, value_enum)]
    pub kind: Option<OperationKind>,

    /// Terminal state (repeatable); overrides the kind's terminal states
    #[arg(long = "terminal", short = 't', value_name = "STATE")]
    pub terminal: Vec<String>,

    /// Maximum time to wait in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Polling interval in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// JSON pointer to the state field in the response
    #[arg(long, default_value = cloudpoll_core::http::DEFAULT_STATE_POINTER)]
    pub state_pointer: String,

    /// Bearer token sent with each request
    #[arg(long, env = "CLOUDPOLL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Append progress events as JSON lines to this file
    #[arg(long, value_name = "FILE")]
    pub progress_log: Option<String>,
}

/// Configuration commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,
    /// Show the effective configuration
    Show,
}
