use anyhow::Result;
use clap::Parser;
use cloudpoll_core::Config;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod error;
mod output;

use cli::{Cli, Commands};
use error::CloudPollError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    let config_path = match &cli.config_file {
        Some(config_file) => {
            debug!("Using config from explicit path: {}", config_file);
            PathBuf::from(config_file)
        }
        None => Config::config_path()?,
    };

    if let Err(e) = execute_command(&cli, &config_path).await {
        e.print_diagnostic();
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "cloudpoll=warn,cloudpoll_core=warn",
            1 => "cloudpoll=info,cloudpoll_core=info",
            2 => "cloudpoll=debug,cloudpoll_core=debug",
            _ => "cloudpoll=trace,cloudpoll_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &Cli, config_path: &Path) -> Result<(), CloudPollError> {
    info!("Command: {}", format_command(&cli.command));

    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Wait(args) => {
            let config = Config::load_from_path(config_path)?;
            commands::wait::handle_wait(args, &config, cli.output).await
        }
        Commands::Kinds => {
            let config = Config::load_from_path(config_path)?;
            commands::kinds::handle_kinds(&config, cli.output)
        }
        Commands::Config(config_cmd) => {
            commands::config::handle_config_command(config_cmd, config_path, cli.output)
        }
    };

    let duration = start.elapsed();
    match &result {
        Ok(_) => info!("Command completed successfully in {:?}", duration),
        Err(e) => error!("Command failed after {:?}: {}", duration, e),
    }

    result
}

/// Format command for human-readable logging (without the token)
fn format_command(command: &Commands) -> String {
    match command {
        Commands::Wait(args) => match args.kind {
            Some(kind) => format!("wait {} --kind {}", args.url, kind),
            None => format!("wait {} --terminal {}", args.url, args.terminal.join(",")),
        },
        Commands::Kinds => "kinds".to_string(),
        Commands::Config(cmd) => format!("config {:?}", cmd).to_lowercase(),
    }
}
