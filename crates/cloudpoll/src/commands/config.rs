//! `cloudpoll config`: where the configuration lives and what it resolves to

use std::path::Path;

use cloudpoll_core::Config;
use serde::Serialize;

use crate::cli::{ConfigCommands, OutputFormat};
use crate::error::{CloudPollError, Result as CliResult};
use crate::output;

pub fn handle_config_command(
    config_cmd: &ConfigCommands,
    config_path: &Path,
    output_format: OutputFormat,
) -> CliResult<()> {
    match config_cmd {
        ConfigCommands::Path => handle_path(config_path, output_format),
        ConfigCommands::Show => {
            let config = Config::load_from_path(config_path)?;
            handle_show(&config, output_format)
        }
    }
}

fn handle_path(config_path: &Path, output_format: OutputFormat) -> CliResult<()> {
    match output::OutputFormat::from_cli(output_format) {
        Some(fmt) => {
            let output_data = serde_json::json!({
                "config_path": config_path.display().to_string(),
                "exists": config_path.exists(),
            });
            output::print_output(&output_data, fmt)?;
        }
        None => println!("{}", config_path.display()),
    }
    Ok(())
}

/// Every kind is listed with its effective settings, not just the overrides
fn effective(config: &Config) -> Config {
    let mut effective = config.clone();
    for (kind, settings) in config.effective_settings() {
        effective.set_poll_settings(kind, settings);
    }
    effective
}

fn handle_show(config: &Config, output_format: OutputFormat) -> CliResult<()> {
    let effective = effective(config);
    match output::OutputFormat::from_cli(output_format) {
        Some(fmt) => output::print_output(&effective, fmt)?,
        None => print!("{}", to_toml(&effective)?),
    }
    Ok(())
}

fn to_toml<T: Serialize>(value: &T) -> CliResult<String> {
    toml::to_string_pretty(value).map_err(|e| CloudPollError::OutputError {
        message: format!("TOML error: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpoll_core::{OperationKind, PollSettings};

    #[test]
    fn test_effective_config_lists_every_kind() {
        let mut config = Config::default();
        config.set_poll_settings(OperationKind::ClusterCreate, PollSettings::from_secs(1800, 15));

        let effective = effective(&config);
        assert_eq!(effective.polling.len(), OperationKind::ALL.len());
        assert_eq!(
            effective.poll_settings(OperationKind::ClusterCreate),
            PollSettings::from_secs(1800, 15)
        );

        let rendered = to_toml(&effective).unwrap();
        assert!(rendered.contains("[polling.volume_attach]"));
        assert!(rendered.contains("[cluster_retry]"));
        assert!(rendered.contains("UnknownWorkerEnvironmentException"));
    }
}
