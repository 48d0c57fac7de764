//! `cloudpoll kinds`: the operation catalogue with effective settings

use cloudpoll_core::{Config, OperationKind};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::Result as CliResult;
use crate::output;

#[derive(Debug, Serialize)]
struct KindRow {
    kind: OperationKind,
    terminal_states: &'static [&'static str],
    timeout_secs: u64,
    interval_secs: u64,
}

fn rows(config: &Config) -> Vec<KindRow> {
    config
        .effective_settings()
        .into_iter()
        .map(|(kind, settings)| KindRow {
            kind,
            terminal_states: kind.terminal_states(),
            timeout_secs: settings.timeout.as_secs(),
            interval_secs: settings.interval.as_secs(),
        })
        .collect()
}

pub fn handle_kinds(config: &Config, output_format: OutputFormat) -> CliResult<()> {
    let rows = rows(config);

    match output::OutputFormat::from_cli(output_format) {
        Some(fmt) => output::print_output(&rows, fmt)?,
        None => {
            println!(
                "{:<16} {:>8} {:>9}  TERMINAL",
                "KIND", "TIMEOUT", "INTERVAL"
            );
            for row in rows {
                println!(
                    "{:<16} {:>7}s {:>8}s  {}",
                    row.kind.as_str(),
                    row.timeout_secs,
                    row.interval_secs,
                    row.terminal_states.join(", ")
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpoll_core::PollSettings;

    #[test]
    fn test_rows_reflect_overrides() {
        let mut config = Config::default();
        config.set_poll_settings(OperationKind::VolumeDetach, PollSettings::from_secs(120, 2));

        let rows = rows(&config);
        assert_eq!(rows.len(), OperationKind::ALL.len());

        let detach = rows
            .iter()
            .find(|r| r.kind == OperationKind::VolumeDetach)
            .unwrap();
        assert_eq!((detach.timeout_secs, detach.interval_secs), (120, 2));

        let stop = rows
            .iter()
            .find(|r| r.kind == OperationKind::InstanceStop)
            .unwrap();
        assert_eq!(stop.interval_secs, 60);
        assert_eq!(stop.terminal_states, ["stopped"]);
    }
}
