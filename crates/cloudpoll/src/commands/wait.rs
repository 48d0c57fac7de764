//! `cloudpoll wait`: poll a status endpoint until the operation is finished
//!
//! Wraps the core [`Poller`] with a spinner on stderr and an optional
//! JSON-lines progress log.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use cloudpoll_core::{
    BoxError, Config, HttpStateQuery, OperationKind, PollSettings, Poller, ProgressCallback,
    ProgressEvent, ProgressSink,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{OutputFormat, WaitArgs};
use crate::error::{CloudPollError, Result as CliResult};
use crate::output;

/// Result printed once a terminal state is reached
#[derive(Debug, Serialize)]
struct WaitOutcome<'a> {
    operation_id: &'a str,
    state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<OperationKind>,
    timeout_secs: u64,
    interval_secs: u64,
}

pub async fn handle_wait(
    args: &WaitArgs,
    config: &Config,
    output_format: OutputFormat,
) -> CliResult<()> {
    let terminal = resolve_terminal(args)?;
    let settings = resolve_settings(args, config);
    debug!(
        "Waiting on {} for {:?} (timeout {}s, interval {}s)",
        args.url,
        terminal,
        settings.timeout.as_secs(),
        settings.interval.as_secs()
    );

    let mut query = HttpStateQuery::new(&args.url)?.state_pointer(&args.state_pointer);
    if let Some(token) = &args.token {
        query = query.bearer_token(token);
    }

    let mut sinks: Vec<ProgressCallback> = Vec::new();
    let progress_bar = (output_format == OutputFormat::Auto).then(|| spinner(&args.url));
    if let Some(pb) = &progress_bar {
        sinks.push(Box::new(spinner_sink(pb.clone())));
    }
    if let Some(path) = &args.progress_log {
        sinks.push(Box::new(ProgressLog::create(path)?));
    }
    let on_progress = (!sinks.is_empty()).then(|| Box::new(Fanout(sinks)) as ProgressCallback);

    let result = Poller::new(args.url.as_str(), terminal)
        .settings(settings)
        .with_progress(on_progress)
        .run(|| query.fetch_state())
        .await;

    let state = match result {
        Ok(state) => state,
        Err(e) => {
            if let Some(pb) = &progress_bar {
                pb.finish_and_clear();
            }
            return Err(CloudPollError::from(e));
        }
    };

    info!("{} reached {}", args.url, state);
    match output::OutputFormat::from_cli(output_format) {
        Some(fmt) => output::print_output(
            &WaitOutcome {
                operation_id: &args.url,
                state,
                kind: args.kind,
                timeout_secs: settings.timeout.as_secs(),
                interval_secs: settings.interval.as_secs(),
            },
            fmt,
        )?,
        None => println!("{}", format_state(&state)),
    }
    Ok(())
}

/// `--terminal` wins over the kind's terminal states
fn resolve_terminal(args: &WaitArgs) -> CliResult<Vec<String>> {
    if !args.terminal.is_empty() {
        return Ok(args.terminal.clone());
    }
    match args.kind {
        Some(kind) => Ok(kind
            .terminal_states()
            .iter()
            .map(|s| s.to_string())
            .collect()),
        None => Err(CloudPollError::InvalidInput {
            message: "no terminal states; pass --terminal <STATE> or --kind <KIND>".to_string(),
        }),
    }
}

/// Flags, then the config file entry for the kind, then the defaults
fn resolve_settings(args: &WaitArgs, config: &Config) -> PollSettings {
    let mut settings = match args.kind {
        Some(kind) => config.poll_settings(kind),
        None => PollSettings::default(),
    };
    if let Some(timeout) = args.timeout {
        settings.timeout = Duration::from_secs(timeout);
    }
    if let Some(interval) = args.interval {
        settings.interval = Duration::from_secs(interval);
    }
    settings
}

fn spinner(url: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed_precise}]")
    {
        pb.set_style(style);
    }
    pb.set_message(format!("Waiting for {}", url));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn spinner_sink(pb: ProgressBar) -> impl Fn(&ProgressEvent) + Send + Sync + 'static {
    move |event: &ProgressEvent| match event {
        ProgressEvent::Polling { state, elapsed, .. } => {
            pb.set_message(format!(
                "{} ({}s)",
                format_state(state),
                elapsed.as_secs()
            ));
        }
        ProgressEvent::Completed { .. } => pb.finish_and_clear(),
        ProgressEvent::TimedOut { .. } => pb.finish_and_clear(),
    }
}

/// Appends each event as one JSON line
struct ProgressLog {
    file: Mutex<File>,
}

impl ProgressLog {
    fn create(path: &str) -> CliResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| CloudPollError::FileError {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ProgressSink for ProgressLog {
    fn report(&self, event: &ProgressEvent) -> Result<(), BoxError> {
        let line = serde_json::to_string(event)?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| "progress log lock poisoned")?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Delivers to every sink; the first failure is reported after all have run
struct Fanout(Vec<ProgressCallback>);

impl ProgressSink for Fanout {
    fn report(&self, event: &ProgressEvent) -> Result<(), BoxError> {
        let mut first_err = None;
        for sink in &self.0 {
            if let Err(e) = sink.report(event)
                && first_err.is_none()
            {
                first_err = Some(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Format a state for display with a status icon
fn format_state(state: &str) -> String {
    match state.to_lowercase().as_str() {
        "completed" | "attached" | "detached" | "stopped" | "available" | "running" | "done"
        | "succeeded" => {
            format!("\u{2713} {}", state) // checkmark
        }
        "error" | "failed" | "terminated" | "incompatible-parameters" | "incompatible-restore" => {
            format!("\u{2717} {}", state) // x mark
        }
        _ => format!("\u{21bb} {}", state), // arrow circle
    }
}
