use serde::Serialize;

use crate::cli;
use crate::error::Result;

/// Structured output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    /// Structured format for the CLI flag, `None` for human-readable output
    pub fn from_cli(format: cli::OutputFormat) -> Option<Self> {
        match format {
            cli::OutputFormat::Auto => None,
            cli::OutputFormat::Json => Some(Self::Json),
            cli::OutputFormat::Yaml => Some(Self::Yaml),
        }
    }
}

pub fn render<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    let value = serde_json::to_value(data)?;
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&value)?,
        OutputFormat::Yaml => serde_yaml::to_string(&value)?,
    };
    Ok(rendered)
}

pub fn print_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<()> {
    println!("{}", render(data, format)?.trim_end());
    Ok(())
}
