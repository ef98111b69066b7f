//! Output formatting for resolution results
//!
//! This module provides:
//! - Text output for human-readable display (table, grouped, repo, time)
//! - Lines output, one `name@specifier` per line
//! - JSON output of the upgraded or of the whole dependency map

mod json;
mod lines;
mod text;

pub use json::JsonFormatter;
pub use lines::LinesFormatter;
pub use text::TextFormatter;

use crate::domain::{Declaration, ResolutionResult};
use crate::error::ConfigError;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Human-readable layouts and modifiers selectable with `--format`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// One aligned row per upgrade
    Table,
    /// Rows grouped under patch / minor / major headings
    Group,
    /// Adds the source repository column
    Repo,
    /// Adds the publish time column
    Time,
    /// `name@specifier` per line, nothing else
    Lines,
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(Format::Table),
            "group" => Ok(Format::Group),
            "repo" => Ok(Format::Repo),
            "time" => Ok(Format::Time),
            "lines" => Ok(Format::Lines),
            _ => Err(ConfigError::InvalidFormat {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Table => "table",
            Format::Group => "group",
            Format::Repo => "repo",
            Format::Time => "time",
            Format::Lines => "lines",
        };
        write!(f, "{}", name)
    }
}

/// JSON output selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonMode {
    #[default]
    Off,
    /// Only the upgraded dependencies
    Upgraded,
    /// Every dependency, with upgrades applied
    All,
}

/// Configuration for output formatting
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub formats: Vec<Format>,
    pub json: JsonMode,
    /// Whether to use colors (when supported)
    pub color: bool,
}

impl OutputConfig {
    pub fn new(formats: Vec<Format>, json: JsonMode) -> Self {
        Self {
            formats,
            json,
            color: true,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn has(&self, format: Format) -> bool {
        self.formats.contains(&format)
    }
}

/// Everything a formatter may show
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    pub result: &'a ResolutionResult,
    /// The declarations that were checked, in manifest order
    pub declarations: &'a [Declaration],
    /// Whether package.json has been rewritten
    pub written: bool,
    /// Command that installs the new versions, e.g. `npm install`
    pub install_command: &'a str,
}

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format and write a report
    fn format(&self, report: &Report<'_>, writer: &mut dyn Write) -> std::io::Result<()>;
}

/// Create an output formatter based on configuration
pub fn create_formatter(config: &OutputConfig) -> Box<dyn OutputFormatter> {
    if config.json != JsonMode::Off {
        return Box::new(JsonFormatter::new(config.json));
    }
    if config.has(Format::Lines) {
        return Box::new(LinesFormatter);
    }
    Box::new(
        TextFormatter::new()
            .with_group(config.has(Format::Group))
            .with_repo(config.has(Format::Repo))
            .with_time(config.has(Format::Time))
            .with_color(config.color),
    )
}
