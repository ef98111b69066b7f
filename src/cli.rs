//! CLI argument parsing module for bumpscout
//!
//! Flags are merged over the optional `.bumpscoutrc.toml` and validated
//! before any backend is contacted.

use crate::config::RcConfig;
use crate::domain::{parse_override, PolicyConfig, Section, UpgradePolicy};
use crate::error::ConfigError;
use crate::output::{Format, JsonMode, OutputConfig};
use crate::registry::Backend;
use crate::update::UpdateFilter;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

/// Parse duration string in format: Nd (days), Nw (weeks), Nm (months)
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let days_per_unit = match s.chars().last() {
        Some('d') => 1,
        Some('w') => 7,
        Some('m') => 30,
        _ => return Err(format!("invalid duration format: {}", s)),
    };
    let num: u64 = s[..s.len() - 1]
        .parse()
        .map_err(|_| format!("invalid number in duration: {}", s))?;
    Ok(Duration::from_secs(num * days_per_unit * 24 * 60 * 60))
}

/// Find newer versions of package.json dependencies
#[derive(Parser, Debug, Clone)]
#[command(
    name = "bumpscout",
    version,
    about = "Find newer versions of package.json dependencies"
)]
pub struct CliArgs {
    /// Only check these packages (names, globs or /regex/)
    pub filter: Vec<String>,

    /// Project directory
    #[arg(short = 'C', long, default_value = ".")]
    pub cwd: PathBuf,

    /// Configuration file (default: <cwd>/.bumpscoutrc.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    // Selection
    /// Upgrade target: patch, minor, major, latest or @<tag>
    #[arg(short, long)]
    pub target: Option<UpgradePolicy>,

    /// Per-package target override (can be specified multiple times)
    #[arg(long = "target-for", value_name = "NAME=TARGET", action = ArgAction::Append)]
    pub target_for: Vec<String>,

    /// Keep upgrades consistent with the peer ranges of the other upgrades
    #[arg(long)]
    pub peer: bool,

    /// Consider pre-release versions
    #[arg(long)]
    pub pre: bool,

    /// Consider deprecated versions
    #[arg(long)]
    pub deprecated: bool,

    /// Only update to versions released at least this long ago (e.g., 2w, 10d, 1m)
    #[arg(long, value_parser = parse_duration)]
    pub age: Option<Duration>,

    // Package filters
    /// Update only specific packages (can be specified multiple times)
    #[arg(long, action = ArgAction::Append, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Exclude specific packages from update (can be specified multiple times)
    #[arg(short = 'x', long, action = ArgAction::Append, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Sections to check: prod, dev, optional, peer
    #[arg(long, value_delimiter = ',')]
    pub dep: Vec<Section>,

    // Backend
    /// npm or yarn (default: yarn when yarn.lock exists, npm otherwise)
    #[arg(short = 'p', long = "packageManager", alias = "package-manager")]
    pub package_manager: Option<Backend>,

    /// npm registry URL
    #[arg(long)]
    pub registry: Option<String>,

    /// Maximum concurrent registry queries
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-query timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Retries for failed registry requests
    #[arg(long)]
    pub retry: Option<u32>,

    /// Iteration budget for peer resolution
    #[arg(long = "peer-iterations")]
    pub peer_iterations: Option<usize>,

    /// Report peer conflicts as warnings instead of failing
    #[arg(long = "tolerate-conflicts")]
    pub tolerate_conflicts: bool,

    /// Check globally installed packages
    #[arg(short, long)]
    pub global: bool,

    /// Read package.json from standard input
    #[arg(long)]
    pub stdin: bool,

    // Output options
    /// Output formats: table, group, repo, time, lines
    #[arg(long, value_delimiter = ',')]
    pub format: Vec<Format>,

    /// Output upgraded dependencies as JSON
    #[arg(long = "jsonUpgraded", alias = "json-upgraded")]
    pub json_upgraded: bool,

    /// Output the whole dependency map with upgrades applied as JSON
    #[arg(long = "jsonAll", alias = "json-all")]
    pub json_all: bool,

    /// Write upgraded specifiers to package.json
    #[arg(short, long)]
    pub upgrade: bool,

    /// 1: exit 0 when upgrades exist; 2: exit 1 when upgrades exist
    #[arg(short, long = "error-level", default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub error_level: u8,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Fill in everything the command line left unset from the rc file
    pub fn merge(&mut self, rc: RcConfig) -> Result<(), ConfigError> {
        if self.target.is_none() {
            self.target = rc.target;
        }
        let mut overrides: Vec<String> = rc
            .target_for
            .into_iter()
            .map(|(name, policy)| format!("{}={}", name, policy))
            .collect();
        overrides.append(&mut self.target_for);
        self.target_for = overrides;

        self.peer |= rc.peer.unwrap_or(false);
        self.pre |= rc.pre.unwrap_or(false);
        self.deprecated |= rc.deprecated.unwrap_or(false);
        self.tolerate_conflicts |= rc.tolerate_conflicts.unwrap_or(false);

        if self.only.is_empty() {
            self.only = rc.only;
        }
        if self.exclude.is_empty() {
            self.exclude = rc.exclude;
        }
        if self.dep.is_empty() {
            self.dep = rc
                .dep
                .iter()
                .map(|s| s.parse())
                .collect::<Result<_, _>>()?;
        }
        if self.format.is_empty() {
            self.format = rc
                .format
                .iter()
                .map(|s| s.parse())
                .collect::<Result<_, _>>()?;
        }
        if self.package_manager.is_none() {
            self.package_manager = rc.package_manager.as_deref().map(str::parse).transpose()?;
        }
        if self.age.is_none() {
            self.age = rc
                .age
                .as_deref()
                .map(|value| {
                    parse_duration(value).map_err(|_| ConfigError::InvalidDuration {
                        value: value.to_string(),
                    })
                })
                .transpose()?;
        }

        self.registry = self.registry.take().or(rc.registry);
        self.concurrency = self.concurrency.or(rc.concurrency);
        self.timeout = self.timeout.or(rc.timeout);
        self.retry = self.retry.or(rc.retry);
        self.peer_iterations = self.peer_iterations.or(rc.peer_iterations);
        Ok(())
    }

    /// Reject option combinations that cannot be honoured
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.format.contains(&Format::Lines) {
            if self.json_upgraded {
                return Err(ConfigError::conflict(
                    "Cannot specify both --format lines and --jsonUpgraded.",
                ));
            }
            if self.json_all {
                return Err(ConfigError::conflict(
                    "Cannot specify both --format lines and --jsonAll.",
                ));
            }
            if self.format.iter().any(|f| *f != Format::Lines) {
                return Err(ConfigError::conflict(
                    "Cannot use --format lines with other formatting options.",
                ));
            }
        }
        if self.global && self.stdin {
            return Err(ConfigError::conflict("Cannot use --global with --stdin."));
        }
        if self.upgrade && self.stdin {
            return Err(ConfigError::conflict(
                "Cannot use --upgrade with --stdin: there is no file to write.",
            ));
        }
        if self.upgrade && self.global {
            return Err(ConfigError::conflict(
                "Cannot use --upgrade with --global: install global packages with your package manager.",
            ));
        }
        Ok(())
    }

    /// Build an UpdateFilter from the arguments
    pub fn filter(&self) -> UpdateFilter {
        let mut only = self.only.clone();
        only.extend(self.filter.iter().cloned());

        let mut filter = UpdateFilter::new()
            .with_sections(self.dep.clone())
            .with_only(&only)
            .with_exclude(&self.exclude)
            .with_prerelease(self.pre)
            .with_deprecated(self.deprecated);
        if let Some(age) = self.age {
            filter = filter.with_min_age(age);
        }
        filter
    }

    /// Default policy plus every `--target-for` override
    pub fn policy(&self) -> Result<PolicyConfig, ConfigError> {
        let mut policy = PolicyConfig::uniform(self.target.clone().unwrap_or_default());
        for entry in &self.target_for {
            let (name, target) = parse_override(entry)?;
            policy = policy.with_override(name, target);
        }
        Ok(policy)
    }

    /// Output settings
    pub fn output(&self) -> OutputConfig {
        let json = if self.json_all {
            JsonMode::All
        } else if self.json_upgraded {
            JsonMode::Upgraded
        } else {
            JsonMode::Off
        };
        OutputConfig::new(self.format.clone(), json)
    }

    /// Whether anything besides the requested output may be printed
    pub fn is_machine_output(&self) -> bool {
        self.json_all || self.json_upgraded || self.format.contains(&Format::Lines)
    }

    /// Default log level for the tracing subscriber
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}
