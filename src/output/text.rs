//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Aligned `name  from  →  to` rows with colored distance labels
//! - Grouping under patch / minor / major headings
//! - Optional repository and publish time columns
//! - Issues, incomplete packages and the next-step hint

use crate::domain::{Distance, PackageIssue, Upgrade};
use crate::output::{OutputFormatter, Report};
use chrono::SecondsFormat;
use colored::Colorize;
use std::io::Write;

/// Text formatter for human-readable output
#[derive(Debug, Clone, Default)]
pub struct TextFormatter {
    group: bool,
    repo: bool,
    time: bool,
    color: bool,
}

/// Column widths shared by every row of one report
struct Widths {
    name: usize,
    from: usize,
    to: usize,
}

impl Widths {
    fn of<'a>(upgrades: impl Iterator<Item = &'a Upgrade>) -> Self {
        let mut widths = Widths {
            name: 0,
            from: 0,
            to: 0,
        };
        for upgrade in upgrades {
            widths.name = widths.name.max(upgrade.name.chars().count());
            widths.from = widths.from.max(upgrade.from.chars().count());
            widths.to = widths.to.max(upgrade.to.chars().count());
        }
        widths
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self {
            color: true,
            ..Self::default()
        }
    }

    /// Group rows by distance
    pub fn with_group(mut self, group: bool) -> Self {
        self.group = group;
        self
    }

    /// Show the repository column
    pub fn with_repo(mut self, repo: bool) -> Self {
        self.repo = repo;
        self
    }

    /// Show the publish time column
    pub fn with_time(mut self, time: bool) -> Self {
        self.time = time;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn format_row(
        &self,
        upgrade: &Upgrade,
        widths: &Widths,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let name = format!("{:<width$}", upgrade.name, width = widths.name);
        let from = format!("{:>width$}", upgrade.from, width = widths.from);
        let to = format!("{:<width$}", upgrade.to, width = widths.to);

        let mut line = if self.color {
            let label = if self.group {
                String::new()
            } else {
                format!("  {}", upgrade.distance.colored_label())
            };
            format!(
                " {}  {}  {}  {}{}",
                name,
                from.dimmed(),
                "→".dimmed(),
                paint_to(&to, upgrade.distance),
                label
            )
        } else {
            let label = if self.group {
                String::new()
            } else {
                format!("  {}", upgrade.distance.label())
            };
            format!(" {}  {}  →  {}{}", name, from, to, label)
        };

        if self.time {
            let published = upgrade
                .published_at
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_default();
            line.push_str("  ");
            line.push_str(&published);
        }
        if self.repo {
            if let Some(repository) = &upgrade.repository {
                line.push_str("  ");
                line.push_str(repository);
            }
        }

        writeln!(writer, "{}", line.trim_end())
    }

    fn format_grouped(&self, report: &Report<'_>, writer: &mut dyn Write) -> std::io::Result<()> {
        let widths = Widths::of(report.result.upgrades.values());
        let mut first = true;

        for distance in [Distance::Patch, Distance::Minor, Distance::Major] {
            let rows: Vec<&Upgrade> = report
                .result
                .upgrades
                .values()
                .filter(|u| u.distance == distance)
                .collect();
            if rows.is_empty() {
                continue;
            }

            if !first {
                writeln!(writer)?;
            }
            first = false;

            let heading = distance.heading();
            if self.color {
                let (title, rest) = heading.split_at(heading.find(' ').unwrap_or(heading.len()));
                let title = match distance {
                    Distance::Major => title.red().bold(),
                    Distance::Minor => title.cyan().bold(),
                    Distance::Patch => title.green().bold(),
                };
                writeln!(writer, "{}{}", title, rest)?;
            } else {
                writeln!(writer, "{}", heading)?;
            }

            for upgrade in rows {
                self.format_row(upgrade, &widths, writer)?;
            }
        }
        Ok(())
    }

    fn format_issues(
        &self,
        title: &str,
        issues: &[PackageIssue],
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if issues.is_empty() {
            return Ok(());
        }
        writeln!(writer)?;
        if self.color {
            writeln!(writer, "{}", title.yellow().bold())?;
        } else {
            writeln!(writer, "{}", title)?;
        }
        for issue in issues {
            writeln!(writer, "  {} ({})", issue, issue.kind)?;
        }
        Ok(())
    }
}

fn paint_to(to: &str, distance: Distance) -> String {
    match distance {
        Distance::Major => to.red().to_string(),
        Distance::Minor => to.cyan().to_string(),
        Distance::Patch => to.green().to_string(),
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, report: &Report<'_>, writer: &mut dyn Write) -> std::io::Result<()> {
        let result = report.result;

        if !result.has_changes() {
            writeln!(writer, "All dependencies are up to date :)")?;
        } else if self.group {
            self.format_grouped(report, writer)?;
        } else {
            let widths = Widths::of(result.upgrades.values());
            for upgrade in result.upgrades.values() {
                self.format_row(upgrade, &widths, writer)?;
            }
        }

        self.format_issues("Errors:", &result.errors, writer)?;
        self.format_issues("Warnings:", &result.warnings, writer)?;

        if !result.incomplete.is_empty() {
            writeln!(writer)?;
            let prefix = if result.partial {
                "Cancelled, results are partial."
            } else {
                "Some packages could not be fully checked."
            };
            writeln!(writer, "{} Incomplete: {}", prefix, result.incomplete.join(", "))?;
        }

        if result.has_changes() {
            writeln!(writer)?;
            if report.written {
                writeln!(
                    writer,
                    "Run {} to install new versions.",
                    report.install_command
                )?;
            } else {
                writeln!(writer, "Run bumpscout -u to upgrade package.json")?;
            }
        }
        Ok(())
    }
}
