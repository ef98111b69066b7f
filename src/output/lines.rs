//! Lines output: `name@specifier` per upgrade, nothing else

use crate::output::{OutputFormatter, Report};
use std::io::Write;

/// Formatter printing one upgrade per line
pub struct LinesFormatter;

impl OutputFormatter for LinesFormatter {
    fn format(&self, report: &Report<'_>, writer: &mut dyn Write) -> std::io::Result<()> {
        for upgrade in report.result.upgrades.values() {
            writeln!(writer, "{}", upgrade)?;
        }
        Ok(())
    }
}
