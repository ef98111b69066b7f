//! JSON output formatter for machine processing
//!
//! - `--jsonUpgraded`: `{ name: newSpecifier }` for every upgrade
//! - `--jsonAll`: `{ name: specifier }` for every checked dependency, with
//!   upgrades applied

use crate::output::{JsonMode, OutputFormatter, Report};
use indexmap::IndexMap;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    mode: JsonMode,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(mode: JsonMode) -> Self {
        Self { mode }
    }

    /// The name → specifier map this formatter prints
    fn entries<'a>(&self, report: &Report<'a>) -> IndexMap<&'a str, &'a str> {
        match self.mode {
            JsonMode::All => {
                let mut entries = IndexMap::new();
                for declaration in report.declarations {
                    let specifier = report
                        .result
                        .upgrades
                        .get(&declaration.name)
                        .map(|u| u.to.as_str())
                        .unwrap_or(declaration.specifier.as_str());
                    entries.entry(declaration.name.as_str()).or_insert(specifier);
                }
                entries
            }
            JsonMode::Upgraded | JsonMode::Off => report.result.specifiers(),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &Report<'_>, writer: &mut dyn Write) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.entries(report))?;
        writeln!(writer, "{}", json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;
    use serde_json::Value;

    fn render(mode: JsonMode) -> Value {
        let result = fixtures::result();
        let declarations = fixtures::declarations();
        let report = Report {
            result: &result,
            declarations: &declarations,
            written: false,
            install_command: "npm install",
        };
        let mut out = Vec::new();
        JsonFormatter::new(mode).format(&report, &mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn test_json_upgraded() {
        let json = render(JsonMode::Upgraded);
        assert_eq!(
            json,
            serde_json::json!({ "ncu-test-v2": "^2.0.0", "ncu-test-tag": "^1.1.0" })
        );
    }

    #[test]
    fn test_json_all_includes_unchanged() {
        let json = render(JsonMode::All);
        assert_eq!(
            json,
            serde_json::json!({
                "ncu-test-v2": "^2.0.0",
                "ncu-test-tag": "^1.1.0",
                "left-pad": "1.3.0"
            })
        );
    }

    #[test]
    fn test_json_keeps_declaration_order() {
        let json = render(JsonMode::All);
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["ncu-test-v2", "ncu-test-tag", "left-pad"]);
    }
}
