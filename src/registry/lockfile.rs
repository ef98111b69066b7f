//! yarn.lock reader
//!
//! Supports both lockfile generations:
//! - yarn v1: `lodash@^4.17.0:` headers with `version "4.17.21"` fields
//! - yarn v2+: `"lodash@npm:^4.17.0":` headers with `version: 4.17.21` fields
//!
//! Only the resolved version of each package is extracted.

use indexmap::IndexMap;
use semver::Version;

/// File name of the lockfile
pub const YARN_LOCKFILE: &str = "yarn.lock";

/// Parses lockfile content into package name -> resolved version
///
/// When several ranges of one package resolve to different versions the
/// highest one is kept.
pub fn parse_yarn_lock(content: &str) -> IndexMap<String, Version> {
    let mut installed: IndexMap<String, Version> = IndexMap::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        if !line.starts_with(char::is_whitespace) {
            current = line
                .strip_suffix(':')
                .and_then(first_descriptor)
                .and_then(|descriptor| package_name(&descriptor));
            continue;
        }

        let Some(name) = current.as_ref() else {
            continue;
        };
        let Some(version) = version_field(line.trim()) else {
            continue;
        };

        match installed.get(name) {
            Some(existing) if existing >= &version => {}
            _ => {
                installed.insert(name.clone(), version);
            }
        }
    }

    installed
}

fn first_descriptor(header: &str) -> Option<String> {
    let first = header.split(',').next()?.trim().trim_matches('"');
    if first.is_empty() || first == "__metadata" {
        return None;
    }
    Some(first.to_string())
}

fn package_name(descriptor: &str) -> Option<String> {
    // Scoped names start with '@'; the separator is the next '@'
    let offset = usize::from(descriptor.starts_with('@'));
    let at = descriptor[offset..].find('@')? + offset;
    Some(descriptor[..at].to_string())
}

fn version_field(line: &str) -> Option<Version> {
    let rest = line.strip_prefix("version")?;
    let value = rest.trim_start_matches(':').trim().trim_matches('"');
    Version::parse(value).ok()
}
