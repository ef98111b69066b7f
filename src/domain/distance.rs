//! Semver distance between a declared and an upgraded version

use colored::Colorize;
use semver::Version;
use serde::Serialize;

/// How far an upgrade moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    /// Patch version change (fixes)
    Patch,
    /// Minor version change (features)
    Minor,
    /// Major version change (breaking)
    Major,
}

impl Distance {
    /// Determine the distance between two versions
    ///
    /// Below 1.0.0 a minor bump is breaking and is reported as major,
    /// following caret semantics.
    pub fn between(old: &Version, new: &Version) -> Self {
        if new.major != old.major {
            Distance::Major
        } else if new.minor != old.minor {
            if old.major == 0 {
                Distance::Major
            } else {
                Distance::Minor
            }
        } else {
            Distance::Patch
        }
    }

    /// Get the display label with color
    pub fn colored_label(&self) -> String {
        match self {
            Distance::Major => "major".red().bold().to_string(),
            Distance::Minor => "minor".cyan().to_string(),
            Distance::Patch => "patch".green().to_string(),
        }
    }

    /// Get the plain label
    pub fn label(&self) -> &'static str {
        match self {
            Distance::Major => "major",
            Distance::Minor => "minor",
            Distance::Patch => "patch",
        }
    }

    /// Heading used by the grouped report
    pub fn heading(&self) -> &'static str {
        match self {
            Distance::Patch => "Patch   Backwards-compatible bug fixes",
            Distance::Minor => "Minor   Backwards-compatible features",
            Distance::Major => "Major   Potentially breaking API changes",
        }
    }
}
