//! Dependency declarations read from a manifest

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The manifest section a dependency is declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// `dependencies`
    Prod,
    /// `devDependencies`
    Dev,
    /// `optionalDependencies`
    Optional,
    /// `peerDependencies`
    Peer,
}

impl Section {
    /// All sections, most specific first
    pub const ALL: [Section; 4] = [
        Section::Prod,
        Section::Dev,
        Section::Optional,
        Section::Peer,
    ];

    /// The package.json key of this section
    pub fn manifest_key(&self) -> &'static str {
        match self {
            Section::Prod => "dependencies",
            Section::Dev => "devDependencies",
            Section::Optional => "optionalDependencies",
            Section::Peer => "peerDependencies",
        }
    }

    /// Dedup priority; lower wins
    pub fn priority(&self) -> u8 {
        match self {
            Section::Prod => 0,
            Section::Dev => 1,
            Section::Optional => 2,
            Section::Peer => 3,
        }
    }
}

impl FromStr for Section {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prod" | "production" | "dependencies" => Ok(Section::Prod),
            "dev" | "development" | "devdependencies" => Ok(Section::Dev),
            "optional" | "optionaldependencies" => Ok(Section::Optional),
            "peer" | "peerdependencies" => Ok(Section::Peer),
            _ => Err(ConfigError::InvalidSection {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.manifest_key())
    }
}

/// Represents a declared package dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Package name
    pub name: String,
    /// Declared specifier, as written
    pub specifier: String,
    /// Manifest section
    pub section: Section,
}

impl Declaration {
    /// Creates a new declaration
    pub fn new(name: impl Into<String>, specifier: impl Into<String>, section: Section) -> Self {
        Self {
            name: name.into(),
            specifier: specifier.into(),
            section,
        }
    }

    /// Creates a runtime declaration
    pub fn prod(name: impl Into<String>, specifier: impl Into<String>) -> Self {
        Self::new(name, specifier, Section::Prod)
    }

    /// Creates a development declaration
    pub fn dev(name: impl Into<String>, specifier: impl Into<String>) -> Self {
        Self::new(name, specifier, Section::Dev)
    }

    /// Creates a peer declaration
    pub fn peer(name: impl Into<String>, specifier: impl Into<String>) -> Self {
        Self::new(name, specifier, Section::Peer)
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.name, self.specifier, self.section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_new() {
        let decl = Declaration::new("lodash", "^4.17.0", Section::Prod);
        assert_eq!(decl.name, "lodash");
        assert_eq!(decl.specifier, "^4.17.0");
        assert_eq!(decl.section, Section::Prod);
    }

    #[test]
    fn test_declaration_constructors() {
        assert_eq!(Declaration::prod("a", "1").section, Section::Prod);
        assert_eq!(Declaration::dev("a", "1").section, Section::Dev);
        assert_eq!(Declaration::peer("a", "1").section, Section::Peer);
    }

    #[test]
    fn test_declaration_display() {
        let decl = Declaration::dev("jest", "^29.0.0");
        assert_eq!(decl.to_string(), "jest@^29.0.0 (devDependencies)");
    }

    #[test]
    fn test_section_priority_order() {
        assert!(Section::Prod.priority() < Section::Dev.priority());
        assert!(Section::Dev.priority() < Section::Optional.priority());
        assert!(Section::Optional.priority() < Section::Peer.priority());
    }

    #[test]
    fn test_section_from_str() {
        assert_eq!("prod".parse::<Section>().unwrap(), Section::Prod);
        assert_eq!("dev".parse::<Section>().unwrap(), Section::Dev);
        assert_eq!("devDependencies".parse::<Section>().unwrap(), Section::Dev);
        assert_eq!("optional".parse::<Section>().unwrap(), Section::Optional);
        assert_eq!("peer".parse::<Section>().unwrap(), Section::Peer);
        assert!("bundle".parse::<Section>().is_err());
    }

    #[test]
    fn test_serde_declaration() {
        let decl = Declaration::prod("react", "^18.2.0");
        let json = serde_json::to_string(&decl).unwrap();
        assert!(json.contains("\"section\":\"prod\""));
        let parsed: Declaration = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, decl);
    }
}
