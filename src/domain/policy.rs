//! Upgrade policies
//!
//! A policy bounds how far a dependency may move:
//! - `patch`: stay on the current major.minor
//! - `minor`: stay on the current major
//! - `major`: highest published version
//! - `latest`: the version behind the `latest` dist-tag
//! - `@<tag>`: the version behind any other dist-tag

use crate::error::ConfigError;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Target level of an upgrade
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum UpgradePolicy {
    Patch,
    Minor,
    Major,
    #[default]
    Latest,
    /// A named dist-tag such as `next` or `beta`
    Tag(String),
}

impl UpgradePolicy {
    /// Returns true if the policy keeps the current major version
    pub fn is_bounded(&self) -> bool {
        matches!(self, UpgradePolicy::Patch | UpgradePolicy::Minor)
    }
}

impl FromStr for UpgradePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "patch" => Ok(UpgradePolicy::Patch),
            "minor" => Ok(UpgradePolicy::Minor),
            "major" => Ok(UpgradePolicy::Major),
            "latest" | "@latest" => Ok(UpgradePolicy::Latest),
            other => match other.strip_prefix('@') {
                Some(tag) if !tag.is_empty() && !tag.contains(char::is_whitespace) => {
                    Ok(UpgradePolicy::Tag(tag.to_string()))
                }
                _ => Err(ConfigError::InvalidTarget {
                    value: s.to_string(),
                }),
            },
        }
    }
}

impl<'de> Deserialize<'de> for UpgradePolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for UpgradePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradePolicy::Patch => write!(f, "patch"),
            UpgradePolicy::Minor => write!(f, "minor"),
            UpgradePolicy::Major => write!(f, "major"),
            UpgradePolicy::Latest => write!(f, "latest"),
            UpgradePolicy::Tag(tag) => write!(f, "@{}", tag),
        }
    }
}

/// A default policy plus per-package overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyConfig {
    pub default: UpgradePolicy,
    pub overrides: IndexMap<String, UpgradePolicy>,
}

impl PolicyConfig {
    /// Creates a config applying `policy` to every package
    pub fn uniform(policy: UpgradePolicy) -> Self {
        Self {
            default: policy,
            overrides: IndexMap::new(),
        }
    }

    /// Adds a per-package override
    pub fn with_override(mut self, package: impl Into<String>, policy: UpgradePolicy) -> Self {
        self.overrides.insert(package.into(), policy);
        self
    }

    /// The policy that applies to `package`
    pub fn policy_for(&self, package: &str) -> &UpgradePolicy {
        self.overrides.get(package).unwrap_or(&self.default)
    }
}

/// Parses a `name=policy` pair as used by `--target-for`
pub fn parse_override(value: &str) -> Result<(String, UpgradePolicy), ConfigError> {
    // Split on the last '=' so scoped names stay intact
    match value.rsplit_once('=') {
        Some((name, policy)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), policy.parse()?))
        }
        _ => Err(ConfigError::InvalidTarget {
            value: value.to_string(),
        }),
    }
}
