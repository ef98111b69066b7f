//! Resolution result types

use super::{Distance, Section, VersionRange};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use semver::Version;
use serde::Serialize;
use std::fmt;

/// A recommended upgrade for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrade {
    /// Package name as declared in the manifest
    pub name: String,
    /// Section the declaration was taken from
    pub section: Section,
    /// Declared specifier
    pub from: String,
    /// Recommended specifier
    pub to: String,
    /// The concrete version the new specifier was built from
    pub version: String,
    /// Semver distance from the declared version
    pub distance: Distance,
    /// Publish time of the target version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Source repository of the target version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

impl fmt::Display for Upgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.to)
    }
}

/// A peer range one chosen package version declares against another package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConstraint {
    /// Package declaring the peer dependency
    pub declarer: String,
    /// Version of the declaring package the range was read from
    pub declarer_version: Version,
    /// Package the range applies to
    pub peer: String,
    pub range: VersionRange,
}

impl fmt::Display for PeerConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} requires {}@{}",
            self.declarer,
            self.declarer_version,
            self.peer,
            self.range.raw()
        )
    }
}

/// Category of a per-package problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    /// Declared in several sections with different specifiers
    DuplicateDeclaration,
    /// Name is empty or contains control characters
    InvalidName,
    /// Specifier could not be parsed
    InvalidSpecifier,
    /// Package absent from the registry
    NotFound,
    /// Backend query failed or timed out
    BackendUnavailable,
    /// Peer ranges could not all be satisfied
    PeerConflict,
    /// A peer range declared by a dependency could not be parsed
    InvalidPeerRange,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IssueKind::DuplicateDeclaration => "duplicate declaration",
            IssueKind::InvalidName => "invalid name",
            IssueKind::InvalidSpecifier => "invalid specifier",
            IssueKind::NotFound => "not found",
            IssueKind::BackendUnavailable => "backend unavailable",
            IssueKind::PeerConflict => "peer conflict",
            IssueKind::InvalidPeerRange => "invalid peer range",
        };
        write!(f, "{}", label)
    }
}

/// A warning or error attached to one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageIssue {
    pub package: String,
    pub kind: IssueKind,
    pub message: String,
}

impl PackageIssue {
    pub fn new(package: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for PackageIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.package, self.message)
    }
}

/// Outcome of one resolution run
///
/// Only packages with an upgrade appear in `upgrades`, at most once each and
/// in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    pub upgrades: IndexMap<String, Upgrade>,
    pub warnings: Vec<PackageIssue>,
    pub errors: Vec<PackageIssue>,
    /// Packages whose result could not be fully computed
    pub incomplete: Vec<String>,
    /// Set when the run was cancelled before finishing
    pub partial: bool,
}

impl ResolutionResult {
    /// Creates an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// A result for a run stopped before any package was checked
    pub fn cancelled() -> Self {
        Self {
            partial: true,
            ..Self::new()
        }
    }

    /// Returns true if at least one upgrade was found
    pub fn has_changes(&self) -> bool {
        !self.upgrades.is_empty()
    }

    /// Returns true if any per-package error was recorded
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Adds an upgrade, replacing an earlier one for the same package
    pub fn insert(&mut self, upgrade: Upgrade) {
        self.upgrades.insert(upgrade.name.clone(), upgrade);
    }

    /// Records a warning
    pub fn warn(&mut self, package: impl Into<String>, kind: IssueKind, message: impl Into<String>) {
        self.warnings.push(PackageIssue::new(package, kind, message));
    }

    /// Records an error
    pub fn error(&mut self, package: impl Into<String>, kind: IssueKind, message: impl Into<String>) {
        self.errors.push(PackageIssue::new(package, kind, message));
    }

    /// Marks a package incomplete
    pub fn mark_incomplete(&mut self, package: impl Into<String>) {
        let package = package.into();
        if !self.incomplete.contains(&package) {
            self.incomplete.push(package);
        }
    }

    /// Mapping of package name to recommended specifier
    pub fn specifiers(&self) -> IndexMap<&str, &str> {
        self.upgrades
            .values()
            .map(|u| (u.name.as_str(), u.to.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upgrade(name: &str, to: &str) -> Upgrade {
        Upgrade {
            name: name.to_string(),
            section: Section::Prod,
            from: "^1.0.0".to_string(),
            to: to.to_string(),
            version: to.trim_start_matches('^').to_string(),
            distance: Distance::Major,
            published_at: None,
            repository: None,
        }
    }

    #[test]
    fn test_empty_result_has_no_changes() {
        let result = ResolutionResult::new();
        assert!(!result.has_changes());
        assert!(!result.has_errors());
        assert!(!result.partial);
    }

    #[test]
    fn test_insert_keeps_one_entry_per_package() {
        let mut result = ResolutionResult::new();
        result.insert(upgrade("a", "^2.0.0"));
        result.insert(upgrade("a", "^3.0.0"));
        assert_eq!(result.upgrades.len(), 1);
        assert_eq!(result.upgrades["a"].to, "^3.0.0");
    }

    #[test]
    fn test_specifiers_in_insertion_order() {
        let mut result = ResolutionResult::new();
        result.insert(upgrade("b", "^2.0.0"));
        result.insert(upgrade("a", "^3.0.0"));
        let pairs: Vec<_> = result.specifiers().into_iter().collect();
        assert_eq!(pairs, vec![("b", "^2.0.0"), ("a", "^3.0.0")]);
    }

    #[test]
    fn test_cancelled_result_is_partial() {
        let result = ResolutionResult::cancelled();
        assert!(result.partial);
        assert!(!result.has_changes());
    }

    #[test]
    fn test_mark_incomplete_dedups() {
        let mut result = ResolutionResult::new();
        result.mark_incomplete("a");
        result.mark_incomplete("a");
        assert_eq!(result.incomplete, vec!["a".to_string()]);
    }

    #[test]
    fn test_issue_display() {
        let issue = PackageIssue::new("left-pad", IssueKind::NotFound, "not in registry");
        assert_eq!(issue.to_string(), "left-pad: not in registry");
        assert_eq!(IssueKind::PeerConflict.to_string(), "peer conflict");
    }

    #[test]
    fn test_upgrade_display() {
        assert_eq!(upgrade("ncu-test-v2", "^2.0.0").to_string(), "ncu-test-v2@^2.0.0");
    }

    #[test]
    fn test_serialize_upgrade_camel_case() {
        let json = serde_json::to_string(&upgrade("a", "^2.0.0")).unwrap();
        assert!(json.contains("\"from\":\"^1.0.0\""));
        assert!(!json.contains("publishedAt"));
    }
}
