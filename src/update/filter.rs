//! Update filter configuration
//!
//! This module provides the UpdateFilter struct that encapsulates
//! all filter options for version selection:
//! - which packages and manifest sections take part
//! - which published versions are eligible (pre-releases, deprecated, cooldown)
//!
//! Package patterns may be exact names, globs with `*`, or `/regex/`.

use crate::domain::Section;
use regex::Regex;
use std::time::Duration;

/// A package name pattern
#[derive(Debug, Clone)]
pub enum PackagePattern {
    /// Exact package name
    Exact(String),
    /// Glob (`*` matches any run of characters) or `/regex/`
    Regex(Regex),
}

impl PackagePattern {
    /// Parses a pattern; invalid regular expressions fall back to exact matching
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(body) = raw.strip_prefix('/').and_then(|r| r.strip_suffix('/')) {
            if let Ok(regex) = Regex::new(body) {
                return PackagePattern::Regex(regex);
            }
        }
        if raw.contains('*') {
            let escaped: Vec<String> = raw.split('*').map(regex::escape).collect();
            if let Ok(regex) = Regex::new(&format!("^{}$", escaped.join(".*"))) {
                return PackagePattern::Regex(regex);
            }
        }
        PackagePattern::Exact(raw.to_string())
    }

    /// Check whether a package name matches
    pub fn matches(&self, name: &str) -> bool {
        match self {
            PackagePattern::Exact(exact) => exact == name,
            PackagePattern::Regex(regex) => regex.is_match(name),
        }
    }
}

impl PartialEq for PackagePattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PackagePattern::Exact(a), PackagePattern::Exact(b)) => a == b,
            (PackagePattern::Regex(a), PackagePattern::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// Filter configuration for version selection
#[derive(Debug, Clone, Default)]
pub struct UpdateFilter {
    /// Sections to process (empty means all)
    pub sections: Vec<Section>,
    /// Packages to exclude from updates
    pub exclude: Vec<PackagePattern>,
    /// If non-empty, only update these packages
    pub only: Vec<PackagePattern>,
    /// Minimum age for versions to be considered
    pub min_age: Option<Duration>,
    /// Consider pre-release versions for every package
    pub include_prerelease: bool,
    /// Consider deprecated versions
    pub include_deprecated: bool,
}

impl UpdateFilter {
    /// Create a new UpdateFilter with default settings (process all)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set sections to process
    pub fn with_sections(mut self, sections: Vec<Section>) -> Self {
        self.sections = sections;
        self
    }

    /// Set packages to exclude
    pub fn with_exclude<S: AsRef<str>>(mut self, exclude: &[S]) -> Self {
        self.exclude = exclude.iter().map(|p| PackagePattern::parse(p.as_ref())).collect();
        self
    }

    /// Set packages to include (only list)
    pub fn with_only<S: AsRef<str>>(mut self, only: &[S]) -> Self {
        self.only = only.iter().map(|p| PackagePattern::parse(p.as_ref())).collect();
        self
    }

    /// Set minimum age for versions
    pub fn with_min_age(mut self, age: Duration) -> Self {
        self.min_age = Some(age);
        self
    }

    /// Set whether pre-releases are eligible
    pub fn with_prerelease(mut self, include: bool) -> Self {
        self.include_prerelease = include;
        self
    }

    /// Set whether deprecated versions are eligible
    pub fn with_deprecated(mut self, include: bool) -> Self {
        self.include_deprecated = include;
        self
    }

    /// Check if a section should be processed
    pub fn should_process_section(&self, section: Section) -> bool {
        if self.sections.is_empty() {
            return true;
        }
        self.sections.contains(&section)
    }

    /// Check if a package should be processed based on filters
    pub fn should_process_package(&self, name: &str) -> bool {
        if !self.only.is_empty() && !self.only.iter().any(|p| p.matches(name)) {
            return false;
        }
        !self.exclude.iter().any(|p| p.matches(name))
    }
}
