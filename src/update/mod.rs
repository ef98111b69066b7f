//! Version selection for dependencies
//!
//! This module provides:
//! - Update filter configuration from CLI args
//! - The version selector that applies an upgrade policy to a version set
//! - The peer constraint resolver that iterates selection to a fixpoint

mod filter;
pub mod peer;

pub use filter::{PackagePattern, UpdateFilter};
pub use peer::{PeerOutcome, PeerPackage, PeerResolver, PeerState, DEFAULT_PEER_ITERATIONS};

use crate::domain::range::precedence;
use crate::domain::{
    Specifier, SpecifierKind, TagTieBreak, UpgradePolicy, VersionRange, VersionRecord, VersionSet,
};
use chrono::{DateTime, Utc};
use semver::Version;
use std::cmp::Ordering;

/// A chosen target: the version and the specifier rewritten to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target<'a> {
    pub record: &'a VersionRecord,
    pub specifier: String,
}

/// Selection engine that picks the target version of a dependency
#[derive(Debug, Clone)]
pub struct VersionSelector {
    /// Filter configuration
    filter: UpdateFilter,
    /// How to pick between versions sharing one dist-tag
    tie_break: TagTieBreak,
    /// Current time for age calculations
    now: DateTime<Utc>,
}

impl VersionSelector {
    /// Create a new VersionSelector with the given filter
    pub fn new(filter: UpdateFilter) -> Self {
        Self {
            filter,
            tie_break: TagTieBreak::default(),
            now: Utc::now(),
        }
    }

    /// Create a new VersionSelector with a custom current time (for testing)
    pub fn with_time(filter: UpdateFilter, now: DateTime<Utc>) -> Self {
        Self {
            filter,
            tie_break: TagTieBreak::default(),
            now,
        }
    }

    /// Set the dist-tag tie-break rule
    pub fn with_tie_break(mut self, tie_break: TagTieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// The filter in use
    pub fn filter(&self) -> &UpdateFilter {
        &self.filter
    }

    /// Select the target of a dependency with no cross-package constraints
    pub fn select_target<'a>(
        &self,
        spec: &Specifier,
        set: &'a VersionSet,
        policy: &UpgradePolicy,
    ) -> Option<Target<'a>> {
        let record = self.select_version(spec, set, policy, &[], None)?;
        self.target_for(spec, record)
    }

    /// Pick the version `policy` allows, restricted to versions accepted by
    /// every range in `constraints` and not above `ceiling`
    ///
    /// Returns `None` when no eligible version remains.
    pub fn select_version<'a>(
        &self,
        spec: &Specifier,
        set: &'a VersionSet,
        policy: &UpgradePolicy,
        constraints: &[&VersionRange],
        ceiling: Option<&Version>,
    ) -> Option<&'a VersionRecord> {
        let allow_pre = self.filter.include_prerelease || spec.targets_prerelease();
        let cutoff = self.cutoff();

        let fits = |record: &VersionRecord, allow_pre: bool| -> bool {
            (allow_pre || !record.is_prerelease())
                && (self.filter.include_deprecated || record.deprecated.is_none())
                && match (cutoff, record.published_at) {
                    (Some(cutoff), Some(published)) => published <= cutoff,
                    _ => true,
                }
                && constraints
                    .iter()
                    .all(|range| range.matches_with(&record.version, allow_pre))
                && ceiling.is_none_or(|c| precedence(&record.version, c) != Ordering::Greater)
        };

        let records = set.records();
        let highest_fitting = |allow_pre: bool, bound: Option<&Version>| {
            records.iter().rev().find(|r| {
                bound.is_none_or(|b| precedence(&r.version, b) != Ordering::Greater)
                    && fits(r, allow_pre)
            })
        };

        match policy {
            UpgradePolicy::Patch | UpgradePolicy::Minor => {
                let reference = self.reference_version(spec, set)?;
                let same_minor = matches!(policy, UpgradePolicy::Patch);
                let anchor = records.iter().rev().map(|r| &r.version).find(|v| {
                    if same_minor {
                        (v.major, v.minor) <= (reference.major, reference.minor)
                    } else {
                        v.major <= reference.major
                    }
                })?;
                records.iter().rev().find(|r| {
                    r.version.major == anchor.major
                        && (!same_minor || r.version.minor == anchor.minor)
                        && fits(r, allow_pre)
                })
            }
            UpgradePolicy::Major => highest_fitting(allow_pre, None),
            UpgradePolicy::Latest => match set.tagged("latest", self.tie_break) {
                Some(tagged) if fits(tagged, true) => Some(tagged),
                Some(tagged) => highest_fitting(allow_pre, Some(&tagged.version)),
                None => highest_fitting(allow_pre, None),
            },
            UpgradePolicy::Tag(tag) => {
                let tagged = set.tagged(tag, self.tie_break)?;
                let allow_pre = allow_pre || tagged.is_prerelease();
                if fits(tagged, allow_pre) {
                    Some(tagged)
                } else {
                    highest_fitting(allow_pre, Some(&tagged.version))
                }
            }
        }
    }

    /// Turn a selected version into a rewritten specifier
    ///
    /// Returns `None` when the version is not above what the specifier
    /// already declares or when rewriting would not change the text.
    pub fn target_for<'a>(&self, spec: &Specifier, record: &'a VersionRecord) -> Option<Target<'a>> {
        let base = spec.base.as_ref()?;
        if precedence(&record.version, base) != Ordering::Greater {
            return None;
        }
        if spec.kind == SpecifierKind::Range && spec.satisfies(&record.version) {
            return None;
        }
        let specifier = spec.format_updated(&record.version)?;
        if specifier == spec.raw.trim() {
            return None;
        }
        Some(Target { record, specifier })
    }

    /// The version the current declaration effectively stands for
    ///
    /// The version written in the specifier, else the installed version,
    /// else the highest published version the specifier accepts.
    pub fn reference_version(&self, spec: &Specifier, set: &VersionSet) -> Option<Version> {
        spec.base
            .clone()
            .or_else(|| set.installed.clone())
            .or_else(|| {
                set.records()
                    .iter()
                    .rev()
                    .find(|r| spec.satisfies(&r.version))
                    .map(|r| r.version.clone())
            })
    }

    fn cutoff(&self) -> Option<DateTime<Utc>> {
        let min_age = chrono::Duration::from_std(self.filter.min_age?).ok()?;
        Some(self.now - min_age)
    }
}
