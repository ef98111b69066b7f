//! Version information from registry backends
//!
//! A [`VersionSet`] is the answer of a backend for one package: every
//! published version that parses as semver, ordered ascending and
//! deduplicated, together with dist-tag associations and publish metadata.

use super::range::precedence;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Information about a single published version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    /// Package name the record belongs to
    pub package: String,
    /// The parsed version
    pub version: Version,
    /// When this version was published, if the backend reports it
    pub published_at: Option<DateTime<Utc>>,
    /// Source repository URL
    pub repository: Option<String>,
    /// Dist-tags pointing at this version (e.g., "latest", "next")
    pub tags: Vec<String>,
    /// Peer ranges declared by this version; `None` when not yet known
    pub peer_dependencies: Option<IndexMap<String, String>>,
    /// Deprecation message, if the version is deprecated
    pub deprecated: Option<String>,
}

impl VersionRecord {
    /// Create a new VersionRecord
    pub fn new(package: impl Into<String>, version: Version) -> Self {
        Self {
            package: package.into(),
            version,
            published_at: None,
            repository: None,
            tags: Vec::new(),
            peer_dependencies: None,
            deprecated: None,
        }
    }

    /// Sets the publish time
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Sets the repository URL
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Adds a dist-tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Sets the declared peer dependencies
    pub fn with_peer_dependencies<I, K, V>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.peer_dependencies = Some(
            peers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Marks the version deprecated
    pub fn with_deprecated(mut self, message: impl Into<String>) -> Self {
        self.deprecated = Some(message.into());
        self
    }

    /// Returns true if this version carries the given dist-tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Returns true if this is a pre-release
    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }
}

/// How to choose between several versions that share one dist-tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagTieBreak {
    /// The most recently published version wins
    #[default]
    MostRecentlyPublished,
    /// The highest version wins
    HighestVersion,
}

/// All known versions of one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSet {
    /// Package name
    pub package: String,
    records: Vec<VersionRecord>,
    /// Version installed in the project, if any
    pub installed: Option<Version>,
}

impl VersionSet {
    /// Builds a set, sorting by semver precedence and dropping duplicate versions
    ///
    /// When the same version is reported twice the records are merged: tags are
    /// combined and missing metadata is filled from the later record.
    pub fn new(package: impl Into<String>, records: impl IntoIterator<Item = VersionRecord>) -> Self {
        let mut records: Vec<VersionRecord> = records.into_iter().collect();
        // Build metadata breaks precedence ties so equal versions end up adjacent
        records.sort_by(|a, b| a.version.cmp(&b.version));

        let mut merged: Vec<VersionRecord> = Vec::with_capacity(records.len());
        for record in records {
            match merged.last_mut() {
                Some(last) if last.version == record.version => merge_into(last, record),
                _ => merged.push(record),
            }
        }

        Self {
            package: package.into(),
            records: merged,
            installed: None,
        }
    }

    /// Sets the installed version
    pub fn with_installed(mut self, installed: Option<Version>) -> Self {
        self.installed = installed;
        self
    }

    /// Records in ascending order
    pub fn records(&self) -> &[VersionRecord] {
        &self.records
    }

    /// Mutable access for filling in lazily fetched metadata
    pub fn records_mut(&mut self) -> &mut [VersionRecord] {
        &mut self.records
    }

    /// Returns true if no versions are known
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of known versions
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Looks up an exact version
    pub fn get(&self, version: &Version) -> Option<&VersionRecord> {
        self.records
            .binary_search_by(|r| r.version.cmp(version))
            .ok()
            .map(|index| &self.records[index])
    }

    /// Highest version overall
    pub fn highest(&self) -> Option<&VersionRecord> {
        self.records.last()
    }

    /// The version a dist-tag points at
    ///
    /// A well-formed registry has at most one version per tag; if several
    /// carry the same tag the tie is broken according to `tie_break`.
    pub fn tagged(&self, tag: &str, tie_break: TagTieBreak) -> Option<&VersionRecord> {
        let mut tagged = self.records.iter().filter(|r| r.has_tag(tag));
        let first = tagged.next()?;
        Some(tagged.fold(first, |best, candidate| {
            let ord = match tie_break {
                TagTieBreak::MostRecentlyPublished => candidate
                    .published_at
                    .cmp(&best.published_at)
                    .then_with(|| precedence(&candidate.version, &best.version)),
                TagTieBreak::HighestVersion => precedence(&candidate.version, &best.version),
            };
            if ord == Ordering::Greater {
                candidate
            } else {
                best
            }
        }))
    }
}

fn merge_into(existing: &mut VersionRecord, other: VersionRecord) {
    for tag in other.tags {
        if !existing.tags.contains(&tag) {
            existing.tags.push(tag);
        }
    }
    if existing.published_at.is_none() {
        existing.published_at = other.published_at;
    }
    if existing.repository.is_none() {
        existing.repository = other.repository;
    }
    if existing.peer_dependencies.is_none() {
        existing.peer_dependencies = other.peer_dependencies;
    }
    if existing.deprecated.is_none() {
        existing.deprecated = other.deprecated;
    }
}
