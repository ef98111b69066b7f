//! Core domain models for bumpscout
//!
//! This module contains the fundamental types used throughout the application:
//! - Dependency declarations and manifest sections
//! - npm range algebra and declared specifiers
//! - Version records reported by registry backends
//! - Upgrade policies and semver distance
//! - Resolution results

mod declaration;
mod distance;
mod policy;
pub mod range;
mod resolution;
mod specifier;
mod version_record;

pub use declaration::{Declaration, Section};
pub use distance::Distance;
pub use policy::{parse_override, PolicyConfig, UpgradePolicy};
pub use range::VersionRange;
pub use resolution::{IssueKind, PackageIssue, PeerConstraint, ResolutionResult, Upgrade};
pub use specifier::{is_external, Specifier, SpecifierKind};
pub use version_record::{TagTieBreak, VersionRecord, VersionSet};
