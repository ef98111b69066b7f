//! npm-style semver range algebra
//!
//! Supported forms:
//! - `1.2.3`, `=1.2.3` - exact match
//! - `^1.2.3` - compatible with version (>=1.2.3 <2.0.0)
//! - `~1.2.3` - approximately equivalent (>=1.2.3 <1.3.0)
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3` - comparison operators
//! - `1.2.x`, `1.x`, `1`, `*` - X-ranges
//! - `1.0.0 - 2.0.0` - hyphen ranges
//! - `>=1.0.0 <2.0.0` - intersections, `^1.0.0 || ^2.0.0` - unions
//!
//! A range is stored as a union of comparator sets. Pre-release versions only
//! match a set when one of its comparators carries a pre-release on the same
//! `major.minor.patch` tuple, unless pre-releases are explicitly included.

use crate::error::SpecifierError;
use semver::{Prerelease, Version};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator of a single comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// A single `op version` test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub version: Version,
}

impl Comparator {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    /// Test a version against this comparator, ignoring build metadata
    pub fn matches(&self, version: &Version) -> bool {
        let ord = precedence(version, &self.version);
        match self.op {
            Op::Eq => ord == Ordering::Equal,
            Op::Gt => ord == Ordering::Greater,
            Op::Gte => ord != Ordering::Less,
            Op::Lt => ord == Ordering::Less,
            Op::Lte => ord != Ordering::Greater,
        }
    }
}

/// A parsed range: a union (`||`) of comparator intersections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    raw: String,
    sets: Vec<Vec<Comparator>>,
}

/// A possibly-partial version as written in a range (`1`, `1.2`, `1.x`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialVersion {
    pub major: Option<u64>,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    pub pre: Prerelease,
    /// Number of components written, wildcards included
    pub parts: usize,
    /// The wildcard token used, if any (`x`, `X` or `*`)
    pub wildcard: Option<char>,
    /// Whether the version was written with a leading `v`
    pub v_prefix: bool,
}

impl PartialVersion {
    /// Parse a partial version such as `1`, `1.2.x`, `v1.2.3-beta.1+build`
    pub fn parse(input: &str) -> Result<Self, String> {
        let (body, v_prefix) = match input.strip_prefix('v').or_else(|| input.strip_prefix('V')) {
            Some(rest) => (rest, true),
            None => (input, false),
        };
        // Build metadata never takes part in range matching
        let body = body.split('+').next().unwrap_or_default();
        let (numbers, pre) = match body.split_once('-') {
            Some((numbers, pre)) => (numbers, Some(pre)),
            None => (body, None),
        };

        if numbers.is_empty() {
            return Err(format!("missing version in '{}'", input));
        }

        let pieces: Vec<&str> = numbers.split('.').collect();
        if pieces.len() > 3 {
            return Err(format!("too many version components in '{}'", input));
        }

        let mut values = [None, None, None];
        let mut wildcard = None;
        for (index, piece) in pieces.iter().enumerate() {
            match *piece {
                "x" | "X" | "*" => {
                    wildcard.get_or_insert(piece.chars().next().unwrap_or('x'));
                }
                digits if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
                    if wildcard.is_some() {
                        return Err(format!("number after wildcard in '{}'", input));
                    }
                    let value = digits
                        .parse::<u64>()
                        .map_err(|_| format!("version component too large in '{}'", input))?;
                    values[index] = Some(value);
                }
                other => return Err(format!("invalid version component '{}'", other)),
            }
        }

        let pre = match pre {
            Some(pre) => {
                if values[2].is_none() {
                    return Err(format!("pre-release on a partial version '{}'", input));
                }
                Prerelease::new(pre).map_err(|e| format!("invalid pre-release '{}': {}", pre, e))?
            }
            None => Prerelease::EMPTY,
        };

        Ok(Self {
            major: values[0],
            minor: values[1],
            patch: values[2],
            pre,
            parts: pieces.len(),
            wildcard,
            v_prefix,
        })
    }

    /// Number of leading components that are concrete numbers
    pub fn numeric_parts(&self) -> usize {
        [self.major, self.minor, self.patch]
            .iter()
            .take_while(|c| c.is_some())
            .count()
    }

    /// Fill missing components with zero
    pub fn floor(&self) -> Version {
        let mut version = Version::new(
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
        );
        version.pre = self.pre.clone();
        version
    }

    fn is_full(&self) -> bool {
        self.numeric_parts() == 3
    }
}

impl VersionRange {
    /// A range matching every version
    pub fn any() -> Self {
        Self {
            raw: "*".to_string(),
            sets: vec![Vec::new()],
        }
    }

    /// Parse an npm range expression
    pub fn parse(raw: &str) -> Result<Self, SpecifierError> {
        let trimmed = raw.trim();
        if trimmed.chars().any(char::is_control) {
            return Err(SpecifierError::new(raw, "contains control characters"));
        }

        let mut sets = Vec::new();
        for alternative in trimmed.split("||") {
            let set = parse_intersection(alternative.trim())
                .map_err(|message| SpecifierError::new(raw, message))?;
            sets.push(set);
        }

        Ok(Self {
            raw: trimmed.to_string(),
            sets,
        })
    }

    /// The text this range was parsed from
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Comparator sets of the union
    pub fn sets(&self) -> &[Vec<Comparator>] {
        &self.sets
    }

    /// True if the range places no restriction at all
    pub fn is_any(&self) -> bool {
        self.sets.iter().any(|set| set.is_empty())
    }

    /// Test a version with npm's default pre-release rules
    pub fn matches(&self, version: &Version) -> bool {
        self.matches_with(version, false)
    }

    /// Test a version, optionally treating pre-releases like any other version
    pub fn matches_with(&self, version: &Version, include_prerelease: bool) -> bool {
        self.sets.iter().any(|set| {
            set.iter().all(|c| c.matches(version))
                && (version.pre.is_empty()
                    || include_prerelease
                    || set.iter().any(|c| {
                        !c.version.pre.is_empty()
                            && c.version.major == version.major
                            && c.version.minor == version.minor
                            && c.version.patch == version.patch
                    }))
        })
    }

    /// Whether any comparator names a pre-release
    pub fn mentions_prerelease(&self) -> bool {
        self.sets
            .iter()
            .flatten()
            .any(|c| !c.version.pre.is_empty() && !is_lowest_prerelease(&c.version.pre))
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Compare two versions by semver precedence (build metadata ignored)
pub fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch)
        .cmp(&(b.major, b.minor, b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

/// `M.m.p-0`, the lowest version on a tuple; used for exclusive upper bounds
fn lowest(major: u64, minor: u64, patch: u64) -> Version {
    let mut version = Version::new(major, minor, patch);
    version.pre = Prerelease::new("0").unwrap_or(Prerelease::EMPTY);
    version
}

fn is_lowest_prerelease(pre: &Prerelease) -> bool {
    pre.as_str() == "0"
}

fn parse_intersection(input: &str) -> Result<Vec<Comparator>, String> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    if let Some((lower, upper)) = input.split_once(" - ") {
        return parse_hyphen(lower.trim(), upper.trim());
    }

    let mut comparators = Vec::new();
    for token in join_operator_tokens(input) {
        comparators.extend(parse_simple(&token)?);
    }
    Ok(comparators)
}

/// Re-attach operators written with a following space (`>= 1.2.3`)
pub(crate) fn join_operator_tokens(input: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending: Option<String> = None;
    for word in input.split_whitespace() {
        let is_bare_operator = word.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~'));
        match pending.take() {
            Some(op) => tokens.push(format!("{}{}", op, word)),
            None if is_bare_operator => pending = Some(word.to_string()),
            None => tokens.push(word.to_string()),
        }
    }
    if let Some(op) = pending {
        tokens.push(op);
    }
    tokens
}

/// Split a single token into its operator and version text
pub(crate) fn split_operator(token: &str) -> Result<(&str, &str), String> {
    if token.starts_with("~>") {
        return Err("unsupported operator '~>'".to_string());
    }
    for op in [">=", "<=", "^", "~", ">", "<", "="] {
        if let Some(rest) = token.strip_prefix(op) {
            if rest.starts_with(['<', '>', '=', '^', '~']) {
                return Err(format!("unsupported operator in '{}'", token));
            }
            return Ok((op, rest.trim_start()));
        }
    }
    match token.chars().next() {
        Some(c) if c.is_ascii_digit() || matches!(c, 'x' | 'X' | '*' | 'v' | 'V') => Ok(("", token)),
        Some(c) => Err(format!("unsupported operator '{}'", c)),
        None => Err("empty range".to_string()),
    }
}

/// Increment a version component for an exclusive upper bound
fn next(component: u64) -> Result<u64, String> {
    component
        .checked_add(1)
        .ok_or_else(|| format!("version component too large: {}", component))
}

fn parse_simple(token: &str) -> Result<Vec<Comparator>, String> {
    let (op, version) = split_operator(token)?;
    let partial = PartialVersion::parse(version)?;
    let floor = partial.floor();

    let (major, minor, patch) = (partial.major, partial.minor, partial.patch);

    let comparators = match op {
        "" | "=" => match (major, minor, patch) {
            (None, _, _) => Vec::new(),
            (Some(m), None, _) => vec![
                Comparator::new(Op::Gte, floor),
                Comparator::new(Op::Lt, lowest(next(m)?, 0, 0)),
            ],
            (Some(m), Some(n), None) => vec![
                Comparator::new(Op::Gte, floor),
                Comparator::new(Op::Lt, lowest(m, next(n)?, 0)),
            ],
            _ => vec![Comparator::new(Op::Eq, floor)],
        },
        ">" => match (major, minor, patch) {
            (None, _, _) => vec![Comparator::new(Op::Lt, lowest(0, 0, 0))],
            (Some(m), None, _) => vec![Comparator::new(Op::Gte, Version::new(next(m)?, 0, 0))],
            (Some(m), Some(n), None) => vec![Comparator::new(Op::Gte, Version::new(m, next(n)?, 0))],
            _ => vec![Comparator::new(Op::Gt, floor)],
        },
        ">=" => match major {
            None => Vec::new(),
            Some(_) => vec![Comparator::new(Op::Gte, floor)],
        },
        "<" => match (major, minor, patch) {
            (None, _, _) => vec![Comparator::new(Op::Lt, lowest(0, 0, 0))],
            (Some(m), None, _) => vec![Comparator::new(Op::Lt, lowest(m, 0, 0))],
            (Some(m), Some(n), None) => vec![Comparator::new(Op::Lt, lowest(m, n, 0))],
            _ => vec![Comparator::new(Op::Lt, floor)],
        },
        "<=" => match (major, minor, patch) {
            (None, _, _) => Vec::new(),
            (Some(m), None, _) => vec![Comparator::new(Op::Lt, lowest(next(m)?, 0, 0))],
            (Some(m), Some(n), None) => vec![Comparator::new(Op::Lt, lowest(m, next(n)?, 0))],
            _ => vec![Comparator::new(Op::Lte, floor)],
        },
        "~" => match (major, minor) {
            (None, _) => Vec::new(),
            (Some(m), None) => vec![
                Comparator::new(Op::Gte, floor),
                Comparator::new(Op::Lt, lowest(next(m)?, 0, 0)),
            ],
            (Some(m), Some(n)) => vec![
                Comparator::new(Op::Gte, floor),
                Comparator::new(Op::Lt, lowest(m, next(n)?, 0)),
            ],
        },
        "^" => match (major, minor, patch) {
            (None, _, _) => Vec::new(),
            (Some(0), Some(0), Some(p)) if partial.is_full() => vec![
                Comparator::new(Op::Gte, floor),
                Comparator::new(Op::Lt, lowest(0, 0, next(p)?)),
            ],
            (Some(0), Some(n), _) => vec![
                Comparator::new(Op::Gte, floor),
                Comparator::new(Op::Lt, lowest(0, next(n)?, 0)),
            ],
            (Some(m), _, _) => vec![
                Comparator::new(Op::Gte, floor),
                Comparator::new(Op::Lt, lowest(next(m)?, 0, 0)),
            ],
        },
        other => return Err(format!("unsupported operator '{}'", other)),
    };

    Ok(comparators)
}

fn parse_hyphen(lower: &str, upper: &str) -> Result<Vec<Comparator>, String> {
    let lower = PartialVersion::parse(lower)?;
    let upper = PartialVersion::parse(upper)?;
    let mut comparators = Vec::new();

    if lower.major.is_some() {
        comparators.push(Comparator::new(Op::Gte, lower.floor()));
    }

    match (upper.major, upper.minor, upper.patch) {
        (None, _, _) => {}
        (Some(m), None, _) => comparators.push(Comparator::new(Op::Lt, lowest(next(m)?, 0, 0))),
        (Some(m), Some(n), None) => comparators.push(Comparator::new(Op::Lt, lowest(m, next(n)?, 0))),
        _ => comparators.push(Comparator::new(Op::Lte, upper.floor())),
    }

    Ok(comparators)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn matches(range: &str, version: &str) -> bool {
        VersionRange::parse(range).unwrap().matches(&v(version))
    }

    #[test]
    fn test_exact() {
        assert!(matches("1.2.3", "1.2.3"));
        assert!(matches("=1.2.3", "1.2.3"));
        assert!(!matches("1.2.3", "1.2.4"));
    }

    #[test]
    fn test_caret() {
        assert!(matches("^1.2.3", "1.2.3"));
        assert!(matches("^1.2.3", "1.9.0"));
        assert!(!matches("^1.2.3", "2.0.0"));
        assert!(!matches("^1.2.3", "1.2.2"));
    }

    #[test]
    fn test_caret_zero_major() {
        assert!(matches("^0.2.3", "0.2.9"));
        assert!(!matches("^0.2.3", "0.3.0"));
        assert!(matches("^0.0.3", "0.0.3"));
        assert!(!matches("^0.0.3", "0.0.4"));
        assert!(matches("^0.0", "0.0.7"));
        assert!(!matches("^0.0", "0.1.0"));
        assert!(matches("^0", "0.9.0"));
        assert!(!matches("^0", "1.0.0"));
    }

    #[test]
    fn test_tilde() {
        assert!(matches("~1.2.3", "1.2.9"));
        assert!(!matches("~1.2.3", "1.3.0"));
        assert!(matches("~1", "1.9.9"));
        assert!(!matches("~1", "2.0.0"));
    }

    #[test]
    fn test_comparisons() {
        assert!(matches(">=1.2.3", "5.0.0"));
        assert!(!matches(">1.2.3", "1.2.3"));
        assert!(matches("<2.0.0", "1.9.9"));
        assert!(matches("<=2.0.0", "2.0.0"));
        assert!(matches(">= 1.2.3", "1.2.3"));
    }

    #[test]
    fn test_partial_comparisons() {
        assert!(matches(">1", "2.0.0"));
        assert!(!matches(">1", "1.9.0"));
        assert!(matches("<=1.2", "1.2.9"));
        assert!(!matches("<=1.2", "1.3.0"));
        assert!(!matches("<1.2", "1.2.0"));
    }

    #[test]
    fn test_wildcards() {
        assert!(matches("*", "3.4.5"));
        assert!(matches("", "3.4.5"));
        assert!(matches("1.x", "1.8.0"));
        assert!(!matches("1.x", "2.0.0"));
        assert!(matches("1.2.*", "1.2.7"));
        assert!(!matches("1.2.*", "1.3.0"));
        assert!(matches("1", "1.5.0"));
    }

    #[test]
    fn test_hyphen() {
        assert!(matches("1.0.0 - 2.0.0", "2.0.0"));
        assert!(!matches("1.0.0 - 2.0.0", "2.0.1"));
        assert!(matches("1.0.0 - 2.3", "2.3.9"));
        assert!(!matches("1.0.0 - 2.3", "2.4.0"));
    }

    #[test]
    fn test_intersection_and_union() {
        assert!(matches(">=1.0.0 <2.0.0", "1.5.0"));
        assert!(!matches(">=1.0.0 <2.0.0", "2.0.0"));
        assert!(matches("^1.0.0 || ^3.0.0", "3.1.0"));
        assert!(!matches("^1.0.0 || ^3.0.0", "2.1.0"));
    }

    #[test]
    fn test_prerelease_excluded_by_default() {
        assert!(!matches("^1.0.0", "1.5.0-beta.1"));
        assert!(!matches("*", "2.0.0-rc.1"));
        assert!(!matches("^1.0.0", "2.0.0-alpha"));
    }

    #[test]
    fn test_prerelease_on_same_tuple() {
        assert!(matches("^1.2.3-beta.1", "1.2.3-beta.2"));
        assert!(!matches("^1.2.3-beta.1", "1.2.4-beta.1"));
        assert!(matches("^1.2.3-beta.1", "1.2.4"));
    }

    #[test]
    fn test_include_prerelease() {
        let range = VersionRange::parse("^1.0.0").unwrap();
        assert!(range.matches_with(&v("1.5.0-beta.1"), true));
        assert!(!range.matches_with(&v("2.0.0-beta.1"), true));
    }

    #[test]
    fn test_build_metadata_ignored() {
        assert!(matches("1.2.3", "1.2.3+build.5"));
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(VersionRange::parse("~>1.0").is_err());
        assert!(VersionRange::parse(">>1.0.0").is_err());
        assert!(VersionRange::parse("!1.0.0").is_err());
        assert!(VersionRange::parse("1.2.3.4").is_err());
        assert!(VersionRange::parse("1.x.3").is_err());
        assert!(VersionRange::parse("^1.0.0\n").is_ok());
        assert!(VersionRange::parse("^1.0.0\n^2.0.0").is_err());
    }

    #[test]
    fn test_oversized_component_is_rejected() {
        let error = VersionRange::parse("^18446744073709551615").unwrap_err();
        assert!(error.message.contains("version component too large"));
        assert!(VersionRange::parse("<=1.18446744073709551615").is_err());
        assert!(VersionRange::parse("0.0.18446744073709551615 - 1.x").is_ok());
        assert!(VersionRange::parse("1.0.0 - 18446744073709551615").is_err());
        assert!(VersionRange::parse(">=18446744073709551615").is_ok());
    }

    #[test]
    fn test_is_any() {
        assert!(VersionRange::parse("*").unwrap().is_any());
        assert!(VersionRange::parse("x").unwrap().is_any());
        assert!(!VersionRange::parse("^1.0.0").unwrap().is_any());
        assert!(VersionRange::any().is_any());
    }

    #[test]
    fn test_partial_version_parse() {
        let partial = PartialVersion::parse("1.2.x").unwrap();
        assert_eq!(partial.major, Some(1));
        assert_eq!(partial.minor, Some(2));
        assert_eq!(partial.patch, None);
        assert_eq!(partial.parts, 3);
        assert_eq!(partial.numeric_parts(), 2);
        assert_eq!(partial.wildcard, Some('x'));
        assert_eq!(partial.floor(), v("1.2.0"));

        let prefixed = PartialVersion::parse("v2.0.1-rc.1").unwrap();
        assert!(prefixed.v_prefix);
        assert_eq!(prefixed.floor(), v("2.0.1-rc.1"));
    }

    #[test]
    fn test_mentions_prerelease() {
        assert!(VersionRange::parse("^2.0.0-beta.1").unwrap().mentions_prerelease());
        assert!(!VersionRange::parse("^2.0.0").unwrap().mentions_prerelease());
    }
}
