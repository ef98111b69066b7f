//! Declared version specifiers
//!
//! A specifier is the string written next to a dependency in package.json.
//! Besides the range it describes, it remembers how it was written so an
//! upgraded specifier keeps the same shape:
//! - `^1.2.3` -> `^2.0.0`, `~1.2` -> `~1.3`, `1.x` -> `2.x`
//! - `>=1.0.0` -> `>=2.0.0`, `<2.0.0` -> `<=3.1.0`
//! - `npm:real-name@^1.0.0` -> `npm:real-name@^2.0.0`
//! - `latest`, `next` (dist-tags) and `*` are never rewritten

use super::range::{join_operator_tokens, split_operator, PartialVersion, VersionRange};
use crate::error::SpecifierError;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of version specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecifierKind {
    /// Exact version without operator (e.g., `1.2.3`)
    Exact,
    /// Exact version with explicit `=` (e.g., `=1.2.3`)
    Equals,
    /// Caret range (e.g., `^1.2.3`) - compatible with major version
    Caret,
    /// Tilde range (e.g., `~1.2.3`) - compatible with minor version
    Tilde,
    /// Greater than or equal (e.g., `>=1.2.3`)
    GreaterOrEqual,
    /// Greater than (e.g., `>1.2.3`)
    Greater,
    /// Less than or equal (e.g., `<=1.2.3`)
    LessOrEqual,
    /// Less than (e.g., `<1.2.3`)
    Less,
    /// X-range or partial version (e.g., `1.2.x`, `1`)
    Wildcard,
    /// Union, intersection or hyphen range (e.g., `>=1.0.0 <2.0.0`)
    Range,
    /// Any version (`*`, `x` or empty)
    Any,
    /// Distribution tag (e.g., `latest`, `next`)
    Tag,
}

impl SpecifierKind {
    fn from_operator(op: &str) -> Self {
        match op {
            "^" => SpecifierKind::Caret,
            "~" => SpecifierKind::Tilde,
            ">=" => SpecifierKind::GreaterOrEqual,
            ">" => SpecifierKind::Greater,
            "<=" => SpecifierKind::LessOrEqual,
            "<" => SpecifierKind::Less,
            "=" => SpecifierKind::Equals,
            _ => SpecifierKind::Exact,
        }
    }

    /// Returns true if this kind is an upper bound
    pub fn is_upper_bound(&self) -> bool {
        matches!(self, SpecifierKind::Less | SpecifierKind::LessOrEqual)
    }
}

/// How many version components were written, and with which wildcard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    parts: usize,
    numeric: usize,
    wildcard: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Form {
    Simple(Layout),
    Union(Vec<Specifier>),
    Intersection(Vec<Specifier>),
    Hyphen { lower: String, upper: Box<Specifier> },
    Opaque,
}

/// A parsed dependency specifier with its original string representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    /// The kind of specifier
    pub kind: SpecifierKind,
    /// The raw specifier string as it appears in the manifest
    pub raw: String,
    /// Range of versions the specifier accepts
    pub range: VersionRange,
    /// Operator (and `v` marker) to preserve during updates
    pub prefix: Option<String>,
    /// Highest concrete version the specifier mentions
    pub base: Option<Version>,
    /// Real package name for `npm:<name>@<range>` aliases
    pub alias: Option<String>,
    /// Distribution tag name for tag specifiers
    pub tag: Option<String>,
    form: Form,
}

impl Specifier {
    /// Parses a specifier
    pub fn parse(raw: &str) -> Result<Self, SpecifierError> {
        if raw.chars().any(char::is_control) {
            return Err(SpecifierError::new(raw, "contains control characters"));
        }

        let trimmed = raw.trim();
        let (alias, body) = match trimmed.strip_prefix("npm:") {
            Some(rest) => {
                let (name, range) = split_alias(rest);
                if name.is_empty() || (name.starts_with('@') && !name.contains('/')) {
                    return Err(SpecifierError::new(raw, "invalid package name in npm alias"));
                }
                (Some(name.to_string()), range)
            }
            None => (None, trimmed),
        };

        if is_external(body) {
            return Err(SpecifierError::new(raw, "not a registry version range"));
        }

        let mut spec = parse_body(body).map_err(|message| SpecifierError::new(raw, message))?;
        spec.raw = raw.to_string();
        spec.alias = alias;
        Ok(spec)
    }

    /// Name to query the registry with, honoring npm aliases
    pub fn query_name<'a>(&'a self, declared_name: &'a str) -> &'a str {
        self.alias.as_deref().unwrap_or(declared_name)
    }

    /// Whether the specifier accepts `version`
    pub fn satisfies(&self, version: &Version) -> bool {
        self.range.matches(version)
    }

    /// Whether the specifier itself points at a pre-release channel
    pub fn targets_prerelease(&self) -> bool {
        self.base.as_ref().is_some_and(|b| !b.pre.is_empty()) || self.range.mentions_prerelease()
    }

    /// Whether this specifier can be rewritten at all
    pub fn is_upgradable(&self) -> bool {
        !matches!(self.kind, SpecifierKind::Any | SpecifierKind::Tag)
    }

    /// Formats a new version while preserving the original format
    ///
    /// Returns `None` for specifiers that are never rewritten (`*`, dist-tags).
    pub fn format_updated(&self, new_version: &Version) -> Option<String> {
        let body = self.render(new_version)?;
        Some(match &self.alias {
            Some(name) => format!("npm:{}@{}", name, body),
            None => body,
        })
    }

    fn render(&self, new_version: &Version) -> Option<String> {
        match &self.form {
            Form::Opaque => None,
            Form::Simple(layout) => {
                let prefix = match self.kind {
                    SpecifierKind::Greater => ">=".to_string(),
                    kind if kind.is_upper_bound() => "<=".to_string(),
                    _ => self.prefix.clone().unwrap_or_default(),
                };
                Some(format!("{}{}", prefix, render_version(layout, new_version)))
            }
            Form::Union(alternatives) => alternatives
                .iter()
                .filter(|alt| alt.base.is_some())
                .max_by(|a, b| a.base.cmp(&b.base))
                .and_then(|alt| alt.render(new_version)),
            Form::Intersection(tokens) => {
                let has_upper = tokens.iter().any(|t| t.kind.is_upper_bound());
                let last = tokens.len().saturating_sub(1);
                let rendered: Option<Vec<String>> = tokens
                    .iter()
                    .enumerate()
                    .map(|(index, token)| {
                        if token.kind.is_upper_bound() || (!has_upper && index == last) {
                            token.render(new_version)
                        } else {
                            Some(token.raw.clone())
                        }
                    })
                    .collect();
                rendered.map(|parts| parts.join(" "))
            }
            Form::Hyphen { lower, upper } => upper
                .render(new_version)
                .map(|upper| format!("{} - {}", lower, upper)),
        }
    }

    fn opaque(kind: SpecifierKind, range: VersionRange) -> Self {
        Self {
            kind,
            raw: String::new(),
            range,
            prefix: None,
            base: None,
            alias: None,
            tag: None,
            form: Form::Opaque,
        }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Returns true for specifiers that point outside the registry
/// (`file:`, `workspace:`, git URLs, `user/repo` shorthands)
pub fn is_external(raw: &str) -> bool {
    let raw = raw.trim();
    if raw.starts_with("npm:") {
        return false;
    }
    raw.contains(':') || raw.contains('/')
}

fn split_alias(rest: &str) -> (&str, &str) {
    // Scoped names start with '@', so the separator is the next '@'
    let search_from = usize::from(rest.starts_with('@'));
    match rest[search_from..].find('@') {
        Some(pos) => {
            let at = pos + search_from;
            (&rest[..at], &rest[at + 1..])
        }
        None => (rest, ""),
    }
}

fn is_tag(body: &str) -> bool {
    let mut chars = body.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if !first.is_ascii_alphabetic() || body.split('.').all(|p| matches!(p, "x" | "X" | "*")) {
        return false;
    }
    if matches!(first, 'v' | 'V') && body[1..].starts_with(|c: char| c.is_ascii_digit()) {
        return false;
    }
    body.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

fn parse_body(body: &str) -> Result<Specifier, String> {
    if matches!(body, "" | "*" | "x" | "X") {
        return Ok(Specifier::opaque(SpecifierKind::Any, VersionRange::any()));
    }

    if is_tag(body) {
        let mut spec = Specifier::opaque(SpecifierKind::Tag, VersionRange::any());
        spec.tag = Some(body.to_string());
        return Ok(spec);
    }

    let range = VersionRange::parse(body).map_err(|e| e.message)?;

    if body.contains("||") {
        let alternatives = body
            .split("||")
            .map(|alt| parse_body(alt.trim()).map(|spec| with_raw(spec, alt.trim())))
            .collect::<Result<Vec<_>, _>>()?;
        let base = alternatives.iter().filter_map(|a| a.base.clone()).max();
        return Ok(complex(range, base, Form::Union(alternatives)));
    }

    if let Some((lower, upper)) = body.split_once(" - ") {
        let upper = parse_body(upper.trim())?;
        let base = upper.base.clone().or_else(|| {
            PartialVersion::parse(lower.trim())
                .ok()
                .filter(|p| p.major.is_some())
                .map(|p| p.floor())
        });
        let form = Form::Hyphen {
            lower: lower.trim().to_string(),
            upper: Box::new(upper),
        };
        return Ok(complex(range, base, form));
    }

    let tokens = join_operator_tokens(body);
    if tokens.len() > 1 {
        let parsed = tokens
            .iter()
            .map(|token| parse_simple(token).map(|spec| with_raw(spec, token)))
            .collect::<Result<Vec<_>, _>>()?;
        let base = parsed.iter().filter_map(|t| t.base.clone()).max();
        return Ok(complex(range, base, Form::Intersection(parsed)));
    }

    let mut spec = parse_simple(body)?;
    spec.range = range;
    Ok(spec)
}

fn parse_simple(token: &str) -> Result<Specifier, String> {
    let (op, version) = split_operator(token)?;
    let partial = PartialVersion::parse(version)?;
    let range = VersionRange::parse(token).map_err(|e| e.message)?;

    if partial.major.is_none() {
        return Ok(Specifier::opaque(SpecifierKind::Any, range));
    }

    let layout = Layout {
        parts: partial.parts,
        numeric: partial.numeric_parts(),
        wildcard: partial.wildcard,
    };
    let kind = match SpecifierKind::from_operator(op) {
        SpecifierKind::Exact if layout.numeric < 3 => SpecifierKind::Wildcard,
        kind => kind,
    };
    let mut prefix = op.to_string();
    if partial.v_prefix {
        prefix.push('v');
    }

    Ok(Specifier {
        kind,
        raw: token.to_string(),
        range,
        prefix: (!prefix.is_empty()).then_some(prefix),
        base: Some(partial.floor()),
        alias: None,
        tag: None,
        form: Form::Simple(layout),
    })
}

fn complex(range: VersionRange, base: Option<Version>, form: Form) -> Specifier {
    Specifier {
        kind: SpecifierKind::Range,
        raw: String::new(),
        range,
        prefix: None,
        base,
        alias: None,
        tag: None,
        form,
    }
}

fn with_raw(mut spec: Specifier, raw: &str) -> Specifier {
    spec.raw = raw.to_string();
    spec
}

/// Writes `version` with the same number of components as the original
fn render_version(layout: &Layout, version: &Version) -> String {
    let core = [version.major, version.minor, version.patch];
    if layout.numeric >= 3 || !version.pre.is_empty() {
        return if version.pre.is_empty() {
            format!("{}.{}.{}", core[0], core[1], core[2])
        } else {
            format!("{}.{}.{}-{}", core[0], core[1], core[2], version.pre)
        };
    }

    let mut parts: Vec<String> = core[..layout.numeric].iter().map(u64::to_string).collect();
    if let Some(wildcard) = layout.wildcard {
        while parts.len() < layout.parts {
            parts.push(wildcard.to_string());
        }
    }
    parts.join(".")
}
