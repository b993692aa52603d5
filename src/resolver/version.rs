//! Dotted version ordering and constraint matching.
//!
//! Catalog entries are concrete dotted versions (`3.9.4`, `0.71.0`).
//! Requests are either partial versions, matched by prefix (`3.9` matches
//! `3.9.4` but not `3.10.0`), or range expressions in npm/composer style
//! (`>=12 <14`, `^7.2`, `~3.7 || ^3.9`, composer's `^7.2|^8.0`), matched
//! with `semver`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::{Version, VersionReq};

/// A dotted numeric version, e.g. `3.9.4`.
///
/// Ordering compares components numerically, left to right; a shorter
/// version sorts below any longer version it is a prefix of
/// (`3.9` < `3.9.1`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DottedVersion(Vec<u64>);

impl DottedVersion {
    /// Numeric components.
    pub fn components(&self) -> &[u64] {
        &self.0
    }

    /// Whether `prefix`'s components lead this version's components.
    pub fn starts_with(&self, prefix: &DottedVersion) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The first component.
    pub fn major(&self) -> u64 {
        self.0[0]
    }

    /// The first two components joined, e.g. `3.8` for `3.8.1`.
    pub fn major_minor(&self) -> String {
        self.0
            .iter()
            .take(2)
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Semver view of the first three components, padding with zeros.
    pub fn to_semver(&self) -> Version {
        let get = |i: usize| self.0.get(i).copied().unwrap_or(0);
        Version::new(get(0), get(1), get(2))
    }
}

impl FromStr for DottedVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err("empty version".to_string());
        }

        trimmed
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| format!("invalid version component `{}` in `{}`", part, s))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(DottedVersion)
    }
}

impl fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// A requested version: a partial version or a range expression.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionConstraint {
    /// Matches every version.
    Any,
    /// Matches versions whose leading components equal these.
    Prefix(DottedVersion),
    /// Matches when any of the alternatives matches.
    Ranges(Vec<VersionReq>),
}

impl VersionConstraint {
    /// Parse a requested version or constraint.
    pub fn parse(input: &str) -> Result<Self, String> {
        let s = input.trim();
        if s.is_empty() || matches!(s, "*" | "x" | "X" | "latest") {
            return Ok(VersionConstraint::Any);
        }

        let mut stripped = s;
        while let Some(rest) = stripped
            .strip_suffix(".x")
            .or_else(|| stripped.strip_suffix(".X"))
            .or_else(|| stripped.strip_suffix(".*"))
        {
            stripped = rest;
        }
        if let Ok(prefix) = stripped.parse::<DottedVersion>() {
            return Ok(VersionConstraint::Prefix(prefix));
        }

        // `|` and `||` both separate alternatives
        let ranges = s
            .split('|')
            .map(str::trim)
            .filter(|branch| !branch.is_empty())
            .map(|branch| {
                let normalized = normalize_range(branch);
                VersionReq::parse(&normalized)
                    .map_err(|e| format!("invalid version constraint `{}`: {}", input, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(VersionConstraint::Ranges(ranges))
    }

    /// Whether `version` satisfies this constraint.
    pub fn matches(&self, version: &DottedVersion) -> bool {
        match self {
            VersionConstraint::Any => true,
            VersionConstraint::Prefix(prefix) => version.starts_with(prefix),
            VersionConstraint::Ranges(reqs) => {
                let v = version.to_semver();
                reqs.iter().any(|req| req.matches(&v))
            }
        }
    }
}

/// Turn an npm/composer style range into the comma-separated form `semver`
/// accepts: `>= 12 <14` becomes `>=12, <14`, `1.2 - 2.3` becomes
/// `>=1.2, <=2.3`.
fn normalize_range(range: &str) -> String {
    let tokens: Vec<&str> = range.split_whitespace().collect();

    if let [low, "-", high] = tokens.as_slice() {
        return format!(">={}, <={}", low, high);
    }

    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;
    for token in tokens {
        let token = token.trim_end_matches(',');
        if token.is_empty() {
            continue;
        }
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
            pending_op = Some(token);
            continue;
        }
        match pending_op.take() {
            Some(op) => comparators.push(format!("{}{}", op, token)),
            None => comparators.push(token.to_string()),
        }
    }
    comparators.join(", ")
}

/// Compare two version strings by dotted precedence. Unparseable strings
/// sort after every valid version, alphabetically among themselves.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (a.parse::<DottedVersion>(), b.parse::<DottedVersion>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Sort version strings ascending by dotted precedence and drop duplicates.
pub fn sort_versions(versions: &mut Vec<String>) {
    versions.sort_by(|a, b| compare_versions(a, b));
    versions.dedup();
}

/// The highest catalog entry satisfying `requested`.
///
/// Returns `None` when `requested` is not a valid constraint or nothing in
/// the catalog satisfies it. Catalog entries that are not dotted versions
/// are ignored.
pub fn max_satisfying_version(requested: &str, catalog: &[String]) -> Option<String> {
    let constraint = VersionConstraint::parse(requested).ok()?;

    catalog
        .iter()
        .filter_map(|entry| entry.parse::<DottedVersion>().ok().map(|v| (v, entry)))
        .filter(|(v, _)| constraint.matches(v))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, entry)| entry.clone())
}
