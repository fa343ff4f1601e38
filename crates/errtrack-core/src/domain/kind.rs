//! Fault kind identifiers and the subtype relation between them
//!
//! A [`FaultKind`] is a stable, dotted identifier for a category of fault
//! (`http.not_found`, `validation.email`, `panic`). Exclusion rules in the
//! tracker configuration are expressed as fault kinds, and a
//! [`FaultTaxonomy`] decides whether a raised fault *is a* given kind.
//!
//! ## Design Notes
//!
//! - Kinds are normalized to lowercase on construction so `HTTP.NotFound`
//!   and `http.notfound` compare equal.
//! - [`DottedTaxonomy`] treats every dotted prefix as an ancestor:
//!   `validation.email` is a `validation`, but `validations` is not.
//! - Hosts with a richer fault hierarchy register explicit parent edges in a
//!   [`TaxonomyMap`].

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Segment separator inside a fault kind
const SEPARATOR: char = '.';

const PANIC: &str = "panic";

/// A validated, normalized fault kind identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FaultKind(String);

impl FaultKind {
    /// Creates a new FaultKind, validating and normalizing the identifier
    ///
    /// # Errors
    /// Returns `DomainError::InvalidFaultKind` if the identifier is empty,
    /// has an empty segment, or contains characters other than ASCII
    /// alphanumerics, `_` and `-` inside its segments.
    pub fn new(kind: impl AsRef<str>) -> Result<Self, DomainError> {
        let normalized = kind.as_ref().trim().to_ascii_lowercase();

        if normalized.is_empty() {
            return Err(DomainError::InvalidFaultKind(
                "fault kind cannot be empty".to_string(),
            ));
        }

        for segment in normalized.split(SEPARATOR) {
            if segment.is_empty() {
                return Err(DomainError::InvalidFaultKind(format!(
                    "empty segment in '{normalized}'"
                )));
            }
            if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(DomainError::InvalidFaultKind(format!(
                    "invalid character in '{normalized}'"
                )));
            }
        }

        Ok(Self(normalized))
    }

    /// The kind assigned to Rust panics
    #[must_use]
    pub fn panic() -> Self {
        Self(PANIC.to_string())
    }

    /// Returns the kind as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the immediate dotted parent, if any (`http.not_found` → `http`)
    #[must_use]
    pub fn parent(&self) -> Option<FaultKind> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| Self(parent.to_string()))
    }

    /// Returns true if this kind equals `ancestor` or is nested under it
    /// at a segment boundary
    #[must_use]
    pub fn is_within(&self, ancestor: &FaultKind) -> bool {
        match self.0.strip_prefix(ancestor.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with(SEPARATOR),
            None => false,
        }
    }
}

impl Display for FaultKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FaultKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FaultKind {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FaultKind> for String {
    fn from(kind: FaultKind) -> Self {
        kind.0
    }
}

impl AsRef<str> for FaultKind {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// FaultTaxonomy
// ============================================================================

/// Subtype relation between fault kinds, supplied by the host
///
/// `is_a(kind, ancestor)` must be reflexive: every kind is a itself.
pub trait FaultTaxonomy: Send + Sync {
    /// Returns true if a fault of `kind` is an instance of `ancestor`
    fn is_a(&self, kind: &FaultKind, ancestor: &FaultKind) -> bool;
}

/// Taxonomy derived purely from the dotted structure of kind identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct DottedTaxonomy;

impl FaultTaxonomy for DottedTaxonomy {
    fn is_a(&self, kind: &FaultKind, ancestor: &FaultKind) -> bool {
        kind.is_within(ancestor)
    }
}

/// Taxonomy with explicit child → parent edges registered by the host
///
/// Lookups walk the registered edges transitively. A kind without a
/// registered parent continues through its dotted parent. Cycles in the
/// registered edges terminate the walk.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyMap {
    parents: HashMap<FaultKind, FaultKind>,
}

impl TaxonomyMap {
    /// Creates an empty taxonomy (equivalent to [`DottedTaxonomy`])
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `parent` as the direct supertype of `child`
    pub fn with_parent(mut self, child: FaultKind, parent: FaultKind) -> Self {
        self.parents.insert(child, parent);
        self
    }

    /// Returns the registered parent of `kind`, if any
    pub fn parent_of(&self, kind: &FaultKind) -> Option<&FaultKind> {
        self.parents.get(kind)
    }
}

impl FaultTaxonomy for TaxonomyMap {
    fn is_a(&self, kind: &FaultKind, ancestor: &FaultKind) -> bool {
        let mut visited: HashSet<FaultKind> = HashSet::new();
        let mut current = kind.clone();

        loop {
            if current.is_within(ancestor) {
                return true;
            }
            let next = self
                .parents
                .get(&current)
                .cloned()
                .or_else(|| current.parent());
            match next {
                Some(next) if visited.insert(next.clone()) => current = next,
                _ => return false,
            }
        }
    }
}
