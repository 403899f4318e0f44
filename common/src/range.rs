//! Version range expressions in the rez grammar.
//!
//! A range is a `|`-separated union of bounds. Supported bound forms:
//!
//! | Form | Meaning |
//! |---|---|
//! | (empty) or `*` | any version |
//! | `==1.2` | exactly `1.2` |
//! | `1.2` | `1.2` or any version extending it (`1.2.5`) |
//! | `1.2+` / `>=1.2` | at least `1.2` |
//! | `>1.2` | greater than `1.2` |
//! | `<2` / `<=2` | below / at most `2` |
//! | `1.2+<2` / `>=1.2<2` | lower and upper bound together |
//! | `1.2..2` | `1.2` to `2` inclusive |

use crate::version::{Version, VersionParseError};
use std::fmt;
use std::str::FromStr;

/// Errors raised while parsing a range expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeParseError {
    /// A bound could not be understood.
    #[error("invalid version range '{range}': {reason}")]
    Syntax {
        /// The full range expression.
        range: String,
        /// Description of the problem.
        reason: String,
    },

    /// A version inside the range is malformed.
    #[error(transparent)]
    Version(#[from] VersionParseError),
}

#[derive(Debug, Clone)]
struct Endpoint {
    version: Version,
    inclusive: bool,
}

#[derive(Debug, Clone)]
enum Bound {
    Any,
    Exact(Version),
    Family(Version),
    Between {
        lower: Option<Endpoint>,
        upper: Option<Endpoint>,
    },
}

impl Bound {
    fn contains(&self, version: &Version) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(exact) => version == exact,
            Self::Family(prefix) => version.in_family_of(prefix),
            Self::Between { lower, upper } => {
                let above = lower.as_ref().is_none_or(|end| {
                    if end.inclusive {
                        version >= &end.version
                    } else {
                        version > &end.version
                    }
                });
                let below = upper.as_ref().is_none_or(|end| {
                    if end.inclusive {
                        version <= &end.version
                    } else {
                        version < &end.version
                    }
                });
                above && below
            }
        }
    }
}

/// A parsed version range.
///
/// # Examples
///
/// ```
/// use rezbind_common::{Version, VersionRange};
///
/// let range: VersionRange = "1.2+<2".parse()?;
/// assert!(range.contains(&"1.9.3".parse()?));
/// assert!(!range.contains(&"2.0".parse()?));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct VersionRange {
    raw: String,
    bounds: Vec<Bound>,
}

impl VersionRange {
    /// Parses a range expression.
    ///
    /// # Errors
    ///
    /// Returns [`RangeParseError`] when a bound is malformed.
    pub fn parse(input: &str) -> Result<Self, RangeParseError> {
        let bounds = input
            .split('|')
            .map(|part| parse_bound(input, part.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            raw: input.trim().to_owned(),
            bounds,
        })
    }

    /// The range that admits every version.
    #[must_use]
    pub fn any() -> Self {
        Self {
            raw: String::new(),
            bounds: vec![Bound::Any],
        }
    }

    /// Returns `true` when any bound of the union admits `version`.
    #[must_use]
    pub fn contains(&self, version: &Version) -> bool {
        self.bounds.iter().any(|bound| bound.contains(version))
    }

    /// The expression as written, trimmed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for VersionRange {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_bound(range: &str, part: &str) -> Result<Bound, RangeParseError> {
    let syntax = |reason: &str| RangeParseError::Syntax {
        range: range.to_owned(),
        reason: reason.to_owned(),
    };

    if part.is_empty() || part == "*" {
        return Ok(Bound::Any);
    }
    if let Some(exact) = part.strip_prefix("==") {
        return Ok(Bound::Exact(Version::parse(exact.trim())?));
    }
    if let Some((low, high)) = part.split_once("..") {
        return Ok(Bound::Between {
            lower: Some(endpoint(low, true)?),
            upper: Some(endpoint(high, true)?),
        });
    }

    // Split "lower<upper" at the first '<' that does not open the bound.
    let (lower_text, upper_text) = match part.char_indices().skip(1).find(|(_, c)| *c == '<') {
        Some((idx, _)) => part.split_at(idx),
        None if part.starts_with('<') => ("", part),
        None => (part, ""),
    };

    let upper = if let Some(text) = upper_text.strip_prefix("<=") {
        Some(endpoint(text, true)?)
    } else if let Some(text) = upper_text.strip_prefix('<') {
        Some(endpoint(text, false)?)
    } else {
        None
    };

    let lower = if lower_text.is_empty() {
        None
    } else if let Some(text) = lower_text.strip_prefix(">=") {
        Some(endpoint(text, true)?)
    } else if let Some(text) = lower_text.strip_prefix('>') {
        Some(endpoint(text, false)?)
    } else if let Some(text) = lower_text.strip_suffix('+') {
        Some(endpoint(text, true)?)
    } else if upper.is_none() {
        return Ok(Bound::Family(Version::parse(lower_text)?));
    } else {
        return Err(syntax("lower bound needs '+', '>=' or '>'"));
    };

    Ok(Bound::Between { lower, upper })
}

fn endpoint(text: &str, inclusive: bool) -> Result<Endpoint, RangeParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(VersionParseError {
            version: String::new(),
            reason: "missing version in bound",
        }
        .into());
    }
    Ok(Endpoint {
        version: Version::parse(text)?,
        inclusive,
    })
}
