//! Total ordering over dotted version identifiers.
//!
//! A version is a sequence of tokens separated by `.` or `-`. Each token is
//! split into alternating runs of digits and non-digits. Digit runs compare
//! numerically, other runs compare lexically, and a non-digit run sorts below
//! a digit run in the same position. A version that is a strict prefix of
//! another sorts first, so `1 < 1.0 < 1.0.1` and `9.0 < 10.0`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Errors raised while parsing a version string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version '{version}': {reason}")]
pub struct VersionParseError {
    /// The rejected input.
    pub version: String,
    /// Why the input was rejected.
    pub reason: &'static str,
}

#[derive(Debug, Clone)]
enum SubToken {
    Alpha(String),
    // Leading zeros stripped so that length orders magnitude.
    Number(String),
}

impl SubToken {
    fn number(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        Self::Number(if trimmed.is_empty() { "0" } else { trimmed }.to_owned())
    }
}

impl Ord for SubToken {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Self::Alpha(a), Self::Alpha(b)) => a.cmp(b),
            (Self::Alpha(_), Self::Number(_)) => Ordering::Less,
            (Self::Number(_), Self::Alpha(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for SubToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SubToken {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SubToken {}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Token(Vec<SubToken>);

impl Token {
    fn parse(raw: &str) -> Self {
        let mut subtokens = Vec::new();
        let mut run = String::new();
        let mut run_is_digit = false;
        for ch in raw.chars() {
            let is_digit = ch.is_ascii_digit();
            if !run.is_empty() && is_digit != run_is_digit {
                subtokens.push(Self::finish_run(&run, run_is_digit));
                run.clear();
            }
            run_is_digit = is_digit;
            run.push(ch);
        }
        if !run.is_empty() {
            subtokens.push(Self::finish_run(&run, run_is_digit));
        }
        Self(subtokens)
    }

    fn finish_run(run: &str, is_digit: bool) -> SubToken {
        if is_digit {
            SubToken::number(run)
        } else {
            SubToken::Alpha(run.to_owned())
        }
    }
}

/// A parsed version with a total order.
///
/// Equality follows the ordering, so `1.01` equals `1.1`; callers needing
/// exact textual matches compare [`Version::as_str`].
///
/// # Examples
///
/// ```
/// use rezbind_common::Version;
///
/// let old: Version = "9.0".parse()?;
/// let new: Version = "10.0".parse()?;
/// assert!(new > old);
/// # Ok::<(), rezbind_common::VersionParseError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    tokens: Vec<Token>,
}

impl Version {
    /// Parses a version string. The empty string is the lowest version.
    ///
    /// # Errors
    ///
    /// Returns [`VersionParseError`] when the input contains whitespace or
    /// an empty token such as `1..2`.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let reject = |reason| VersionParseError {
            version: input.to_owned(),
            reason,
        };
        if input.is_empty() {
            return Ok(Self {
                raw: String::new(),
                tokens: Vec::new(),
            });
        }
        if input.chars().any(char::is_whitespace) {
            return Err(reject("whitespace is not allowed"));
        }
        let mut tokens = Vec::new();
        for raw in input.split(['.', '-']) {
            if raw.is_empty() {
                return Err(reject("empty token"));
            }
            tokens.push(Token::parse(raw));
        }
        Ok(Self {
            raw: input.to_owned(),
            tokens,
        })
    }

    /// The version exactly as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns `true` when `self` equals `prefix` or extends it with more
    /// tokens, so `1.2.3` lies in the family of `1.2`.
    #[must_use]
    pub fn in_family_of(&self, prefix: &Self) -> bool {
        self.tokens.len() >= prefix.tokens.len()
            && self.tokens.iter().zip(&prefix.tokens).all(|(a, b)| a == b)
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tokens.cmp(&other.tokens)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}
