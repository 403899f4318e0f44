//! Translation of Python dependency specifiers into rez requirements.
//!
//! Only the subset of the specifier grammar with a direct rez equivalent is
//! accepted:
//!
//! | Python | rez |
//! |---|---|
//! | `foo` | `foo` |
//! | `foo==1.2.3` | `foo-1.2.3` |
//! | `foo>=1.2` | `foo-1.2+` |
//! | `foo<2` | `foo-<2` |
//! | `foo>=1.2,<2` | `foo-1.2+<2` |
//!
//! Every other comparator (`>`, `<=`, `!=`, `~=`, `===`) is rejected rather
//! than approximated, so a requirement is never silently widened or dropped.
//! Extras (`foo[bar]`) and environment markers (`foo; python_version<"3"`)
//! have no rez counterpart either and are reported as the unsupported part.

use log::warn;

/// Errors raised while translating a requirement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequirementError {
    /// The requirement uses an operation with no rez translation.
    #[error("unsupported operation '{operation}' in requirement '{requirement}'")]
    UnsupportedRequirement {
        /// The offending comparator or clause.
        operation: String,
        /// The requirement as declared.
        requirement: String,
    },
}

/// Normalises a Python distribution name into a rez package name.
///
/// # Examples
///
/// ```
/// use rezbind_pypackage::requirement::normalise_name;
///
/// assert_eq!(normalise_name(" Foo-Bar "), "foo_bar");
/// ```
#[must_use]
pub fn normalise_name(name: &str) -> String {
    name.trim().to_lowercase().replace('-', "_")
}

/// Translates one Python requirement into the rez requirement grammar.
///
/// # Errors
///
/// Returns [`RequirementError::UnsupportedRequirement`] for comparators
/// other than `==`, `>=` and `<`, for extras and environment markers, and
/// for malformed clauses.
///
/// # Examples
///
/// ```
/// use rezbind_pypackage::requirement::translate;
///
/// assert_eq!(translate("foo >= 1.2.3, < 2")?, "foo-1.2.3+<2");
/// assert_eq!(translate("Foo-Bar >= 1")?, "foo_bar-1+");
/// assert!(translate("foo > 1").is_err());
/// # Ok::<(), rezbind_pypackage::requirement::RequirementError>(())
/// ```
pub fn translate(requirement: &str) -> Result<String, RequirementError> {
    let trimmed = requirement.trim();
    let unsupported = |operation: &str| RequirementError::UnsupportedRequirement {
        operation: operation.to_owned(),
        requirement: requirement.to_owned(),
    };

    if let Some((_, marker)) = trimmed.split_once(';') {
        return Err(unsupported(&format!("; {}", marker.trim())));
    }
    if let Some(start) = trimmed.find('[') {
        let end = trimmed[start..]
            .find(']')
            .map_or(trimmed.len(), |close| start + close + 1);
        return Err(unsupported(&trimmed[start..end]));
    }

    if !trimmed.contains(['<', '>', '=']) {
        let name = normalise_name(trimmed);
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(unsupported(trimmed));
        }
        return Ok(name);
    }

    if let Some((name, version)) = trimmed.split_once("==") {
        let version = version.trim();
        let name = normalise_name(name);
        if name.is_empty() || !is_plain_version(version) {
            return Err(unsupported(&format!("=={version}")));
        }
        return Ok(format!("{name}-{version}"));
    }

    let split = trimmed
        .find(|c: char| is_comparator_char(c) || c.is_whitespace())
        .unwrap_or(trimmed.len());
    let (name, clauses) = trimmed.split_at(split);
    let name = normalise_name(name);
    if name.is_empty() {
        return Err(unsupported(trimmed));
    }

    let mut lower = Vec::new();
    let mut upper = Vec::new();
    for clause in clauses.split(',').map(str::trim) {
        if clause.is_empty() {
            continue;
        }
        match parse_clause(clause) {
            Some(Clause::AtLeast(version)) => lower.push(format!("{version}+")),
            Some(Clause::Below(version)) => upper.push(format!("<{version}")),
            None => return Err(unsupported(comparator_of(clause))),
        }
    }

    if lower.len() > 1 || upper.len() > 1 {
        warn!("requirement '{requirement}' has several bounds on one side; concatenating them");
    }
    Ok(format!("{name}-{}{}", lower.concat(), upper.concat()))
}

/// Translates a list of requirements, failing on the first unsupported one.
///
/// # Errors
///
/// Returns the first [`RequirementError`] encountered.
pub fn translate_all<S: AsRef<str>>(requirements: &[S]) -> Result<Vec<String>, RequirementError> {
    requirements
        .iter()
        .map(|requirement| translate(requirement.as_ref()))
        .collect()
}

enum Clause<'a> {
    AtLeast(&'a str),
    Below(&'a str),
}

fn parse_clause(clause: &str) -> Option<Clause<'_>> {
    if let Some(version) = clause.strip_prefix(">=") {
        let version = version.trim();
        return is_plain_version(version).then_some(Clause::AtLeast(version));
    }
    if let Some(version) = clause.strip_prefix('<') {
        let version = version.trim();
        return is_plain_version(version).then_some(Clause::Below(version));
    }
    None
}

fn comparator_of(clause: &str) -> &str {
    let end = clause
        .find(|c: char| !is_comparator_char(c))
        .unwrap_or(clause.len());
    if end == 0 { clause } else { &clause[..end] }
}

fn is_comparator_char(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '!' | '~')
}

fn is_plain_version(version: &str) -> bool {
    !version.is_empty()
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.')
}
