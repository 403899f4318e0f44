//! Mapping of declared metadata onto a rez package descriptor.

use crate::harvest::DeclaredMetadata;
use crate::requirement::{RequirementError, translate_all};
use rezbind_common::PackageDescriptor;

/// Descriptions at or above this many characters are truncated for the
/// nice name.
pub const NICE_NAME_LIMIT: usize = 150;

/// `commands()` body exposing a bound package's scripts and modules.
pub const COMMANDS: [&str; 2] = [
    "env.PATH.append('{this.root}/bin')",
    "env.PYTHONPATH.append('{this.root}/python')",
];

/// Shortens a one-line description into a nice name.
///
/// # Examples
///
/// ```
/// use rezbind_pypackage::assemble::nice_name;
///
/// assert_eq!(nice_name("Better dates"), "Better dates");
/// let long = "x".repeat(150);
/// assert_eq!(nice_name(&long).chars().count(), 150);
/// assert!(nice_name(&long).ends_with("..."));
/// ```
#[must_use]
pub fn nice_name(description: &str) -> String {
    if description.chars().count() < NICE_NAME_LIMIT {
        return description.to_owned();
    }
    let mut shortened: String = description.chars().take(NICE_NAME_LIMIT - 3).collect();
    shortened.push_str("...");
    shortened
}

/// Joins author name and e-mail into the single author entry, if either is
/// declared.
#[must_use]
pub fn authors(author: Option<&str>, author_email: Option<&str>) -> Option<Vec<String>> {
    let parts: Vec<&str> = [author, author_email].into_iter().flatten().collect();
    (!parts.is_empty()).then(|| vec![parts.join(" ")])
}

/// The executable name of each script: its final path segment.
#[must_use]
pub fn tools<S: AsRef<str>>(scripts: &[S]) -> Vec<String> {
    scripts
        .iter()
        .map(|script| {
            let script = script.as_ref().trim_end_matches(['/', '\\']);
            script
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(script)
                .to_owned()
        })
        .collect()
}

/// Fills `descriptor` from `metadata`, leaving name and version untouched.
///
/// Undeclared fields stay `None`.
///
/// # Errors
///
/// Returns the first [`RequirementError`] among the declared requirements.
pub fn describe(
    metadata: &DeclaredMetadata,
    descriptor: &mut PackageDescriptor,
) -> Result<(), RequirementError> {
    descriptor.nice_name = metadata.description.as_deref().map(nice_name);
    descriptor.description.clone_from(&metadata.long_description);
    descriptor.authors = authors(metadata.author.as_deref(), metadata.author_email.as_deref());
    descriptor.requires = metadata
        .install_requires
        .as_deref()
        .map(translate_all)
        .transpose()?;
    descriptor.build_requires = metadata
        .setup_requires
        .as_deref()
        .map(translate_all)
        .transpose()?;
    descriptor.tools = metadata.scripts.as_deref().map(tools);
    descriptor.commands = COMMANDS.iter().map(|line| (*line).to_owned()).collect();
    Ok(())
}
