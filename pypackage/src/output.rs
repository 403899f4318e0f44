//! User-facing output for the binder CLI.

use crate::bind::BindOutcome;
use std::io::Write;

/// Format the success message printed after a bind.
///
/// # Example
///
/// ```
/// use camino::Utf8PathBuf;
/// use rezbind_pypackage::bind::BindOutcome;
/// use rezbind_pypackage::output::success_message;
///
/// let outcome = BindOutcome {
///     name: "arrow".to_owned(),
///     version: "0.4.4".to_owned(),
///     path: Utf8PathBuf::from("/home/user/packages/arrow/0.4.4"),
/// };
/// assert_eq!(
///     success_message(&outcome),
///     "Bound arrow-0.4.4 into /home/user/packages/arrow/0.4.4"
/// );
/// ```
#[must_use]
pub fn success_message(outcome: &BindOutcome) -> String {
    format!(
        "Bound {}-{} into {}",
        outcome.name, outcome.version, outcome.path
    )
}

/// Writes one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
