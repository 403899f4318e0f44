//! Version selection over the versions an index publishes.

use crate::error::{BindError, Result};
use log::debug;
use rezbind_common::{Version, VersionRange};

/// Picks the version to bind.
///
/// An explicit `requested` version must match a published version exactly.
/// Without one, the newest published version under [`Version`] ordering is
/// chosen. Either way the result must lie inside `range` when one is given.
///
/// # Errors
///
/// Returns [`BindError::VersionNotFound`] when `requested` is not published,
/// [`BindError::PackageNotFound`] when nothing usable is published, and
/// [`BindError::VersionConstraint`] when the chosen version is outside
/// `range`.
///
/// # Examples
///
/// ```
/// use rezbind_pypackage::selection::select_version;
///
/// let published = vec!["9.0".to_owned(), "10.0".to_owned()];
/// assert_eq!(select_version("demo", &published, None, None)?, "10.0");
/// # Ok::<(), rezbind_pypackage::error::BindError>(())
/// ```
pub fn select_version(
    package: &str,
    published: &[String],
    requested: Option<&str>,
    range: Option<&VersionRange>,
) -> Result<String> {
    let selected = match requested {
        Some(requested) => published
            .iter()
            .find(|version| version.as_str() == requested)
            .cloned()
            .ok_or_else(|| BindError::VersionNotFound {
                package: package.to_owned(),
                requested: requested.to_owned(),
                available: published.join(", "),
            })?,
        None => newest(published).ok_or_else(|| BindError::PackageNotFound {
            package: package.to_owned(),
        })?,
    };

    if let Some(range) = range {
        let admitted = Version::parse(&selected).is_ok_and(|version| range.contains(&version));
        if !admitted {
            return Err(BindError::VersionConstraint {
                package: package.to_owned(),
                version: selected,
                range: range.to_string(),
            });
        }
    }
    Ok(selected)
}

fn newest(published: &[String]) -> Option<String> {
    published
        .iter()
        .filter_map(|raw| match Version::parse(raw) {
            Ok(version) => Some((version, raw)),
            Err(err) => {
                debug!("ignoring unorderable version: {err}");
                None
            }
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, raw)| raw.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn published(versions: &[&str]) -> Vec<String> {
        versions.iter().map(|v| (*v).to_owned()).collect()
    }

    fn range(expr: &str) -> VersionRange {
        VersionRange::parse(expr).expect("valid range")
    }

    #[rstest]
    #[case::numeric_order(&["9.0", "10.0", "2.5"], "10.0")]
    #[case::patch_release(&["1.0", "1.0.1"], "1.0.1")]
    #[case::single(&["0.1"], "0.1")]
    #[case::skips_unorderable(&["1.0", "2 beta"], "1.0")]
    fn picks_newest_without_request(#[case] versions: &[&str], #[case] expected: &str) {
        let chosen = select_version("pkg", &published(versions), None, None).expect("selected");
        assert_eq!(chosen, expected);
    }

    #[test]
    fn explicit_version_must_be_published() {
        let err = select_version("pkg", &published(&["1.0", "1.1"]), Some("3.0"), None)
            .expect_err("not published");
        match err {
            BindError::VersionNotFound {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, "3.0");
                assert_eq!(available, "1.0, 1.1");
            }
            other => panic!("expected VersionNotFound, got {other:?}"),
        }
    }

    #[test]
    fn explicit_version_uses_string_equality() {
        let result = select_version("pkg", &published(&["1.01"]), Some("1.1"), None);
        assert!(matches!(result, Err(BindError::VersionNotFound { .. })));
    }

    #[test]
    fn explicit_version_is_returned_verbatim() {
        let chosen = select_version("pkg", &published(&["1.0", "1.1"]), Some("1.0"), None)
            .expect("selected");
        assert_eq!(chosen, "1.0");
    }

    #[test]
    fn newest_outside_range_is_a_constraint_error() {
        let err = select_version("pkg", &published(&["1.0", "2.0"]), None, Some(&range("<2")))
            .expect_err("outside range");
        assert!(matches!(err, BindError::VersionConstraint { version, .. } if version == "2.0"));
    }

    #[test]
    fn explicit_version_is_checked_against_range() {
        let result = select_version(
            "pkg",
            &published(&["1.0", "2.0"]),
            Some("1.0"),
            Some(&range("2+")),
        );
        assert!(matches!(result, Err(BindError::VersionConstraint { .. })));
    }

    #[test]
    fn version_inside_range_is_accepted() {
        let chosen = select_version("pkg", &published(&["1.1", "1.2"]), None, Some(&range("1+<2")))
            .expect("selected");
        assert_eq!(chosen, "1.2");
    }

    #[test]
    fn nothing_orderable_is_package_not_found() {
        let result = select_version("pkg", &[], None, None);
        assert!(matches!(result, Err(BindError::PackageNotFound { .. })));
    }
}
