//! Error types for the package-index binder.
//!
//! Every stage of a bind reports through [`BindError`]. Stage-specific
//! failures keep their own enums (`IndexError`, `HarvestError`, ...) and are
//! folded in with `#[from]` so messages carry the package, version or
//! requirement that caused them.

use crate::artefact::download::DownloadError;
use crate::artefact::extraction::ExtractionError;
use crate::harvest::HarvestError;
use crate::index::IndexError;
use crate::requirement::RequirementError;
use camino::Utf8PathBuf;
use rezbind::ConfigError;
use rezbind_common::{PackageError, RangeParseError};
use thiserror::Error;

/// Errors that can occur while binding a package.
#[derive(Debug, Error)]
pub enum BindError {
    /// The index publishes no package under the requested name.
    #[error("package {package} not found on the package index")]
    PackageNotFound {
        /// Requested package name.
        package: String,
    },

    /// An explicitly requested version is not published.
    #[error("version {requested} of {package} not found; available: {available}")]
    VersionNotFound {
        /// Package name.
        package: String,
        /// The version that was asked for.
        requested: String,
        /// Comma-separated list of published versions.
        available: String,
    },

    /// The selected version lies outside the requested range.
    #[error("version {version} of {package} does not satisfy range '{range}'")]
    VersionConstraint {
        /// Package name.
        package: String,
        /// The selected version.
        version: String,
        /// The range it was checked against.
        range: String,
    },

    /// The release offers no artefact the binder can use.
    #[error("cannot bind {package} {version}: {reason}")]
    UnsupportedArtefact {
        /// Package name.
        package: String,
        /// Release version.
        version: String,
        /// Why the artefacts were rejected.
        reason: String,
    },

    /// The unpacked source distribution does not have the expected shape.
    #[error("malformed source distribution at {path}: {reason}")]
    MalformedDistribution {
        /// Directory or file that was inspected.
        path: Utf8PathBuf,
        /// What was missing or wrong.
        reason: String,
    },

    /// The build descriptor could not be evaluated or declared too little.
    #[error(transparent)]
    Declaration(#[from] HarvestError),

    /// A declared requirement uses grammar the translator rejects.
    #[error(transparent)]
    Requirement(#[from] RequirementError),

    /// The external installer exited unsuccessfully.
    #[error("installer failed: {command}\n{stderr}")]
    InstallerFailure {
        /// The command line that was run.
        command: String,
        /// Captured standard error of the installer.
        stderr: String,
    },

    /// A subprocess could not be started.
    #[error("failed to run {program}: {source}")]
    CommandSpawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The package index could not be queried.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The artefact could not be downloaded.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The artefact could not be unpacked.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Writing the package to the repository failed.
    #[error(transparent)]
    Package(#[from] PackageError),

    /// A version range expression could not be parsed.
    #[error(transparent)]
    Range(#[from] RangeParseError),

    /// The configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A scratch-tree filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl BindError {
    /// Wraps an I/O failure with the path it concerned.
    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias using [`BindError`].
pub type Result<T> = std::result::Result<T, BindError>;
