//! Build metadata harvesting.
//!
//! A source distribution declares its metadata by calling
//! `setuptools.setup(...)` (or `distutils.core.setup(...)`) from `setup.py`.
//! The harvester evaluates that script in a separate Python interpreter
//! whose `setup` functions have been replaced by a capture stub. The stub
//! records the recognised keyword arguments and the interpreter writes them
//! as JSON to a capture file; nothing is built or installed.
//!
//! The distribution root reaches the child only as its working directory
//! and as a `PYTHONPATH` prefix on the [`Invocation`], so the binder's own
//! working directory and environment are never touched.

use crate::artefact::SourceDistribution;
use crate::error::{BindError, Result};
use crate::executor::{CommandExecutor, Invocation};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, error};
use serde::Deserialize;

/// Python program that evaluates a build descriptor with `setup` captured.
///
/// Invoked as `python -c SHIM <descriptor> <capture-file>`.
pub const CAPTURE_SHIM: &str = r#"
import json
import runpy
import sys
import types

RECOGNISED = (
    "version",
    "description",
    "long_description",
    "author",
    "author_email",
    "install_requires",
    "setup_requires",
    "scripts",
)

descriptor, capture_path = sys.argv[1], sys.argv[2]
capture = {"called": False, "kwargs": {}}


def capture_setup(*args, **kwargs):
    capture["called"] = True
    capture["kwargs"] = {key: kwargs[key] for key in RECOGNISED if key in kwargs}


def find_packages(*args, **kwargs):
    return []


try:
    import setuptools
except ImportError:
    setuptools = types.ModuleType("setuptools")
    setuptools.find_packages = find_packages
    sys.modules["setuptools"] = setuptools
setuptools.setup = capture_setup

try:
    import distutils.core
except ImportError:
    distutils = types.ModuleType("distutils")
    distutils.core = types.ModuleType("distutils.core")
    distutils.__path__ = []
    sys.modules["distutils"] = distutils
    sys.modules["distutils.core"] = distutils.core
distutils.core.setup = capture_setup

sys.argv = [descriptor, "--name"]
try:
    runpy.run_path(descriptor, run_name="__main__")
except SystemExit as exc:
    if exc.code not in (None, 0):
        raise

if "version" in capture["kwargs"] and capture["kwargs"]["version"] is not None:
    capture["kwargs"]["version"] = str(capture["kwargs"]["version"])

with open(capture_path, "w", encoding="utf-8") as handle:
    json.dump(capture, handle, default=str)
"#;

/// Errors raised while evaluating a build descriptor.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// The interpreter exited unsuccessfully while loading the descriptor.
    #[error("failed to evaluate {descriptor}:\n{stderr}")]
    Load {
        /// The build descriptor.
        descriptor: Utf8PathBuf,
        /// Captured standard error of the interpreter.
        stderr: String,
    },

    /// The descriptor ran to completion without calling `setup`.
    #[error("{descriptor} did not call setup")]
    SetupNotCalled {
        /// The build descriptor.
        descriptor: Utf8PathBuf,
    },

    /// `setup` was called without a `version` argument.
    #[error("{descriptor}: a package must declare a version")]
    MissingVersion {
        /// The build descriptor.
        descriptor: Utf8PathBuf,
    },

    /// The capture file could not be read or decoded.
    #[error("unreadable metadata capture for {descriptor}: {reason}")]
    Capture {
        /// The build descriptor.
        descriptor: Utf8PathBuf,
        /// What went wrong.
        reason: String,
    },
}

/// Metadata a build descriptor declared through `setup`.
///
/// Only the recognised subset is kept; other keyword arguments are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredMetadata {
    /// Declared version.
    pub version: String,
    /// One-line summary.
    pub description: Option<String>,
    /// Long-form description.
    pub long_description: Option<String>,
    /// Author name.
    pub author: Option<String>,
    /// Author e-mail address.
    pub author_email: Option<String>,
    /// Runtime requirements in Python specifier grammar.
    pub install_requires: Option<Vec<String>>,
    /// Build-time requirements in Python specifier grammar.
    pub setup_requires: Option<Vec<String>>,
    /// Script paths installed as executables.
    pub scripts: Option<Vec<String>>,
}

/// A string list as setuptools accepts it: a list or a newline-separated
/// string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringList {
    List(Vec<String>),
    Lines(String),
}

impl StringList {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(items) => items,
            Self::Lines(text) => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_owned)
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CapturedKwargs {
    version: Option<String>,
    description: Option<String>,
    long_description: Option<String>,
    author: Option<String>,
    author_email: Option<String>,
    install_requires: Option<StringList>,
    setup_requires: Option<StringList>,
    scripts: Option<StringList>,
}

#[derive(Debug, Deserialize)]
struct Capture {
    called: bool,
    #[serde(default)]
    kwargs: CapturedKwargs,
}

/// Decodes the JSON written by [`CAPTURE_SHIM`].
///
/// # Errors
///
/// Returns [`HarvestError::Capture`] for undecodable JSON,
/// [`HarvestError::SetupNotCalled`] when `setup` was never invoked and
/// [`HarvestError::MissingVersion`] when no non-empty version was declared.
pub fn parse_capture(
    descriptor: &Utf8Path,
    json: &str,
) -> std::result::Result<DeclaredMetadata, HarvestError> {
    let capture: Capture = serde_json::from_str(json).map_err(|e| HarvestError::Capture {
        descriptor: descriptor.to_owned(),
        reason: e.to_string(),
    })?;
    if !capture.called {
        return Err(HarvestError::SetupNotCalled {
            descriptor: descriptor.to_owned(),
        });
    }
    let kwargs = capture.kwargs;
    let version = kwargs
        .version
        .map(|version| version.trim().to_owned())
        .filter(|version| !version.is_empty())
        .ok_or_else(|| HarvestError::MissingVersion {
            descriptor: descriptor.to_owned(),
        })?;
    Ok(DeclaredMetadata {
        version,
        description: kwargs.description,
        long_description: kwargs.long_description,
        author: kwargs.author,
        author_email: kwargs.author_email,
        install_requires: kwargs.install_requires.map(StringList::into_vec),
        setup_requires: kwargs.setup_requires.map(StringList::into_vec),
        scripts: kwargs.scripts.map(StringList::into_vec),
    })
}

/// Builds the interpreter invocation for one harvest.
///
/// The distribution root becomes the child's working directory and is
/// prepended to any inherited `PYTHONPATH`.
#[must_use]
pub fn harvest_invocation(
    python: &str,
    root: &Utf8Path,
    descriptor: &Utf8Path,
    capture_file: &Utf8Path,
) -> Invocation {
    let search_path = match std::env::var("PYTHONPATH") {
        Ok(existing) if !existing.is_empty() => format!("{root}{PATH_SEPARATOR}{existing}"),
        _ => root.to_string(),
    };
    Invocation::new(python)
        .args(["-c", CAPTURE_SHIM])
        .arg(descriptor.as_str())
        .arg(capture_file.as_str())
        .current_dir(root)
        .env("PYTHONPATH", search_path)
}

#[cfg(windows)]
const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
const PATH_SEPARATOR: char = ':';

/// Evaluates the distribution's build descriptor and returns what it declared.
///
/// # Errors
///
/// Returns [`BindError::Declaration`] when the descriptor fails to load,
/// never calls `setup` or declares no version, and
/// [`BindError::CommandSpawn`] when the interpreter cannot be started.
pub fn harvest(
    python: &str,
    dist: &SourceDistribution,
    executor: &dyn CommandExecutor,
) -> Result<DeclaredMetadata> {
    harvest_descriptor(python, dist.root(), dist.descriptor(), executor)
}

/// Evaluates `descriptor` with `root` as the distribution root.
///
/// # Errors
///
/// As for [`harvest`].
pub fn harvest_descriptor(
    python: &str,
    root: &Utf8Path,
    descriptor: &Utf8Path,
    executor: &dyn CommandExecutor,
) -> Result<DeclaredMetadata> {
    let capture_file = tempfile::Builder::new()
        .prefix("rezbind-capture-")
        .suffix(".json")
        .tempfile()
        .map_err(|e| {
            let temp_dir = std::env::temp_dir().to_string_lossy().into_owned();
            BindError::io(temp_dir, e)
        })?;
    let capture_path = Utf8PathBuf::try_from(capture_file.path().to_path_buf()).map_err(|e| {
        HarvestError::Capture {
            descriptor: descriptor.to_owned(),
            reason: e.to_string(),
        }
    })?;

    let invocation = harvest_invocation(python, root, descriptor, &capture_path);
    debug!("evaluating {descriptor} with {python}");
    let output = executor.run(&invocation)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        error!(
            "evaluating {descriptor} failed ({}) in {root}:\n{stderr}",
            output.status
        );
        return Err(HarvestError::Load {
            descriptor: descriptor.to_owned(),
            stderr,
        }
        .into());
    }

    let json = std::fs::read_to_string(&capture_path).map_err(|e| HarvestError::Capture {
        descriptor: descriptor.to_owned(),
        reason: e.to_string(),
    })?;
    let metadata = parse_capture(descriptor, &json)?;
    debug!("{descriptor} declared version {}", metadata.version);
    Ok(metadata)
}


#[cfg(test)]
#[path = "harvest_python_tests.rs"]
mod python_tests;
