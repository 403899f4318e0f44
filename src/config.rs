//! Bind configuration loaded from `rezbind.toml`.
//!
//! Every binder in the workspace reads the same settings: where the package
//! index lives, where scratch downloads go, where finished packages are
//! installed, and which interpreter drives the foreign build system.
//! Values are deserialised from TOML when a file is present and fall back to
//! defaults otherwise. Command-line flags are layered on top by the binders.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "REZBIND_CONFIG";

/// Default package index endpoint (PyPI JSON API root).
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/pypi";

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// Path of the unreadable file.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has unknown keys.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A configured path could not be made absolute.
    #[error("failed to resolve {path}: {source}")]
    Resolve {
        /// Path as configured.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Settings shared by every bind operation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BindConfig {
    /// Root of the package index JSON API.
    pub index_url: String,
    /// Parent directory for per-package scratch trees.
    pub scratch_dir: Utf8PathBuf,
    /// Package repository that receives bound packages.
    pub install_path: Utf8PathBuf,
    /// Interpreter used to evaluate and install build descriptors.
    pub python: String,
    /// Network timeout in seconds. Unset means block indefinitely.
    pub timeout_secs: Option<u64>,
    /// Leave the scratch tree on disk after a bind for diagnostics.
    pub keep_scratch: bool,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_owned(),
            scratch_dir: default_scratch_dir(),
            install_path: default_install_path(),
            python: "python3".to_owned(),
            timeout_secs: None,
            keep_scratch: false,
        }
    }
}

impl BindConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML, wrongly typed values
    /// or unknown keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use rezbind::BindConfig;
    ///
    /// let config = BindConfig::from_toml_str("python = \"python3.11\"\n")?;
    /// assert_eq!(config.python, "python3.11");
    /// assert!(!config.keep_scratch);
    /// # Ok::<(), rezbind::ConfigError>(())
    /// ```
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Reads and parses the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when its contents are invalid.
    pub fn load_from(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads the file named by `REZBIND_CONFIG`, or defaults when unset.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Self::load_from`].
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load_from(Utf8Path::new(path.trim())),
            _ => Ok(Self::default()),
        }
    }

    /// A copy with relative scratch and install paths resolved against the
    /// working directory.
    ///
    /// External programs run from inside the scratch tree, so every path
    /// handed to them must be absolute.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Resolve`] when the working directory cannot be
    /// determined or is not valid UTF-8.
    pub fn with_absolute_paths(&self) -> Result<Self, ConfigError> {
        Ok(Self {
            scratch_dir: absolute(&self.scratch_dir)?,
            install_path: absolute(&self.install_path)?,
            ..self.clone()
        })
    }

    /// Network timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn absolute(path: &Utf8Path) -> Result<Utf8PathBuf, ConfigError> {
    let resolve = |source| ConfigError::Resolve {
        path: path.to_owned(),
        source,
    };
    let resolved = std::path::absolute(path).map_err(resolve)?;
    Utf8PathBuf::try_from(resolved).map_err(|e| resolve(e.into_io_error()))
}

fn default_scratch_dir() -> Utf8PathBuf {
    Utf8PathBuf::try_from(std::env::temp_dir())
        .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
        .join("rezbind")
}

// Mirrors the rez default local packages path.
fn default_install_path() -> Utf8PathBuf {
    directories_next::BaseDirs::new()
        .and_then(|dirs| Utf8PathBuf::try_from(dirs.home_dir().to_path_buf()).ok())
        .map_or_else(|| Utf8PathBuf::from("packages"), |home| home.join("packages"))
}
