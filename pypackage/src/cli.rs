//! CLI argument definitions for the package-index binder.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the entrypoint to keep the binary small and focused on orchestration.

use crate::bind::BindRequest;
use camino::Utf8PathBuf;
use clap::Parser;
use rezbind::BindConfig;
use rezbind_common::{RangeParseError, VersionRange};

/// Bind a package from a Python package index as a rez package.
#[derive(Parser, Debug, Default)]
#[command(name = "rez-bind-pypackage")]
#[command(about)]
#[command(long_about = concat!(
    "Bind a package from a Python package index as a rez package.\n\n",
    "The binder queries the index for published versions, downloads the ",
    "selected release's source distribution, reads its setup.py metadata ",
    "without building it, translates its requirements into rez ranges and ",
    "installs its files into a new package in the rez repository.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Bind the newest release:\n",
    "    $ rez-bind-pypackage --pypkg arrow\n\n",
    "  Bind an exact version under another name:\n",
    "    $ rez-bind-pypackage --pypkg python-dateutil --version 2.8.2 --name dateutil\n\n",
    "  Bind the newest release inside a range:\n",
    "    $ rez-bind-pypackage --pypkg arrow --range '0.4+<1'\n\n",
    "CONFIGURATION:\n",
    "  Settings are read from --config, else from $REZBIND_CONFIG, else defaults.",
))]
pub struct Cli {
    /// The package to bind, as named on the index.
    #[arg(long, value_name = "PYPKG", required = true)]
    pub pypkg: String,

    /// Name of the rez package to create [default: PYPKG with '-' as '_'].
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Exact version to bind [default: newest published].
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,

    /// Version range the bound version must satisfy (rez syntax).
    #[arg(long, value_name = "RANGE")]
    pub range: Option<String>,

    /// Package repository to install into [default: from configuration].
    #[arg(long, value_name = "DIR")]
    pub install_path: Option<Utf8PathBuf>,

    /// Configuration file to load.
    #[arg(long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Keep the downloaded and unpacked sources after binding.
    #[arg(long)]
    pub keep_scratch: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Layers command-line overrides onto a loaded configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use rezbind::BindConfig;
    /// use rezbind_pypackage::cli::Cli;
    ///
    /// let cli = Cli::parse_from(["rez-bind-pypackage", "--pypkg", "arrow", "--keep-scratch"]);
    /// let mut config = BindConfig::default();
    /// cli.apply_to(&mut config);
    /// assert!(config.keep_scratch);
    /// ```
    pub fn apply_to(&self, config: &mut BindConfig) {
        if let Some(path) = &self.install_path {
            config.install_path.clone_from(path);
        }
        if self.keep_scratch {
            config.keep_scratch = true;
        }
    }

    /// Builds the bind request described by the arguments.
    ///
    /// # Errors
    ///
    /// Returns [`RangeParseError`] when `--range` is malformed.
    pub fn request(&self) -> Result<BindRequest, RangeParseError> {
        let range = self.range.as_deref().map(VersionRange::parse).transpose()?;
        Ok(BindRequest {
            pypkg: self.pypkg.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
            range,
            quiet: self.quiet,
        })
    }

    /// Default log filter for the requested verbosity.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbosity) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            (false, _) => "trace",
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
