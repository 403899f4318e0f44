//! Installer invocation.
//!
//! Materialises a source distribution's files into a package root by running
//! its build descriptor's `install` command with the configured interpreter,
//! from the distribution directory. Headers, modules and scripts are
//! redirected into the root's `include`, `python` and `bin` subdirectories;
//! dependencies are not resolved and nothing is byte-compiled.

use crate::artefact::BUILD_DESCRIPTOR;
use crate::error::{BindError, Result};
use crate::executor::{CommandExecutor, Invocation};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use rezbind_common::make_dirs;

/// File the installer lists installed paths in, inside the distribution.
pub const RECORD_FILE: &str = "rezbind-installed-files.txt";

/// Runs the build descriptor with setuptools imported first, so descriptors
/// written against plain distutils still accept the externally-managed
/// install options.
pub const SETUPTOOLS_SHIM: &str = concat!(
    "import sys, setuptools\n",
    "sys.argv[0] = __file__ = 'setup.py'\n",
    "with open(__file__, 'rb') as f:\n",
    "    code = compile(f.read(), __file__, 'exec')\n",
    "exec(code)\n",
);

/// Directory layout of a bound package root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    /// Executables installed by the package.
    pub bin: Utf8PathBuf,
    /// Pure and platform-specific Python modules.
    pub python: Utf8PathBuf,
    /// C headers.
    pub include: Utf8PathBuf,
    /// Data files, placed relative to the package root itself.
    pub data: Utf8PathBuf,
}

impl InstallLayout {
    /// The layout rooted at `root`, without touching the filesystem.
    #[must_use]
    pub fn under(root: &Utf8Path) -> Self {
        Self {
            bin: root.join("bin"),
            python: root.join("python"),
            include: root.join("include"),
            data: root.to_owned(),
        }
    }

    /// Creates the layout's directories under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::Package`] when a directory cannot be created.
    pub fn create(root: &Utf8Path) -> Result<Self> {
        Ok(Self {
            bin: make_dirs(root, "bin")?,
            python: make_dirs(root, "python")?,
            include: make_dirs(root, "include")?,
            data: root.to_owned(),
        })
    }
}

/// The installer command for one distribution.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use rezbind_pypackage::installer::{InstallLayout, InstallerCommand};
///
/// let layout = InstallLayout::under(Utf8Path::new("/repo/arrow/0.4.4"));
/// let command = InstallerCommand::new("python3", Utf8Path::new("/tmp/arrow-0.4.4"), layout);
/// let line = command.invocation().command_line();
/// assert!(line.contains(" install --single-version-externally-managed"));
/// assert!(line.contains("--install-scripts=/repo/arrow/0.4.4/bin"));
/// ```
#[derive(Debug, Clone)]
pub struct InstallerCommand {
    python: String,
    source_dir: Utf8PathBuf,
    layout: InstallLayout,
}

impl InstallerCommand {
    /// Describes installing the distribution in `source_dir` into `layout`
    /// with the interpreter `python`.
    #[must_use]
    pub fn new(python: &str, source_dir: &Utf8Path, layout: InstallLayout) -> Self {
        Self {
            python: python.to_owned(),
            source_dir: source_dir.to_owned(),
            layout,
        }
    }

    /// The child-process invocation, run from the distribution directory.
    ///
    /// The child's working directory is the distribution, so every layout
    /// path must already be absolute.
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        let layout = &self.layout;
        Invocation::new(&self.python)
            .args(["-c", SETUPTOOLS_SHIM])
            .args(["install", "--single-version-externally-managed"])
            .arg(format!("--record={}", self.source_dir.join(RECORD_FILE)))
            .arg("--no-compile")
            .arg(format!("--install-headers={}", layout.include))
            .arg(format!("--install-purelib={}", layout.python))
            .arg(format!("--install-platlib={}", layout.python))
            .arg(format!("--install-scripts={}", layout.bin))
            .arg(format!("--install-data={}", layout.data))
            .current_dir(&self.source_dir)
    }

    /// Runs the installer.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::InstallerFailure`] on a non-zero exit status and
    /// [`BindError::CommandSpawn`] when the installer cannot be started.
    pub fn run(&self, executor: &dyn CommandExecutor) -> Result<()> {
        let invocation = self.invocation();
        let command = invocation.command_line();
        info!(
            "installing {} with {} {BUILD_DESCRIPTOR} install",
            self.source_dir, self.python
        );
        let output = executor.run(&invocation)?;
        debug!("installer output:\n{}", String::from_utf8_lossy(&output.stdout));
        if !output.status.success() {
            return Err(BindError::InstallerFailure {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(())
    }
}

/// Creates the package layout under `root` and installs `source_dir` into it.
///
/// # Errors
///
/// As for [`InstallLayout::create`] and [`InstallerCommand::run`].
pub fn install(
    python: &str,
    source_dir: &Utf8Path,
    root: &Utf8Path,
    executor: &dyn CommandExecutor,
) -> Result<()> {
    let layout = InstallLayout::create(root)?;
    InstallerCommand::new(python, source_dir, layout).run(executor)
}


#[cfg(test)]
#[path = "installer_python_tests.rs"]
mod python_tests;
