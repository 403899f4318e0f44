//! Subprocess execution for the harvester and the installer.
//!
//! Both the build-descriptor evaluation and the installer run as child
//! processes. Their working directory and environment additions travel with
//! the [`Invocation`] so the binder never changes its own process state.

use crate::error::{BindError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::process::{Command, Output};

/// A fully described child-process invocation.
///
/// # Examples
///
/// ```
/// use rezbind_pypackage::executor::Invocation;
///
/// let invocation = Invocation::new("python3")
///     .args(["setup.py", "install", "--no-compile"])
///     .current_dir("/tmp/src")
///     .env("PYTHONDONTWRITEBYTECODE", "1");
/// assert_eq!(invocation.command_line(), "python3 setup.py install --no-compile");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Program to run, resolved through `PATH`.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Working directory of the child, inherited when `None`.
    pub cwd: Option<Utf8PathBuf>,
    /// Environment variables set on the child in addition to the inherited ones.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Starts an invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the child's working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Utf8Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Sets an environment variable on the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Returns the value this invocation sets for `key`, if any.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Program and arguments joined by spaces, for diagnostics.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs the invocation to completion and returns the captured output.
    ///
    /// A non-zero exit status is not an error at this level; callers inspect
    /// [`Output::status`].
    ///
    /// # Errors
    ///
    /// Returns [`BindError::CommandSpawn`] when the program cannot be started.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rezbind_pypackage::executor::{CommandExecutor, Invocation, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run(&Invocation::new("python3").arg("--version"))?;
    /// assert!(output.status.success());
    /// # Ok::<(), rezbind_pypackage::error::BindError>(())
    /// ```
    fn run(&self, invocation: &Invocation) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        debug!("running {}", invocation.command_line());
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }
        command.output().map_err(|source| BindError::CommandSpawn {
            program: invocation.program.clone(),
            source,
        })
    }
}
