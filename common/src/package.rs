//! Package descriptors and transactional package assembly.
//!
//! A binder fills in a [`PackageDescriptor`] through a [`PackageMaker`] and
//! then commits it. Committing creates `<repository>/<name>/<version>`,
//! hands that root to a caller-supplied population callback, and writes
//! `package.py`. If anything fails the partially written version directory
//! is removed again; a maker dropped without committing writes nothing.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use std::fs;

/// File name of the rez package definition.
pub const PACKAGE_FILE: &str = "package.py";

/// Errors raised while assembling a package on disk.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    /// The descriptor was committed without a version.
    #[error("package {name} has no version")]
    MissingVersion {
        /// Package name.
        name: String,
    },

    /// The name is not a valid rez package name.
    #[error(
        "invalid package name '{name}': use letters, digits and underscores, \
         optionally separated by single dots"
    )]
    InvalidName {
        /// Rejected name.
        name: String,
    },

    /// The version cannot name a single directory inside the package.
    #[error("invalid package version '{version}'")]
    InvalidVersion {
        /// Rejected version.
        version: String,
    },

    /// The target version directory is already populated.
    #[error("package already exists at {path}; remove it to rebind")]
    AlreadyExists {
        /// Existing version directory.
        path: Utf8PathBuf,
    },

    /// A filesystem operation failed.
    #[error("failed to write package at {path}: {source}")]
    Io {
        /// Path being written.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// The rez package definition emitted by a binder.
///
/// Optional fields left as `None` are omitted from `package.py`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Short one-line summary.
    pub nice_name: Option<String>,
    /// Long description.
    pub description: Option<String>,
    /// Author display strings.
    pub authors: Option<Vec<String>>,
    /// Runtime requirements in rez grammar.
    pub requires: Option<Vec<String>>,
    /// Build-time requirements in rez grammar.
    pub build_requires: Option<Vec<String>>,
    /// Executables the package provides.
    pub tools: Option<Vec<String>>,
    /// Body lines of the `commands()` function.
    pub commands: Vec<String>,
}

impl PackageDescriptor {
    /// Renders the descriptor as a `package.py` document.
    ///
    /// # Examples
    ///
    /// ```
    /// use rezbind_common::PackageDescriptor;
    ///
    /// let descriptor = PackageDescriptor {
    ///     name: "arrow".to_owned(),
    ///     version: "0.4.4".to_owned(),
    ///     requires: Some(vec!["python_dateutil".to_owned()]),
    ///     ..PackageDescriptor::default()
    /// };
    /// let text = descriptor.render();
    /// assert!(text.contains("name = 'arrow'"));
    /// assert!(text.contains("requires = ['python_dateutil']"));
    /// assert!(!text.contains("tools"));
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from("# -*- coding: utf-8 -*-\n");
        push_attr(&mut out, "name", &py_str(&self.name));
        push_attr(&mut out, "version", &py_str(&self.version));
        if let Some(nice_name) = &self.nice_name {
            push_attr(&mut out, "nice_name", &py_str(nice_name));
        }
        if let Some(description) = &self.description {
            push_attr(&mut out, "description", &py_str(description));
        }
        let lists = [
            ("authors", &self.authors),
            ("requires", &self.requires),
            ("build_requires", &self.build_requires),
            ("tools", &self.tools),
        ];
        for (key, values) in lists {
            if let Some(values) = values {
                push_attr(&mut out, key, &py_list(values));
            }
        }
        if !self.commands.is_empty() {
            out.push_str("\ndef commands():\n");
            for line in &self.commands {
                out.push_str(&format!("    {line}\n"));
            }
        }
        out
    }
}

fn push_attr(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!("\n{key} = {value}\n"));
}

/// Quotes `value` as a single-quoted Python string literal.
fn py_str(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}

fn py_list(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|value| py_str(value)).collect();
    format!("[{}]", items.join(", "))
}

/// Checks that `name` is a valid rez package name.
///
/// A name is one or more runs of ASCII letters, digits and underscores
/// joined by single dots, so it can never hold a path separator or a
/// parent-directory reference.
///
/// # Errors
///
/// Returns [`PackageError::InvalidName`] otherwise.
///
/// # Examples
///
/// ```
/// use rezbind_common::validate_name;
///
/// assert!(validate_name("python_dateutil").is_ok());
/// assert!(validate_name("zope.interface").is_ok());
/// assert!(validate_name("..").is_err());
/// assert!(validate_name("../precious").is_err());
/// ```
pub fn validate_name(name: &str) -> Result<(), PackageError> {
    let valid = name.split('.').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    });
    if valid {
        Ok(())
    } else {
        Err(PackageError::InvalidName {
            name: name.to_owned(),
        })
    }
}

fn is_single_component(value: &str) -> bool {
    matches!(
        Utf8Path::new(value).components().collect::<Vec<_>>().as_slice(),
        [Utf8Component::Normal(part)] if *part == value
    )
}

/// Arguments handed to the root-population callback.
#[derive(Debug, Clone, Copy)]
pub struct RootContext<'a> {
    /// Directory holding the package definition.
    pub resources_path: &'a Utf8Path,
    /// Variant index, `None` for variantless packages.
    pub variant: Option<usize>,
    /// Directory the callback populates.
    pub root: &'a Utf8Path,
}

/// A package written to a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Version directory inside the repository.
    pub path: Utf8PathBuf,
}

/// Scoped builder for one package in a repository.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use rezbind_common::{PackageError, PackageMaker};
///
/// let temp = tempfile::tempdir()?;
/// let repo = Utf8PathBuf::try_from(temp.path().to_path_buf())?;
/// let mut maker = PackageMaker::new("demo", &repo);
/// maker.descriptor_mut().version = "1.0".to_owned();
/// let installed = maker.commit(|ctx| {
///     std::fs::create_dir_all(ctx.root.join("bin")).map_err(|source| PackageError::Io {
///         path: ctx.root.join("bin"),
///         source,
///     })
/// })?;
/// assert!(installed.path.join("package.py").exists());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct PackageMaker {
    repository: Utf8PathBuf,
    descriptor: PackageDescriptor,
}

impl PackageMaker {
    /// Starts a package named `name` in `repository`.
    #[must_use]
    pub fn new(name: &str, repository: &Utf8Path) -> Self {
        Self {
            repository: repository.to_owned(),
            descriptor: PackageDescriptor {
                name: name.to_owned(),
                ..PackageDescriptor::default()
            },
        }
    }

    /// The descriptor being assembled.
    #[must_use]
    pub fn descriptor(&self) -> &PackageDescriptor {
        &self.descriptor
    }

    /// Mutable access to the descriptor being assembled.
    pub fn descriptor_mut(&mut self) -> &mut PackageDescriptor {
        &mut self.descriptor
    }

    /// Where the package will be written once committed.
    #[must_use]
    pub fn version_dir(&self) -> Utf8PathBuf {
        self.repository
            .join(&self.descriptor.name)
            .join(&self.descriptor.version)
    }

    /// Populates the package root and writes `package.py`.
    ///
    /// `make_root` runs first; its error aborts the commit and the version
    /// directory is removed again.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::MissingVersion`] for an empty version,
    /// [`PackageError::InvalidName`] or [`PackageError::InvalidVersion`] when
    /// the name or version would escape the repository,
    /// [`PackageError::AlreadyExists`] when the version directory exists,
    /// [`PackageError::Io`] for filesystem failures, and any error produced by
    /// `make_root`.
    pub fn commit<F, E>(self, make_root: F) -> Result<InstalledPackage, E>
    where
        F: FnOnce(&RootContext<'_>) -> Result<(), E>,
        E: From<PackageError>,
    {
        if self.descriptor.version.is_empty() {
            return Err(PackageError::MissingVersion {
                name: self.descriptor.name,
            }
            .into());
        }
        validate_name(&self.descriptor.name)?;
        if !is_single_component(&self.descriptor.version) {
            return Err(PackageError::InvalidVersion {
                version: self.descriptor.version,
            }
            .into());
        }
        let version_dir = self.version_dir();
        if version_dir.exists() {
            return Err(PackageError::AlreadyExists { path: version_dir }.into());
        }
        create_dir(&version_dir)?;
        let mut guard = PartialPackage::new(version_dir.clone());

        debug!("populating package root {version_dir}");
        make_root(&RootContext {
            resources_path: &version_dir,
            variant: None,
            root: &version_dir,
        })?;

        let definition = version_dir.join(PACKAGE_FILE);
        fs::write(&definition, self.descriptor.render()).map_err(|source| PackageError::Io {
            path: definition.clone(),
            source,
        })?;
        guard.disarm();

        info!(
            "wrote package {}-{} to {version_dir}",
            self.descriptor.name, self.descriptor.version
        );
        Ok(InstalledPackage {
            name: self.descriptor.name,
            version: self.descriptor.version,
            path: version_dir,
        })
    }
}

/// Removes a half-written version directory unless disarmed.
struct PartialPackage {
    path: Utf8PathBuf,
    armed: bool,
}

impl PartialPackage {
    fn new(path: Utf8PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialPackage {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = fs::remove_dir_all(&self.path) {
            warn!("failed to remove partial package {}: {err}", self.path);
        }
    }
}

fn create_dir(path: &Utf8Path) -> Result<(), PackageError> {
    fs::create_dir_all(path).map_err(|source| PackageError::Io {
        path: path.to_owned(),
        source,
    })
}

/// Creates `base/name` (and parents) and returns its path.
///
/// # Errors
///
/// Returns [`PackageError::Io`] when the directory cannot be created.
pub fn make_dirs(base: &Utf8Path, name: &str) -> Result<Utf8PathBuf, PackageError> {
    let path = base.join(name);
    create_dir(&path)?;
    Ok(path)
}
