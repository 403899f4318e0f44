//! The bind operation.
//!
//! Runs the pipeline index → version selection → sdist fetch → metadata
//! harvest → requirement translation → installer → package assembly. Any
//! stage failing aborts the bind; the package repository is only written
//! once every earlier stage has succeeded, and a failing installer leaves
//! no partial package behind.

use camino::Utf8PathBuf;
use log::{info, warn};
use rezbind::BindConfig;
use rezbind_common::{PackageMaker, VersionRange, validate_name};
use std::io::Write;

use crate::artefact::{
    ArchiveExtractor, ArtefactDownloader, FetchRequest, HttpDownloader, SdistExtractor,
    fetch_sdist,
};
use crate::assemble::describe;
use crate::error::{BindError, Result};
use crate::executor::{CommandExecutor, SystemCommandExecutor};
use crate::harvest::harvest;
use crate::index::{HttpIndex, IndexError, PackageIndex};
use crate::installer::install;
use crate::output::write_stderr_line;
use crate::selection::select_version;

/// What to bind.
#[derive(Debug, Clone, Default)]
pub struct BindRequest {
    /// Name of the package on the index.
    pub pypkg: String,
    /// Name of the rez package to create; derived from `pypkg` when `None`.
    pub name: Option<String>,
    /// Exact version to bind; the newest when `None`.
    pub version: Option<String>,
    /// Range the bound version must satisfy.
    pub range: Option<VersionRange>,
    /// Suppress progress output.
    pub quiet: bool,
}

impl BindRequest {
    /// Requests the newest release of `pypkg`.
    #[must_use]
    pub fn new(pypkg: &str) -> Self {
        Self {
            pypkg: pypkg.to_owned(),
            ..Self::default()
        }
    }

    /// The rez package name this request produces.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::Package`] when the name, given or derived, is not
    /// a valid rez package name.
    pub fn package_name(&self) -> Result<String> {
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| default_package_name(&self.pypkg));
        validate_name(&name)?;
        Ok(name)
    }
}

/// The rez package name for an index package: `-` becomes `_`.
///
/// # Examples
///
/// ```
/// use rezbind_pypackage::bind::default_package_name;
///
/// assert_eq!(default_package_name("python-dateutil"), "python_dateutil");
/// ```
#[must_use]
pub fn default_package_name(pypkg: &str) -> String {
    pypkg.replace('-', "_")
}

/// A completed bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOutcome {
    /// Name of the created package.
    pub name: String,
    /// Version of the created package.
    pub version: String,
    /// Version directory written into the repository.
    pub path: Utf8PathBuf,
}

/// External services a bind talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Package index queried for versions and files.
    pub index: &'a dyn PackageIndex,
    /// Fetches the source distribution.
    pub downloader: &'a dyn ArtefactDownloader,
    /// Unpacks the source distribution.
    pub extractor: &'a dyn ArchiveExtractor,
    /// Runs the interpreter for metadata capture and installation.
    pub executor: &'a dyn CommandExecutor,
}

/// Binds a package using the production index, HTTP downloader, archive
/// extractor and system command executor.
///
/// # Errors
///
/// Returns the [`BindError`] of the first stage that fails.
pub fn bind(
    request: &BindRequest,
    config: &BindConfig,
    stderr: &mut dyn Write,
) -> Result<BindOutcome> {
    let index = HttpIndex::new(&config.index_url, config.timeout());
    let downloader = HttpDownloader::new(config.timeout());
    let collaborators = Collaborators {
        index: &index,
        downloader: &downloader,
        extractor: &SdistExtractor,
        executor: &SystemCommandExecutor,
    };
    bind_with(request, config, collaborators, stderr)
}

/// Testable inner function with injected dependencies.
///
/// The production entry point [`bind`] delegates here with real
/// implementations; tests inject stubs. Relative scratch and install paths
/// are resolved against the working directory before any stage runs.
///
/// # Errors
///
/// Returns the [`BindError`] of the first stage that fails.
pub fn bind_with(
    request: &BindRequest,
    config: &BindConfig,
    collaborators: Collaborators<'_>,
    stderr: &mut dyn Write,
) -> Result<BindOutcome> {
    let pypkg = request.pypkg.as_str();
    let quiet = request.quiet;
    let package_name = request.package_name()?;
    let config = &config.with_absolute_paths()?;

    progress(quiet, stderr, format!("Querying {} for {pypkg}...", config.index_url));
    let published = collaborators
        .index
        .list_versions(pypkg)
        .map_err(|err| match err {
            IndexError::NotFound { .. } => BindError::PackageNotFound {
                package: pypkg.to_owned(),
            },
            other => other.into(),
        })?;
    let version = select_version(
        pypkg,
        &published,
        request.version.as_deref(),
        request.range.as_ref(),
    )?;
    info!("selected {pypkg} {version}");

    let artefacts = collaborators.index.list_artefacts(pypkg, &version)?;
    progress(quiet, stderr, format!("Downloading {pypkg} {version}..."));
    let dist = fetch_sdist(
        &FetchRequest {
            package: &package_name,
            version: &version,
            artefacts: &artefacts,
            scratch_root: &config.scratch_dir,
            keep_scratch: config.keep_scratch,
        },
        collaborators.downloader,
        collaborators.extractor,
    )?;

    progress(quiet, stderr, format!("Reading metadata from {}...", dist.descriptor()));
    let metadata = harvest(&config.python, &dist, collaborators.executor)?;
    if metadata.version != version {
        warn!(
            "{pypkg} {version} declares version {}; binding as {version}",
            metadata.version
        );
    }

    let mut maker = PackageMaker::new(&package_name, &config.install_path);
    maker.descriptor_mut().version.clone_from(&version);
    describe(&metadata, maker.descriptor_mut())?;

    progress(
        quiet,
        stderr,
        format!("Installing into {}...", maker.version_dir()),
    );
    let installed = maker.commit(|ctx| {
        install(
            &config.python,
            dist.root(),
            ctx.root,
            collaborators.executor,
        )
    })?;

    Ok(BindOutcome {
        name: installed.name,
        version: installed.version,
        path: installed.path,
    })
}

fn progress(quiet: bool, stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if !quiet {
        write_stderr_line(stderr, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artefact::download::{DownloadError, MockArtefactDownloader};
    use crate::artefact::extraction::MockArchiveExtractor;
    use crate::index::{Artefact, ArtefactKind, MockPackageIndex};
    use crate::test_utils::{ExpectedCall, StubExecutor, sdist_tar_gz, success_output};
    use camino::Utf8Path;
    use rezbind_common::PackageError;

    struct Sandbox {
        _temp: tempfile::TempDir,
        config: BindConfig,
    }

    fn sandbox() -> Sandbox {
        let temp = tempfile::tempdir().expect("temp dir");
        let base = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        let config = BindConfig {
            scratch_dir: base.join("scratch"),
            install_path: base.join("packages"),
            ..BindConfig::default()
        };
        Sandbox {
            _temp: temp,
            config,
        }
    }

    fn index_with(versions: &[&str]) -> MockPackageIndex {
        let versions: Vec<String> = versions.iter().map(|v| (*v).to_owned()).collect();
        let mut index = MockPackageIndex::new();
        index
            .expect_list_versions()
            .returning(move |_| Ok(versions.clone()));
        index
    }

    #[test]
    fn unknown_package_is_package_not_found() {
        let sandbox = sandbox();
        let mut index = MockPackageIndex::new();
        index.expect_list_versions().returning(|_| {
            Err(IndexError::NotFound {
                url: "https://pypi.org/pypi/nope/json".to_owned(),
            })
        });
        let executor = StubExecutor::new(Vec::new());
        let collaborators = Collaborators {
            index: &index,
            downloader: &MockArtefactDownloader::new(),
            extractor: &MockArchiveExtractor::new(),
            executor: &executor,
        };

        let result = bind_with(&BindRequest::new("nope"), &sandbox.config, collaborators, &mut Vec::new());

        assert!(matches!(result, Err(BindError::PackageNotFound { package }) if package == "nope"));
    }

    #[test]
    fn harvest_failure_writes_no_package() {
        let sandbox = sandbox();
        let mut index = index_with(&["1.0"]);
        index.expect_list_artefacts().returning(|_, _| {
            Ok(vec![Artefact {
                kind: ArtefactKind::Sdist,
                filename: "my-pkg-1.0.tar.gz".to_owned(),
                url: "https://files.example/my-pkg-1.0.tar.gz".to_owned(),
            }])
        });
        let archive = sdist_tar_gz(&[("my-pkg-1.0/setup.py", "print('no setup')\n")]);
        let mut downloader = MockArtefactDownloader::new();
        downloader
            .expect_download()
            .returning(move |_, dest| std::fs::write(dest, &archive).map_err(DownloadError::Io));
        let executor = StubExecutor::new(vec![
            ExpectedCall::new("python3", success_output())
                .writing_capture(r#"{"called": false, "kwargs": {}}"#),
        ]);
        let collaborators = Collaborators {
            index: &index,
            downloader: &downloader,
            extractor: &crate::artefact::SdistExtractor,
            executor: &executor,
        };

        let result = bind_with(&BindRequest::new("my-pkg"), &sandbox.config, collaborators, &mut Vec::new());

        assert!(matches!(result, Err(BindError::Declaration(_))));
        assert!(!sandbox.config.install_path.join("my_pkg").exists());
        assert!(!sandbox.config.scratch_dir.join("my_pkg").exists());
        executor.assert_finished();
    }

    #[test]
    fn quiet_request_prints_nothing() {
        let sandbox = sandbox();
        let index = index_with(&["1.0"]);
        let executor = StubExecutor::new(Vec::new());
        let collaborators = Collaborators {
            index: &index,
            downloader: &MockArtefactDownloader::new(),
            extractor: &MockArchiveExtractor::new(),
            executor: &executor,
        };
        let request = BindRequest {
            version: Some("9.9".to_owned()),
            quiet: true,
            ..BindRequest::new("pkg")
        };
        let mut stderr = Vec::new();

        let result = bind_with(&request, &sandbox.config, collaborators, &mut stderr);

        assert!(matches!(result, Err(BindError::VersionNotFound { .. })));
        assert!(stderr.is_empty());
    }

    #[test]
    fn explicit_name_overrides_default() {
        let request = BindRequest {
            name: Some("custom".to_owned()),
            ..BindRequest::new("python-dateutil")
        };
        assert_eq!(request.package_name().expect("valid"), "custom");
        assert_eq!(
            BindRequest::new("python-dateutil")
                .package_name()
                .expect("valid"),
            "python_dateutil"
        );
    }

    #[test]
    fn traversing_name_is_rejected_before_any_work() {
        let sandbox = sandbox();
        let scratch_parent = sandbox
            .config
            .scratch_dir
            .parent()
            .expect("scratch parent")
            .to_owned();
        let victim = scratch_parent.join("precious");
        std::fs::create_dir_all(&victim).expect("mkdir");
        std::fs::write(victim.join("data.txt"), "keep").expect("write");
        let mut index = MockPackageIndex::new();
        index.expect_list_versions().never();
        let mut downloader = MockArtefactDownloader::new();
        downloader.expect_download().never();
        let executor = StubExecutor::new(Vec::new());
        let collaborators = Collaborators {
            index: &index,
            downloader: &downloader,
            extractor: &MockArchiveExtractor::new(),
            executor: &executor,
        };

        for name in ["..", "../precious", "/tmp"] {
            let request = BindRequest {
                name: Some(name.to_owned()),
                ..BindRequest::new("pkg")
            };
            let result = bind_with(&request, &sandbox.config, collaborators, &mut Vec::new());
            assert!(
                matches!(result, Err(BindError::Package(PackageError::InvalidName { .. }))),
                "{name}: {result:?}"
            );
        }

        assert!(victim.join("data.txt").is_file());
        assert!(executor.invocations().is_empty());
    }

    // Spells `target` as a path relative to the working directory.
    fn relative_to_cwd(target: &Utf8Path) -> Utf8PathBuf {
        let cwd = Utf8PathBuf::try_from(std::env::current_dir().expect("cwd")).expect("UTF-8 cwd");
        let mut relative = Utf8PathBuf::new();
        for _ in cwd.components().skip(1) {
            relative.push("..");
        }
        relative.push(target.strip_prefix("/").expect("absolute target"));
        relative
    }

    #[test]
    #[cfg(unix)]
    fn relative_paths_reach_child_processes_as_absolute() {
        let sandbox = sandbox();
        let config = BindConfig {
            scratch_dir: relative_to_cwd(&sandbox.config.scratch_dir),
            install_path: relative_to_cwd(&sandbox.config.install_path),
            ..sandbox.config.clone()
        };
        assert!(config.install_path.is_relative());
        let mut index = index_with(&["1.0"]);
        index.expect_list_artefacts().returning(|_, _| {
            Ok(vec![Artefact {
                kind: ArtefactKind::Sdist,
                filename: "relpkg-1.0.tar.gz".to_owned(),
                url: "https://files.example/relpkg-1.0.tar.gz".to_owned(),
            }])
        });
        let archive = sdist_tar_gz(&[("relpkg-1.0/setup.py", "")]);
        let mut downloader = MockArtefactDownloader::new();
        downloader
            .expect_download()
            .returning(move |_, dest| std::fs::write(dest, &archive).map_err(DownloadError::Io));
        let executor = StubExecutor::new(vec![
            ExpectedCall::new("python3", success_output())
                .writing_capture(r#"{"called": true, "kwargs": {"version": "1.0"}}"#),
            ExpectedCall::new("python3", success_output()),
        ]);
        let collaborators = Collaborators {
            index: &index,
            downloader: &downloader,
            extractor: &crate::artefact::SdistExtractor,
            executor: &executor,
        };

        let outcome = bind_with(&BindRequest::new("relpkg"), &config, collaborators, &mut Vec::new())
            .expect("bind succeeds");

        executor.assert_finished();
        assert!(outcome.path.is_absolute(), "{}", outcome.path);
        assert!(sandbox.config.install_path.join("relpkg/1.0/package.py").is_file());
        let invocations = executor.invocations();
        let harvest = &invocations[0];
        let harvest_cwd = harvest.cwd.as_ref().expect("harvest cwd");
        assert!(harvest_cwd.is_absolute(), "{harvest_cwd}");
        assert!(Utf8Path::new(&harvest.args[2]).is_absolute(), "{}", harvest.args[2]);
        let installer = &invocations[1];
        let purelib = installer
            .args
            .iter()
            .find_map(|arg| arg.strip_prefix("--install-purelib="))
            .expect("purelib option");
        assert!(Utf8Path::new(purelib).is_absolute(), "{purelib}");
        assert!(purelib.ends_with("relpkg/1.0/python"), "{purelib}");
    }
}
