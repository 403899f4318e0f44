//! Source distribution retrieval.
//!
//! Chooses the sdist among a release's files, downloads it into a fresh
//! per-package scratch tree, unpacks it and checks that the build descriptor
//! sits where a source distribution keeps it.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use rezbind_common::validate_name;

use super::download::ArtefactDownloader;
use super::extraction::{ArchiveExtractor, ArchiveFormat};
use crate::error::{BindError, Result};
use crate::index::{Artefact, ArtefactKind};

/// File name of the build descriptor inside a source distribution.
pub const BUILD_DESCRIPTOR: &str = "setup.py";

/// Where to fetch a release from and where to unpack it.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// Package name; also names the scratch subdirectory.
    pub package: &'a str,
    /// Release version, for diagnostics.
    pub version: &'a str,
    /// Files the index lists for the release.
    pub artefacts: &'a [Artefact],
    /// Parent of the per-package scratch tree.
    pub scratch_root: &'a Utf8Path,
    /// Leave the scratch tree on disk when the distribution is dropped.
    pub keep_scratch: bool,
}

/// An unpacked source distribution.
///
/// Dropping the value removes its scratch tree unless the fetch asked to
/// keep it.
#[derive(Debug)]
pub struct SourceDistribution {
    root: Utf8PathBuf,
    descriptor: Utf8PathBuf,
    _scratch: ScratchDir,
}

impl SourceDistribution {
    /// The distribution's top-level directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Path of the build descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &Utf8Path {
        &self.descriptor
    }
}

#[derive(Debug)]
struct ScratchDir {
    path: Utf8PathBuf,
    keep: bool,
}

impl ScratchDir {
    fn fresh(path: Utf8PathBuf, keep: bool) -> Result<Self> {
        if path.exists() {
            std::fs::remove_dir_all(&path).map_err(|e| BindError::io(path.clone(), e))?;
        }
        std::fs::create_dir_all(&path).map_err(|e| BindError::io(path.clone(), e))?;
        Ok(Self { path, keep })
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.keep {
            debug!("keeping scratch tree {}", self.path);
            return;
        }
        if let Err(err) = std::fs::remove_dir_all(&self.path) {
            warn!("failed to remove scratch tree {}: {err}", self.path);
        }
    }
}

/// Returns the first source distribution among `artefacts`.
///
/// # Errors
///
/// Returns [`BindError::UnsupportedArtefact`] when the release has no sdist.
pub fn select_sdist<'a>(
    package: &str,
    version: &str,
    artefacts: &'a [Artefact],
) -> Result<&'a Artefact> {
    artefacts
        .iter()
        .find(|artefact| artefact.kind == ArtefactKind::Sdist)
        .ok_or_else(|| BindError::UnsupportedArtefact {
            package: package.to_owned(),
            version: version.to_owned(),
            reason: "no source distribution published; wheel-only releases unsupported".to_owned(),
        })
}

/// Downloads and unpacks the release's source distribution.
///
/// The archive format is determined from the file name before anything is
/// downloaded.
///
/// # Errors
///
/// Returns [`BindError::Package`] when the package name could escape the
/// scratch root, [`BindError::UnsupportedArtefact`] when there is no sdist
/// or its format is unknown, [`BindError::MalformedDistribution`] when the
/// unpacked tree lacks a build descriptor, and download, extraction or I/O
/// errors from the individual steps.
pub fn fetch_sdist(
    request: &FetchRequest<'_>,
    downloader: &dyn ArtefactDownloader,
    extractor: &dyn ArchiveExtractor,
) -> Result<SourceDistribution> {
    validate_name(request.package)?;
    let sdist = select_sdist(request.package, request.version, request.artefacts)?;
    let unsupported = |reason: String| BindError::UnsupportedArtefact {
        package: request.package.to_owned(),
        version: request.version.to_owned(),
        reason,
    };
    let (format, stem) = ArchiveFormat::detect(&sdist.filename)
        .ok_or_else(|| unsupported(format!("unsupported archive format: {}", sdist.filename)))?;
    if Utf8Path::new(&sdist.filename).file_name() != Some(sdist.filename.as_str()) {
        return Err(unsupported(format!("invalid file name: {}", sdist.filename)));
    }

    let scratch = ScratchDir::fresh(
        request.scratch_root.join(request.package),
        request.keep_scratch,
    )?;
    let archive_path = scratch.path.join(&sdist.filename);
    downloader.download(&sdist.url, archive_path.as_std_path())?;

    let extracted = extractor.extract(
        archive_path.as_std_path(),
        format,
        scratch.path.as_std_path(),
    )?;
    debug!("unpacked {} entries from {}", extracted.len(), sdist.filename);

    let root = scratch.path.join(stem);
    let descriptor = root.join(BUILD_DESCRIPTOR);
    if !descriptor.is_file() {
        return Err(BindError::MalformedDistribution {
            path: root,
            reason: format!("expected {BUILD_DESCRIPTOR} under the top-level directory {stem}"),
        });
    }

    Ok(SourceDistribution {
        root,
        descriptor,
        _scratch: scratch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artefact::download::{DownloadError, MockArtefactDownloader};
    use crate::artefact::extraction::{MockArchiveExtractor, SdistExtractor};
    use crate::test_utils::sdist_tar_gz;
    use mockall::predicate::eq;
    use rstest::{fixture, rstest};

    struct Scratch {
        _temp: tempfile::TempDir,
        root: Utf8PathBuf,
    }

    #[fixture]
    fn scratch() -> Scratch {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        Scratch { _temp: temp, root }
    }

    fn artefact(kind: ArtefactKind, filename: &str) -> Artefact {
        Artefact {
            kind,
            filename: filename.to_owned(),
            url: format!("https://files.example/{filename}"),
        }
    }

    fn request<'a>(artefacts: &'a [Artefact], scratch: &'a Scratch, keep: bool) -> FetchRequest<'a> {
        FetchRequest {
            package: "examplepkg",
            version: "1.1",
            artefacts,
            scratch_root: &scratch.root,
            keep_scratch: keep,
        }
    }

    fn serving(bytes: Vec<u8>) -> MockArtefactDownloader {
        let mut downloader = MockArtefactDownloader::new();
        downloader
            .expect_download()
            .with(eq("https://files.example/examplepkg-1.1.tar.gz"), mockall::predicate::always())
            .times(1)
            .returning(move |_, dest| std::fs::write(dest, &bytes).map_err(DownloadError::Io));
        downloader
    }

    #[test]
    fn wheel_only_release_is_unsupported() {
        let artefacts = [artefact(ArtefactKind::Wheel, "examplepkg-1.1-py3-none-any.whl")];
        let err = select_sdist("examplepkg", "1.1", &artefacts).expect_err("no sdist");
        assert!(err.to_string().contains("wheel-only releases unsupported"));
    }

    #[test]
    fn first_sdist_is_selected() {
        let artefacts = [
            artefact(ArtefactKind::Wheel, "a.whl"),
            artefact(ArtefactKind::Sdist, "first.tar.gz"),
            artefact(ArtefactKind::Sdist, "second.zip"),
        ];
        let chosen = select_sdist("examplepkg", "1.1", &artefacts).expect("sdist");
        assert_eq!(chosen.filename, "first.tar.gz");
    }

    #[rstest]
    fn unknown_format_is_rejected_before_download(scratch: Scratch) {
        let artefacts = [artefact(ArtefactKind::Sdist, "examplepkg-1.1.tar.bz2")];
        let mut downloader = MockArtefactDownloader::new();
        downloader.expect_download().never();
        let mut extractor = MockArchiveExtractor::new();
        extractor.expect_extract().never();

        let result = fetch_sdist(&request(&artefacts, &scratch, false), &downloader, &extractor);

        assert!(matches!(result, Err(BindError::UnsupportedArtefact { .. })));
        assert!(!scratch.root.join("examplepkg").exists());
    }

    #[rstest]
    fn unpacks_and_locates_descriptor(scratch: Scratch) {
        let artefacts = [artefact(ArtefactKind::Sdist, "examplepkg-1.1.tar.gz")];
        let downloader = serving(sdist_tar_gz(&[(
            "examplepkg-1.1/setup.py",
            "from setuptools import setup\nsetup(version='1.1')\n",
        )]));

        let dist = fetch_sdist(&request(&artefacts, &scratch, false), &downloader, &SdistExtractor)
            .expect("fetch");

        assert_eq!(dist.root(), scratch.root.join("examplepkg").join("examplepkg-1.1"));
        assert!(dist.descriptor().is_file());
        drop(dist);
        assert!(!scratch.root.join("examplepkg").exists());
    }

    #[rstest]
    fn keep_scratch_leaves_tree_behind(scratch: Scratch) {
        let artefacts = [artefact(ArtefactKind::Sdist, "examplepkg-1.1.tar.gz")];
        let downloader = serving(sdist_tar_gz(&[("examplepkg-1.1/setup.py", "")]));

        let dist = fetch_sdist(&request(&artefacts, &scratch, true), &downloader, &SdistExtractor)
            .expect("fetch");
        drop(dist);

        assert!(scratch.root.join("examplepkg/examplepkg-1.1/setup.py").is_file());
    }

    #[rstest]
    fn stale_scratch_tree_is_replaced(scratch: Scratch) {
        let stale = scratch.root.join("examplepkg").join("stale.txt");
        std::fs::create_dir_all(stale.parent().expect("parent")).expect("mkdir");
        std::fs::write(&stale, "old").expect("write");
        let artefacts = [artefact(ArtefactKind::Sdist, "examplepkg-1.1.tar.gz")];
        let downloader = serving(sdist_tar_gz(&[("examplepkg-1.1/setup.py", "")]));

        let _dist = fetch_sdist(&request(&artefacts, &scratch, true), &downloader, &SdistExtractor)
            .expect("fetch");

        assert!(!stale.exists());
    }

    #[rstest]
    fn missing_descriptor_is_malformed(scratch: Scratch) {
        let artefacts = [artefact(ArtefactKind::Sdist, "examplepkg-1.1.tar.gz")];
        let downloader = serving(sdist_tar_gz(&[("other-name/setup.py", "")]));

        let result = fetch_sdist(&request(&artefacts, &scratch, false), &downloader, &SdistExtractor);

        assert!(matches!(result, Err(BindError::MalformedDistribution { .. })));
        assert!(!scratch.root.join("examplepkg").exists());
    }

    #[rstest]
    #[case::parent_traversal("../precious")]
    #[case::parent("..")]
    #[case::absolute("/precious")]
    fn escaping_package_name_leaves_siblings_alone(scratch: Scratch, #[case] package: &str) {
        let scratch_root = scratch.root.join("scratch");
        let victim = scratch.root.join("precious");
        std::fs::create_dir_all(&scratch_root).expect("mkdir");
        std::fs::create_dir_all(&victim).expect("mkdir");
        std::fs::write(victim.join("data.txt"), "keep").expect("write");
        let artefacts = [artefact(ArtefactKind::Sdist, "examplepkg-1.1.tar.gz")];
        let mut downloader = MockArtefactDownloader::new();
        downloader.expect_download().never();
        let request = FetchRequest {
            package,
            scratch_root: &scratch_root,
            ..request(&artefacts, &scratch, false)
        };

        let result = fetch_sdist(&request, &downloader, &SdistExtractor);

        assert!(matches!(
            result,
            Err(BindError::Package(rezbind_common::PackageError::InvalidName { .. }))
        ));
        assert!(victim.join("data.txt").is_file());
        assert!(scratch_root.is_dir());
    }
}
