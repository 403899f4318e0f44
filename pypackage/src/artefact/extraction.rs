//! Source distribution unpacking.
//!
//! Extracts `.zip` and gzip-compressed tar archives with path traversal
//! protection so entries cannot escape the destination directory.

use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path};

/// Archive formats a source distribution may be published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// A zip archive (`.zip`).
    Zip,
    /// A gzip-compressed tarball (`.tar.gz` or `.tgz`).
    TarGz,
}

impl ArchiveFormat {
    const SUFFIXES: [(&'static str, Self); 3] = [
        (".tar.gz", Self::TarGz),
        (".tgz", Self::TarGz),
        (".zip", Self::Zip),
    ];

    /// Detects the format from a file name, returning it with the file stem
    /// (the name minus its compound extension).
    ///
    /// # Examples
    ///
    /// ```
    /// use rezbind_pypackage::artefact::extraction::ArchiveFormat;
    ///
    /// assert_eq!(
    ///     ArchiveFormat::detect("arrow-0.4.4.tar.gz"),
    ///     Some((ArchiveFormat::TarGz, "arrow-0.4.4"))
    /// );
    /// assert_eq!(ArchiveFormat::detect("arrow-0.4.4.tar.bz2"), None);
    /// ```
    #[must_use]
    pub fn detect(filename: &str) -> Option<(Self, &str)> {
        Self::SUFFIXES.iter().find_map(|(suffix, format)| {
            filename
                .strip_suffix(suffix)
                .filter(|stem| !stem.is_empty())
                .map(|stem| (*format, stem))
        })
    }
}

/// Trait for extracting archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the relative paths of the extracted files.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry
    /// attempts to escape the destination directory.
    /// Returns [`ExtractionError::EmptyArchive`] if no files are found.
    /// Returns [`ExtractionError::Io`] or [`ExtractionError::Zip`] on
    /// read failures.
    fn extract(
        &self,
        archive_path: &Path,
        format: ArchiveFormat,
        dest_dir: &Path,
    ) -> Result<Vec<String>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip container could not be read.
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,
}

/// Default extractor backed by the `zip`, `flate2` and `tar` crates.
///
/// Validates each entry path before extraction to guard against
/// path traversal attacks (zip-slip). Link entries are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SdistExtractor;

impl ArchiveExtractor for SdistExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        format: ArchiveFormat,
        dest_dir: &Path,
    ) -> Result<Vec<String>, ExtractionError> {
        let extracted = match format {
            ArchiveFormat::TarGz => extract_tar_gz(archive_path, dest_dir)?,
            ArchiveFormat::Zip => extract_zip(archive_path, dest_dir)?,
        };
        if extracted.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }
        Ok(extracted)
    }
}

fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<Vec<String>, ExtractionError> {
    let file = File::open(archive_path)?;
    let decoder = flate2::read::GzDecoder::new(BufReader::new(file));
    let mut archive = tar::Archive::new(decoder);
    let mut extracted = Vec::new();

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_path = entry.path()?.into_owned();
        validate_entry_path(&entry_path)?;

        let kind = entry.header().entry_type();
        let dest_path = dest_dir.join(&entry_path);
        if kind.is_dir() {
            std::fs::create_dir_all(&dest_path)?;
            continue;
        }
        if !kind.is_file() {
            log::debug!("skipping non-file entry {}", entry_path.display());
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry.unpack(&dest_path)?;
        extracted.push(entry_path.to_string_lossy().into_owned());
    }
    Ok(extracted)
}

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<Vec<String>, ExtractionError> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let entry_path = entry
            .enclosed_name()
            .ok_or_else(|| ExtractionError::PathTraversal {
                path: entry.name().to_owned(),
            })?;
        validate_entry_path(&entry_path)?;

        let dest_path = dest_dir.join(&entry_path);
        if entry.is_dir() {
            std::fs::create_dir_all(&dest_path)?;
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest_path)?;
        std::io::copy(&mut entry, &mut out)?;
        extracted.push(entry_path.to_string_lossy().into_owned());
    }
    Ok(extracted)
}

/// Validate that an entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    if path.is_absolute() {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    for component in path.components() {
        if matches!(component, Component::ParentDir) {
            return Err(ExtractionError::PathTraversal {
                path: path.display().to_string(),
            });
        }
    }
    Ok(())
}
