//! Release artefact handling: download, extraction and source distribution
//! retrieval.

pub mod download;
pub mod extraction;
pub mod fetch;

pub use download::{ArtefactDownloader, DownloadError, HttpDownloader};
pub use extraction::{ArchiveExtractor, ArchiveFormat, ExtractionError, SdistExtractor};
pub use fetch::{BUILD_DESCRIPTOR, FetchRequest, SourceDistribution, fetch_sdist, select_sdist};
