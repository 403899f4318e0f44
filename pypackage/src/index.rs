//! Package index client.
//!
//! Queries the PyPI JSON API for the versions a package has published and
//! for the files attached to one release. [`PackageIndex`] is the seam the
//! bind pipeline depends on; [`HttpIndex`] is the production client.
//!
//! Responses are decoded straight from the response stream. Project
//! documents of long-lived packages run to tens of megabytes, so no body
//! size cap applies.

use log::debug;
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use std::collections::BTreeMap;
use std::io::{BufReader, Read};
use std::time::Duration;

use crate::artefact::download::build_agent;

/// The kind of file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtefactKind {
    /// A source distribution.
    Sdist,
    /// A built wheel.
    Wheel,
    /// Any other package type reported by the index.
    Other(String),
}

impl ArtefactKind {
    /// Maps the index's `packagetype` field onto a kind.
    #[must_use]
    pub fn from_package_type(package_type: &str) -> Self {
        match package_type {
            "sdist" => Self::Sdist,
            "bdist_wheel" => Self::Wheel,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// One downloadable file of a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artefact {
    /// What kind of distribution the file is.
    pub kind: ArtefactKind,
    /// File name as published.
    pub filename: String,
    /// Download location.
    pub url: String,
}

/// Errors arising from index queries.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The index has nothing published under the queried name.
    #[error("nothing published at {url}")]
    NotFound {
        /// The queried URL.
        url: String,
    },

    /// The request failed in transport or with a non-404 status.
    #[error("index request failed for {url}: {reason}")]
    Http {
        /// The queried URL.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The response body was not the expected JSON document.
    #[error("unexpected index response from {url}: {reason}")]
    Parse {
        /// The queried URL.
        url: String,
        /// Deserialisation failure.
        reason: String,
    },
}

/// Read access to a package index.
///
/// Each call issues exactly one query; nothing is cached.
#[cfg_attr(test, mockall::automock)]
pub trait PackageIndex {
    /// Lists every version published for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] when the package is unknown or has
    /// no published versions, and other variants for transport failures.
    fn list_versions(&self, name: &str) -> Result<Vec<String>, IndexError>;

    /// Lists the files published for `name` at `version`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] when the release is unknown, and other
    /// variants for transport failures.
    fn list_artefacts(&self, name: &str, version: &str) -> Result<Vec<Artefact>, IndexError>;
}

#[derive(Deserialize)]
struct ProjectDocument {
    releases: BTreeMap<String, IgnoredAny>,
}

#[derive(Deserialize)]
struct ReleaseDocument {
    urls: Vec<ReleaseFile>,
}

#[derive(Deserialize)]
struct ReleaseFile {
    packagetype: String,
    filename: String,
    url: String,
}

/// Client for the PyPI JSON API using `ureq`.
///
/// # Examples
///
/// ```
/// use rezbind_pypackage::index::HttpIndex;
///
/// let index = HttpIndex::new("https://pypi.org/pypi/", None);
/// assert_eq!(index.project_url("arrow"), "https://pypi.org/pypi/arrow/json");
/// ```
pub struct HttpIndex {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpIndex {
    /// Creates a client rooted at `base_url` with an optional global timeout.
    #[must_use]
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            agent: build_agent(timeout),
        }
    }

    /// URL of the project document listing all releases.
    #[must_use]
    pub fn project_url(&self, name: &str) -> String {
        format!("{}/{name}/json", self.base_url)
    }

    /// URL of the document describing one release.
    #[must_use]
    pub fn release_url(&self, name: &str, version: &str) -> String {
        format!("{}/{name}/{version}/json", self.base_url)
    }

    fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, IndexError> {
        debug!("querying {url}");
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        decode(url, response.into_body().into_reader())
    }
}

impl PackageIndex for HttpIndex {
    fn list_versions(&self, name: &str) -> Result<Vec<String>, IndexError> {
        let url = self.project_url(name);
        versions_of(&url, self.fetch(&url)?)
    }

    fn list_artefacts(&self, name: &str, version: &str) -> Result<Vec<Artefact>, IndexError> {
        let url = self.release_url(name, version);
        Ok(artefacts_of(self.fetch(&url)?))
    }
}

// Transport failures mid-body stay `Http`; everything else is `Parse`.
fn decode<T: DeserializeOwned>(url: &str, reader: impl Read) -> Result<T, IndexError> {
    serde_json::from_reader(BufReader::new(reader)).map_err(|e| {
        if e.is_io() {
            IndexError::Http {
                url: url.to_owned(),
                reason: e.to_string(),
            }
        } else {
            IndexError::Parse {
                url: url.to_owned(),
                reason: e.to_string(),
            }
        }
    })
}

fn versions_of(url: &str, document: ProjectDocument) -> Result<Vec<String>, IndexError> {
    if document.releases.is_empty() {
        return Err(IndexError::NotFound {
            url: url.to_owned(),
        });
    }
    Ok(document.releases.into_keys().collect())
}

fn artefacts_of(document: ReleaseDocument) -> Vec<Artefact> {
    document
        .urls
        .into_iter()
        .map(|file| Artefact {
            kind: ArtefactKind::from_package_type(&file.packagetype),
            filename: file.filename,
            url: file.url,
        })
        .collect()
}

/// Extracts published versions from a project document.
///
/// Releases without files are still listed.
///
/// # Errors
///
/// Returns [`IndexError::Parse`] for malformed JSON and
/// [`IndexError::NotFound`] when no versions are published.
pub fn parse_versions(url: &str, body: &str) -> Result<Vec<String>, IndexError> {
    versions_of(url, decode(url, body.as_bytes())?)
}

/// Extracts the files of a release document.
///
/// # Errors
///
/// Returns [`IndexError::Parse`] for malformed JSON.
pub fn parse_artefacts(url: &str, body: &str) -> Result<Vec<Artefact>, IndexError> {
    Ok(artefacts_of(decode(url, body.as_bytes())?))
}

fn map_ureq_error(url: &str, err: &ureq::Error) -> IndexError {
    match err {
        ureq::Error::StatusCode(404) => IndexError::NotFound {
            url: url.to_owned(),
        },
        other => IndexError::Http {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
