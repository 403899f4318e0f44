//! Python package index binder for rez.
//!
//! This crate turns a release published on a Python package index into a
//! rez package. It is used by the `rez-bind-pypackage` CLI binary and can be
//! consumed programmatically for testing or custom bind workflows.
//!
//! # Modules
//!
//! - [`artefact`] - Source distribution download, extraction and scratch trees
//! - [`assemble`] - Mapping of declared metadata onto a package descriptor
//! - [`bind`] - The end-to-end bind operation
//! - [`cli`] - Command-line argument definitions
//! - [`error`] - Semantic error types for every bind stage
//! - [`executor`] - Subprocess execution abstraction
//! - [`harvest`] - Build descriptor metadata capture
//! - [`index`] - Package index client
//! - [`installer`] - Installer invocation into a package root
//! - [`output`] - User-facing stderr output
//! - [`requirement`] - Requirement to rez range translation
//! - [`selection`] - Version selection among published releases

pub mod artefact;
pub mod assemble;
pub mod bind;
pub mod cli;
pub mod error;
pub mod executor;
pub mod harvest;
pub mod index;
pub mod installer;
pub mod output;
pub mod requirement;
pub mod selection;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
