//! Shared configuration for rez package binders.
//!
//! Binders convert externally distributed software into rez packages. This
//! crate holds the settings they share; see [`BindConfig`].

pub mod config;

pub use config::{BindConfig, CONFIG_ENV, ConfigError, DEFAULT_INDEX_URL};
