//! # win-artifact-extractor
//!
//! Read-only extraction of host-forensic artifacts from a live Windows
//! system: machine identity, network adapter configuration, execution
//! history and persistence locations.
//!
//! ## Overview
//!
//! Artifacts are read through two narrow provider traits, one over the
//! registry ([`registry::RegistryProvider`]) and one over the filesystem
//! ([`filesystem::FileSystemProvider`]). Four aggregators turn those reads
//! into [`models::ArtifactRecord`]s, and every aggregator applies the same
//! inclusive time window before handing records back. Missing keys, denied
//! access and malformed cache blobs never abort a run; they produce fewer
//! records.
//!
//! ## Usage
//!
//! ```no_run
//! use win_artifact_extractor::aggregators::{extract, ExtractionContext};
//! use win_artifact_extractor::config::ExtractionConfig;
//! use win_artifact_extractor::filesystem::LocalFileSystem;
//! use win_artifact_extractor::models::{Category, ExtractionScope};
//! use win_artifact_extractor::registry::get_platform_registry;
//!
//! let config = ExtractionConfig::default();
//! let registry = get_platform_registry();
//! let filesystem = LocalFileSystem::new();
//! let ctx = ExtractionContext::new(registry.as_ref(), &filesystem, &config);
//!
//! let scope = ExtractionScope::from_config(&config);
//! for (category, records) in extract(&ctx, &scope, &[Category::Identity]) {
//!     println!("{}: {} records", category, records.len());
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`models`]: records, categories, time window and user identity
//! - [`utils`]: FILETIME conversion, ROT13 and UTF-16 decoding
//! - [`registry`]: registry provider trait, live and in-memory stores, enumeration
//! - [`filesystem`]: filesystem provider trait and the local implementation
//! - [`shimcache`]: AppCompatCache blob decoder
//! - [`aggregators`]: the four category reports
//! - [`config`]: YAML configuration and environment token expansion
//! - [`output`]: TSV and JSON rendering
//!
//! ## Safety
//!
//! The only `unsafe` code is the elevation check in [`privileges`].

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Core data models and structures used throughout the application
pub mod models;

/// Time and string normalization helpers
pub mod utils;

/// Registry access and enumeration
pub mod registry;

/// Filesystem listing and walking
pub mod filesystem;

/// AppCompatCache decoding
pub mod shimcache;

/// Category report builders
pub mod aggregators;

/// Configuration management
pub mod config;

/// Result rendering
pub mod output;

/// Elevation check
pub mod privileges;

/// Registry locations and default values
pub mod constants;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
