//! Utility functions shared by the extractors.
//!
//! ## Components
//!
//! - **Time**: FILETIME conversion and ROT13 decoding of obfuscated names
//! - **Strings**: UTF-16LE decoding for registry and cache payloads
//!
//! ## Example
//!
//! ```
//! use win_artifact_extractor::utils::time::{filetime_to_utc, rot13_decode};
//!
//! let installed = filetime_to_utc(132_669_792_000_000_000);
//! assert_eq!(installed.to_rfc3339(), "2021-06-01T00:00:00+00:00");
//! assert_eq!(rot13_decode("pzq.rkr"), "cmd.exe");
//! ```

/// FILETIME and text normalization
pub mod time;

/// UTF-16LE decoding helpers
pub mod strings;
