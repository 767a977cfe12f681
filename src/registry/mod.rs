//! Read-only access to the Windows registry.
//!
//! The registry itself is an external collaborator reached through the
//! [`RegistryProvider`] and [`RegistryKey`] traits. Two providers ship with
//! the crate:
//!
//! - [`live::LiveRegistry`] (Windows only) opens keys on the running host
//!   through `winreg`.
//! - [`memory::InMemoryRegistry`] holds a synthetic tree. It stands in for
//!   the registry on other platforms and drives the test suite.
//!
//! Callers never talk to a provider directly. The [`enumerator`] functions
//! wrap every open and enumerate call so that missing keys, access denial
//! and mid-enumeration errors all degrade to an empty result.

use std::fmt;
use std::io;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::strings::{utf16le_to_string, utf16le_to_strings};

pub mod enumerator;
pub mod memory;

#[cfg(target_os = "windows")]
pub mod live;

pub use enumerator::{key_last_written, list_child_keys, list_values, read_value, ChildKeys};
pub use memory::InMemoryRegistry;

const ERROR_FILE_NOT_FOUND: i32 = 2;
const ERROR_PATH_NOT_FOUND: i32 = 3;
const ERROR_ACCESS_DENIED: i32 = 5;
const ERROR_NO_MORE_ITEMS: i32 = 259;

/// Root keys the extractor reads from.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hive {
    LocalMachine,
    CurrentUser,
    Users,
}

impl fmt::Display for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hive::LocalMachine => write!(f, "HKLM"),
            Hive::CurrentUser => write!(f, "HKCU"),
            Hive::Users => write!(f, "HKU"),
        }
    }
}

/// Conditions a provider reports instead of a result.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("registry key or value not found")]
    NotFound,
    #[error("access to registry key denied")]
    AccessDenied,
    #[error("no more items to enumerate")]
    NoMoreItems,
    #[error("registry I/O error: {0}")]
    Io(#[source] io::Error),
}

impl StoreError {
    /// Classify an OS error returned by the registry API.
    pub fn from_io(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(ERROR_FILE_NOT_FOUND) | Some(ERROR_PATH_NOT_FOUND) => StoreError::NotFound,
            Some(ERROR_ACCESS_DENIED) => StoreError::AccessDenied,
            Some(ERROR_NO_MORE_ITEMS) => StoreError::NoMoreItems,
            _ => match err.kind() {
                io::ErrorKind::NotFound => StoreError::NotFound,
                io::ErrorKind::PermissionDenied => StoreError::AccessDenied,
                _ => StoreError::Io(err),
            },
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::from_io(err)
    }
}

/// Registry value type as reported by the store.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    None,
    String,
    ExpandString,
    MultiString,
    DWord,
    QWord,
    Binary,
    Other(u32),
}

/// Decoded value payload. Interpretation is left to the aggregators.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ValueData {
    None,
    String(String),
    ExpandString(String),
    MultiString(Vec<String>),
    DWord(u32),
    QWord(u64),
    Binary(Vec<u8>),
}

impl ValueData {
    /// Decode raw registry bytes for a given value type.
    pub fn from_raw(kind: ValueKind, bytes: &[u8]) -> Self {
        match kind {
            ValueKind::None => ValueData::None,
            ValueKind::String => ValueData::String(utf16le_to_string(bytes)),
            ValueKind::ExpandString => ValueData::ExpandString(utf16le_to_string(bytes)),
            ValueKind::MultiString => ValueData::MultiString(utf16le_to_strings(bytes)),
            ValueKind::DWord => match bytes.get(0..4).and_then(|b| b.try_into().ok()) {
                Some(raw) => ValueData::DWord(u32::from_le_bytes(raw)),
                None => ValueData::Binary(bytes.to_vec()),
            },
            ValueKind::QWord => match bytes.get(0..8).and_then(|b| b.try_into().ok()) {
                Some(raw) => ValueData::QWord(u64::from_le_bytes(raw)),
                None => ValueData::Binary(bytes.to_vec()),
            },
            ValueKind::Binary | ValueKind::Other(_) => ValueData::Binary(bytes.to_vec()),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ValueData::None => ValueKind::None,
            ValueData::String(_) => ValueKind::String,
            ValueData::ExpandString(_) => ValueKind::ExpandString,
            ValueData::MultiString(_) => ValueKind::MultiString,
            ValueData::DWord(_) => ValueKind::DWord,
            ValueData::QWord(_) => ValueKind::QWord,
            ValueData::Binary(_) => ValueKind::Binary,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ValueData::String(text) | ValueData::ExpandString(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ValueData::DWord(value) => Some(u64::from(*value)),
            ValueData::QWord(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ValueData::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Text form used when a value passes through unchanged.
    pub fn render(&self) -> String {
        match self {
            ValueData::None => String::new(),
            ValueData::String(text) | ValueData::ExpandString(text) => text.clone(),
            ValueData::MultiString(items) => items.join(", "),
            ValueData::DWord(value) => value.to_string(),
            ValueData::QWord(value) => value.to_string(),
            ValueData::Binary(bytes) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
        }
    }
}

/// A named value read from a key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RawValue {
    pub name: String,
    pub data: ValueData,
    pub kind: ValueKind,
}

impl RawValue {
    pub fn new(name: impl Into<String>, data: ValueData) -> Self {
        let kind = data.kind();
        RawValue {
            name: name.into(),
            data,
            kind,
        }
    }
}

/// Counts and last-write time of an open key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyInfo {
    pub subkeys: u32,
    pub values: u32,
    /// FILETIME of the last write to the key.
    pub last_write: u64,
}

/// An open registry key. The handle is released when the value is dropped.
pub trait RegistryKey {
    /// Name of the child key at `index`; `StoreError::NoMoreItems` past the end.
    fn subkey_name(&self, index: u32) -> Result<String, StoreError>;

    /// Value at `index`; `StoreError::NoMoreItems` past the end.
    fn value_at(&self, index: u32) -> Result<RawValue, StoreError>;

    fn info(&self) -> Result<KeyInfo, StoreError>;
}

/// Entry point into a registry: opens keys for reading.
pub trait RegistryProvider {
    fn open_key(&self, hive: Hive, path: &str) -> Result<Box<dyn RegistryKey + '_>, StoreError>;
}

/// Get the registry provider for the current platform
pub fn get_platform_registry() -> Box<dyn RegistryProvider> {
    #[cfg(target_os = "windows")]
    {
        info!("Using live Windows registry");
        Box::new(live::LiveRegistry::new())
    }
    #[cfg(not(target_os = "windows"))]
    {
        info!("No live registry on {}, using an empty in-memory registry", std::env::consts::OS);
        Box::new(InMemoryRegistry::new())
    }
}
