use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::utils::time::FILETIME_EPOCH;

/// The four report categories an aggregator can produce.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Identity,
    Network,
    Execution,
    Persistence,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Identity,
        Category::Network,
        Category::Execution,
        Category::Persistence,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Identity => write!(f, "Identity"),
            Category::Network => write!(f, "Network"),
            Category::Execution => write!(f, "Execution"),
            Category::Persistence => write!(f, "Persistence"),
        }
    }
}

/// Payload of an artifact record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum RecordValue {
    Text(String),
    Binary(Vec<u8>),
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordValue::Text(text) => write!(f, "{}", text),
            RecordValue::Binary(bytes) => {
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

/// Created/accessed/modified instants of a filesystem entry.
///
/// Any of the three may be missing when the underlying filesystem does not
/// record it (creation time on many Linux filesystems, for instance).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileTimes {
    pub created: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

/// One normalized artifact, as handed to the presentation layer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub name: String,
    pub value: RecordValue,
    pub timestamp: Option<DateTime<Utc>>,
    pub category: Category,
    /// Store location or directory the record came from (adapter GUID,
    /// run-key label, `ShimCache`, ...).
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_times: Option<FileTimes>,
}

impl ArtifactRecord {
    pub fn text(category: Category, source: &str, name: &str, value: impl Into<String>) -> Self {
        ArtifactRecord {
            name: name.to_string(),
            value: RecordValue::Text(value.into()),
            timestamp: None,
            category,
            source: source.to_string(),
            file_times: None,
        }
    }

    pub fn binary(category: Category, source: &str, name: &str, bytes: Vec<u8>) -> Self {
        ArtifactRecord {
            name: name.to_string(),
            value: RecordValue::Binary(bytes),
            timestamp: None,
            category,
            source: source.to_string(),
            file_times: None,
        }
    }

    /// Record whose payload is an instant: the value carries its RFC 3339 form.
    pub fn timed(category: Category, source: &str, name: &str, timestamp: DateTime<Utc>) -> Self {
        ArtifactRecord {
            name: name.to_string(),
            value: RecordValue::Text(timestamp.to_rfc3339()),
            timestamp: Some(timestamp),
            category,
            source: source.to_string(),
            file_times: None,
        }
    }

    pub fn with_file_times(mut self, times: FileTimes, timestamp: Option<DateTime<Utc>>) -> Self {
        self.file_times = Some(times);
        self.timestamp = timestamp;
        self
    }
}

/// One decoded ShimCache entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: String,
    pub last_modified: DateTime<Utc>,
}

/// Inclusive `[min, max]` filter applied to timestamped records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub min: DateTime<Utc>,
    pub max: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(min: DateTime<Utc>, max: DateTime<Utc>) -> Self {
        TimeWindow { min, max }
    }

    /// From the FILETIME epoch up to the moment of the call.
    pub fn up_to_now() -> Self {
        TimeWindow {
            min: *FILETIME_EPOCH,
            max: Utc::now(),
        }
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        *instant >= self.min && *instant <= self.max
    }

    /// Records without a timestamp are never excluded.
    pub fn admits(&self, record: &ArtifactRecord) -> bool {
        record.timestamp.as_ref().map_or(true, |ts| self.contains(ts))
    }

    pub fn retain(&self, records: &mut Vec<ArtifactRecord>) {
        records.retain(|record| self.admits(record));
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::up_to_now()
    }
}

/// Security identifier selecting the per-user hive and profile to inspect.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct UserIdentity {
    pub sid: String,
}

impl UserIdentity {
    pub fn new(sid: impl Into<String>) -> Self {
        UserIdentity { sid: sid.into() }
    }

    pub fn fallback(config: &ExtractionConfig) -> Self {
        Self::new(config.fallback_sid.clone())
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sid)
    }
}

/// Filters shared by every aggregator in one run.
#[derive(Debug, Clone)]
pub struct ExtractionScope {
    pub window: TimeWindow,
    pub user: UserIdentity,
}

impl ExtractionScope {
    pub fn new(window: TimeWindow, user: UserIdentity) -> Self {
        ExtractionScope { window, user }
    }

    /// Unbounded window and the configured fallback identity.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        ExtractionScope {
            window: TimeWindow::up_to_now(),
            user: UserIdentity::fallback(config),
        }
    }
}
