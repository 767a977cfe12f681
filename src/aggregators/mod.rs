//! Report builders that turn registry and filesystem reads into artifact records.
//!
//! Each aggregator produces one [`Category`]. [`ArtifactAggregator::collect`]
//! applies the scope's time window to whatever [`ArtifactAggregator::gather`]
//! emitted, so every aggregator filters the same way regardless of where
//! its records came from.

mod behavior;
mod network;
mod persistence;
mod system;

use std::path::PathBuf;

use log::{debug, info};

use crate::config::{expand_env_tokens, ExtractionConfig};
use crate::constants::{PROFILE_IMAGE_PATH_VALUE, PROFILE_LIST_KEY};
use crate::filesystem::{FileEntry, FileSystemProvider};
use crate::models::{ArtifactRecord, Category, ExtractionScope};
use crate::registry::{read_value, Hive, RawValue, RegistryProvider, ValueData};

pub use behavior::UserBehavior;
pub use network::NetworkAdapters;
pub use persistence::{extract_executable_path, Persistence};
pub use system::SystemIdentity;

/// The stores an extraction run reads from.
#[derive(Clone, Copy)]
pub struct ExtractionContext<'a> {
    pub registry: &'a dyn RegistryProvider,
    pub filesystem: &'a dyn FileSystemProvider,
    pub config: &'a ExtractionConfig,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(
        registry: &'a dyn RegistryProvider,
        filesystem: &'a dyn FileSystemProvider,
        config: &'a ExtractionConfig,
    ) -> Self {
        ExtractionContext {
            registry,
            filesystem,
            config,
        }
    }
}

/// Builds the records of one category.
pub trait ArtifactAggregator {
    fn category(&self) -> Category;

    /// Every record the stores yield, before time filtering.
    fn gather(&self, ctx: &ExtractionContext<'_>, scope: &ExtractionScope) -> Vec<ArtifactRecord>;

    /// Gather, then drop records whose timestamp falls outside the window.
    fn collect(&self, ctx: &ExtractionContext<'_>, scope: &ExtractionScope) -> Vec<ArtifactRecord> {
        let mut records = self.gather(ctx, scope);
        let gathered = records.len();
        scope.window.retain(&mut records);
        debug!(
            "{}: kept {} of {} records inside the time window",
            self.category(),
            records.len(),
            gathered
        );
        records
    }
}

pub fn aggregator_for(category: Category) -> Box<dyn ArtifactAggregator> {
    match category {
        Category::Identity => Box::new(SystemIdentity),
        Category::Network => Box::new(NetworkAdapters),
        Category::Execution => Box::new(UserBehavior),
        Category::Persistence => Box::new(Persistence),
    }
}

/// Run the aggregators for the selected categories, in selection order.
///
/// Repeated categories run once. An empty selection produces no output.
pub fn extract(
    ctx: &ExtractionContext<'_>,
    scope: &ExtractionScope,
    categories: &[Category],
) -> Vec<(Category, Vec<ArtifactRecord>)> {
    let mut seen = Vec::new();
    let mut results = Vec::new();

    for &category in categories {
        if seen.contains(&category) {
            continue;
        }
        seen.push(category);

        info!("Extracting {} artifacts for {}", category, scope.user);
        let records = aggregator_for(category).collect(ctx, scope);
        info!("{}: {} records", category, records.len());
        results.push((category, records));
    }

    results
}

/// Profile directory of `sid`, from its ProfileList registration.
pub(crate) fn profile_path(ctx: &ExtractionContext<'_>, sid: &str) -> Option<PathBuf> {
    let key = format!("{}\\{}", PROFILE_LIST_KEY, sid);
    let value = read_value(ctx.registry, Hive::LocalMachine, &key, PROFILE_IMAGE_PATH_VALUE)?;
    let raw = value.data.as_str()?;

    let drive = ctx.config.system_drive.trim_end_matches('\\');
    let expanded = expand_env_tokens(raw, |name| {
        if name.eq_ignore_ascii_case("SystemDrive") {
            Some(drive.to_string())
        } else if name.eq_ignore_ascii_case("SystemRoot") || name.eq_ignore_ascii_case("windir") {
            Some(format!("{}\\Windows", drive))
        } else {
            None
        }
    });
    Some(ctx.config.host_path(&expanded))
}

/// Record for a value passed through unchanged. Binary data keeps its bytes.
pub(crate) fn value_record(category: Category, source: &str, value: &RawValue) -> ArtifactRecord {
    match &value.data {
        ValueData::Binary(bytes) => {
            ArtifactRecord::binary(category, source, &value.name, bytes.clone())
        }
        other => ArtifactRecord::text(category, source, &value.name, other.render()),
    }
}

/// Record for a file found in a startup, prefetch or tasks directory.
pub(crate) fn file_record(
    category: Category,
    source: &str,
    dir: &std::path::Path,
    entry: &FileEntry,
    timestamp: Option<chrono::DateTime<chrono::Utc>>,
) -> ArtifactRecord {
    let full_path = dir.join(&entry.path);
    ArtifactRecord::text(
        category,
        source,
        &entry.display_name(),
        full_path.to_string_lossy(),
    )
    .with_file_times(entry.times, timestamp)
}
