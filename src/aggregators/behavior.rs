use log::{debug, warn};

use super::{file_record, ArtifactAggregator, ExtractionContext};
use crate::constants::{
    APP_COMPAT_CACHE_KEY, APP_COMPAT_CACHE_VALUE, BAM_KEY, BAM_LEGACY_KEY, ENABLE_PREFETCHER_VALUE,
    PREFETCH_ENABLED, PREFETCH_EXTENSION, PREFETCH_PARAMETERS_KEY, USER_ASSIST_KEY,
    USER_ASSIST_TIME_OFFSET,
};
use crate::models::{ArtifactRecord, Category, ExtractionScope, UserIdentity};
use crate::registry::{list_child_keys, list_values, read_value, Hive, RegistryProvider};
use crate::shimcache;
use crate::utils::time::{filetime_at, rot13_decode, FILETIME_EPOCH};

/// Execution history: BAM, UserAssist (opt-in), prefetch files and the
/// AppCompatCache.
pub struct UserBehavior;

impl ArtifactAggregator for UserBehavior {
    fn category(&self) -> Category {
        Category::Execution
    }

    fn gather(&self, ctx: &ExtractionContext<'_>, scope: &ExtractionScope) -> Vec<ArtifactRecord> {
        let mut records = bam_records(ctx.registry, &scope.user);
        if ctx.config.include_user_assist {
            records.extend(user_assist_records(ctx.registry, &scope.user));
        }
        records.extend(prefetch_records(ctx));
        records.extend(shimcache_records(ctx.registry));
        records
    }
}

/// One record per executable the background activity moderator tracked for
/// the user. The first 8 bytes of each value are the last execution time.
fn bam_records(registry: &dyn RegistryProvider, user: &UserIdentity) -> Vec<ArtifactRecord> {
    let primary = format!("{}\\{}", BAM_KEY, user.sid);
    let mut values = list_values(registry, Hive::LocalMachine, &primary);
    if values.is_empty() {
        let legacy = format!("{}\\{}", BAM_LEGACY_KEY, user.sid);
        values = list_values(registry, Hive::LocalMachine, &legacy);
    }

    values
        .into_iter()
        .filter_map(|value| {
            // Version and SequenceNumber are DWORDs
            let bytes = value.data.as_bytes()?;
            match filetime_at(bytes, 0) {
                Some(executed) => Some(ArtifactRecord::timed(
                    Category::Execution,
                    "BAM",
                    &value.name,
                    executed,
                )),
                None => {
                    debug!("BAM value {} is too short for a timestamp", value.name);
                    None
                }
            }
        })
        .collect()
}

fn user_assist_records(
    registry: &dyn RegistryProvider,
    user: &UserIdentity,
) -> Vec<ArtifactRecord> {
    let base = format!("{}\\{}", user.sid, USER_ASSIST_KEY);
    let mut records = Vec::new();

    for guid in list_child_keys(registry, Hive::Users, &base) {
        let source = format!("UserAssist\\{}", guid);
        let count_key = format!("{}\\{}\\Count", base, guid);

        for value in list_values(registry, Hive::Users, &count_key) {
            let Some(bytes) = value.data.as_bytes() else {
                continue;
            };
            match filetime_at(bytes, USER_ASSIST_TIME_OFFSET) {
                // never executed through the shell
                Some(executed) if executed == *FILETIME_EPOCH => {}
                Some(executed) => records.push(ArtifactRecord::timed(
                    Category::Execution,
                    &source,
                    &rot13_decode(&value.name),
                    executed,
                )),
                None => debug!("UserAssist value {} has no execution time", value.name),
            }
        }
    }

    records
}

fn prefetch_records(ctx: &ExtractionContext<'_>) -> Vec<ArtifactRecord> {
    let enabled = read_value(
        ctx.registry,
        Hive::LocalMachine,
        PREFETCH_PARAMETERS_KEY,
        ENABLE_PREFETCHER_VALUE,
    )
    .and_then(|value| value.data.as_u64());
    if enabled != Some(PREFETCH_ENABLED) {
        debug!("Prefetching not fully enabled ({:?}), skipping prefetch directory", enabled);
        return Vec::new();
    }

    let dir = ctx.config.prefetch_path();
    ctx.filesystem
        .list_directory(&dir)
        .filter(|entry| {
            !entry.is_dir
                && entry
                    .path
                    .extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case(PREFETCH_EXTENSION))
        })
        .map(|entry| {
            file_record(
                Category::Execution,
                "Prefetch",
                &dir,
                &entry,
                entry.times.accessed,
            )
        })
        .collect()
}

fn shimcache_records(registry: &dyn RegistryProvider) -> Vec<ArtifactRecord> {
    let Some(value) = read_value(
        registry,
        Hive::LocalMachine,
        APP_COMPAT_CACHE_KEY,
        APP_COMPAT_CACHE_VALUE,
    ) else {
        debug!("No AppCompatCache value present");
        return Vec::new();
    };
    let Some(blob) = value.data.as_bytes() else {
        warn!("AppCompatCache holds {:?} data instead of binary, skipping", value.kind);
        return Vec::new();
    };

    match shimcache::decode_blob(blob) {
        Ok(entries) => entries
            .into_iter()
            .map(|entry| {
                ArtifactRecord::timed(
                    Category::Execution,
                    "ShimCache",
                    &entry.path,
                    entry.last_modified,
                )
            })
            .collect(),
        Err(e) => {
            warn!("Skipping malformed AppCompatCache value: {}", e);
            Vec::new()
        }
    }
}
