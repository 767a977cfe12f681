use log::debug;

use super::{file_record, profile_path, ArtifactAggregator, ExtractionContext};
use crate::config::{parse_windows_env_vars, resolve_windir_token, RunKeyLocation};
use crate::filesystem::resolve_under;
use crate::models::{ArtifactRecord, Category, ExtractionScope};
use crate::registry::list_values;

const TASKS_SOURCE: &str = "Scheduled Tasks";

/// Run keys, startup folders and scheduled task definitions.
pub struct Persistence;

/// Executable path named by a run-key command line.
///
/// The command is cut after the first `exe` (in any case) and surrounding
/// quotes are removed, which drops any arguments. `None` when there is no
/// `exe`.
pub fn extract_executable_path(data: &str) -> Option<String> {
    // ASCII lowering keeps byte offsets valid for `data`
    let end = data.to_ascii_lowercase().find("exe")? + "exe".len();
    Some(data[..end].trim_matches('"').to_string())
}

fn run_key_records(
    ctx: &ExtractionContext<'_>,
    location: &RunKeyLocation,
    sid: &str,
) -> Vec<ArtifactRecord> {
    let (hive, path) = location.key_for(sid);
    let mut records = Vec::new();

    for value in list_values(ctx.registry, hive, &path) {
        let Some(command) = value.data.as_str() else {
            debug!("{}: value {} is not a string", location.label, value.name);
            continue;
        };
        let Some(executable) = extract_executable_path(command) else {
            debug!("{}: no executable in {:?}", location.label, command);
            continue;
        };

        let resolved = resolve_windir_token(&executable, &ctx.config.system_drive);
        match ctx.filesystem.stat(&ctx.config.host_path(&resolved)) {
            Ok(times) => records.push(
                ArtifactRecord::text(Category::Persistence, &location.label, &value.name, resolved)
                    .with_file_times(times, times.modified),
            ),
            Err(e) => debug!("{}: cannot stat {}: {}", location.label, resolved, e),
        }
    }

    records
}

impl ArtifactAggregator for Persistence {
    fn category(&self) -> Category {
        Category::Persistence
    }

    fn gather(&self, ctx: &ExtractionContext<'_>, scope: &ExtractionScope) -> Vec<ArtifactRecord> {
        let config = ctx.config;
        let mut records = Vec::new();

        for location in &config.run_key_locations {
            records.extend(run_key_records(ctx, location, &scope.user.sid));
        }

        let profile = profile_path(ctx, &scope.user.sid);
        for folder in &config.startup_folders {
            let dir = if folder.per_user {
                match &profile {
                    Some(profile) => resolve_under(profile, &parse_windows_env_vars(&folder.path)),
                    None => {
                        debug!(
                            "No profile registered for {}, skipping {}",
                            scope.user, folder.label
                        );
                        continue;
                    }
                }
            } else {
                config.system_path(&folder.path)
            };

            for entry in ctx.filesystem.list_directory(&dir) {
                records.push(file_record(
                    Category::Persistence,
                    &folder.label,
                    &dir,
                    &entry,
                    entry.times.modified,
                ));
            }
        }

        let tasks = config.tasks_path();
        for entry in ctx.filesystem.walk_tree(&tasks) {
            records.push(file_record(
                Category::Persistence,
                TASKS_SOURCE,
                &tasks,
                &entry,
                entry.times.modified,
            ));
        }

        records
    }
}
