use super::{value_record, ArtifactAggregator, ExtractionContext};
use crate::constants::{INTERFACES_KEY, INTERFACE_VALUES, LAST_WRITE_TIME};
use crate::models::{ArtifactRecord, Category, ExtractionScope};
use crate::registry::{key_last_written, list_child_keys, list_values, Hive};

/// Addressing configuration of every TCP/IP interface, grouped per adapter.
pub struct NetworkAdapters;

impl ArtifactAggregator for NetworkAdapters {
    fn category(&self) -> Category {
        Category::Network
    }

    fn gather(&self, ctx: &ExtractionContext<'_>, _scope: &ExtractionScope) -> Vec<ArtifactRecord> {
        let mut records = Vec::new();

        for adapter in list_child_keys(ctx.registry, Hive::LocalMachine, INTERFACES_KEY) {
            let path = format!("{}\\{}", INTERFACES_KEY, adapter);

            for value in list_values(ctx.registry, Hive::LocalMachine, &path) {
                if INTERFACE_VALUES
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(&value.name))
                {
                    records.push(value_record(Category::Network, &adapter, &value));
                }
            }

            if let Some(written) = key_last_written(ctx.registry, Hive::LocalMachine, &path) {
                records.push(ArtifactRecord::timed(
                    Category::Network,
                    &adapter,
                    LAST_WRITE_TIME,
                    written,
                ));
            }
        }

        records
    }
}
