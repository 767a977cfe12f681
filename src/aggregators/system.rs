use chrono::{DateTime, Utc};
use log::warn;

use super::{value_record, ArtifactAggregator, ExtractionContext};
use crate::constants::{
    COMPUTER_NAME_KEY, COMPUTER_NAME_VALUE, CURRENT_VERSION_KEY, CURRENT_VERSION_VALUES,
    INSTALL_TIME_VALUE,
};
use crate::models::{ArtifactRecord, Category, ExtractionScope};
use crate::registry::{list_values, read_value, Hive, ValueData};
use crate::utils::time::{filetime_at, filetime_to_utc};

/// Host name, product, build and install time.
pub struct SystemIdentity;

fn install_time(data: &ValueData) -> Option<DateTime<Utc>> {
    match data {
        ValueData::QWord(filetime) => Some(filetime_to_utc(*filetime)),
        ValueData::Binary(bytes) => filetime_at(bytes, 0),
        _ => None,
    }
}

impl ArtifactAggregator for SystemIdentity {
    fn category(&self) -> Category {
        Category::Identity
    }

    fn gather(&self, ctx: &ExtractionContext<'_>, _scope: &ExtractionScope) -> Vec<ArtifactRecord> {
        let mut records = Vec::new();

        let computer_name = read_value(
            ctx.registry,
            Hive::LocalMachine,
            COMPUTER_NAME_KEY,
            COMPUTER_NAME_VALUE,
        );
        if let Some(value) = computer_name {
            records.push(value_record(Category::Identity, "ComputerName", &value));
        }

        for value in list_values(ctx.registry, Hive::LocalMachine, CURRENT_VERSION_KEY) {
            if !CURRENT_VERSION_VALUES
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(&value.name))
            {
                continue;
            }

            if value.name.eq_ignore_ascii_case(INSTALL_TIME_VALUE) {
                match install_time(&value.data) {
                    Some(installed) => records.push(ArtifactRecord::timed(
                        Category::Identity,
                        "CurrentVersion",
                        &value.name,
                        installed,
                    )),
                    None => warn!("Unexpected {:?} data for InstallTime, skipping", value.kind),
                }
                continue;
            }

            records.push(value_record(Category::Identity, "CurrentVersion", &value));
        }

        records
    }
}
