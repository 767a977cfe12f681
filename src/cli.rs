use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};

use crate::models::Category;
use crate::output::OutputFormat;

/// Command-line arguments for the artifact extractor.
///
/// Category flags select which reports run; with none of them set the run
/// produces no records.
#[derive(Parser, Debug)]
#[clap(
    name = "win-artifacts",
    about = "Read-only extraction of Windows host artifacts"
)]
pub struct Args {
    /// Host identity: computer name and OS version details
    #[clap(long)]
    pub system: bool,

    /// Network adapter configuration
    #[clap(long)]
    pub network: bool,

    /// Execution history: BAM, Prefetch and ShimCache
    #[clap(long)]
    pub behavior: bool,

    /// Autostart locations: run keys, startup folders and scheduled tasks
    #[clap(long)]
    pub persistence: bool,

    /// Run every category
    #[clap(short, long)]
    pub all: bool,

    /// SID of the user whose hive and profile are inspected
    #[clap(long)]
    pub sid: Option<String>,

    /// Earliest timestamp to report (RFC 3339 or YYYY-MM-DD)
    #[clap(long, value_parser = parse_time_bound)]
    pub min_time: Option<DateTime<Utc>>,

    /// Latest timestamp to report (RFC 3339 or YYYY-MM-DD, inclusive)
    #[clap(long, value_parser = parse_time_upper_bound)]
    pub max_time: Option<DateTime<Utc>>,

    /// Output format
    #[clap(short, long, value_enum, default_value_t = OutputFormat::Tsv)]
    pub format: OutputFormat,

    /// Path to configuration YAML file
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands for the extractor.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a default configuration file
    InitConfig {
        /// Path to output configuration file
        #[clap(default_value = "config.yaml")]
        path: PathBuf,
    },
}

impl Args {
    /// Categories to run, in report order.
    pub fn selected_categories(&self) -> Vec<Category> {
        if self.all {
            return Category::ALL.to_vec();
        }

        [
            (self.system, Category::Identity),
            (self.network, Category::Network),
            (self.behavior, Category::Execution),
            (self.persistence, Category::Persistence),
        ]
        .into_iter()
        .filter(|(selected, _)| *selected)
        .map(|(_, category)| category)
        .collect()
    }
}

fn parse_bound(value: &str, time_of_day: NaiveTime) -> Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(time_of_day).and_utc())
        .map_err(|_| anyhow!("Invalid time '{}': expected RFC 3339 or YYYY-MM-DD", value))
}

/// Accepts a full RFC 3339 timestamp or a bare date taken as midnight UTC.
pub fn parse_time_bound(value: &str) -> Result<DateTime<Utc>> {
    parse_bound(value, NaiveTime::MIN)
}

/// Like [`parse_time_bound`], but a bare date covers the whole day.
pub fn parse_time_upper_bound(value: &str) -> Result<DateTime<Utc>> {
    let end_of_day = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
        .ok_or_else(|| anyhow!("Invalid end-of-day time"))?;
    parse_bound(value, end_of_day)
}
