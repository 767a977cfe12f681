use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use win_artifact_extractor::aggregators::{extract, ExtractionContext};
use win_artifact_extractor::cli::{Args, Commands};
use win_artifact_extractor::config::{load_or_create_config, ExtractionConfig};
use win_artifact_extractor::filesystem::LocalFileSystem;
use win_artifact_extractor::models::{ExtractionScope, TimeWindow, UserIdentity};
use win_artifact_extractor::output::{local_hostname, render_json, render_tsv, OutputFormat};
use win_artifact_extractor::privileges::warn_if_not_elevated;
use win_artifact_extractor::registry::get_platform_registry;

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    initialize_logging(args.verbose)?;

    // Handle subcommands
    if let Some(cmd) = &args.command {
        return handle_subcommand(cmd);
    }

    let categories = args.selected_categories();
    if categories.is_empty() {
        info!("No category selected, nothing to extract");
        return Ok(());
    }

    let config = load_or_create_config(args.config.as_deref())?;
    let scope = build_scope(&args, &config);
    info!(
        "Extracting for {} between {} and {}",
        scope.user,
        scope.window.min.to_rfc3339(),
        scope.window.max.to_rfc3339()
    );

    warn_if_not_elevated();

    let registry = get_platform_registry();
    let filesystem = LocalFileSystem::new();
    let ctx = ExtractionContext::new(registry.as_ref(), &filesystem, &config);

    let results = extract(&ctx, &scope, &categories);

    let rendered = match args.format {
        OutputFormat::Tsv => render_tsv(&results),
        OutputFormat::Json => render_json(&results, &scope, &local_hostname(), Utc::now())?,
    };

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .context("Failed to write results to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;

    info!("Extraction completed");
    Ok(())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

/// Handle the init-config subcommand
fn handle_subcommand(cmd: &Commands) -> Result<()> {
    match cmd {
        Commands::InitConfig { path } => {
            info!("Creating default configuration file at {}", path.display());
            ExtractionConfig::default().save_to_yaml_file(path)?;
            info!("Configuration created successfully");
            Ok(())
        }
    }
}

/// Window bounds default to the FILETIME epoch and the current time.
fn build_scope(args: &Args, config: &ExtractionConfig) -> ExtractionScope {
    let mut window = TimeWindow::up_to_now();
    if let Some(min) = args.min_time {
        window.min = min;
    }
    if let Some(max) = args.max_time {
        window.max = max;
    }

    let user = match &args.sid {
        Some(sid) => UserIdentity::new(sid.clone()),
        None => UserIdentity::fallback(config),
    };

    ExtractionScope::new(window, user)
}
