//! End-to-end extraction scenarios.
//!
//! The registry side runs against `InMemoryRegistry`; the filesystem side
//! runs against real temporary directories laid out like a Windows volume.

use std::fs;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use win_artifact_extractor::aggregators::{extract, ExtractionContext};
use win_artifact_extractor::config::ExtractionConfig;
use win_artifact_extractor::constants::{
    APP_COMPAT_CACHE_KEY, APP_COMPAT_CACHE_VALUE, BAM_KEY, COMPUTER_NAME_KEY, COMPUTER_NAME_VALUE,
    CURRENT_VERSION_KEY, ENABLE_PREFETCHER_VALUE, INSTALL_TIME_VALUE, PREFETCH_PARAMETERS_KEY,
    PROFILE_IMAGE_PATH_VALUE, PROFILE_LIST_KEY,
};
use win_artifact_extractor::filesystem::LocalFileSystem;
use win_artifact_extractor::models::{
    ArtifactRecord, Category, ExtractionScope, RecordValue, TimeWindow, UserIdentity,
};
use win_artifact_extractor::output::render_tsv;
use win_artifact_extractor::registry::{Hive, InMemoryRegistry, ValueData};

const SID: &str = "S-1-5-21-3623811015-3361044348-30300820-1013";
const HKLM_RUN: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Run";

/// 2021-06-01T00:00:00Z as a FILETIME
const JUNE_2021: u64 = 132_669_792_000_000_000;

fn june_2021() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap()
}

fn config_rooted_at(root: &Path) -> ExtractionConfig {
    ExtractionConfig {
        system_root: root.to_string_lossy().into_owned(),
        fallback_sid: SID.to_string(),
        ..ExtractionConfig::default()
    }
}

fn run(
    registry: &InMemoryRegistry,
    config: &ExtractionConfig,
    scope: &ExtractionScope,
    category: Category,
) -> Vec<ArtifactRecord> {
    let filesystem = LocalFileSystem::new();
    let ctx = ExtractionContext::new(registry, &filesystem, config);
    let mut results = extract(&ctx, scope, &[category]);
    assert_eq!(results.len(), 1);
    results.remove(0).1
}

fn touch(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, b"artifact")?;
    Ok(())
}

fn utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()
}

/// Windows 10 style AppCompatCache blob: 0x34-byte header, then one
/// `10ts` record per path.
fn shimcache_blob(paths: &[(&str, u64)]) -> Vec<u8> {
    let mut blob = vec![0u8; 0x34];
    blob[0..4].copy_from_slice(&0x34u32.to_le_bytes());

    for (path, filetime) in paths {
        let encoded = utf16(path);
        let mut entry = Vec::new();
        entry.extend_from_slice(&(encoded.len() as u16).to_le_bytes());
        entry.extend_from_slice(&encoded);
        entry.extend_from_slice(&filetime.to_le_bytes());
        entry.extend_from_slice(&0u32.to_le_bytes());

        blob.extend_from_slice(b"10ts");
        blob.extend_from_slice(&0x1234_5678u32.to_le_bytes());
        blob.extend_from_slice(&(entry.len() as u32).to_le_bytes());
        blob.extend_from_slice(&entry);
    }
    blob
}

#[test]
fn test_system_identity_end_to_end() -> Result<()> {
    let mut registry = InMemoryRegistry::new();
    registry
        .set_value(
            Hive::LocalMachine,
            COMPUTER_NAME_KEY,
            COMPUTER_NAME_VALUE,
            ValueData::String("WKSTN-07".into()),
        )
        .set_value(
            Hive::LocalMachine,
            CURRENT_VERSION_KEY,
            "ProductName",
            ValueData::String("Windows 10 Pro".into()),
        )
        .set_value(
            Hive::LocalMachine,
            CURRENT_VERSION_KEY,
            INSTALL_TIME_VALUE,
            ValueData::QWord(JUNE_2021),
        )
        .set_value(
            Hive::LocalMachine,
            CURRENT_VERSION_KEY,
            "DigitalProductId",
            ValueData::Binary(vec![0xa4, 0x00, 0x00, 0x00]),
        );

    let root = TempDir::new()?;
    let config = config_rooted_at(root.path());
    let records = run(
        &registry,
        &config,
        &ExtractionScope::from_config(&config),
        Category::Identity,
    );

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["ComputerName", "ProductName", "InstallTime"]);
    assert_eq!(records[0].value, RecordValue::Text("WKSTN-07".into()));
    assert_eq!(records[1].value, RecordValue::Text("Windows 10 Pro".into()));
    assert_eq!(records[2].timestamp, Some(june_2021()));

    let tsv = render_tsv(&[(Category::Identity, records)]);
    assert!(tsv.contains("Identity\tCurrentVersion\tProductName\tWindows 10 Pro\t\n"));
    Ok(())
}

#[test]
fn test_time_window_is_inclusive_and_drops_outside_records() -> Result<()> {
    let mut registry = InMemoryRegistry::new();
    registry.set_value(
        Hive::LocalMachine,
        CURRENT_VERSION_KEY,
        INSTALL_TIME_VALUE,
        ValueData::QWord(JUNE_2021),
    );

    let root = TempDir::new()?;
    let config = config_rooted_at(root.path());
    let user = UserIdentity::new(SID);

    let exact = ExtractionScope::new(TimeWindow::new(june_2021(), june_2021()), user.clone());
    assert_eq!(run(&registry, &config, &exact, Category::Identity).len(), 1);

    let later = ExtractionScope::new(
        TimeWindow::new(june_2021() + Duration::seconds(1), Utc::now()),
        user,
    );
    assert!(run(&registry, &config, &later, Category::Identity).is_empty());
    Ok(())
}

#[test]
fn test_missing_keys_and_directories_yield_no_records() -> Result<()> {
    let registry = InMemoryRegistry::new();
    let root = TempDir::new()?;
    let config = config_rooted_at(&root.path().join("does-not-exist"));
    let scope = ExtractionScope::from_config(&config);

    let filesystem = LocalFileSystem::new();
    let ctx = ExtractionContext::new(&registry, &filesystem, &config);
    let results = extract(&ctx, &scope, &Category::ALL);

    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|(_, records)| records.is_empty()));
    Ok(())
}

#[test]
fn test_denied_key_is_treated_as_absent() -> Result<()> {
    let mut registry = InMemoryRegistry::new();
    registry
        .set_value(
            Hive::LocalMachine,
            CURRENT_VERSION_KEY,
            "ProductName",
            ValueData::String("Windows 10 Pro".into()),
        )
        .deny_access(Hive::LocalMachine, CURRENT_VERSION_KEY);

    let root = TempDir::new()?;
    let config = config_rooted_at(root.path());
    let records = run(
        &registry,
        &config,
        &ExtractionScope::from_config(&config),
        Category::Identity,
    );
    assert!(records.is_empty());
    Ok(())
}

#[test]
fn test_execution_history() -> Result<()> {
    let root = TempDir::new()?;
    touch(&root.path().join("Windows").join("Prefetch").join("CMD.EXE-4A81B364.pf"))?;
    touch(&root.path().join("Windows").join("Prefetch").join("Layout.ini"))?;

    let mut bam_value = JUNE_2021.to_le_bytes().to_vec();
    bam_value.extend_from_slice(&[0u8; 16]);

    let mut registry = InMemoryRegistry::new();
    registry
        .set_value(
            Hive::LocalMachine,
            &format!(r"{}\{}", BAM_KEY, SID),
            r"\Device\HarddiskVolume3\Windows\System32\cmd.exe",
            ValueData::Binary(bam_value),
        )
        .set_value(
            Hive::LocalMachine,
            &format!(r"{}\{}", BAM_KEY, SID),
            "Version",
            ValueData::DWord(1),
        )
        .set_value(
            Hive::LocalMachine,
            PREFETCH_PARAMETERS_KEY,
            ENABLE_PREFETCHER_VALUE,
            ValueData::DWord(3),
        )
        .set_value(
            Hive::LocalMachine,
            APP_COMPAT_CACHE_KEY,
            APP_COMPAT_CACHE_VALUE,
            ValueData::Binary(shimcache_blob(&[
                (r"C:\Windows\System32\calc.exe", JUNE_2021),
                (r"C:\Tools\psexec.exe", JUNE_2021 + 10_000_000),
            ])),
        );

    let config = config_rooted_at(root.path());
    let scope = ExtractionScope::from_config(&config);
    let records = run(&registry, &config, &scope, Category::Execution);

    let rows: Vec<(&str, &str)> = records
        .iter()
        .map(|r| (r.source.as_str(), r.name.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("BAM", r"\Device\HarddiskVolume3\Windows\System32\cmd.exe"),
            ("Prefetch", "CMD.EXE-4A81B364.pf"),
            ("ShimCache", r"C:\Windows\System32\calc.exe"),
            ("ShimCache", r"C:\Tools\psexec.exe"),
        ]
    );
    assert_eq!(records[0].timestamp, Some(june_2021()));
    assert!(records[1].file_times.is_some());
    assert_eq!(records[3].timestamp, Some(june_2021() + Duration::seconds(1)));
    Ok(())
}

#[test]
fn test_malformed_shimcache_is_skipped() -> Result<()> {
    let mut blob = shimcache_blob(&[(r"C:\Windows\System32\calc.exe", JUNE_2021)]);
    let signature_at = 0x34;
    blob[signature_at..signature_at + 4].copy_from_slice(b"00ts");

    let mut registry = InMemoryRegistry::new();
    registry
        .set_value(
            Hive::LocalMachine,
            APP_COMPAT_CACHE_KEY,
            APP_COMPAT_CACHE_VALUE,
            ValueData::Binary(blob),
        )
        .set_value(
            Hive::LocalMachine,
            &format!(r"{}\{}", BAM_KEY, SID),
            r"\Device\HarddiskVolume3\Windows\explorer.exe",
            ValueData::Binary(JUNE_2021.to_le_bytes().to_vec()),
        );

    let root = TempDir::new()?;
    let config = config_rooted_at(root.path());
    let records = run(
        &registry,
        &config,
        &ExtractionScope::from_config(&config),
        Category::Execution,
    );

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, "BAM");
    Ok(())
}

#[test]
fn test_persistence_locations() -> Result<()> {
    let root = TempDir::new()?;
    let agent = root.path().join("Tools").join("agent.exe");
    touch(&agent)?;
    touch(
        &root
            .path()
            .join("ProgramData/Microsoft/Windows/Start Menu/Programs/StartUp/updater.lnk"),
    )?;
    let profile = root.path().join("Users").join("alice");
    touch(
        &profile.join("AppData/Roaming/Microsoft/Windows/Start Menu/Programs/Startup/run.bat"),
    )?;
    touch(&root.path().join("Windows/System32/Tasks/Microsoft/Windows/Defrag/ScheduledDefrag"))?;

    let mut registry = InMemoryRegistry::new();
    registry
        .set_value(
            Hive::LocalMachine,
            HKLM_RUN,
            "Agent",
            ValueData::String(format!("\"{}\" --silent", agent.display())),
        )
        .set_value(
            Hive::LocalMachine,
            HKLM_RUN,
            "Missing",
            ValueData::String(r"C:\nowhere\missing.exe".into()),
        )
        .set_value(
            Hive::LocalMachine,
            &format!(r"{}\{}", PROFILE_LIST_KEY, SID),
            PROFILE_IMAGE_PATH_VALUE,
            ValueData::ExpandString(profile.to_string_lossy().into_owned()),
        );

    let config = config_rooted_at(root.path());
    let scope = ExtractionScope::from_config(&config);
    let records = run(&registry, &config, &scope, Category::Persistence);

    let sources: Vec<&str> = records.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(
        sources,
        vec!["HKLM Run", "All Users Startup", "User Startup", "Scheduled Tasks"]
    );
    assert_eq!(records[0].name, "Agent");
    assert_eq!(records[0].value, RecordValue::Text(agent.to_string_lossy().into_owned()));
    assert_eq!(records[1].name, "updater.lnk");
    assert_eq!(records[2].name, "run.bat");
    assert!(records[3].name.ends_with("ScheduledDefrag"));
    assert!(records.iter().all(|r| r.file_times.is_some()));
    Ok(())
}

#[test]
fn test_window_before_files_existed_drops_persistence_entries() -> Result<()> {
    let root = TempDir::new()?;
    touch(&root.path().join("Windows/System32/Tasks/Updater"))?;

    let registry = InMemoryRegistry::new();
    let config = config_rooted_at(root.path());
    let scope = ExtractionScope::new(
        TimeWindow::new(june_2021() - Duration::days(365), june_2021()),
        UserIdentity::new(SID),
    );

    assert!(run(&registry, &config, &scope, Category::Persistence).is_empty());
    Ok(())
}
