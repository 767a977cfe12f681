use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::env_vars::parse_windows_env_vars;
use crate::constants::{
    DEFAULT_ALL_USERS_STARTUP, DEFAULT_FALLBACK_SID, DEFAULT_PREFETCH_DIR, DEFAULT_SYSTEM_DRIVE,
    DEFAULT_SYSTEM_ROOT, DEFAULT_TASKS_DIR, DEFAULT_USER_STARTUP,
};
use crate::filesystem::resolve_under;
use crate::registry::Hive;

/// A registry key whose values the OS launches at logon or boot.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RunKeyLocation {
    pub hive: Hive,
    /// Relative to `HKEY_USERS\<sid>` when `per_user` is set.
    pub path: String,
    pub label: String,
    #[serde(default)]
    pub per_user: bool,
}

impl RunKeyLocation {
    fn machine(path: &str, label: &str) -> Self {
        RunKeyLocation {
            hive: Hive::LocalMachine,
            path: path.to_string(),
            label: label.to_string(),
            per_user: false,
        }
    }

    fn user(path: &str, label: &str) -> Self {
        RunKeyLocation {
            hive: Hive::Users,
            path: path.to_string(),
            label: label.to_string(),
            per_user: true,
        }
    }

    /// Hive and full key path for the given user.
    pub fn key_for(&self, sid: &str) -> (Hive, String) {
        if self.per_user {
            (Hive::Users, format!("{}\\{}", sid, self.path))
        } else {
            (self.hive, self.path.clone())
        }
    }
}

/// A directory whose entries the shell launches at logon.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StartupFolder {
    /// Relative to the user's profile when `per_user` is set, otherwise to
    /// the system root. `%VAR%` tokens are expanded.
    pub path: String,
    pub label: String,
    #[serde(default)]
    pub per_user: bool,
}

/// Settings for one extraction run.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExtractionConfig {
    pub version: String,
    pub description: String,
    /// Drive the analysed system was installed on. Substituted for
    /// `%windir%` in registry data, and re-rooted under `system_root` when
    /// registry paths are opened.
    #[serde(default = "default_system_drive")]
    pub system_drive: String,
    /// Filesystem root that relative directories and `system_drive` paths
    /// are joined to.
    #[serde(default = "default_system_root")]
    pub system_root: String,
    #[serde(default = "default_fallback_sid")]
    pub fallback_sid: String,
    #[serde(default)]
    pub include_user_assist: bool,
    #[serde(default = "default_run_keys")]
    pub run_key_locations: Vec<RunKeyLocation>,
    #[serde(default = "default_startup_folders")]
    pub startup_folders: Vec<StartupFolder>,
    #[serde(default = "default_tasks_dir")]
    pub scheduled_tasks_dir: String,
    #[serde(default = "default_prefetch_dir")]
    pub prefetch_dir: String,
}

fn default_system_drive() -> String {
    DEFAULT_SYSTEM_DRIVE.to_string()
}

fn default_system_root() -> String {
    DEFAULT_SYSTEM_ROOT.to_string()
}

fn default_fallback_sid() -> String {
    DEFAULT_FALLBACK_SID.to_string()
}

fn default_tasks_dir() -> String {
    DEFAULT_TASKS_DIR.to_string()
}

fn default_prefetch_dir() -> String {
    DEFAULT_PREFETCH_DIR.to_string()
}

fn default_run_keys() -> Vec<RunKeyLocation> {
    vec![
        RunKeyLocation::machine(r"SOFTWARE\Microsoft\Windows\CurrentVersion\Run", "HKLM Run"),
        RunKeyLocation::machine(
            r"SOFTWARE\Microsoft\Windows\CurrentVersion\RunOnce",
            "HKLM RunOnce",
        ),
        RunKeyLocation::machine(
            r"SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Run",
            "HKLM WOW6432Node Run",
        ),
        RunKeyLocation::user(r"Software\Microsoft\Windows\CurrentVersion\Run", "User Run"),
        RunKeyLocation::user(r"Software\Microsoft\Windows\CurrentVersion\RunOnce", "User RunOnce"),
    ]
}

fn default_startup_folders() -> Vec<StartupFolder> {
    vec![
        StartupFolder {
            path: DEFAULT_ALL_USERS_STARTUP.to_string(),
            label: "All Users Startup".to_string(),
            per_user: false,
        },
        StartupFolder {
            path: DEFAULT_USER_STARTUP.to_string(),
            label: "User Startup".to_string(),
            per_user: true,
        },
    ]
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            version: "1.0".to_string(),
            description: "Default Windows host artifact extraction".to_string(),
            system_drive: default_system_drive(),
            system_root: default_system_root(),
            fallback_sid: default_fallback_sid(),
            include_user_assist: false,
            run_key_locations: default_run_keys(),
            startup_folders: default_startup_folders(),
            scheduled_tasks_dir: default_tasks_dir(),
            prefetch_dir: default_prefetch_dir(),
        }
    }
}

impl ExtractionConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: ExtractionConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML config")?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    pub fn system_root_path(&self) -> PathBuf {
        PathBuf::from(parse_windows_env_vars(&self.system_root))
    }

    /// Join a configured relative directory to the system root.
    pub fn system_path(&self, relative: &str) -> PathBuf {
        resolve_under(&self.system_root_path(), &parse_windows_env_vars(relative))
    }

    /// Host location of a path read from registry data.
    ///
    /// Paths on `system_drive` are re-rooted under `system_root`, so they
    /// land on the same volume as the configured directories. Paths on any
    /// other drive are used as they are.
    pub fn host_path(&self, windows_path: &str) -> PathBuf {
        let drive = self.system_drive.trim_end_matches(|c: char| c == '\\' || c == '/');
        if let Some(prefix) = windows_path.get(..drive.len()) {
            let rest = &windows_path[drive.len()..];
            if !drive.is_empty()
                && prefix.eq_ignore_ascii_case(drive)
                && (rest.is_empty() || rest.starts_with(|c: char| c == '\\' || c == '/'))
            {
                return resolve_under(&self.system_root_path(), rest);
            }
        }
        PathBuf::from(windows_path)
    }

    pub fn prefetch_path(&self) -> PathBuf {
        self.system_path(&self.prefetch_dir)
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.system_path(&self.scheduled_tasks_dir)
    }
}

/// Load a configuration file or create a default one.
///
/// * An existing `config_path` is read and parsed.
/// * A `config_path` that does not exist receives the default configuration.
/// * No path means built-in defaults.
pub fn load_or_create_config(config_path: Option<&Path>) -> Result<ExtractionConfig> {
    match config_path {
        Some(path) if path.exists() => ExtractionConfig::from_yaml_file(path),
        Some(path) => {
            info!("Creating default config at {}", path.display());
            let default_config = ExtractionConfig::default();
            default_config.save_to_yaml_file(path)?;
            Ok(default_config)
        }
        None => {
            info!("No config path provided, using default configuration");
            Ok(ExtractionConfig::default())
        }
    }
}
