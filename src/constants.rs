//! Registry locations, value names and defaults used by the aggregators.
//!
//! Per-user paths are relative to `HKEY_USERS\<sid>`. Directory paths are
//! relative to the configured system root.

// System identity
/// Key holding the active host name
pub const COMPUTER_NAME_KEY: &str =
    r"SYSTEM\CurrentControlSet\Control\ComputerName\ActiveComputerName";

/// Value name of the host name under [`COMPUTER_NAME_KEY`]
pub const COMPUTER_NAME_VALUE: &str = "ComputerName";

/// Key holding product and build information
pub const CURRENT_VERSION_KEY: &str = r"SOFTWARE\Microsoft\Windows NT\CurrentVersion";

/// Values reported from [`CURRENT_VERSION_KEY`]
pub const CURRENT_VERSION_VALUES: &[&str] = &[
    "ProductName",
    "ReleaseId",
    "DisplayVersion",
    "CurrentBuild",
    "BuildLab",
    "BuildLabEx",
    "CompositionEditionID",
    "RegisteredOrganization",
    "RegisteredOwner",
    "InstallTime",
];

/// The one identity value whose data is a FILETIME
pub const INSTALL_TIME_VALUE: &str = "InstallTime";

/// Per-user profile registrations, one subkey per SID
pub const PROFILE_LIST_KEY: &str = r"SOFTWARE\Microsoft\Windows NT\CurrentVersion\ProfileList";

pub const PROFILE_IMAGE_PATH_VALUE: &str = "ProfileImagePath";

// Network
/// Parent of one subkey per network adapter
pub const INTERFACES_KEY: &str = r"SYSTEM\CurrentControlSet\Services\Tcpip\Parameters\Interfaces";

/// Values reported for each adapter
pub const INTERFACE_VALUES: &[&str] = &[
    "DefaultGateway",
    "DhcpServer",
    "DhcpIPAddress",
    "DhcpNameServer",
    "DhcpSubnetMask",
    "DhcpDomain",
    "Domain",
    "IPAddress",
    "NameServer",
    "SubnetMask",
];

pub const LAST_WRITE_TIME: &str = "LastWriteTime";

// Execution history
/// Background activity moderator settings, Windows 10 1809 and later
pub const BAM_KEY: &str = r"SYSTEM\CurrentControlSet\Services\bam\State\UserSettings";

/// Background activity moderator settings before 1809
pub const BAM_LEGACY_KEY: &str = r"SYSTEM\CurrentControlSet\Services\bam\UserSettings";

pub const PREFETCH_PARAMETERS_KEY: &str =
    r"SYSTEM\CurrentControlSet\Control\Session Manager\Memory Management\PrefetchParameters";

pub const ENABLE_PREFETCHER_VALUE: &str = "EnablePrefetcher";

/// `EnablePrefetcher` value meaning application and boot prefetching are on
pub const PREFETCH_ENABLED: u64 = 3;

pub const PREFETCH_EXTENSION: &str = "pf";

pub const APP_COMPAT_CACHE_KEY: &str =
    r"SYSTEM\CurrentControlSet\Control\Session Manager\AppCompatCache";

pub const APP_COMPAT_CACHE_VALUE: &str = "AppCompatCache";

/// Relative to `HKEY_USERS\<sid>`
pub const USER_ASSIST_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Explorer\UserAssist";

/// Offset of the last-execution FILETIME in a UserAssist `Count` value
pub const USER_ASSIST_TIME_OFFSET: usize = 60;

// Defaults
/// Identity used when no SID is given on the command line or in config
pub const DEFAULT_FALLBACK_SID: &str = "S-1-5-21-881430183-2975666877-16831743-1001";

pub const DEFAULT_SYSTEM_DRIVE: &str = "C:";

pub const DEFAULT_SYSTEM_ROOT: &str = r"C:\";

pub const DEFAULT_PREFETCH_DIR: &str = r"Windows\Prefetch";

pub const DEFAULT_TASKS_DIR: &str = r"Windows\System32\Tasks";

pub const DEFAULT_ALL_USERS_STARTUP: &str =
    r"ProgramData\Microsoft\Windows\Start Menu\Programs\StartUp";

/// Relative to the user's profile directory
pub const DEFAULT_USER_STARTUP: &str =
    r"AppData\Roaming\Microsoft\Windows\Start Menu\Programs\Startup";
