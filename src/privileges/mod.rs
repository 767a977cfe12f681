//! Elevation check. Extraction never requires it, but protected keys and
//! directories come back empty without it.

use log::{info, warn};

/// Check if the process is running with elevated privileges
#[cfg(target_os = "windows")]
pub fn is_elevated() -> bool {
    use winapi::um::shellapi::IsUserAnAdmin;
    unsafe { IsUserAnAdmin() != 0 }
}

#[cfg(unix)]
pub fn is_elevated() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(any(target_os = "windows", unix)))]
pub fn is_elevated() -> bool {
    false
}

/// Get instructions for elevating privileges on the current platform
pub fn get_elevation_instructions() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "Run as Administrator by right-clicking the executable and selecting 'Run as administrator'"
    }
    #[cfg(not(target_os = "windows"))]
    {
        "Run with sudo: 'sudo ./win-artifacts'"
    }
}

/// Logs the elevation state; a missing elevation is a warning only.
pub fn warn_if_not_elevated() -> bool {
    let elevated = is_elevated();
    if elevated {
        info!("Running with elevated privileges");
    } else {
        warn!("Not running elevated, protected keys and directories will be reported empty");
        warn!("{}", get_elevation_instructions());
    }
    elevated
}
