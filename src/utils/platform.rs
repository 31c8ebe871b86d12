//! Platform-specific helpers.

use anyhow::Result;
use std::path::PathBuf;

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Gets the home directory path for the current user.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined, which usually
/// means `HOME` (Unix) or `USERPROFILE` (Windows) is not set.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Expands a leading `~` or `~/` to the current user's home directory.
///
/// Any other input, including `~user/...`, is returned unchanged.
///
/// # Errors
///
/// Returns an error only when the path starts with `~` and the home directory
/// cannot be determined.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    if path == "~" {
        return get_home_dir();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return Ok(get_home_dir()?.join(rest));
    }
    Ok(PathBuf::from(path))
}
