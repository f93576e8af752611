//! Staging cleanup.

use std::fs;
use std::io;
use std::path::Path;

/// Recursively remove `path` if it exists.
///
/// Returns `Ok(true)` when something was removed and `Ok(false)` when the
/// path was already absent.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Delete the staging directory after a successful apply.
///
/// Failure is only logged: the next run resets staging before extracting.
/// Returns whether the directory is gone.
pub fn cleanup_staging(staging_dir: &Path) -> bool {
    match remove_dir_if_exists(staging_dir) {
        Ok(removed) => {
            if removed {
                tracing::debug!("Removed staging directory {}", staging_dir.display());
            }
            true
        }
        Err(e) => {
            tracing::warn!(
                "Could not remove staging directory {}: {}",
                staging_dir.display(),
                e
            );
            false
        }
    }
}
