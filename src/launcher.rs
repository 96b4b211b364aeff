use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::QueryError;

#[cfg(windows)]
const LAUNCHER_FILE: &str = "ArchipelagoLauncher.exe";
#[cfg(not(windows))]
const LAUNCHER_FILE: &str = "ArchipelagoLauncher";

fn launcher_sub_path() -> PathBuf {
    Path::new("Archipelago").join(LAUNCHER_FILE)
}

/// Install locations to probe on this platform, in priority order
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if cfg!(windows) {
        if let Some(program_data) = std::env::var_os("PROGRAMDATA") {
            candidates.push(PathBuf::from(program_data).join(launcher_sub_path()));
        }
    } else if cfg!(target_os = "linux") {
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(launcher_sub_path()));
        }
        // AUR package location
        candidates.push(Path::new("/opt").join(launcher_sub_path()));
    } else {
        debug!(
            "don't know how to find Archipelago on {}, giving up",
            std::env::consts::OS
        );
    }

    candidates
}

/// First candidate that is an existing file
pub fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.is_file()).cloned()
}

/// Autodetect the launcher
pub fn find_launcher() -> Option<PathBuf> {
    let found = first_existing(&candidate_paths());
    match &found {
        Some(path) => debug!("found launcher at {}", path.display()),
        None => debug!("launcher autodetection found nothing"),
    }
    found
}

/// Pick the explicit path, then the configured one, then autodetect
pub fn resolve(
    explicit: Option<PathBuf>,
    configured: Option<PathBuf>,
) -> Result<PathBuf, QueryError> {
    explicit
        .or(configured)
        .or_else(find_launcher)
        .ok_or(QueryError::LauncherNotFound)
}
