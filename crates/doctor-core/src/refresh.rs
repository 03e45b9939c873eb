//! System cache refresh collaborators.
//!
//! After a fix pass changed anything, the desktop database and icon cache
//! need a refresh so launchers pick up the rewritten entries. Both commands
//! are opaque external processes: they may be absent or fail, and that is
//! never fatal to the run.

use std::path::Path;
use std::process::Command;
use tracing::{debug, error, info, warn};

/// Refreshes the desktop's application and icon caches.
pub trait CacheRefresher {
    /// Run `update-desktop-database` against the applications directory.
    fn refresh_desktop_database(&self, apps_dir: &Path) -> bool;
    /// Run `gtk-update-icon-cache` against the icon theme directory.
    fn refresh_icon_cache(&self, icons_dir: &Path) -> bool;
}

/// Production refresher shelling out to the standard desktop tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCacheRefresher;

impl CacheRefresher for SystemCacheRefresher {
    fn refresh_desktop_database(&self, apps_dir: &Path) -> bool {
        run_refresh_command("update-desktop-database", apps_dir)
    }

    fn refresh_icon_cache(&self, icons_dir: &Path) -> bool {
        if !icons_dir.exists() {
            debug!("Icons directory {} absent, skipping", icons_dir.display());
            return false;
        }
        run_refresh_command("gtk-update-icon-cache", icons_dir)
    }
}

fn run_refresh_command(program: &str, dir: &Path) -> bool {
    match Command::new(program).arg(dir).output() {
        Ok(output) if output.status.success() => {
            info!("{} refreshed {}", program, dir.display());
            true
        }
        Ok(output) => {
            warn!(
                "{} warning: {}",
                program,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            false
        }
        Err(e) => {
            error!("Error running {}: {}", program, e);
            false
        }
    }
}
