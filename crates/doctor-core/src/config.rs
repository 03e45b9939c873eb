//! Centralized configuration for AppImage Doctor.
//!
//! All paths and timeouts live in an explicit [`FixerConfig`] value that is
//! passed into the orchestrator at construction, so tests can override every
//! location instead of fighting module-level constants.

use std::path::PathBuf;
use std::time::Duration;

/// Immutable configuration for a fixer run.
#[derive(Debug, Clone)]
pub struct FixerConfig {
    /// User's home directory.
    pub home_dir: PathBuf,
    /// Directory holding launcher-generated `.desktop` files.
    pub apps_dir: PathBuf,
    /// Hicolor icon theme directory refreshed after fixes.
    pub icons_dir: PathBuf,
    /// Location of the SQLite registry file.
    pub registry_db_path: PathBuf,
    /// Suffix appended to a desktop file before it is mutated.
    pub backup_extension: String,
    /// Timeout for version-probing external tools.
    pub probe_timeout: Duration,
    /// Timeout for cheap probes (`file`).
    pub quick_probe_timeout: Duration,
    /// Interval the external scheduler is expected to run at. Informational
    /// only; the library never sleeps on it.
    pub scan_interval: Duration,
}

impl FixerConfig {
    pub const BACKUP_EXTENSION: &'static str = ".bak";
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
    pub const QUICK_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
    pub const SCAN_INTERVAL: Duration = Duration::from_secs(30);

    /// Build a configuration rooted at the given home directory.
    pub fn with_home(home_dir: impl Into<PathBuf>) -> Self {
        let home_dir = home_dir.into();
        Self {
            apps_dir: home_dir.join(".local/share/applications"),
            icons_dir: home_dir.join(".local/share/icons/hicolor"),
            registry_db_path: home_dir.join(".local/share/appimage-doctor/registry.db"),
            backup_extension: Self::BACKUP_EXTENSION.to_string(),
            probe_timeout: Self::PROBE_TIMEOUT,
            quick_probe_timeout: Self::QUICK_PROBE_TIMEOUT,
            scan_interval: Self::SCAN_INTERVAL,
            home_dir,
        }
    }
}

impl Default for FixerConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        Self::with_home(home)
    }
}

/// Per-application fix policy derived from the entry's display name.
///
/// `needs_no_sandbox` is unconditionally true today; the struct exists so a
/// per-application policy can be substituted later without touching the
/// rules engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppFixPolicy {
    /// Target icon name: lowercase first word of the application name.
    pub icon_name: String,
    /// Whether the launch command must carry `--no-sandbox`.
    pub needs_no_sandbox: bool,
}

impl AppFixPolicy {
    /// Derive the policy for an application name.
    pub fn for_app(app_name: &str) -> Self {
        let icon_name = app_name
            .split_whitespace()
            .next()
            .map(str::to_lowercase)
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            icon_name,
            needs_no_sandbox: true,
        }
    }
}
