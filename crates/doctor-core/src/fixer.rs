//! Orchestrator for the repair and reconciliation passes.
//!
//! A run is linear: discover desktop files, sync the registry against the
//! binaries they point at, fix each file, then refresh the system caches if
//! anything changed. No error aborts the run; every fault is logged and
//! counted, and the caller decides exit status from the aggregate report.
//!
//! Concurrent runs are not guarded against here: at-most-one-concurrent-run
//! is the external scheduler's responsibility.

use crate::config::{AppFixPolicy, FixerConfig};
use crate::desktop::{entry, rules};
use crate::discover::{self, LocationResolver};
use crate::error::Result;
use crate::hashing;
use crate::refresh::CacheRefresher;
use crate::registry::{AppImageRegistry, NewRecord};
use crate::version::{self, RegistryComparison, VersionComparison};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Counters from a registry sync pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SyncReport {
    /// Desktop files whose binary was resolved and hashed.
    pub scanned: usize,
    /// Records actually persisted.
    pub updated: usize,
    /// Orphaned records removed.
    pub cleaned: usize,
}

/// Aggregate result of a full fixer run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunReport {
    pub files_found: usize,
    pub files_fixed: usize,
    pub changes_made: bool,
    pub db_scanned: usize,
    pub db_updated: usize,
    pub db_cleaned: usize,
    pub success: bool,
}

/// Desktop-file repair and version-reconciliation engine.
pub struct Fixer<R: LocationResolver, C: CacheRefresher> {
    config: FixerConfig,
    registry: AppImageRegistry,
    locations: R,
    refresher: C,
}

impl Fixer<crate::discover::DefaultLocations, crate::refresh::SystemCacheRefresher> {
    /// Build a fixer with the default fixed-path locations and the system
    /// cache refresher.
    pub fn open(config: FixerConfig) -> Result<Self> {
        let locations = crate::discover::DefaultLocations::new(&config.home_dir);
        Self::with_collaborators(config, locations, crate::refresh::SystemCacheRefresher)
    }
}

impl<R: LocationResolver, C: CacheRefresher> Fixer<R, C> {
    /// Build a fixer with explicit collaborators, opening the registry at
    /// the configured path.
    pub fn with_collaborators(config: FixerConfig, locations: R, refresher: C) -> Result<Self> {
        let registry = AppImageRegistry::open_at(&config.registry_db_path)?;
        Ok(Self {
            config,
            registry,
            locations,
            refresher,
        })
    }

    pub fn config(&self) -> &FixerConfig {
        &self.config
    }

    pub fn registry(&self) -> &AppImageRegistry {
        &self.registry
    }

    /// Fix a single desktop file. Returns true only if a corrected version
    /// was written to disk.
    ///
    /// Protocol: extract the app name (skip with a warning if absent), derive
    /// the fix policy, bail early when nothing needs fixing, take a backup
    /// copy before any mutation, then apply the icon rule followed by the
    /// sandbox rule and write back.
    pub fn fix_desktop_file(&self, path: &Path) -> bool {
        if !path.exists() {
            return false;
        }

        let lines = entry::read_desktop_file(path);
        let Some(app_name) = entry::app_name(&lines) else {
            warn!("Could not extract app name from {}", path.display());
            return false;
        };

        let policy = AppFixPolicy::for_app(&app_name);
        if !rules::needs_fixing(&lines, &policy.icon_name, policy.needs_no_sandbox) {
            return false;
        }

        info!("Fixing {} for {}", path.display(), app_name);

        // Backup before any mutation. If the backup cannot be created the
        // original is never overwritten.
        let backup_path = self.backup_path(path);
        if let Err(e) = std::fs::copy(path, &backup_path) {
            error!("Error creating backup {}: {}", backup_path.display(), e);
            return false;
        }

        let (lines, icon_modified) = rules::fix_icon_references(&lines, &policy.icon_name);
        let (lines, sandbox_modified) = if policy.needs_no_sandbox {
            let (lines, modified) = rules::add_no_sandbox_flag(&lines);
            if modified {
                info!("Added {} flag for {}", rules::NO_SANDBOX_FLAG, app_name);
            }
            (lines, modified)
        } else {
            (lines, false)
        };

        if (icon_modified || sandbox_modified) && entry::write_desktop_file(path, &lines) {
            info!(
                "Fixed icon reference in {} to use: {}",
                path.display(),
                policy.icon_name
            );
            return true;
        }

        false
    }

    fn backup_path(&self, path: &Path) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(&self.config.backup_extension);
        PathBuf::from(name)
    }

    /// Sync the registry against the binaries the current desktop files
    /// point at: hash and probe each resolvable binary, upsert its record,
    /// then prune records for paths no longer referenced.
    pub fn sync_registry(&self) -> SyncReport {
        let desktop_files = discover::find_desktop_files(&self.locations, &self.config);

        let mut report = SyncReport::default();
        let mut live_paths: Vec<PathBuf> = Vec::new();

        for desktop_file in &desktop_files {
            let lines = entry::read_desktop_file(desktop_file);
            let Some(target) = entry::appimage_target(&lines).filter(|p| p.exists()) else {
                continue;
            };
            live_paths.push(target.clone());

            let Some(name) = entry::app_name(&lines) else {
                continue;
            };

            let checksum = match hashing::sha256_file(&target) {
                Ok(checksum) => checksum,
                Err(e) => {
                    warn!("Could not hash {}: {}", target.display(), e);
                    continue;
                }
            };
            let version = version::appimage_version(&target, &self.config);

            let record = NewRecord {
                name,
                version,
                checksum,
                file_path: target,
                desktop_file: Some(desktop_file.clone()),
                appimage_id: None,
            };
            if self.registry.upsert(&record) {
                report.updated += 1;
            }
            report.scanned += 1;
        }

        report.cleaned = self.registry.prune_orphans(&live_paths).unwrap_or_else(|e| {
            warn!("Orphan cleanup failed: {}", e);
            0
        });

        report
    }

    /// Compare a desktop file's version against a fresh probe of its binary.
    pub fn compare_versions(&self, desktop_file: &Path) -> VersionComparison {
        version::compare_versions(desktop_file, &self.config)
    }

    /// Compare using the registry as version-of-record for the binary side.
    pub fn compare_versions_with_registry(&self, desktop_file: &Path) -> RegistryComparison {
        version::compare_versions_with_registry(desktop_file, &self.registry)
    }

    /// Full pass: registry sync, per-file fixes, conditional cache refresh.
    pub fn run(&self) -> RunReport {
        info!("Starting AppImage desktop file fixer");

        let sync = self.sync_registry();
        info!(
            "Registry updated: {} records, cleaned: {} orphaned",
            sync.updated, sync.cleaned
        );

        let desktop_files = discover::find_desktop_files(&self.locations, &self.config);
        if desktop_files.is_empty() {
            info!("No AppImage desktop files found");
            return RunReport {
                db_scanned: sync.scanned,
                db_updated: sync.updated,
                db_cleaned: sync.cleaned,
                success: true,
                ..RunReport::default()
            };
        }

        info!(
            "Found {} AppImage desktop files to check",
            desktop_files.len()
        );

        let mut files_fixed = 0;
        for desktop_file in &desktop_files {
            if self.fix_desktop_file(desktop_file) {
                files_fixed += 1;
            }
        }

        let changes_made = files_fixed > 0;
        if changes_made {
            info!("Changes made, refreshing desktop database");
            self.refresher.refresh_desktop_database(&self.config.apps_dir);
            self.refresher.refresh_icon_cache(&self.config.icons_dir);
        } else {
            info!("No changes needed");
        }

        RunReport {
            files_found: desktop_files.len(),
            files_fixed,
            changes_made,
            db_scanned: sync.scanned,
            db_updated: sync.updated,
            db_cleaned: sync.cleaned,
            success: true,
        }
    }
}
