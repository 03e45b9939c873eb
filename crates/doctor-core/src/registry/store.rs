//! SQLite-backed store for AppImage metadata records.

use crate::error::{DoctorError, Result};
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Busy timeout for the registry connection.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// A persisted AppImage record, keyed by content checksum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub id: i64,
    pub name: String,
    pub version: Option<String>,
    /// SHA256 of the binary's full byte content.
    pub checksum: String,
    /// Unique: at most one live record per binary path.
    pub file_path: PathBuf,
    pub desktop_file: Option<PathBuf>,
    pub appimage_id: Option<String>,
    pub last_scan: String,
    pub created_at: String,
}

/// Data for an upsert; id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub name: String,
    pub version: Option<String>,
    pub checksum: String,
    pub file_path: PathBuf,
    pub desktop_file: Option<PathBuf>,
    pub appimage_id: Option<String>,
}

/// SQLite-backed registry for AppImage binaries.
///
/// Single-writer by design; concurrent process invocations are assumed to be
/// prevented by the external scheduler. `Arc<Mutex<Connection>>` covers
/// thread safety within a process.
pub struct AppImageRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl AppImageRegistry {
    /// Open the registry at a specific path.
    ///
    /// Creates the database and parent directories if they don't exist.
    /// Schema initialization is idempotent and safe on every process start.
    pub fn open_at(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| DoctorError::Io {
                    message: format!("Failed to create registry directory: {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        Self::configure_connection(&conn)?;
        Self::ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;\n\
             PRAGMA busy_timeout={BUSY_TIMEOUT_MS};\n\
             PRAGMA synchronous=NORMAL;",
        ))?;
        Ok(())
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS appimage_registry (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                version TEXT,
                checksum TEXT NOT NULL,
                file_path TEXT UNIQUE NOT NULL,
                desktop_file TEXT,
                appimage_id TEXT,
                last_scan TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DoctorError::Database {
            message: "Failed to acquire registry connection lock".to_string(),
            source: None,
        })
    }

    /// Insert or update a record, replacing by unique `file_path`.
    ///
    /// A hash change for the same path replaces the record rather than
    /// appending; `created_at` survives the replacement. Never errors
    /// outward: any storage fault is logged and reported as `false`, and the
    /// caller retries on the next sync cycle.
    pub fn upsert(&self, record: &NewRecord) -> bool {
        match self.try_upsert(record) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Registry upsert failed for {}: {}",
                    record.file_path.display(),
                    e
                );
                false
            }
        }
    }

    fn try_upsert(&self, record: &NewRecord) -> Result<()> {
        let conn = self.lock_conn()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO appimage_registry
                 (name, version, checksum, file_path, desktop_file, appimage_id, last_scan, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(file_path) DO UPDATE SET
                 name = ?1,
                 version = ?2,
                 checksum = ?3,
                 desktop_file = ?5,
                 appimage_id = ?6,
                 last_scan = ?7",
            params![
                record.name,
                record.version,
                record.checksum,
                record.file_path.to_string_lossy().to_string(),
                record.desktop_file.as_ref().map(|p| p.to_string_lossy().to_string()),
                record.appimage_id,
                now,
            ],
        )?;

        debug!(
            "Upserted registry record for {}",
            record.file_path.display()
        );
        Ok(())
    }

    /// Find a record by content checksum.
    pub fn find_by_checksum(&self, checksum: &str) -> Result<Option<RegistryRecord>> {
        let conn = self.lock_conn()?;
        let result = conn
            .query_row(
                "SELECT id, name, version, checksum, file_path, desktop_file,
                        appimage_id, last_scan, created_at
                 FROM appimage_registry WHERE checksum = ?1 LIMIT 1",
                params![checksum],
                Self::row_to_record,
            )
            .optional()?;
        Ok(result)
    }

    /// List all records, ordered by name for stable display.
    pub fn list_all(&self) -> Result<Vec<RegistryRecord>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, version, checksum, file_path, desktop_file,
                    appimage_id, last_scan, created_at
             FROM appimage_registry ORDER BY name",
        )?;

        let rows = stmt.query_map([], Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Delete every record whose `file_path` is not in `live_paths`.
    ///
    /// An empty `live_paths` set is a no-op: a transient empty discovery pass
    /// must never wipe the whole registry.
    pub fn prune_orphans(&self, live_paths: &[PathBuf]) -> Result<usize> {
        if live_paths.is_empty() {
            return Ok(0);
        }

        let conn = self.lock_conn()?;
        let placeholders = vec!["?"; live_paths.len()].join(",");
        let sql = format!("DELETE FROM appimage_registry WHERE file_path NOT IN ({placeholders})");

        let removed = conn.execute(
            &sql,
            params_from_iter(live_paths.iter().map(|p| p.to_string_lossy().to_string())),
        )?;

        if removed > 0 {
            debug!("Pruned {} orphaned registry records", removed);
        }
        Ok(removed)
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RegistryRecord> {
        Ok(RegistryRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            version: row.get(2)?,
            checksum: row.get(3)?,
            file_path: PathBuf::from(row.get::<_, String>(4)?),
            desktop_file: row.get::<_, Option<String>>(5)?.map(PathBuf::from),
            appimage_id: row.get(6)?,
            last_scan: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}
