//! AppImage Doctor - repair engine for launcher-generated desktop files.
//!
//! This crate normalizes icon references and injects the `--no-sandbox`
//! launch flag in AppImage desktop entries, keeps a content-addressed SQLite
//! registry of known binaries, and reports version drift between a shortcut
//! and the binary it launches. It is a headless library: scheduling, CLI and
//! service installation live with the consumer.
//!
//! # Example
//!
//! ```rust,ignore
//! use appimage_doctor::{Fixer, FixerConfig};
//!
//! fn main() -> appimage_doctor::Result<()> {
//!     let fixer = Fixer::open(FixerConfig::default())?;
//!     let report = fixer.run();
//!     println!("fixed {} of {} files", report.files_fixed, report.files_found);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod desktop;
pub mod discover;
pub mod error;
pub mod fixer;
pub mod hashing;
pub mod refresh;
pub mod registry;
pub mod version;

// Re-export commonly used types
pub use config::{AppFixPolicy, FixerConfig};
pub use discover::{DefaultLocations, LocationResolver};
pub use error::{DoctorError, Result};
pub use fixer::{Fixer, RunReport, SyncReport};
pub use refresh::{CacheRefresher, SystemCacheRefresher};
pub use registry::{AppImageRegistry, NewRecord, RegistryRecord};
pub use version::{
    RegistryComparison, RegistryVersionStatus, VersionComparison, VersionStatus,
};
