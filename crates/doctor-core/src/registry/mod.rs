//! Content-addressed registry of known AppImage binaries.
//!
//! A single SQLite file maps each binary's SHA256 checksum to its last-known
//! metadata. The registry is the version-of-record for the binary side of
//! version reconciliation once a sync pass has run.

mod store;

pub use store::{AppImageRegistry, NewRecord, RegistryRecord};
