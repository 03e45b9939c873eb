//! Streaming content hashing for AppImage binaries.
//!
//! The registry is keyed by the SHA256 of the full binary, not by path: a
//! binary may move or be replaced in place and the hash stays its identity.

use crate::error::{DoctorError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Chunk size for reading files.
const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the SHA256 of a file's full byte content as lowercase hex.
pub fn sha256_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DoctorError::FileNotFound(path.to_path_buf()),
        _ => DoctorError::io_with_path(e, path),
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| DoctorError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
