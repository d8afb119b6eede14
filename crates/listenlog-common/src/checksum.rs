//! Content fingerprints for export files
//!
//! A file's identity is the SHA-256 of its bytes, never its path. Files are
//! streamed in fixed-size chunks so memory use does not grow with file size.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Read buffer size used while hashing (1 MiB)
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Compute the fingerprint of any readable source
pub fn compute_checksum<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the fingerprint of a file on disk
pub fn compute_file_checksum(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path.as_ref())?;
    compute_checksum(&mut file)
}

/// Compute the fingerprint of an in-memory buffer
pub fn compute_bytes_checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
