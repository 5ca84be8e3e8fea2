//! Content checksums for produced box artifacts
//!
//! The box download format records SHA-1 digests, so that is what we compute.

use anyhow::{Context, Result};
use sha1::{Digest, Sha1};
use std::io::Read;
use std::path::Path;

/// The checksum type name recorded alongside every digest
pub const CHECKSUM_TYPE: &str = "sha1";

/// Hash a file's contents using SHA-1, returning lowercase hex
///
/// Streams through the file rather than loading it; box artifacts are
/// routinely multiple gigabytes.
pub fn sha1_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha1::new();
    let mut buffer = [0; 65536];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read file for hashing: {}", path.display()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
