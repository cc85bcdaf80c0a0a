// src/sync/fingerprint.rs

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

/// Compute the content fingerprint of a single file.
///
/// The file is streamed in fixed-size chunks, so memory use is independent
/// of file size. Identical bytes always produce the identical hex digest;
/// the dedup logic in the change detector relies on this.
pub fn fingerprint_file(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs
        .open_read(path)
        .with_context(|| format!("opening file for fingerprinting: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("reading file for fingerprinting: {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Compute the content fingerprint of an in-memory payload (upload mode).
///
/// Produces the same digest as [`fingerprint_file`] over a file with
/// identical bytes.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}
