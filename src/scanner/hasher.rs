//! SHA-256 file hasher with streaming support.
//!
//! # Overview
//! [`ExactHasher`] streams a file through SHA-256 in fixed-size chunks, so
//! memory use does not depend on file size. Identical bytes always produce
//! identical digests regardless of file name.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::HashError;

/// Read buffer size used while hashing (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Streaming SHA-256 hasher for byte-identical matching.
#[derive(Debug, Clone)]
pub struct ExactHasher {
    buffer_size: usize,
}

impl Default for ExactHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ExactHasher {
    /// Create a hasher with the default 64 KiB chunk size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: CHUNK_SIZE,
        }
    }

    /// Override the chunk size. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Hash the full content of the file at `path`.
    ///
    /// Returns the lowercase hex digest (64 characters).
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn hash_file(&self, path: &Path) -> Result<String, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            hasher.update(&buffer[..read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}
