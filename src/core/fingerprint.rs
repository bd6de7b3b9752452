/*!
 * Streaming content fingerprint (MD5 digest + byte length)
 */

use crate::error::Result;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Block size used when hashing the source file
pub const HASH_BLOCK_SIZE: usize = 4096;

/// Streaming hasher that calculates the digest incrementally
pub struct StreamingHasher {
    hasher: Md5,
}

impl StreamingHasher {
    /// Create a new streaming hasher
    pub fn new() -> Self {
        Self { hasher: Md5::new() }
    }

    /// Update the hash with new data
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Finalize and return the lowercase hex digest
    pub fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl Default for StreamingHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Content hash and length of a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    /// Lowercase hex MD5 digest (32 chars)
    pub hash: String,
    /// Length in bytes, taken from file metadata
    pub size: u64,
}

impl FileFingerprint {
    /// Fingerprint a file by reading it in `HASH_BLOCK_SIZE` blocks
    pub fn compute(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let size = file.metadata()?.len();

        let mut hasher = StreamingHasher::new();
        let mut buffer = [0u8; HASH_BLOCK_SIZE];

        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(Self {
            hash: hasher.finalize_hex(),
            size,
        })
    }

    /// Fingerprint an in-memory buffer in one pass
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = StreamingHasher::new();
        hasher.update(data);
        Self {
            hash: hasher.finalize_hex(),
            size: data.len() as u64,
        }
    }
}
