//! CRC-32 (zlib polynomial) over the data segment.

use crc32fast::Hasher;

use crate::error::{ResError, Result};

pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Compare `expected` against the CRC-32 of `data`.
pub fn verify(expected: u32, data: &[u8]) -> Result<()> {
    let actual = crc32(data);
    if actual != expected {
        return Err(ResError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}
