//! Crate-level error type.
//!
//! Every container-format failure is fatal to the current pack or unpack
//! operation.  Variants carry the offset and the expected/actual values so a
//! diagnostic can be produced without re-running with tracing enabled.

use std::io;
use thiserror::Error;

use crate::codec::CodecError;
use crate::validate::ValidationError;

#[derive(Error, Debug)]
pub enum ResError {
    /// Bad magic on the header or an item entry, or a malformed chain.
    #[error("Format error at offset {offset:#x}: {message}")]
    Format { offset: u64, message: String },

    #[error("Unsupported res-img version {found} (supported: 1..={max})")]
    UnsupportedVersion { found: i32, max: i32 },

    /// A declared offset/length runs past the end of the available bytes.
    #[error("Truncated data at offset {offset:#x}: need {needed} bytes, {available} available")]
    Truncated { offset: u64, needed: u64, available: u64 },

    #[error("Invalid item name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("Too many items: the index field holds at most {max} entries")]
    TooManyItems { max: usize },

    #[error("Data segment CRC mismatch: header says {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Sidecar error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ResError {
    pub(crate) fn format(offset: u64, message: impl Into<String>) -> Self {
        ResError::Format { offset, message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, ResError>;
