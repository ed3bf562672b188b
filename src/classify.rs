//! Sub-format classification by content sniffing.
//!
//! Item entries carry no reliable type tag, so a payload is recognised by
//! its leading bytes: `1F 8B` is probed as a gzip member, `BM` is parsed as
//! a bitmap.  A gzip probe that fails to decode is not an error; the payload
//! is simply reported as [`Classification::Unknown`].

use tracing::debug;

use crate::bitmap::BitmapInfo;
use crate::codec::{declared_level, gzip_decompress, is_gzip};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Bitmap(BitmapInfo),
    GzipWrapped {
        /// XFL byte of the gzip header.
        level:   u8,
        decoded: Vec<u8>,
        /// Attributes of the decoded bytes, when they are a bitmap.
        bitmap:  Option<BitmapInfo>,
    },
    Unknown,
}

impl Classification {
    pub fn bitmap(&self) -> Option<&BitmapInfo> {
        match self {
            Classification::Bitmap(info) => Some(info),
            Classification::GzipWrapped { bitmap, .. } => bitmap.as_ref(),
            Classification::Unknown => None,
        }
    }

    pub fn is_gzip(&self) -> bool {
        matches!(self, Classification::GzipWrapped { .. })
    }

    pub fn gzip_level(&self) -> Option<u8> {
        match self {
            Classification::GzipWrapped { level, .. } => Some(*level),
            _ => None,
        }
    }

    /// The asset bytes as they should be written to disk: decoded for gzip
    /// members, `raw` otherwise.
    pub fn content<'a>(&'a self, raw: &'a [u8]) -> &'a [u8] {
        match self {
            Classification::GzipWrapped { decoded, .. } => decoded,
            _ => raw,
        }
    }
}

pub fn classify(payload: &[u8]) -> Classification {
    if is_gzip(payload) {
        return match gzip_decompress(payload) {
            Ok(decoded) => {
                let level  = declared_level(payload).unwrap_or(0);
                let bitmap = BitmapInfo::parse(&decoded);
                Classification::GzipWrapped { level, decoded, bitmap }
            }
            Err(e) => {
                debug!("gzip probe failed ({e}); treating payload as unknown");
                Classification::Unknown
            }
        };
    }
    match BitmapInfo::parse(payload) {
        Some(info) => Classification::Bitmap(info),
        None       => Classification::Unknown,
    }
}
