//! Repack validation: a replacement bitmap must keep the structural
//! attributes recorded when the image was unpacked.
//!
//! Width, height, bit depth and color masks are compared.  File size and
//! compression mode are volatile and ignored.

use std::fmt;

use thiserror::Error;

use crate::bitmap::{BitmapInfo, ColorMasks};

/// Attributes recorded for an asset, as read from the sidecar.  A `None`
/// field was absent from the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedAttributes {
    pub width:       Option<u32>,
    pub height:      Option<u32>,
    pub bit_depth:   Option<u16>,
    pub color_masks: Option<ColorMasks>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMismatch {
    pub field:    &'static str,
    pub expected: String,
    pub actual:   String,
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, found {}", self.field, self.expected, self.actual)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{asset} is not a BMP file; replacements must be bitmaps")]
    NotBitmap { asset: String },
    #[error("{asset} does not match the recorded attributes ({})", join(.mismatches))]
    Mismatch { asset: String, mismatches: Vec<FieldMismatch> },
}

fn join(items: &[FieldMismatch]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

fn show<T: fmt::Display>(v: Option<T>) -> String {
    v.map_or_else(|| "none".to_owned(), |v| v.to_string())
}

fn show_masks(m: Option<ColorMasks>) -> String {
    match m {
        Some(m) => format!("r={:#x} g={:#x} b={:#x}", m.red, m.green, m.blue),
        None    => "none".to_owned(),
    }
}

/// Every field that differs between `candidate` and `recorded`.
pub fn diff(candidate: &BitmapInfo, recorded: &RecordedAttributes) -> Vec<FieldMismatch> {
    let mut out = Vec::new();
    if recorded.width != Some(candidate.width) {
        out.push(FieldMismatch {
            field:    "width",
            expected: show(recorded.width),
            actual:   candidate.width.to_string(),
        });
    }
    if recorded.height != Some(candidate.height) {
        out.push(FieldMismatch {
            field:    "height",
            expected: show(recorded.height),
            actual:   candidate.height.to_string(),
        });
    }
    if recorded.bit_depth != Some(candidate.bit_depth) {
        out.push(FieldMismatch {
            field:    "bit_depth",
            expected: show(recorded.bit_depth),
            actual:   candidate.bit_depth.to_string(),
        });
    }
    if recorded.color_masks != candidate.color_masks {
        out.push(FieldMismatch {
            field:    "color_masks",
            expected: show_masks(recorded.color_masks),
            actual:   show_masks(candidate.color_masks),
        });
    }
    out
}

/// Accept or reject the replacement for `asset`.
pub fn validate_replacement(
    asset:     &str,
    payload:   &[u8],
    recorded:  &RecordedAttributes,
) -> Result<BitmapInfo, ValidationError> {
    let info = BitmapInfo::parse(payload)
        .ok_or_else(|| ValidationError::NotBitmap { asset: asset.to_owned() })?;
    let mismatches = diff(&info, recorded);
    if !mismatches.is_empty() {
        return Err(ValidationError::Mismatch { asset: asset.to_owned(), mismatches });
    }
    Ok(info)
}
