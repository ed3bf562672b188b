//! Payload codecs: stored verbatim or wrapped in a single gzip member.
//!
//! The gzip framing is RFC 1952 around a raw DEFLATE body produced by
//! `miniz_oxide`.  Output is deterministic: mtime is always zero and the OS
//! byte is 255 ("unknown"), so packing the same assets twice yields the same
//! image bytes.
//!
//! # Extra-flags byte
//! Byte 8 of a gzip stream (XFL) is what the sidecar records as the
//! "compression level" of a gzip-wrapped asset.  Encoders only set it to
//! 2 (maximum compression) or 4 (fastest); every other level writes 0.

use byteorder::{ByteOrder, LittleEndian};
use miniz_oxide::{deflate, inflate};
use thiserror::Error;

use crate::checksum::crc32;

pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
/// Default level used when an asset is marked `gz` in the sidecar.
pub const DEFAULT_GZIP_LEVEL: u8 = 6;
pub const MAX_GZIP_LEVEL: u8 = 10;

const GZIP_HEADER_LEN:  usize = 10;
const GZIP_TRAILER_LEN: usize = 8;
const METHOD_DEFLATE:   u8    = 8;
const OS_UNKNOWN:       u8    = 255;

const FLAG_HCRC:     u8 = 0x02;
const FLAG_EXTRA:    u8 = 0x04;
const FLAG_NAME:     u8 = 0x08;
const FLAG_COMMENT:  u8 = 0x10;
const FLAG_RESERVED: u8 = 0xE0;

// ── CodecId ──────────────────────────────────────────────────────────────────

/// How an asset's bytes are stored inside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecId {
    Stored,
    Gzip,
}

impl CodecId {
    /// Human-readable name (diagnostics only).
    pub fn name(self) -> &'static str {
        match self {
            CodecId::Stored => "stored",
            CodecId::Gzip   => "gzip",
        }
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("not a gzip stream")]
    NotGzip,
    #[error("unsupported gzip compression method {0}")]
    UnsupportedMethod(u8),
    #[error("gzip header uses reserved flag bits {0:#04x}")]
    ReservedFlags(u8),
    #[error("gzip stream truncated")]
    Truncated,
    #[error("Decompression error: {0}")]
    Decompression(String),
    #[error("gzip trailer mismatch: stored crc {stored_crc:#010x} / size {stored_len}, decoded crc {actual_crc:#010x} / size {actual_len}")]
    TrailerMismatch { stored_crc: u32, stored_len: u32, actual_crc: u32, actual_len: u32 },
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec {
    fn codec_id(&self) -> CodecId;
    fn compress(&self, data: &[u8], level: u8) -> Vec<u8>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}

pub struct StoredCodec;
impl Codec for StoredCodec {
    fn codec_id(&self) -> CodecId { CodecId::Stored }
    fn compress(&self, data: &[u8], _: u8) -> Vec<u8> { data.to_vec() }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> { Ok(data.to_vec()) }
}

pub struct GzipCodec;
impl Codec for GzipCodec {
    fn codec_id(&self) -> CodecId { CodecId::Gzip }
    fn compress(&self, data: &[u8], level: u8) -> Vec<u8> { gzip_compress(data, level) }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> { gzip_decompress(data) }
}

pub fn get_codec(id: CodecId) -> Box<dyn Codec> {
    match id {
        CodecId::Stored => Box::new(StoredCodec),
        CodecId::Gzip   => Box::new(GzipCodec),
    }
}

// ── gzip framing ─────────────────────────────────────────────────────────────

pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[..2] == GZIP_MAGIC
}

/// The XFL byte of a gzip stream, `None` when the header is incomplete.
pub fn declared_level(data: &[u8]) -> Option<u8> {
    if data.len() < GZIP_HEADER_LEN {
        return None;
    }
    Some(data[8])
}

fn extra_flags(level: u8) -> u8 {
    match level {
        l if l >= 9 => 2,
        1           => 4,
        _           => 0,
    }
}

pub fn gzip_compress(data: &[u8], level: u8) -> Vec<u8> {
    let level = level.min(MAX_GZIP_LEVEL);
    let body  = deflate::compress_to_vec(data, level);

    let mut out = Vec::with_capacity(GZIP_HEADER_LEN + body.len() + GZIP_TRAILER_LEN);
    out.extend_from_slice(&GZIP_MAGIC);
    out.push(METHOD_DEFLATE);
    out.push(0);                         // flags
    out.extend_from_slice(&[0u8; 4]);    // mtime
    out.push(extra_flags(level));
    out.push(OS_UNKNOWN);
    out.extend_from_slice(&body);

    let mut trailer = [0u8; GZIP_TRAILER_LEN];
    LittleEndian::write_u32(&mut trailer[0..4], crc32(data));
    LittleEndian::write_u32(&mut trailer[4..8], data.len() as u32);
    out.extend_from_slice(&trailer);
    out
}

/// Length of the member header including optional fields.
fn header_len(data: &[u8]) -> Result<usize, CodecError> {
    if !is_gzip(data) {
        return Err(CodecError::NotGzip);
    }
    if data.len() < GZIP_HEADER_LEN {
        return Err(CodecError::Truncated);
    }
    if data[2] != METHOD_DEFLATE {
        return Err(CodecError::UnsupportedMethod(data[2]));
    }
    let flags = data[3];
    if flags & FLAG_RESERVED != 0 {
        return Err(CodecError::ReservedFlags(flags & FLAG_RESERVED));
    }

    let mut pos = GZIP_HEADER_LEN;
    if flags & FLAG_EXTRA != 0 {
        let xlen_bytes = data.get(pos..pos + 2).ok_or(CodecError::Truncated)?;
        pos += 2 + LittleEndian::read_u16(xlen_bytes) as usize;
    }
    for flag in [FLAG_NAME, FLAG_COMMENT] {
        if flags & flag != 0 {
            let rest = data.get(pos..).ok_or(CodecError::Truncated)?;
            let nul  = rest.iter().position(|&b| b == 0).ok_or(CodecError::Truncated)?;
            pos += nul + 1;
        }
    }
    if flags & FLAG_HCRC != 0 {
        pos += 2;
    }
    if pos > data.len() {
        return Err(CodecError::Truncated);
    }
    Ok(pos)
}

/// Decode a single gzip member, checking the trailer CRC-32 and length.
pub fn gzip_decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let start = header_len(data)?;
    if data.len() < start + GZIP_TRAILER_LEN {
        return Err(CodecError::Truncated);
    }
    let end  = data.len() - GZIP_TRAILER_LEN;
    let body = &data[start..end];

    let stored_crc = LittleEndian::read_u32(&data[end..end + 4]);
    let stored_len = LittleEndian::read_u32(&data[end + 4..]);

    // ISIZE bounds the output; one spare byte lets an oversized body surface
    // as a trailer mismatch instead of running on.
    let out = inflate::decompress_to_vec_with_limit(body, (stored_len as usize).saturating_add(1))
        .map_err(|e| CodecError::Decompression(format!("{:?}", e.status)))?;
    let actual_crc = crc32(&out);
    let actual_len = out.len() as u32;
    if stored_crc != actual_crc || stored_len != actual_len {
        return Err(CodecError::TrailerMismatch { stored_crc, stored_len, actual_crc, actual_len });
    }
    Ok(out)
}
