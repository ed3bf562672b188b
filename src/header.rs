//! Container header — the fixed 64-byte record at offset 0.
//!
//! ```text
//! 0x00  crc        u32   CRC-32 of the data segment
//! 0x04  version    i32   1 or 2
//! 0x08  magic      [8]   "AML_RES!"
//! 0x10  total_size u32   whole image length in bytes
//! 0x14  item_count u32   number of item entries
//! 0x18  alignment  u32   payload padding granularity
//! 0x1C  reserved   [36]  zero
//! ```
//!
//! All integers are little-endian.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use crate::error::{ResError, Result};

pub const MAGIC: &[u8; 8] = b"AML_RES!";
pub const VERSION_V1: i32 = 1;
pub const VERSION_V2: i32 = 2;
/// Highest version this build understands.
pub const MAX_VERSION: i32 = VERSION_V2;
pub const DEFAULT_ALIGNMENT: u32 = 16;
pub const HEADER_SIZE: usize = 64;
pub const RESERVED_LEN: usize = HEADER_SIZE - 8 * 3 - 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub crc:        u32,
    pub version:    i32,
    pub magic:      [u8; 8],
    pub total_size: u32,
    pub item_count: u32,
    pub alignment:  u32,
    pub reserved:   [u8; RESERVED_LEN],
}

impl Default for ContainerHeader {
    fn default() -> Self {
        Self::new(VERSION_V2, DEFAULT_ALIGNMENT)
    }
}

impl ContainerHeader {
    pub fn new(version: i32, alignment: u32) -> Self {
        Self {
            crc:        0,
            version,
            magic:      *MAGIC,
            total_size: 0,
            item_count: 0,
            alignment,
            reserved:   [0u8; RESERVED_LEN],
        }
    }

    /// Offset of the first data byte, right after the item directory.
    pub fn data_offset(&self) -> u64 {
        HEADER_SIZE as u64 + self.item_count as u64 * crate::item::ITEM_SIZE as u64
    }

    pub fn write<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.crc)?;
        writer.write_i32::<LittleEndian>(self.version)?;
        writer.write_all(&self.magic)?;
        writer.write_u32::<LittleEndian>(self.total_size)?;
        writer.write_u32::<LittleEndian>(self.item_count)?;
        writer.write_u32::<LittleEndian>(self.alignment)?;
        writer.write_all(&self.reserved)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        // Writing into a correctly sized slice cannot fail.
        let _ = self.write(&mut out[..]);
        out
    }

    /// Decode and validate the header.  Rejects a wrong magic, a version
    /// outside `1..=MAX_VERSION`, and a zero alignment.
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let crc     = reader.read_u32::<LittleEndian>()?;
        let version = reader.read_i32::<LittleEndian>()?;
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(ResError::format(8, format!(
                "bad image magic: expected {:?}, found {:?}",
                String::from_utf8_lossy(MAGIC),
                String::from_utf8_lossy(&magic),
            )));
        }
        if !(VERSION_V1..=MAX_VERSION).contains(&version) {
            return Err(ResError::UnsupportedVersion { found: version, max: MAX_VERSION });
        }
        let total_size = reader.read_u32::<LittleEndian>()?;
        let item_count = reader.read_u32::<LittleEndian>()?;
        let alignment  = reader.read_u32::<LittleEndian>()?;
        if alignment == 0 {
            return Err(ResError::format(0x18, "alignment must be non-zero"));
        }
        let mut reserved = [0u8; RESERVED_LEN];
        reader.read_exact(&mut reserved)?;
        Ok(Self { crc, version, magic, total_size, item_count, alignment, reserved })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ResError::Truncated {
                offset:    0,
                needed:    HEADER_SIZE as u64,
                available: bytes.len() as u64,
            });
        }
        Self::read(Cursor::new(&bytes[..HEADER_SIZE]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ContainerHeader {
        ContainerHeader {
            crc:        0xDEADBEEF,
            total_size: 4096,
            item_count: 3,
            ..ContainerHeader::default()
        }
    }

    #[test]
    fn encoded_layout_matches_fixed_offsets() {
        let bytes = sample().to_bytes();
        assert_eq!(&bytes[0..4], &0xDEADBEEFu32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2i32.to_le_bytes());
        assert_eq!(&bytes[8..16], b"AML_RES!");
        assert_eq!(&bytes[16..20], &4096u32.to_le_bytes());
        assert_eq!(&bytes[20..24], &3u32.to_le_bytes());
        assert_eq!(&bytes[24..28], &16u32.to_le_bytes());
        assert!(bytes[28..].iter().all(|&b| b == 0));
    }

    #[test]
    fn decode_restores_fields() {
        let h = sample();
        assert_eq!(ContainerHeader::from_bytes(&h.to_bytes()).unwrap(), h);
    }

    #[test]
    fn bad_magic_is_format_error() {
        let mut bytes = sample().to_bytes();
        bytes[8] = b'X';
        assert!(matches!(ContainerHeader::from_bytes(&bytes), Err(ResError::Format { .. })));
    }

    #[test]
    fn version_three_is_rejected() {
        let mut h = sample();
        h.version = 3;
        match ContainerHeader::from_bytes(&h.to_bytes()) {
            Err(ResError::UnsupportedVersion { found, max }) => {
                assert_eq!(found, 3);
                assert_eq!(max, 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn version_one_is_accepted() {
        let mut h = sample();
        h.version = VERSION_V1;
        assert_eq!(ContainerHeader::from_bytes(&h.to_bytes()).unwrap().version, 1);
    }

    #[test]
    fn short_input_is_truncated() {
        let bytes = sample().to_bytes();
        assert!(matches!(
            ContainerHeader::from_bytes(&bytes[..40]),
            Err(ResError::Truncated { needed: 64, available: 40, .. })
        ));
    }

    #[test]
    fn zero_alignment_is_rejected() {
        let mut h = sample();
        h.alignment = 0;
        assert!(matches!(ContainerHeader::from_bytes(&h.to_bytes()), Err(ResError::Format { .. })));
    }
}
