//! Item directory entry — one fixed 64-byte record per packed asset.
//!
//! ```text
//! 0x00  magic  u32   0x27051956
//! 0x04  hcrc   u32   unused (0)
//! 0x08  size   u32   payload length before alignment padding
//! 0x0C  start  u32   absolute offset of the payload
//! 0x10  end    u32   unused (0)
//! 0x14  next   u32   absolute offset of the next entry, 0 = last
//! 0x18  dcrc   u32   unused (0)
//! 0x1C  index  u8    position in the chain
//! 0x1D  arch   u8    ARM = 8
//! 0x1E  kind   u8    unused (0)
//! 0x1F  comp   u8    unused (0)
//! 0x20  name   [32]  ASCII, zero padded
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use crate::error::{ResError, Result};

pub const ITEM_MAGIC: u32 = 0x2705_1956;
pub const ITEM_SIZE: usize = 64;
pub const NAME_LEN: usize = 32;
pub const ARCH_ARM: u8 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEntry {
    pub magic: u32,
    pub hcrc:  u32,
    pub size:  u32,
    pub start: u32,
    pub end:   u32,
    pub next:  u32,
    pub dcrc:  u32,
    pub index: u8,
    pub arch:  u8,
    pub kind:  u8,
    pub comp:  u8,
    pub name:  String,
}

/// Check that `name` fits the 32-byte ASCII name field.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ResError::InvalidName { name: name.to_owned(), reason: "empty" });
    }
    if !name.is_ascii() {
        return Err(ResError::InvalidName { name: name.to_owned(), reason: "not ASCII" });
    }
    if name.len() > NAME_LEN {
        return Err(ResError::InvalidName { name: name.to_owned(), reason: "longer than 32 bytes" });
    }
    check_path_component(name)
}

/// Names become `<name>.bmp` on unpack, so they must stay a single path
/// component.  Applied to decoded entries as well as new ones.
pub fn check_path_component(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "empty"
    } else if name == "." || name == ".." {
        "reserved path component"
    } else if name.contains(['/', '\\']) {
        "contains a path separator"
    } else if name.contains('\0') {
        "contains NUL"
    } else {
        return Ok(());
    };
    Err(ResError::InvalidName { name: name.to_owned(), reason })
}

impl ItemEntry {
    /// A fresh entry for `name`; layout fields are filled in by the assembler.
    pub fn new(name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(Self {
            magic: ITEM_MAGIC,
            hcrc:  0,
            size:  0,
            start: 0,
            end:   0,
            next:  0,
            dcrc:  0,
            index: 0,
            arch:  ARCH_ARM,
            kind:  0,
            comp:  0,
            name:  name.to_owned(),
        })
    }

    pub fn is_last(&self) -> bool {
        self.next == 0
    }

    pub fn write<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.magic)?;
        writer.write_u32::<LittleEndian>(self.hcrc)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        writer.write_u32::<LittleEndian>(self.start)?;
        writer.write_u32::<LittleEndian>(self.end)?;
        writer.write_u32::<LittleEndian>(self.next)?;
        writer.write_u32::<LittleEndian>(self.dcrc)?;
        writer.write_u8(self.index)?;
        writer.write_u8(self.arch)?;
        writer.write_u8(self.kind)?;
        writer.write_u8(self.comp)?;
        let mut name = [0u8; NAME_LEN];
        let len = self.name.len().min(NAME_LEN);
        name[..len].copy_from_slice(&self.name.as_bytes()[..len]);
        writer.write_all(&name)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; ITEM_SIZE] {
        let mut out = [0u8; ITEM_SIZE];
        let _ = self.write(&mut out[..]);
        out
    }

    /// Decode one entry.  `offset` is the entry's absolute position and only
    /// feeds error messages.
    pub fn read<R: Read>(mut reader: R, offset: u64) -> Result<Self> {
        let magic = reader.read_u32::<LittleEndian>()?;
        if magic != ITEM_MAGIC {
            return Err(ResError::format(offset, format!(
                "invalid item header magic: expected {ITEM_MAGIC:#x}, found {magic:#x}"
            )));
        }
        let hcrc  = reader.read_u32::<LittleEndian>()?;
        let size  = reader.read_u32::<LittleEndian>()?;
        let start = reader.read_u32::<LittleEndian>()?;
        let end   = reader.read_u32::<LittleEndian>()?;
        let next  = reader.read_u32::<LittleEndian>()?;
        let dcrc  = reader.read_u32::<LittleEndian>()?;
        let index = reader.read_u8()?;
        let arch  = reader.read_u8()?;
        let kind  = reader.read_u8()?;
        let comp  = reader.read_u8()?;
        let mut raw = [0u8; NAME_LEN];
        reader.read_exact(&mut raw)?;
        let trimmed = raw.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
        let name = String::from_utf8_lossy(&raw[..trimmed]).into_owned();
        if let Err(e) = check_path_component(&name) {
            return Err(ResError::format(offset, e.to_string()));
        }
        Ok(Self { magic, hcrc, size, start, end, next, dcrc, index, arch, kind, comp, name })
    }

    pub fn from_bytes(bytes: &[u8], offset: u64) -> Result<Self> {
        if bytes.len() < ITEM_SIZE {
            return Err(ResError::Truncated {
                offset,
                needed:    ITEM_SIZE as u64,
                available: bytes.len() as u64,
            });
        }
        Self::read(Cursor::new(&bytes[..ITEM_SIZE]), offset)
    }
}
