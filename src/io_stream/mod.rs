//! Image assembly and chain walking.
//!
//! # Writer
//! [`assemble`] lays every item payload out in list order into one data
//! segment, pads each payload to the header alignment, fills in `start`,
//! `index` and `next` for every entry, then emits header, directory and data
//! segment back to back.  The header CRC covers exactly the data segment.
//!
//! # Reader
//! [`ContainerReader`] decodes the header, then follows the entry chain from
//! the record right after the header until an entry with `next == 0`.  Every
//! offset and length is bounds-checked against the stream length before it
//! is read, so a short image fails with `Truncated` instead of an I/O error.
//!
//! # Endianness
//! All binary I/O is little-endian; see `header.rs` and `item.rs` for the
//! record layouts.

use std::io::{Read, Seek, SeekFrom};

use tracing::{debug, warn};

use crate::checksum::{self, crc32};
use crate::container::{Container, Item, MAX_ITEMS};
use crate::error::{ResError, Result};
use crate::header::{ContainerHeader, HEADER_SIZE};
use crate::item::{ItemEntry, ITEM_SIZE};

// ── Writer ───────────────────────────────────────────────────────────────────

/// Zero bytes needed to bring `len` up to a multiple of `alignment`.
pub fn padding_for(len: usize, alignment: usize) -> usize {
    (alignment - len % alignment) % alignment
}

/// Absolute offset of the `index`-th directory entry.
pub fn entry_offset(index: usize) -> usize {
    HEADER_SIZE + ITEM_SIZE * index
}

/// Build the data segment and patch every layout field in `container`.
///
/// After each padded payload the segment additionally receives
/// `len % alignment` zero bytes.  Existing tools emit this quirk, so it is
/// reproduced for byte compatibility; because each payload is already padded
/// to the alignment, it always amounts to zero bytes here.
fn layout(container: &mut Container) -> Vec<u8> {
    let alignment = container.header.alignment.max(1) as usize;
    let count     = container.items.len();
    let dir_end   = entry_offset(count);

    let mut data = Vec::new();
    for (i, item) in container.items.iter_mut().enumerate() {
        let entry = &mut item.entry;
        entry.index = i as u8;
        entry.size  = item.payload.len() as u32;
        entry.start = (dir_end + data.len()) as u32;
        entry.next  = if i + 1 < count { entry_offset(i + 1) as u32 } else { 0 };

        data.extend_from_slice(&item.payload);
        data.resize(data.len() + padding_for(item.payload.len(), alignment), 0);
        let quirk = data.len() % alignment;
        data.resize(data.len() + quirk, 0);

        debug!(
            asset = %entry.name,
            index = entry.index,
            start = entry.start,
            size  = entry.size,
            next  = entry.next,
            "laid out item"
        );
    }

    let header = &mut container.header;
    header.item_count = count as u32;
    header.total_size = (dir_end + data.len()) as u32;
    header.crc        = crc32(&data);
    data
}

/// Serialize `container` into a complete image, updating its header and
/// entries to the layout that was written.
pub fn assemble(container: &mut Container) -> Vec<u8> {
    let data = layout(container);

    let mut out = Vec::with_capacity(container.header.total_size as usize);
    out.extend_from_slice(&container.header.to_bytes());
    for item in &container.items {
        out.extend_from_slice(&item.entry.to_bytes());
    }
    out.extend_from_slice(&data);
    out
}

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct ContainerReader<R: Read + Seek> {
    reader: R,
    len:    u64,
}

impl<R: Read + Seek> ContainerReader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self { reader, len })
    }

    /// Total stream length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn ensure(&self, offset: u64, needed: u64) -> Result<()> {
        if offset.saturating_add(needed) > self.len {
            return Err(ResError::Truncated {
                offset,
                needed,
                available: self.len.saturating_sub(offset),
            });
        }
        Ok(())
    }

    fn read_range(&mut self, offset: u64, len: u64) -> Result<Vec<u8>> {
        self.ensure(offset, len)?;
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len as usize];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_header(&mut self) -> Result<ContainerHeader> {
        let bytes = self.read_range(0, HEADER_SIZE as u64)?;
        ContainerHeader::from_bytes(&bytes)
    }

    pub fn read_entry_at(&mut self, offset: u64) -> Result<ItemEntry> {
        let bytes = self.read_range(offset, ITEM_SIZE as u64)?;
        ItemEntry::from_bytes(&bytes, offset)
    }

    /// Exactly `entry.size` bytes from `entry.start`.
    pub fn read_payload(&mut self, entry: &ItemEntry) -> Result<Vec<u8>> {
        self.read_range(entry.start as u64, entry.size as u64)
    }

    /// Walk the chain and return every item in chain order.
    pub fn read_container(&mut self) -> Result<Container> {
        let header = self.read_header()?;
        let mut items = Vec::new();

        if header.item_count > 0 {
            let mut offset = HEADER_SIZE as u64;
            loop {
                if items.len() == MAX_ITEMS {
                    return Err(ResError::format(offset, format!(
                        "item chain is longer than {MAX_ITEMS} entries"
                    )));
                }
                let entry   = self.read_entry_at(offset)?;
                let payload = self.read_payload(&entry)?;
                debug!(
                    asset  = %entry.name,
                    offset,
                    start  = entry.start,
                    size   = entry.size,
                    next   = entry.next,
                    "read item"
                );
                let next = entry.next as u64;
                items.push(Item { entry, payload });
                if next == 0 {
                    break;
                }
                if next <= offset {
                    return Err(ResError::format(offset, format!(
                        "item chain does not advance: next entry at {next:#x}"
                    )));
                }
                offset = next;
            }
        }

        if items.len() != header.item_count as usize {
            warn!(
                declared = header.item_count,
                walked   = items.len(),
                "item count in header disagrees with the entry chain"
            );
        }
        Ok(Container { header, items })
    }

    /// Recompute the data segment CRC and compare it with `header.crc`.
    pub fn verify_checksum(&mut self, header: &ContainerHeader) -> Result<()> {
        let start = header.data_offset();
        let end   = header.total_size as u64;
        if end < start {
            return Err(ResError::format(0x10, format!(
                "total size {end} ends before the data segment at {start}"
            )));
        }
        let data = self.read_range(start, end - start)?;
        checksum::verify(header.crc, &data)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn two_items() -> Container {
        let mut c = Container::new();
        c.push("logo", vec![0x11; 20]).unwrap();
        c.push("boot", vec![0x22; 33]).unwrap();
        c
    }

    #[test]
    fn padding_rule() {
        assert_eq!(padding_for(0, 16), 0);
        assert_eq!(padding_for(1, 16), 15);
        assert_eq!(padding_for(16, 16), 0);
        assert_eq!(padding_for(33, 16), 15);
    }

    #[test]
    fn layout_fields() {
        let mut c = two_items();
        let image = c.pack();
        let (a, b) = (&c.items[0].entry, &c.items[1].entry);
        assert_eq!(a.start, 192);
        assert_eq!(a.next, 128);
        assert_eq!(a.size, 20);
        assert_eq!(b.start, 192 + 32);
        assert_eq!(b.next, 0);
        assert_eq!(b.index, 1);
        assert_eq!(c.header.item_count, 2);
        assert_eq!(c.header.total_size as usize, image.len());
        assert_eq!(image.len(), 192 + 32 + 48);
        assert_eq!(c.header.crc, crc32(&image[192..]));
        assert!(image[192 + 20..192 + 32].iter().all(|&b| b == 0));
    }

    #[test]
    fn walk_restores_items() {
        let mut c = two_items();
        let image = c.pack();
        let back = Container::from_bytes(&image).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn empty_container() {
        let mut c = Container::new();
        let image = c.pack();
        assert_eq!(image.len(), HEADER_SIZE);
        assert_eq!(c.header.crc, 0);
        assert!(Container::from_bytes(&image).unwrap().is_empty());
    }

    #[test]
    fn payload_past_end_is_truncated() {
        let mut c = two_items();
        let image = c.pack();
        let cut = &image[..200];
        match Container::from_bytes(cut) {
            Err(ResError::Truncated { offset, needed, available }) => {
                assert_eq!(offset, 192);
                assert_eq!(needed, 20);
                assert_eq!(available, 8);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(Container::from_bytes(&image[..10]), Err(ResError::Truncated { .. })));
    }

    #[test]
    fn bad_entry_magic_is_format_error() {
        let mut c = two_items();
        let mut image = c.pack();
        image[128] ^= 0xFF;
        match Container::from_bytes(&image) {
            Err(ResError::Format { offset, .. }) => assert_eq!(offset, 128),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn backwards_chain_is_rejected() {
        let mut c = two_items();
        let mut image = c.pack();
        // Point the second entry's `next` back at the first.
        image[128 + 20..128 + 24].copy_from_slice(&64u32.to_le_bytes());
        assert!(matches!(Container::from_bytes(&image), Err(ResError::Format { .. })));
    }

    /// Entries chained back to back, each with an empty payload at offset 0.
    fn chain_of(n: usize) -> Vec<u8> {
        let mut header = ContainerHeader::default();
        header.item_count = 1;
        header.total_size = entry_offset(n) as u32;
        let mut image = header.to_bytes().to_vec();
        for i in 0..n {
            let mut e = ItemEntry::new(&format!("e{i}")).unwrap();
            e.next = if i + 1 < n { entry_offset(i + 1) as u32 } else { 0 };
            image.extend_from_slice(&e.to_bytes());
        }
        image
    }

    #[test]
    fn chain_length_is_capped() {
        let full = Container::from_bytes(&chain_of(MAX_ITEMS)).unwrap();
        assert_eq!(full.len(), MAX_ITEMS);

        match Container::from_bytes(&chain_of(MAX_ITEMS + 1)) {
            Err(ResError::Format { offset, .. }) => assert_eq!(offset, entry_offset(MAX_ITEMS) as u64),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn reader_checksum() {
        let mut c = two_items();
        let image = c.pack();
        let mut reader = ContainerReader::new(Cursor::new(image.clone())).unwrap();
        let header = reader.read_header().unwrap();
        reader.verify_checksum(&header).unwrap();
        assert_eq!(reader.len(), image.len() as u64);
    }

    #[test]
    fn custom_alignment() {
        let mut c = Container::new();
        c.header.alignment = 64;
        c.push("a", vec![1; 10]).unwrap();
        c.push("b", vec![2; 70]).unwrap();
        c.pack();
        assert_eq!(c.items[0].entry.start, 192);
        assert_eq!(c.items[1].entry.start, 192 + 64);
        assert_eq!(c.header.total_size, 192 + 64 + 128);
    }
}
