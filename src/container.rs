//! In-memory [`Container`] aggregate: one header plus the ordered item list.
//!
//! The list order is the chain order.  Forward pointers are only resolved
//! when the container is encoded ([`crate::io_stream::assemble`]) or decoded
//! ([`crate::io_stream::ContainerReader`]).

use std::io::Cursor;

use tracing::debug;

use crate::checksum;
use crate::codec::{get_codec, CodecId};
use crate::error::{ResError, Result};
use crate::header::ContainerHeader;
use crate::image::PackOptions;
use crate::io_stream::{assemble, ContainerReader};
use crate::item::ItemEntry;

/// `index` is a single byte in the entry record.
pub const MAX_ITEMS: usize = u8::MAX as usize + 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub entry:   ItemEntry,
    /// Stored bytes, exactly `entry.size` long (no alignment padding).
    pub payload: Vec<u8>,
}

impl Item {
    pub fn name(&self) -> &str {
        &self.entry.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub header: ContainerHeader,
    pub items:  Vec<Item>,
}

impl Default for Container {
    fn default() -> Self {
        Self::with_options(&PackOptions::default())
    }
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(opts: &PackOptions) -> Self {
        Self {
            header: ContainerHeader::new(opts.version, opts.alignment.max(1)),
            items:  Vec::new(),
        }
    }

    /// Append an already-encoded payload under `name`.
    pub fn push(&mut self, name: &str, payload: Vec<u8>) -> Result<()> {
        self.push_entry(ItemEntry::new(name)?, payload)
    }

    /// Encode `data` with `codec` and append it.  `arch` goes into the entry.
    pub fn push_asset(&mut self, name: &str, data: &[u8], codec: CodecId, opts: &PackOptions) -> Result<()> {
        let mut entry = ItemEntry::new(name)?;
        entry.arch = opts.arch;
        let payload = get_codec(codec).compress(data, opts.gzip_level);
        debug!(asset = name, codec = codec.name(), raw = data.len(), stored = payload.len(), "adding asset");
        self.push_entry(entry, payload)
    }

    fn push_entry(&mut self, mut entry: ItemEntry, payload: Vec<u8>) -> Result<()> {
        if self.items.len() >= MAX_ITEMS {
            return Err(ResError::TooManyItems { max: MAX_ITEMS });
        }
        entry.size = payload.len() as u32;
        self.items.push(Item { entry, payload });
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.name() == name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Lay out the data segment, fix up every entry and the header, and
    /// return the complete image bytes.
    pub fn pack(&mut self) -> Vec<u8> {
        assemble(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ContainerReader::new(Cursor::new(bytes))?.read_container()
    }

    /// Check `header.crc` against the data segment of `image`, the bytes
    /// this container was decoded from.
    pub fn verify_checksum(&self, image: &[u8]) -> Result<()> {
        let start = self.header.data_offset();
        let end   = self.header.total_size as u64;
        if end > image.len() as u64 {
            return Err(ResError::Truncated {
                offset:    start,
                needed:    end.saturating_sub(start),
                available: (image.len() as u64).saturating_sub(start),
            });
        }
        if end < start {
            return Err(ResError::format(0x10, format!(
                "total size {end} ends before the data segment at {start}"
            )));
        }
        checksum::verify(self.header.crc, &image[start as usize..end as usize])
    }
}
