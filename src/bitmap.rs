//! Structural attributes of a Windows BMP payload.
//!
//! Only the fields needed to check that a replacement logo matches the
//! original are read: dimensions, bit depth, compression mode and, for
//! 16/32-bit images, the BI_BITFIELDS color masks at offset 54.

use byteorder::{ByteOrder, LittleEndian};

pub const BMP_MAGIC: [u8; 2] = *b"BM";

const FILE_SIZE_OFF:   usize = 2;
const WIDTH_OFF:       usize = 18;
const HEIGHT_OFF:      usize = 22;
const BIT_DEPTH_OFF:   usize = 28;
const COMPRESSION_OFF: usize = 30;
const MASKS_OFF:       usize = 54;

/// Smallest payload whose fixed fields can all be read.
pub const MIN_HEADER_LEN: usize = COMPRESSION_OFF + 4;
const MASKS_END: usize = MASKS_OFF + 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMasks {
    pub red:   u32,
    pub green: u32,
    pub blue:  u32,
}

/// RGB565, the layout firmware splash screens expect.
pub const RGB565: ColorMasks = ColorMasks { red: 0xF800, green: 0x07E0, blue: 0x001F };

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapInfo {
    pub file_size:   u32,
    pub width:       u32,
    pub height:      u32,
    pub bit_depth:   u16,
    pub compression: u32,
    pub color_masks: Option<ColorMasks>,
}

pub fn is_bitmap(data: &[u8]) -> bool {
    data.len() >= 2 && data[..2] == BMP_MAGIC
}

impl BitmapInfo {
    /// Parse the header of a `BM` payload.  Returns `None` when the magic is
    /// missing or the fixed fields do not fit.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if !is_bitmap(data) || data.len() < MIN_HEADER_LEN {
            return None;
        }
        let bit_depth = LittleEndian::read_u16(&data[BIT_DEPTH_OFF..]);
        let color_masks = match bit_depth {
            16 | 32 if data.len() >= MASKS_END => Some(ColorMasks {
                red:   LittleEndian::read_u32(&data[MASKS_OFF..]),
                green: LittleEndian::read_u32(&data[MASKS_OFF + 4..]),
                blue:  LittleEndian::read_u32(&data[MASKS_OFF + 8..]),
            }),
            _ => None,
        };
        Some(Self {
            file_size:   LittleEndian::read_u32(&data[FILE_SIZE_OFF..]),
            width:       LittleEndian::read_u32(&data[WIDTH_OFF..]),
            height:      LittleEndian::read_u32(&data[HEIGHT_OFF..]),
            bit_depth,
            compression: LittleEndian::read_u32(&data[COMPRESSION_OFF..]),
            color_masks,
        })
    }
}

/// Build a minimal BI_BITFIELDS (16/32-bit) or BI_RGB bitmap with a zeroed
/// pixel array.  Used by tests and benchmarks to produce realistic assets.
pub fn synth_bitmap(width: u32, height: u32, bit_depth: u16, masks: Option<ColorMasks>) -> Vec<u8> {
    let header_len: u32 = if masks.is_some() { MASKS_END as u32 } else { MASKS_OFF as u32 };
    let row = (width * bit_depth as u32).div_ceil(32) * 4;
    let pixels = row * height;
    let file_size = header_len + pixels;

    let mut out = vec![0u8; file_size as usize];
    out[..2].copy_from_slice(&BMP_MAGIC);
    LittleEndian::write_u32(&mut out[FILE_SIZE_OFF..], file_size);
    LittleEndian::write_u32(&mut out[10..], header_len);
    LittleEndian::write_u32(&mut out[14..], header_len - 14);
    LittleEndian::write_u32(&mut out[WIDTH_OFF..], width);
    LittleEndian::write_u32(&mut out[HEIGHT_OFF..], height);
    LittleEndian::write_u16(&mut out[26..], 1);
    LittleEndian::write_u16(&mut out[BIT_DEPTH_OFF..], bit_depth);
    LittleEndian::write_u32(&mut out[COMPRESSION_OFF..], if masks.is_some() { 3 } else { 0 });
    LittleEndian::write_u32(&mut out[34..], pixels);
    if let Some(m) = masks {
        LittleEndian::write_u32(&mut out[MASKS_OFF..], m.red);
        LittleEndian::write_u32(&mut out[MASKS_OFF + 4..], m.green);
        LittleEndian::write_u32(&mut out[MASKS_OFF + 8..], m.blue);
    }
    // Fill pixels with a gradient so gzip has something to do.
    for (i, b) in out[header_len as usize..].iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
    out
}
