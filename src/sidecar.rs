//! `config.json`: per-asset metadata written on unpack and read on repack.
//!
//! One record per item, in chain order.  Keys follow the legacy layout so
//! sidecars produced by older tooling load unchanged: the asset name first,
//! then the raw entry fields, the stored format, and the bitmap attributes.
//! Color masks are hex strings (`"0xf800"`); an empty object means the
//! bitmap has no masks.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::bitmap::{BitmapInfo, ColorMasks};
use crate::classify::Classification;
use crate::codec::CodecId;
use crate::error::Result;
use crate::item::ItemEntry;
use crate::validate::RecordedAttributes;

pub const SIDECAR_NAME: &str = "config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AssetFormat {
    #[default]
    #[serde(rename = "bmp")]
    Bmp,
    #[serde(rename = "gz")]
    Gz,
}

impl AssetFormat {
    pub fn codec(self) -> CodecId {
        match self {
            AssetFormat::Bmp => CodecId::Stored,
            AssetFormat::Gz  => CodecId::Gzip,
        }
    }
}

/// Raw entry fields as they were found in the image.  Informational only;
/// packing recomputes all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryFields {
    pub magic: u32,
    pub hcrc:  u32,
    pub size:  u32,
    pub start: u32,
    pub end:   u32,
    pub next:  u32,
    pub dcrc:  u32,
    pub index: u8,
    pub nums:  u8,
    #[serde(rename = "type")]
    pub kind:  u8,
    pub comp:  u8,
}

impl From<&ItemEntry> for EntryFields {
    fn from(e: &ItemEntry) -> Self {
        EntryFields {
            magic: e.magic,
            hcrc:  e.hcrc,
            size:  e.size,
            start: e.start,
            end:   e.end,
            next:  e.next,
            dcrc:  e.dcrc,
            index: e.index,
            nums:  e.arch,
            kind:  e.kind,
            comp:  e.comp,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskSet {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_mask")]
    pub red_mask:   Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_mask")]
    pub green_mask: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_mask")]
    pub blue_mask:  Option<u32>,
}

impl MaskSet {
    pub fn masks(&self) -> Option<ColorMasks> {
        Some(ColorMasks {
            red:   self.red_mask?,
            green: self.green_mask?,
            blue:  self.blue_mask?,
        })
    }
}

impl From<Option<ColorMasks>> for MaskSet {
    fn from(m: Option<ColorMasks>) -> Self {
        MaskSet {
            red_mask:   m.map(|m| m.red),
            green_mask: m.map(|m| m.green),
            blue_mask:  m.map(|m| m.blue),
        }
    }
}

mod hex_mask {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<u32>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(v) => s.serialize_str(&format!("{v:#x}")),
            None    => s.serialize_none(),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u32),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        match Option::<Raw>::deserialize(d)? {
            None                 => Ok(None),
            Some(Raw::Number(n)) => Ok(Some(n)),
            Some(Raw::Text(t))   => {
                let digits = t.trim_start_matches("0x").trim_start_matches("0X");
                u32::from_str_radix(digits, 16)
                    .map(Some)
                    .map_err(|e| D::Error::custom(format!("bad color mask {t:?}: {e}")))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub name: String,
    #[serde(flatten)]
    pub entry: EntryFields,
    #[serde(default)]
    pub format: AssetFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gz_compress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_depth: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_masks: Option<MaskSet>,
}

impl AssetRecord {
    /// Record for an unpacked item and its classification.
    pub fn describe(entry: &ItemEntry, class: &Classification) -> Self {
        let mut record = AssetRecord {
            name:        entry.name.clone(),
            entry:       EntryFields::from(entry),
            format:      if class.is_gzip() { AssetFormat::Gz } else { AssetFormat::Bmp },
            gz_compress: class.gzip_level(),
            ..AssetRecord::default()
        };
        if let Some(info) = class.bitmap() {
            record.set_bitmap(info);
        }
        record
    }

    pub fn set_bitmap(&mut self, info: &BitmapInfo) {
        self.file_size   = Some(info.file_size);
        self.width       = Some(info.width);
        self.height      = Some(info.height);
        self.bit_depth   = Some(info.bit_depth);
        self.compression = Some(info.compression);
        self.color_masks = Some(MaskSet::from(info.color_masks));
    }

    /// The fields the repack validator compares against.
    pub fn recorded_attributes(&self) -> RecordedAttributes {
        RecordedAttributes {
            width:       self.width,
            height:      self.height,
            bit_depth:   self.bit_depth,
            color_masks: self.color_masks.as_ref().and_then(MaskSet::masks),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sidecar {
    pub records: Vec<AssetRecord>,
}

impl Sidecar {
    pub fn find(&self, name: &str) -> Option<&AssetRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Pretty JSON with four-space indentation.
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, serde_json::Error> {
        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut ser)?;
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_bytes(&fs::read(path)?)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{synth_bitmap, RGB565};
    use crate::classify::classify;
    use crate::codec::gzip_compress;

    fn logo_entry() -> ItemEntry {
        let mut e = ItemEntry::new("logo").unwrap();
        e.size  = 32834;
        e.start = 192;
        e.next  = 128;
        e
    }

    #[test]
    fn name_comes_first_and_masks_are_hex() {
        let bmp    = synth_bitmap(128, 128, 16, Some(RGB565));
        let record = AssetRecord::describe(&logo_entry(), &classify(&bmp));
        let text   = String::from_utf8(Sidecar { records: vec![record] }.to_bytes().unwrap()).unwrap();

        let name_at  = text.find("\"name\"").unwrap();
        let magic_at = text.find("\"magic\"").unwrap();
        assert!(name_at < magic_at, "{text}");
        assert!(text.contains("\"red_mask\": \"0xf800\""), "{text}");
        assert!(text.contains("\"format\": \"bmp\""), "{text}");
        assert!(text.contains("\"type\": 0"), "{text}");
        assert!(text.contains("\n        \"name\": \"logo\""), "{text}");
        assert!(!text.contains("gz_compress"), "{text}");
    }

    #[test]
    fn gzip_record_has_level() {
        let bmp    = synth_bitmap(32, 32, 16, Some(RGB565));
        let record = AssetRecord::describe(&logo_entry(), &classify(&gzip_compress(&bmp, 6)));
        assert_eq!(record.format, AssetFormat::Gz);
        assert_eq!(record.gz_compress, Some(0));
        assert_eq!(record.width, Some(32));
    }

    #[test]
    fn unknown_payload_has_no_bitmap_fields() {
        let record = AssetRecord::describe(&logo_entry(), &Classification::Unknown);
        assert_eq!(record.format, AssetFormat::Bmp);
        assert_eq!(record.width, None);
        assert_eq!(record.color_masks, None);
        assert_eq!(record.recorded_attributes(), RecordedAttributes::default());
    }

    #[test]
    fn reads_legacy_sidecar() {
        let json = br#"[
            {
                "name": "bootup",
                "magic": 654645590,
                "size": 1000,
                "nums": 8,
                "type": 0,
                "format": "gz",
                "gz_compress": 0,
                "file_size": 32834,
                "width": 128,
                "height": 128,
                "bit_depth": 16,
                "compression": 3,
                "color_masks": {
                    "red_mask": "0xf800",
                    "green_mask": "0x7e0",
                    "blue_mask": "0x1f"
                }
            },
            { "name": "upgrade_bar", "format": "bmp", "width": 4, "height": 4, "bit_depth": 24, "color_masks": {} }
        ]"#;
        let sidecar = Sidecar::from_bytes(json).unwrap();
        assert_eq!(sidecar.records.len(), 2);
        let boot = sidecar.find("bootup").unwrap();
        assert_eq!(boot.format, AssetFormat::Gz);
        assert_eq!(boot.entry.magic, crate::item::ITEM_MAGIC);
        assert_eq!(boot.recorded_attributes().color_masks, Some(RGB565));
        let bar = sidecar.find("upgrade_bar").unwrap();
        assert_eq!(bar.recorded_attributes().color_masks, None);
        assert_eq!(bar.entry.start, 0);
    }

    #[test]
    fn bad_mask_text_is_an_error() {
        let json = br#"[{ "name": "x", "color_masks": { "red_mask": "0xZZ" } }]"#;
        assert!(Sidecar::from_bytes(json).is_err());
    }
}
