//! High-level image API — unpack to a directory, pack from a directory.
//!
//! ```no_run
//! use amlres::image::{self, PackOptions};
//!
//! // Unpack: one `<name>.bmp` per item plus `config.json`.
//! image::unpack_to_dir("logo.img", "logo")?;
//!
//! // Repack after editing the bitmaps in place.
//! image::pack_from_dir("logo", "logo-new.img", &PackOptions::default())?;
//! # Ok::<(), amlres::ResError>(())
//! ```
//!
//! Both directions finish all parsing and validation before the first byte
//! of output is written, so a failure leaves no partial results behind.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::classify::classify;
use crate::codec::{CodecId, DEFAULT_GZIP_LEVEL};
use crate::container::Container;
use crate::error::Result;
use crate::header::{ContainerHeader, DEFAULT_ALIGNMENT, VERSION_V2};
use crate::io_stream::ContainerReader;
use crate::item::{validate_name, ARCH_ARM};
use crate::sidecar::{AssetRecord, Sidecar, SIDECAR_NAME};
use crate::validate::validate_replacement;

/// Extension of the per-item files written on unpack.
pub const ASSET_EXT: &str = "bmp";

// ── PackOptions ───────────────────────────────────────────────────────────────

/// Configuration for building a new image.
#[derive(Debug, Clone)]
pub struct PackOptions {
    pub version:    i32,
    pub alignment:  u32,
    /// Level for assets whose sidecar record says `"format": "gz"`.
    pub gzip_level: u8,
    pub arch:       u8,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            version:    VERSION_V2,
            alignment:  DEFAULT_ALIGNMENT,
            gzip_level: DEFAULT_GZIP_LEVEL,
            arch:       ARCH_ARM,
        }
    }
}

// ── Asset ─────────────────────────────────────────────────────────────────────

/// One input to the assembler: name, raw bytes, and how to store them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name:  String,
    pub data:  Vec<u8>,
    pub codec: CodecId,
}

/// An item as it comes out of an image: its sidecar record and the asset
/// bytes (decoded when the item was gzip-wrapped).
#[derive(Debug, Clone)]
pub struct UnpackedAsset {
    pub record:  AssetRecord,
    pub content: Vec<u8>,
}

// ── Read ──────────────────────────────────────────────────────────────────────

pub fn open<P: AsRef<Path>>(path: P) -> Result<Container> {
    ContainerReader::new(File::open(path)?)?.read_container()
}

/// Read the header of the image at `path` and check its data segment CRC.
pub fn verify<P: AsRef<Path>>(path: P) -> Result<ContainerHeader> {
    let mut reader = ContainerReader::new(File::open(path)?)?;
    let header = reader.read_header()?;
    reader.verify_checksum(&header)?;
    Ok(header)
}

/// Classify every item and build its sidecar record.
pub fn describe(container: &Container) -> Vec<UnpackedAsset> {
    container.items.iter().map(|item| {
        let class   = classify(&item.payload);
        let record  = AssetRecord::describe(&item.entry, &class);
        let content = class.content(&item.payload).to_vec();
        UnpackedAsset { record, content }
    }).collect()
}

/// Default unpack directory: the image path without its extension.
pub fn default_output_dir(image: &Path) -> PathBuf {
    image.with_extension("")
}

/// Extract every item of `image` into `out_dir` and write the sidecar.
pub fn unpack_to_dir<P: AsRef<Path>, Q: AsRef<Path>>(image: P, out_dir: Q) -> Result<Sidecar> {
    let image   = image.as_ref();
    let out_dir = out_dir.as_ref();
    info!("unpacking assets in {}", image.display());

    let container = open(image)?;
    let assets    = describe(&container);

    fs::create_dir_all(out_dir)?;
    let mut sidecar = Sidecar::default();
    for asset in assets {
        info!(asset = %asset.record.name, format = ?asset.record.format, "unpacking");
        let path = out_dir.join(format!("{}.{ASSET_EXT}", asset.record.name));
        fs::write(path, &asset.content)?;
        sidecar.records.push(asset.record);
    }
    sidecar.save(out_dir.join(SIDECAR_NAME))?;
    Ok(sidecar)
}

// ── Write ─────────────────────────────────────────────────────────────────────

/// Load and validate the replacement bitmaps in `dir` against `sidecar`.
///
/// Records are visited in sidecar order; a record whose `<name>.bmp` is
/// missing is skipped.  Any bitmap that is not a BMP or whose attributes
/// differ from the record aborts the whole collection.
pub fn collect_assets(dir: &Path, sidecar: &Sidecar) -> Result<Vec<Asset>> {
    let mut assets = Vec::with_capacity(sidecar.records.len());
    for record in &sidecar.records {
        validate_name(&record.name)?;
        let path = dir.join(format!("{}.{ASSET_EXT}", record.name));
        if !path.is_file() {
            warn!(asset = %record.name, "no {} in {}; skipping", ASSET_EXT, dir.display());
            continue;
        }
        let data = fs::read(&path)?;
        validate_replacement(&record.name, &data, &record.recorded_attributes())?;
        assets.push(Asset {
            name:  record.name.clone(),
            data,
            codec: record.format.codec(),
        });
    }
    Ok(assets)
}

/// Assemble `assets` in order into a new container.
pub fn build(assets: &[Asset], opts: &PackOptions) -> Result<Container> {
    let mut container = Container::with_options(opts);
    for asset in assets {
        container.push_asset(&asset.name, &asset.data, asset.codec, opts)?;
    }
    Ok(container)
}

/// Pack the bitmaps described by `dir/config.json` into a new image at `out`.
pub fn pack_from_dir<P: AsRef<Path>, Q: AsRef<Path>>(dir: P, out: Q, opts: &PackOptions) -> Result<Container> {
    let dir = dir.as_ref();
    let out = out.as_ref();
    let sidecar = Sidecar::load(dir.join(SIDECAR_NAME))?;
    let assets  = collect_assets(dir, &sidecar)?;

    let mut container = build(&assets, opts)?;
    let bytes = container.pack();

    info!("packing files in {}", out.display());
    for item in &container.items {
        info!(asset = %item.entry.name, size = item.entry.size, "packed");
    }
    fs::write(out, bytes)?;
    Ok(container)
}
