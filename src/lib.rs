pub mod error;
pub mod header;
pub mod item;
pub mod checksum;
pub mod codec;
pub mod bitmap;
pub mod classify;
pub mod container;
pub mod io_stream;
pub mod validate;
pub mod sidecar;
pub mod image;

pub use error::{ResError, Result};
pub use header::ContainerHeader;
pub use item::ItemEntry;
pub use codec::CodecId;
pub use bitmap::{BitmapInfo, ColorMasks};
pub use classify::{classify, Classification};
pub use container::{Container, Item};
pub use io_stream::{assemble, ContainerReader};
pub use validate::{validate_replacement, ValidationError};
pub use sidecar::{AssetRecord, Sidecar};
pub use image::{Asset, PackOptions};
