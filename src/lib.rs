pub mod compression;
pub use compression::{decompress, DecompressError, Decompressed, Decompressor, Operation};

mod palette;
pub use palette::{palette_to_rgb, ColorIndex, Palette, PALETTE_SIZE};

pub mod tile;
pub use tile::{copy_rect, sheet_to_pixels, tile_to_pixels, Canvas};

pub mod portrait;
pub use portrait::Portrait;

pub mod export;

mod rom;
pub use rom::{
    AddressMapping, BlockSet, CompressedBlock, FailedBlock, MappedPortrait, MappedRom,
    PaletteSource, PortraitEntry, PortraitTable, Rom, RomError, RomLoadError, RomMap,
    RomMetadata,
};
