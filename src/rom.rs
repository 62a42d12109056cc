use rayon::prelude::*;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    ops::{Bound, Range},
    path::Path,
    sync::Arc,
};
use thiserror::Error;

use crate::{
    compression::{self, DecompressError},
    palette::PALETTE_SIZE,
    portrait::{Portrait, SHEET_BYTES},
    Palette,
};

pub mod map;
pub use map::{AddressMapping, PaletteSource, PortraitEntry, PortraitTable, RomMap, RomMetadata};

/// Size of the part of a bank that is skipped by blocks crossing into the next
/// bank.
const BANK_MIRROR: usize = 0x8000;

#[derive(Debug, Clone)]
pub struct Rom {
    data: Vec<u8>,
    crc: u32,
}

#[derive(Error, Debug)]
pub enum RomError {
    #[error("Failed to read ROM file")]
    Read(#[from] std::io::Error),
    #[error("Read of {len:#x} bytes at {offset:#08x} is outside of the ROM")]
    OutOfBounds { offset: usize, len: usize },
    #[error("Block {start:#08x}-{end:#08x} can not be split at a bank boundary")]
    InvalidBlock { start: usize, end: usize },
}

/// Compressed bytes of one block together with the length the decompressor
/// is expected to consume.
#[derive(Debug, Clone)]
pub struct CompressedBlock {
    pub address: usize,
    pub data: Vec<u8>,
    pub expected_len: usize,
}

impl Rom {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        Ok(Self::from_bytes(fs::read(path.as_ref())?))
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        let crc = crc32fast::hash(&data);
        Rom { data, crc }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn crc(&self) -> u32 {
        self.crc
    }

    pub fn read(&self, offset: usize, len: usize) -> Result<&[u8], RomError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(RomError::OutOfBounds { offset, len })
    }

    /// Read a little endian 24 bit pointer.
    pub fn read_u24(&self, offset: usize) -> Result<u32, RomError> {
        let bytes = self.read(offset, 3)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]))
    }

    /// Read the compressed block spanning `start..end`.
    ///
    /// With `skip_bank_mirror`, a block longer than half a bank is stored in
    /// two parts with 0x8000 unused bytes between them. Only the low 15 bits
    /// of its length count, the second part ends at `end & 0x7fff` bytes.
    pub fn read_block(
        &self,
        start: usize,
        end: usize,
        skip_bank_mirror: bool,
    ) -> Result<CompressedBlock, RomError> {
        let length = end
            .checked_sub(start)
            .ok_or(RomError::InvalidBlock { start, end })?;

        if !skip_bank_mirror || length < BANK_MIRROR {
            return Ok(CompressedBlock {
                address: start,
                data: self.read(start, length)?.to_vec(),
                expected_len: length,
            });
        }

        let length = length & (BANK_MIRROR - 1);
        let second_len = end & (BANK_MIRROR - 1);
        let first_len = length
            .checked_sub(second_len)
            .ok_or(RomError::InvalidBlock { start, end })?;

        let mut data = Vec::with_capacity(length);
        data.extend_from_slice(self.read(start, first_len)?);
        data.extend_from_slice(self.read(start + first_len + BANK_MIRROR, second_len)?);

        Ok(CompressedBlock {
            address: start,
            data,
            expected_len: length,
        })
    }
}

/// Ordered set of block start addresses. Each block ends where the next one
/// begins, the last one at `end`.
#[derive(Debug, Clone)]
pub struct BlockSet {
    starts: BTreeSet<usize>,
    end: usize,
}

impl BlockSet {
    pub fn new(end: usize) -> Self {
        BlockSet {
            starts: BTreeSet::new(),
            end,
        }
    }

    /// Returns `false` if the address was already known or lies past the end.
    pub fn insert(&mut self, address: usize) -> bool {
        address < self.end && self.starts.insert(address)
    }

    pub fn contains(&self, address: usize) -> bool {
        self.starts.contains(&address)
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Where the block starting at `address` ends.
    pub fn end_of(&self, address: usize) -> Option<usize> {
        self.contains(address).then(|| self.next_start(address))
    }

    pub fn blocks(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.starts
            .iter()
            .map(|&start| start..self.next_start(start))
    }

    fn next_start(&self, address: usize) -> usize {
        self.starts
            .range((Bound::Excluded(address), Bound::Unbounded))
            .next()
            .copied()
            .unwrap_or(self.end)
    }
}

#[derive(Error, Debug)]
pub enum RomLoadError {
    #[error(transparent)]
    Rom(#[from] RomError),
    #[error("Failed to decompress block at {address:#08x}")]
    Decompress {
        address: usize,
        #[source]
        source: DecompressError,
    },
    #[error("No compatible data map found for the ROM")]
    IncompatibleMap,
    #[error("Portrait {portrait} points to {address:#08x}, outside of the tile data")]
    AddressOutOfRange { portrait: usize, address: usize },
    #[error("Portrait {portrait} references unknown palette {palette}")]
    UnknownPalette { portrait: usize, palette: usize },
}

#[derive(Debug, Clone)]
pub struct MappedPortrait {
    pub index: usize,
    /// File offset of the compressed tiles.
    pub address: usize,
    pub portrait: Arc<Portrait>,
    pub palette: Arc<Palette>,
}

/// A tile block that could not be decompressed. Its portraits are left out.
#[derive(Debug, Clone)]
pub struct FailedBlock {
    pub address: usize,
    pub error: DecompressError,
}

#[derive(Debug, Clone)]
pub struct MappedRom {
    pub metadata: RomMetadata,
    pub portraits: Vec<MappedPortrait>,
    pub failed: Vec<FailedBlock>,
}

impl MappedRom {
    pub fn new(rom: &Rom, map: &RomMap) -> Result<Self, RomLoadError> {
        let metadata = map
            .metadata_for(rom)
            .ok_or(RomLoadError::IncompatibleMap)?
            .clone();

        Self::load(rom, map, metadata)
    }

    /// Load the portraits even though the map does not list the ROM.
    pub fn new_forced(rom: &Rom, map: &RomMap) -> Result<Self, RomLoadError> {
        let metadata = map.metadata_for(rom).cloned().unwrap_or_else(|| RomMetadata {
            name: format!("Unknown ROM ({})", map.name),
            size: rom.data().len(),
            crc: Some(rom.crc()),
        });

        Self::load(rom, map, metadata)
    }

    fn load(rom: &Rom, map: &RomMap, metadata: RomMetadata) -> Result<Self, RomLoadError> {
        let entries = read_portrait_entries(rom, &map.portraits)?;

        let mut blocks = BlockSet::new(map.portraits.data_end);
        let mut addresses = Vec::with_capacity(entries.len());
        for (portrait, entry) in entries.iter().enumerate() {
            let address = map.mapping.to_file_address(entry.tile);
            if address >= map.portraits.data_end {
                return Err(RomLoadError::AddressOutOfRange { portrait, address });
            }

            blocks.insert(address);
            addresses.push(address);
        }
        log::info!(
            "Found {} tile blocks for {} portraits",
            blocks.len(),
            entries.len()
        );

        let decoded = blocks
            .blocks()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|range| (range.start, load_portrait(rom, range, &map.portraits)))
            .collect::<Vec<_>>();

        let mut sheets = BTreeMap::new();
        let mut failed = Vec::new();
        for (start, portrait) in decoded {
            match portrait {
                Ok(portrait) => {
                    sheets.insert(start, Arc::new(portrait));
                }
                Err(RomLoadError::Decompress { address, source }) => {
                    log::warn!("Skipping block at {:#08x}: {}", address, source);
                    failed.push(FailedBlock {
                        address,
                        error: source,
                    });
                }
                Err(err) => return Err(err),
            }
        }

        let palettes = load_palettes(rom, map, &entries)?;

        let portraits = addresses
            .into_iter()
            .zip(palettes)
            .enumerate()
            .filter_map(|(index, (address, palette))| {
                let portrait = sheets.get(&address)?.clone();
                Some(MappedPortrait {
                    index,
                    address,
                    portrait,
                    palette,
                })
            })
            .collect();

        Ok(Self {
            metadata,
            portraits,
            failed,
        })
    }
}

fn read_portrait_entries(
    rom: &Rom,
    table: &PortraitTable,
) -> Result<Vec<PortraitEntry>, RomError> {
    let mut entries = (0..table.count)
        .map(|i| -> Result<PortraitEntry, RomError> {
            let offset = table.table + i * table.entry_size;
            let tile = rom.read_u24(offset)?;
            let palette = if table.entry_size > 3 {
                rom.read(offset + 3, 1)?[0]
            } else {
                0
            };

            Ok(PortraitEntry { tile, palette })
        })
        .collect::<Result<Vec<_>, RomError>>()?;

    entries.extend_from_slice(&table.extra);
    Ok(entries)
}

fn load_portrait(
    rom: &Rom,
    range: Range<usize>,
    table: &PortraitTable,
) -> Result<Portrait, RomLoadError> {
    let block = rom.read_block(range.start, range.end, table.skip_bank_mirror)?;

    let result = compression::decompress(&block.data, SHEET_BYTES).map_err(|source| {
        RomLoadError::Decompress {
            address: block.address,
            source,
        }
    })?;

    if result.bytes_read != block.expected_len {
        log::warn!(
            "Tile length not equal at {:#08x}: read {:#x} bytes, block is {:#x} bytes",
            block.address,
            result.bytes_read,
            block.expected_len
        );
    }

    Ok(Portrait::from_tiles(&result.data, table.flip))
}

/// One palette per portrait, in portrait order. Identical palettes are shared.
fn load_palettes(
    rom: &Rom,
    map: &RomMap,
    entries: &[PortraitEntry],
) -> Result<Vec<Arc<Palette>>, RomLoadError> {
    let read_palette = |offset: usize| -> Result<Arc<Palette>, RomError> {
        Ok(Arc::new(Palette::from_slice(rom.read(offset, PALETTE_SIZE)?)))
    };

    match &map.palettes {
        PaletteSource::Table { table } => {
            let mut loaded = BTreeMap::new();

            (0..entries.len())
                .map(|portrait| -> Result<Arc<Palette>, RomLoadError> {
                    let pointer = rom.read_u24(table + portrait * 3)?;
                    let address = map.mapping.to_file_address(pointer);

                    if let Some(palette) = loaded.get(&address) {
                        return Ok(Arc::clone(palette));
                    }

                    let palette = read_palette(address)?;
                    loaded.insert(address, palette.clone());
                    Ok(palette)
                })
                .collect()
        }
        PaletteSource::Indexed { base, count } => {
            let palettes = (0..*count)
                .map(|i| read_palette(base + i * PALETTE_SIZE))
                .collect::<Result<Vec<_>, RomError>>()?;

            entries
                .iter()
                .enumerate()
                .map(|(portrait, entry)| {
                    let palette = usize::from(entry.palette);
                    palettes
                        .get(palette)
                        .cloned()
                        .ok_or(RomLoadError::UnknownPalette { portrait, palette })
                })
                .collect()
        }
    }
}
