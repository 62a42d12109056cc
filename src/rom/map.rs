use serde::{
    de::{self, value::MapAccessDeserializer, Visitor},
    Deserialize,
};
use std::sync::{Arc, LazyLock};

use super::Rom;

static INBUILT_MAPS: LazyLock<Vec<Arc<RomMap>>> = LazyLock::new(|| {
    const INBUILT_MAP_SRC: &[&str] = &[include_str!("fe4_map.toml"), include_str!("fe5_map.toml")];
    INBUILT_MAP_SRC
        .iter()
        .map(|&map| Arc::new(RomMap::parse(map).expect("Failed to parse inbuilt map")))
        .collect()
});

/// Describes where the portrait data of one game lives.
#[derive(Debug, Clone, Deserialize)]
pub struct RomMap {
    /// Short name used to pick the map on the command line.
    pub name: String,
    pub supported_roms: Vec<RomMetadata>,

    pub mapping: AddressMapping,
    pub portraits: PortraitTable,
    pub palettes: PaletteSource,
}

impl RomMap {
    pub fn parse(map: &str) -> Result<RomMap, toml::de::Error> {
        toml::de::from_str(map)
    }

    pub fn inbuilt() -> &'static [Arc<RomMap>] {
        &INBUILT_MAPS
    }

    pub fn find_inbuilt(name: &str) -> Option<Arc<RomMap>> {
        INBUILT_MAPS
            .iter()
            .find(|map| map.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Find the inbuilt map for a ROM. A map listing the ROM's CRC wins,
    /// otherwise the map is only picked if it is the single compatible one.
    pub fn find_inbuilt_for(rom: &Rom) -> Option<Arc<RomMap>> {
        let crc = rom.crc();

        if let Some(map) = INBUILT_MAPS.iter().find(|map| {
            map.supported_roms
                .iter()
                .any(|rom_type| rom_type.crc == Some(crc))
        }) {
            return Some(map.clone());
        }

        let mut compatible = INBUILT_MAPS.iter().filter(|map| map.is_compatible_with(rom));
        match (compatible.next(), compatible.next()) {
            (Some(map), None) => Some(map.clone()),
            _ => None,
        }
    }

    pub fn is_compatible_with(&self, rom: &Rom) -> bool {
        self.metadata_for(rom).is_some()
    }

    pub fn metadata_for(&self, rom: &Rom) -> Option<&RomMetadata> {
        self.supported_roms.iter().find(|rom_type| {
            rom_type.size == rom.data().len() && rom_type.crc.map_or(true, |crc| crc == rom.crc())
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RomMetadata {
    pub name: String,
    /// Size of an unheadered ROM image.
    pub size: usize,
    #[serde(default)]
    pub crc: Option<u32>,
}

/// How bus addresses in pointer tables translate to file offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressMapping {
    HiRom,
    LoRom,
}

impl AddressMapping {
    pub const fn to_file_address(self, address: u32) -> usize {
        let offset = match self {
            AddressMapping::HiRom => address & 0x3f_ffff,
            AddressMapping::LoRom => ((address & 0x7f_0000) >> 1) + (address & 0x7fff),
        };
        offset as usize
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortraitTable {
    /// File offset of the pointer table.
    pub table: usize,
    /// Number of entries stored in the table.
    pub count: usize,
    /// 3 for a bare tile pointer, 4 when a palette index follows the pointer.
    #[serde(default = "default_entry_size")]
    pub entry_size: usize,
    /// File offset just past the last compressed tile block.
    pub data_end: usize,

    /// Blocks longer than a bank half continue after skipping 0x8000 bytes.
    #[serde(default)]
    pub skip_bank_mirror: bool,
    /// Mirror the portraits horizontally while assembling them.
    #[serde(default)]
    pub flip: bool,

    /// Entries missing from the table in the ROM.
    #[serde(default)]
    pub extra: Vec<PortraitEntry>,
}

const fn default_entry_size() -> usize {
    3
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortraitEntry {
    /// Bus address of the compressed tiles.
    pub tile: u32,
    /// Palette number, only used with [`PaletteSource::Indexed`].
    pub palette: u8,
}

impl PortraitEntry {
    /// Split a raw table entry: pointer in the low 24 bits, palette above.
    pub const fn from_raw(raw: u32) -> Self {
        PortraitEntry {
            tile: raw & 0xff_ffff,
            palette: (raw >> 24) as u8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PaletteSource {
    /// A table of 3 byte pointers, one per portrait.
    Table { table: usize },
    /// `count` palettes stored back to back, selected by the palette number of
    /// the portrait entry.
    Indexed { base: usize, count: usize },
}

impl<'de> Deserialize<'de> for PortraitEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(PortraitEntryVisitor)
    }
}

struct PortraitEntryVisitor;

#[derive(Deserialize)]
struct PortraitEntryFields {
    tile: u32,
    #[serde(default)]
    palette: u8,
}

impl<'de> Visitor<'de> for PortraitEntryVisitor {
    type Value = PortraitEntry;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a raw table entry or a map with a tile address")
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let raw = u32::try_from(value)
            .map_err(|_| de::Error::custom(format!("table entry {value:#x} out of range")))?;
        Ok(PortraitEntry::from_raw(raw))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let raw = u32::try_from(value)
            .map_err(|_| de::Error::custom(format!("table entry {value:#x} out of range")))?;
        Ok(PortraitEntry::from_raw(raw))
    }

    fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
    where
        A: de::MapAccess<'de>,
    {
        let fields = PortraitEntryFields::deserialize(MapAccessDeserializer::new(map))?;

        if fields.tile > 0xff_ffff {
            return Err(de::Error::custom("tile address must fit in 24 bits"));
        }

        Ok(PortraitEntry {
            tile: fields.tile,
            palette: fields.palette,
        })
    }
}
