use worlddiff_common::{Result, WorldDiffError};
use worlddiff_protocol::MaskEncoding;

/// How a chunk is laid out in its persisted tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskLayout {
    /// `Level` wrapper with `Sections`, `Palette`/`BlockStates` and `TileEntities`.
    Legacy,
    /// Flat root with `sections`, `block_states`/`biomes` and `block_entities`.
    Modern,
}

impl DiskLayout {
    pub fn name(self) -> &'static str {
        match self {
            DiskLayout::Legacy => "legacy",
            DiskLayout::Modern => "modern",
        }
    }

    pub fn sections_key(self) -> &'static str {
        match self {
            DiskLayout::Legacy => "Sections",
            DiskLayout::Modern => "sections",
        }
    }

    pub fn block_entities_key(self) -> &'static str {
        match self {
            DiskLayout::Legacy => "TileEntities",
            DiskLayout::Modern => "block_entities",
        }
    }
}

/// Everything that differs between supported chunk schemas.
#[derive(Debug, PartialEq, Eq)]
pub struct SchemaVersion {
    pub name: &'static str,
    /// Lowest `DataVersion` using this schema.
    pub data_version: i32,
    pub layout: DiskLayout,
    /// Inclusive bound of the section y a column may hold.
    pub min_section: i8,
    pub max_section: i8,
    /// Inclusive bound of the sections that carry block data.
    pub min_block_section: i8,
    pub max_block_section: i8,
    /// Bits in a light mask; bit 0 is `min_section`.
    pub light_sections: usize,
    pub light_masks: MaskEncoding,
    /// Light updates start with a trust-edges flag.
    pub trusted_edges: bool,
    /// Each network section starts with its non-air block count.
    pub block_count_prefix: bool,
    pub heightmaps: bool,
    /// Biomes live in each section rather than on the column.
    pub section_biomes: bool,
}

pub static V1_16: SchemaVersion = SchemaVersion {
    name: "1.16",
    data_version: 2566,
    layout: DiskLayout::Legacy,
    min_section: -1,
    max_section: 16,
    min_block_section: 0,
    max_block_section: 15,
    light_sections: 18,
    light_masks: MaskEncoding::VarInt,
    trusted_edges: true,
    block_count_prefix: true,
    heightmaps: true,
    section_biomes: false,
};

pub static V1_17: SchemaVersion = SchemaVersion {
    name: "1.17",
    data_version: 2724,
    layout: DiskLayout::Legacy,
    min_section: -1,
    max_section: 16,
    min_block_section: 0,
    max_block_section: 15,
    light_sections: 18,
    light_masks: MaskEncoding::LongArray,
    trusted_edges: true,
    block_count_prefix: true,
    heightmaps: true,
    section_biomes: false,
};

pub static V1_18: SchemaVersion = SchemaVersion {
    name: "1.18",
    data_version: 2860,
    layout: DiskLayout::Modern,
    min_section: -5,
    max_section: 19,
    min_block_section: -4,
    max_block_section: 19,
    light_sections: 26,
    light_masks: MaskEncoding::LongArray,
    trusted_edges: true,
    block_count_prefix: true,
    heightmaps: true,
    section_biomes: true,
};

pub static V1_20: SchemaVersion = SchemaVersion {
    name: "1.20",
    data_version: 3463,
    layout: DiskLayout::Modern,
    min_section: -5,
    max_section: 19,
    min_block_section: -4,
    max_block_section: 19,
    light_sections: 26,
    light_masks: MaskEncoding::LongArray,
    trusted_edges: false,
    block_count_prefix: true,
    heightmaps: true,
    section_biomes: true,
};

/// Newest first.
pub static VERSIONS: [&SchemaVersion; 4] = [&V1_20, &V1_18, &V1_17, &V1_16];

impl SchemaVersion {
    pub fn for_data_version(data_version: i32) -> Result<&'static SchemaVersion> {
        VERSIONS
            .iter()
            .copied()
            .find(|version| data_version >= version.data_version)
            .ok_or(WorldDiffError::UnsupportedVersion(data_version))
    }

    /// Every section y a column of this schema may hold, lowest first.
    pub fn section_range(&self) -> std::ops::RangeInclusive<i8> {
        self.min_section..=self.max_section
    }

    pub fn contains(&self, y: i32) -> bool {
        y >= self.min_section as i32 && y <= self.max_section as i32
    }

    pub fn holds_blocks(&self, y: i8) -> bool {
        y >= self.min_block_section && y <= self.max_block_section
    }

    pub fn block_sections(&self) -> std::ops::RangeInclusive<i8> {
        self.min_block_section..=self.max_block_section
    }

    /// Bit position of section `y` in a light mask.
    pub fn light_index(&self, y: i8) -> usize {
        (y as i32 - self.min_section as i32) as usize
    }

    /// Section y behind light mask bit `index`.
    pub fn light_section_y(&self, index: usize) -> i32 {
        self.min_section as i32 + index as i32
    }
}
