use crate::container::PalettedContainer;
use crate::palette::{Palette, PaletteType};
use worlddiff_common::Result;

/// Bytes in one nibble-packed light array.
pub const LIGHT_LEN: usize = 2048;

/// One 16x16x16 slice of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub y: i8,
    pub blocks: PalettedContainer,
    /// Per-section biomes (1.18+). Older layouts keep biomes on the column.
    pub biomes: Option<PalettedContainer>,
    pub sky_light: Option<Vec<u8>>,
    pub block_light: Option<Vec<u8>>,
}

impl Section {
    pub fn new(y: i8, palette: Palette) -> Self {
        Section {
            y,
            blocks: PalettedContainer::new(palette),
            biomes: None,
            sky_light: None,
            block_light: None,
        }
    }

    /// Index of a section-local coordinate, YZX order.
    pub fn index(x: usize, y: usize, z: usize) -> usize {
        (y << 8) | (z << 4) | x
    }

    pub fn state_at(&self, x: usize, y: usize, z: usize) -> u32 {
        self.blocks.get(Self::index(x, y, z))
    }

    pub fn set_state_at(&mut self, x: usize, y: usize, z: usize, id: u32) -> Result<()> {
        self.blocks.set(Self::index(x, y, z), id)
    }

    pub fn block_count(&self) -> u16 {
        self.blocks.count_non_air()
    }

    /// True when the section holds no blocks and no light.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_air() && self.sky_light.is_none() && self.block_light.is_none()
    }

    pub fn biomes_or_default(&self) -> PalettedContainer {
        self.biomes
            .clone()
            .unwrap_or_else(|| PalettedContainer::filled(PaletteType::Biomes, 0))
    }
}
