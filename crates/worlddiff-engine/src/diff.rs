use crate::compare::{compare_block_entities, compare_blocks};
use crate::mode::Mode;
use std::sync::Arc;
use worlddiff_common::{Result, WorldDiffError, REGION_SIZE};
use worlddiff_world::{Column, Palette, PaletteType, Region, Registries};

/// Runs one diff pass over a pair of regions.
pub struct DiffEngine {
    mode: Mode,
    registries: Arc<Registries>,
}

impl DiffEngine {
    pub fn new(mode: Mode, registries: Arc<Registries>) -> Self {
        DiffEngine { mode, registries }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Diffs every column present in both regions into a new region at the
    /// position of `a`. Inputs are expected in diff order; ADD callers pass
    /// the newer world first.
    pub fn diff_regions(&self, a: &Region, b: &Region) -> Result<Region> {
        let mut output = Region::empty(a.position, a.dimension);
        for local_z in 0..REGION_SIZE {
            for local_x in 0..REGION_SIZE {
                if !a.contains(local_x, local_z) || !b.contains(local_x, local_z) {
                    continue;
                }
                let column_a = a.column(local_x, local_z, &self.registries)?;
                let column_b = b.column(local_x, local_z, &self.registries)?;
                let (mut column_a, column_b) = match (column_a, column_b) {
                    (Some(column_a), Some(column_b)) => (column_a, column_b),
                    _ => continue,
                };
                self.diff_columns(&mut column_a, &column_b)?;
                output.insert_column(&column_a, &self.registries)?;
            }
        }
        Ok(output)
    }

    /// Rewrites `a` in place so it holds only what the mode keeps.
    pub fn diff_columns(&self, a: &mut Column, b: &Column) -> Result<()> {
        if a.version.layout != b.version.layout {
            return Err(WorldDiffError::VersionMismatch(
                a.version.layout.name(),
                b.version.layout.name(),
            ));
        }

        let mut cleared = Vec::new();
        for y in a.version.section_range() {
            let section_b = b.get_section(y);
            let section_a = match a.get_section_mut(y) {
                Some(section) => section,
                None => {
                    if let (Mode::Add, Some(section_b)) = (self.mode, section_b) {
                        a.set_section(section_b.clone())?;
                    }
                    continue;
                }
            };
            let section_b = match section_b {
                Some(section) => section,
                None => {
                    if self.mode != Mode::Del {
                        cleared.push(y);
                    }
                    continue;
                }
            };

            for index in 0..PaletteType::Blocks.entries() {
                if compare_blocks(self.mode, section_a.blocks.get(index), section_b.blocks.get(index)) {
                    section_a.blocks.set(index, 0)?;
                }
            }
        }

        for y in cleared {
            let mut air = a.create_empty_section(y, Palette::empty(PaletteType::Blocks));
            if let Some(old) = a.remove_section(y) {
                if old.biomes.is_some() {
                    air.biomes = old.biomes;
                }
            }
            a.set_section(air)?;
        }

        let mode = self.mode;
        a.block_entities
            .retain(|pos, entity| !compare_block_entities(mode, entity, b.block_entity(pos)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use worlddiff_common::{BlockPos, ChunkPos, Dimension, RegionPos};
    use worlddiff_nbt::Tag;
    use worlddiff_world::version::{V1_17, V1_20};
    use worlddiff_world::{BlockRegistry, Section};

    const BLOCKS_JSON: &str = r#"[
        {"id": 0, "name": "air", "minStateId": 0, "maxStateId": 0, "states": [], "defaultState": 0},
        {"id": 1, "name": "stone", "minStateId": 1, "maxStateId": 1, "states": [], "defaultState": 1}
    ]"#;

    fn engine(mode: Mode) -> DiffEngine {
        let registries = Registries::new(BlockRegistry::from_json(BLOCKS_JSON).unwrap());
        DiffEngine::new(mode, Arc::new(registries))
    }

    fn column() -> Column {
        Column::new(ChunkPos::new(0, 0, Dimension::Overworld), &V1_20)
    }

    fn filled(column: &Column, y: i8, id: u32) -> Section {
        let mut section = column.create_empty_section(y, Palette::single(PaletteType::Blocks, id));
        section.sky_light = Some(vec![0xFF; 2048]);
        section
    }

    fn chest(pos: BlockPos, id: &str) -> Tag {
        let mut tag = Tag::compound();
        tag.insert("id", Tag::String(id.to_string()));
        tag.insert("x", Tag::Int(pos.x));
        tag.insert("y", Tag::Int(pos.y));
        tag.insert("z", Tag::Int(pos.z));
        tag
    }

    #[test]
    fn test_voxels_cleared_per_mode() {
        for (mode, kept) in [(Mode::Del, 1), (Mode::Stay, 4095)] {
            let mut a = column();
            let section = filled(&a, 0, 1);
            a.set_section(section).unwrap();
            let mut b = column();
            let mut changed = filled(&b, 0, 1);
            changed.set_state_at(4, 5, 6, 0).unwrap();
            b.set_section(changed).unwrap();

            engine(mode).diff_columns(&mut a, &b).unwrap();
            let section = a.get_section(0).unwrap();
            assert_eq!(section.block_count(), kept, "{}", mode);
        }
    }

    #[test]
    fn test_section_only_in_b() {
        let mut b = column();
        b.set_section(filled(&b, 3, 1)).unwrap();

        let mut a = column();
        engine(Mode::Add).diff_columns(&mut a, &b).unwrap();
        assert_eq!(a.get_section(3), b.get_section(3));

        for mode in [Mode::Del, Mode::Stay] {
            let mut a = column();
            engine(mode).diff_columns(&mut a, &b).unwrap();
            assert!(a.get_section(3).is_none());
        }
    }

    #[test]
    fn test_section_only_in_a() {
        let b = column();
        let mut a = column();
        a.set_section(filled(&a, 7, 1)).unwrap();
        engine(Mode::Del).diff_columns(&mut a, &b).unwrap();
        assert_eq!(a.get_section(7).unwrap().block_count(), 4096);

        for mode in [Mode::Add, Mode::Stay] {
            let mut a = column();
            a.set_section(filled(&a, 7, 1)).unwrap();
            engine(mode).diff_columns(&mut a, &b).unwrap();
            let section = a.get_section(7).unwrap();
            assert_eq!(section.block_count(), 0);
            assert!(section.sky_light.is_none());
            assert!(section.biomes.is_some());
        }
    }

    #[test]
    fn test_block_entities_follow_mode() {
        let kept_chest = BlockPos::new(1, 64, 1);
        let swapped = BlockPos::new(2, 64, 2);
        let gone = BlockPos::new(3, 64, 3);

        let mut a = column();
        for pos in [kept_chest, swapped, gone] {
            a.block_entities.insert(pos, chest(pos, "minecraft:chest"));
        }
        let mut b = column();
        b.block_entities.insert(kept_chest, chest(kept_chest, "minecraft:chest"));
        b.block_entities.insert(swapped, chest(swapped, "minecraft:barrel"));

        let mut del = a.clone();
        engine(Mode::Del).diff_columns(&mut del, &b).unwrap();
        let mut remaining: Vec<_> = del.block_entities.keys().copied().collect();
        remaining.sort();
        assert_eq!(remaining, vec![swapped, gone]);

        let mut stay = a.clone();
        engine(Mode::Stay).diff_columns(&mut stay, &b).unwrap();
        assert_eq!(stay.block_entities.keys().copied().collect::<Vec<_>>(), vec![kept_chest]);
    }

    #[test]
    fn test_slots_missing_on_one_side_are_not_decoded() {
        let engine = engine(Mode::Del);
        let mut a = Region::empty(RegionPos::new(0, 0), Dimension::Overworld);
        a.insert_column(&column(), &engine.registries).unwrap();

        let mut other = Column::new(ChunkPos::new(1, 0, Dimension::Overworld), &V1_20);
        other.set_section(filled(&other, 0, 1)).unwrap();
        let mut b = Region::empty(RegionPos::new(0, 0), Dimension::Overworld);
        b.insert_column(&other, &engine.registries).unwrap();
        // unknown compression id in the only payload of b
        let mut bytes = b.to_bytes().unwrap();
        bytes[8192 + 4] = 99;
        let b = Region::from_bytes(RegionPos::new(0, 0), Dimension::Overworld, &bytes).unwrap();
        assert!(b.column(1, 0, &engine.registries).is_err());

        let output = engine.diff_regions(&a, &b).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_layout_mismatch() {
        let mut a = column();
        let b = Column::new(ChunkPos::new(0, 0, Dimension::Overworld), &V1_17);
        assert_matches!(
            engine(Mode::Del).diff_columns(&mut a, &b),
            Err(WorldDiffError::VersionMismatch("modern", "legacy"))
        );
    }
}
