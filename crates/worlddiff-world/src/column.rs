use crate::container::PalettedContainer;
use crate::light::LightChannel;
use crate::palette::{Palette, PaletteType};
use crate::registry::Registries;
use crate::section::{Section, LIGHT_LEN};
use crate::version::{DiskLayout, SchemaVersion};
use std::collections::{BTreeMap, HashMap};
use worlddiff_common::{BlockPos, ChunkPos, Dimension, Result, WorldDiffError};
use worlddiff_logger::{log, LogSeverity};
use worlddiff_nbt::Tag;
use worlddiff_protocol::{LightMask, PacketBuffer};

/// Fields the column models itself; everything else is carried through.
const MODELLED_KEYS: [&str; 9] = [
    "DataVersion",
    "xPos",
    "zPos",
    "Sections",
    "sections",
    "TileEntities",
    "block_entities",
    "Heightmaps",
    "Biomes",
];

fn int_field(tag: &Tag, key: &str) -> Result<i32> {
    tag.get(key)
        .and_then(Tag::as_i32)
        .ok_or_else(|| WorldDiffError::unexpected_tag(format!("missing integer {}", key)))
}

fn light_field(section: &Tag, key: &str, y: i32) -> Result<Option<Vec<u8>>> {
    match section.get(key) {
        None => Ok(None),
        Some(tag) => {
            let bytes = tag.as_byte_array().ok_or_else(|| {
                WorldDiffError::unexpected_tag(format!("{} of section {} is not a byte array", key, y))
            })?;
            if bytes.len() != LIGHT_LEN {
                return Err(WorldDiffError::unexpected_tag(format!(
                    "{} of section {} is {} bytes",
                    key,
                    y,
                    bytes.len()
                )));
            }
            Ok(Some(bytes.iter().map(|&b| b as u8).collect()))
        }
    }
}

fn read_container(ty: PaletteType, tag: &Tag, registries: &Registries) -> Result<PalettedContainer> {
    PalettedContainer::from_nbt(ty, tag, registries.for_type(ty))
}

/// One vertical stack of sections with its block entities.
#[derive(Debug, Clone)]
pub struct Column {
    pub position: ChunkPos,
    pub version: &'static SchemaVersion,
    pub data_version: i32,
    sections: BTreeMap<i8, Section>,
    pub block_entities: HashMap<BlockPos, Tag>,
    pub heightmaps: Option<Tag>,
    /// Column-wide biome array of the legacy layout, kept opaque.
    pub biomes: Option<Tag>,
    /// Unmodelled fields of the chunk (or its `Level` compound).
    extra: HashMap<String, Tag>,
    /// Legacy layout only: root fields next to `Level`.
    outer: HashMap<String, Tag>,
}

impl Column {
    pub fn new(position: ChunkPos, version: &'static SchemaVersion) -> Self {
        Column {
            position,
            version,
            data_version: version.data_version,
            sections: BTreeMap::new(),
            block_entities: HashMap::new(),
            heightmaps: None,
            biomes: None,
            extra: HashMap::new(),
            outer: HashMap::new(),
        }
    }

    pub fn get_section(&self, y: i8) -> Option<&Section> {
        self.sections.get(&y)
    }

    pub fn get_section_mut(&mut self, y: i8) -> Option<&mut Section> {
        self.sections.get_mut(&y)
    }

    /// Stores `section` at its own y, replacing what was there.
    pub fn set_section(&mut self, section: Section) -> Result<()> {
        if !self.version.contains(section.y as i32) {
            return Err(WorldDiffError::SectionOutOfRange {
                y: section.y as i32,
                min: self.version.min_section,
                max: self.version.max_section,
            });
        }
        self.sections.insert(section.y, section);
        Ok(())
    }

    pub fn remove_section(&mut self, y: i8) -> Option<Section> {
        self.sections.remove(&y)
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    /// Air section for this column's schema. Used for parsed sections and for
    /// placeholders that only carry light.
    pub fn create_empty_section(&self, y: i8, palette: Palette) -> Section {
        let mut section = Section::new(y, palette);
        if self.version.section_biomes && self.version.holds_blocks(y) {
            section.biomes = Some(PalettedContainer::filled(PaletteType::Biomes, 0));
        }
        section
    }

    pub fn block_entity(&self, pos: &BlockPos) -> Option<&Tag> {
        self.block_entities.get(pos)
    }

    pub fn extra(&self, key: &str) -> Option<&Tag> {
        self.extra.get(key)
    }

    /// Parses a chunk root as stored in a region file.
    pub fn from_nbt(root: &Tag, dimension: Dimension, registries: &Registries) -> Result<Column> {
        let data_version = root
            .get("DataVersion")
            .and_then(Tag::as_i32)
            .ok_or(WorldDiffError::UnsupportedVersion(0))?;
        let version = SchemaVersion::for_data_version(data_version)?;

        let (level, outer) = match version.layout {
            DiskLayout::Legacy => {
                let level = root
                    .get("Level")
                    .ok_or_else(|| WorldDiffError::unexpected_tag("missing Level"))?;
                let outer = root
                    .as_compound()
                    .map(|map| {
                        map.iter()
                            .filter(|(key, _)| key.as_str() != "Level" && key.as_str() != "DataVersion")
                            .map(|(key, tag)| (key.clone(), tag.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                (level, outer)
            }
            DiskLayout::Modern => (root, HashMap::new()),
        };

        let position = ChunkPos::new(int_field(level, "xPos")?, int_field(level, "zPos")?, dimension);
        let mut column = Column::new(position, version);
        column.data_version = data_version;
        column.outer = outer;

        if let Some(sections) = level.get(version.layout.sections_key()) {
            let sections = sections
                .as_list()
                .ok_or_else(|| WorldDiffError::unexpected_tag("sections is not a list"))?;
            for tag in sections {
                column.read_nbt_section(tag, registries)?;
            }
        }

        if let Some(entities) = level.get(version.layout.block_entities_key()) {
            let entities = entities
                .as_list()
                .ok_or_else(|| WorldDiffError::unexpected_tag("block entities are not a list"))?;
            for entity in entities {
                let pos = BlockPos::new(
                    int_field(entity, "x")?,
                    int_field(entity, "y")?,
                    int_field(entity, "z")?,
                );
                column.block_entities.insert(pos, entity.clone());
            }
        }

        column.heightmaps = level.get("Heightmaps").cloned();
        if version.layout == DiskLayout::Legacy {
            column.biomes = level.get("Biomes").cloned();
        }
        if let Some(map) = level.as_compound() {
            column.extra = map
                .iter()
                .filter(|(key, _)| !MODELLED_KEYS.contains(&key.as_str()))
                .map(|(key, tag)| (key.clone(), tag.clone()))
                .collect();
        }
        Ok(column)
    }

    fn read_nbt_section(&mut self, tag: &Tag, registries: &Registries) -> Result<()> {
        let y = int_field(tag, "Y")?;
        if !self.version.contains(y) {
            log(
                format!(
                    "Dropping section {} of column {} {}, outside of {}..={}",
                    y, self.position.x, self.position.z, self.version.min_section, self.version.max_section
                ),
                LogSeverity::Debug,
            );
            return Ok(());
        }

        let y = y as i8;
        let blocks = match self.version.layout {
            DiskLayout::Legacy => {
                PalettedContainer::from_legacy_nbt(tag, registries.for_type(PaletteType::Blocks))?
            }
            DiskLayout::Modern => match tag.get("block_states") {
                Some(states) => Some(read_container(PaletteType::Blocks, states, registries)?),
                None => None,
            },
        };

        let mut section = self.create_empty_section(y, Palette::empty(PaletteType::Blocks));
        if let Some(blocks) = blocks {
            section.blocks = blocks;
        }
        if let Some(biomes) = tag.get("biomes") {
            section.biomes = Some(read_container(PaletteType::Biomes, biomes, registries)?);
        }
        section.sky_light = light_field(tag, "SkyLight", y as i32)?;
        section.block_light = light_field(tag, "BlockLight", y as i32)?;
        self.sections.insert(y, section);
        Ok(())
    }

    fn write_nbt_section(&self, section: &Section, registries: &Registries) -> Result<Tag> {
        let mut tag = Tag::compound();
        tag.insert("Y", Tag::Byte(section.y));
        if self.version.holds_blocks(section.y) {
            match self.version.layout {
                DiskLayout::Legacy => {
                    if !section.blocks.is_air() {
                        section
                            .blocks
                            .write_legacy_nbt(&mut tag, registries.for_type(PaletteType::Blocks))?;
                    }
                }
                DiskLayout::Modern => {
                    tag.insert(
                        "block_states",
                        section.blocks.to_nbt(registries.for_type(PaletteType::Blocks))?,
                    );
                    tag.insert(
                        "biomes",
                        section
                            .biomes_or_default()
                            .to_nbt(registries.for_type(PaletteType::Biomes))?,
                    );
                }
            }
        }
        if let Some(light) = &section.sky_light {
            tag.insert("SkyLight", Tag::byte_array_from(light));
        }
        if let Some(light) = &section.block_light {
            tag.insert("BlockLight", Tag::byte_array_from(light));
        }
        Ok(tag)
    }

    /// Chunk root in this column's schema.
    pub fn to_nbt(&self, registries: &Registries) -> Result<Tag> {
        let mut level = Tag::Compound(self.extra.clone());
        level.insert("xPos", Tag::Int(self.position.x));
        level.insert("zPos", Tag::Int(self.position.z));

        let mut sections = Vec::with_capacity(self.sections.len());
        for section in self.sections.values() {
            sections.push(self.write_nbt_section(section, registries)?);
        }
        level.insert(self.version.layout.sections_key(), Tag::List(sections));

        let mut entities: Vec<(&BlockPos, &Tag)> = self.block_entities.iter().collect();
        entities.sort_by_key(|(pos, _)| **pos);
        level.insert(
            self.version.layout.block_entities_key(),
            Tag::List(entities.into_iter().map(|(_, tag)| tag.clone()).collect()),
        );

        if self.version.heightmaps {
            if let Some(heightmaps) = &self.heightmaps {
                level.insert("Heightmaps", heightmaps.clone());
            }
        }

        match self.version.layout {
            DiskLayout::Legacy => {
                if let Some(biomes) = &self.biomes {
                    level.insert("Biomes", biomes.clone());
                }
                let mut root = Tag::Compound(self.outer.clone());
                root.insert("DataVersion", Tag::Int(self.data_version));
                root.insert("Level", level);
                Ok(root)
            }
            DiskLayout::Modern => {
                level.insert("DataVersion", Tag::Int(self.data_version));
                Ok(level)
            }
        }
    }

    /// Reads the section payload of a chunk-data packet. `present` flags the
    /// block sections included, bit 0 being the lowest block section.
    pub fn read_chunk_sections(&mut self, buffer: &mut PacketBuffer, present: &LightMask) -> Result<()> {
        let version = self.version;
        for (bit, y) in version.block_sections().enumerate() {
            if !present.get(bit) {
                continue;
            }
            if version.block_count_prefix {
                // recomputed from the palette when written
                buffer.read_i16()?;
            }
            let blocks = PalettedContainer::read(PaletteType::Blocks, buffer)?;
            let biomes = if version.section_biomes {
                Some(PalettedContainer::read(PaletteType::Biomes, buffer)?)
            } else {
                None
            };

            let section = self
                .sections
                .entry(y)
                .or_insert_with(|| Section::new(y, Palette::empty(PaletteType::Blocks)));
            section.blocks = blocks;
            if biomes.is_some() {
                section.biomes = biomes;
            }
        }
        Ok(())
    }

    /// Writes the section payload of a chunk-data packet and returns the mask
    /// of sections written. Schemas with per-section biomes send every block
    /// section, missing ones as air.
    pub fn write_chunk_sections(&self, buffer: &mut PacketBuffer) -> LightMask {
        let version = self.version;
        let mut present = LightMask::new();
        for (bit, y) in version.block_sections().enumerate() {
            let section = match self.sections.get(&y) {
                Some(section) => section,
                None if version.section_biomes => {
                    present.set(bit, true);
                    let air = self.create_empty_section(y, Palette::single(PaletteType::Blocks, 0));
                    Self::write_network_section(version, &air, buffer);
                    continue;
                }
                None => continue,
            };
            if !version.section_biomes && section.blocks.is_air() {
                continue;
            }
            present.set(bit, true);
            Self::write_network_section(version, section, buffer);
        }
        present
    }

    fn write_network_section(version: &SchemaVersion, section: &Section, buffer: &mut PacketBuffer) {
        if version.block_count_prefix {
            buffer.write_i16(section.block_count() as i16);
        }
        section.blocks.write(buffer);
        if version.section_biomes {
            section.biomes_or_default().write(buffer);
        }
    }

    /// Applies a light-update payload. Sections that only receive light get an
    /// air placeholder; sections outside this schema's bound are ignored.
    pub fn update_light(&mut self, buffer: &mut PacketBuffer) -> Result<()> {
        let x = buffer.read_varint()?;
        let z = buffer.read_varint()?;
        if x != self.position.x || z != self.position.z {
            return Err(WorldDiffError::ProtocolError(format!(
                "light update for {} {} applied to column {} {}",
                x, z, self.position.x, self.position.z
            )));
        }
        if self.version.trusted_edges {
            buffer.read_bool()?;
        }

        let encoding = self.version.light_masks;
        let sky = LightMask::read(buffer, encoding)?;
        let block = LightMask::read(buffer, encoding)?;
        let empty_sky = LightMask::read(buffer, encoding)?;
        let empty_block = LightMask::read(buffer, encoding)?;

        let sky_arrays = LightChannel::Sky.read_arrays(buffer, self.version, &sky, &empty_sky)?;
        let block_arrays =
            LightChannel::Block.read_arrays(buffer, self.version, &block, &empty_block)?;

        for (channel, arrays) in [(LightChannel::Sky, sky_arrays), (LightChannel::Block, block_arrays)] {
            for (y, data) in arrays {
                if !self.version.contains(y) {
                    continue;
                }
                let y = y as i8;
                if !self.sections.contains_key(&y) {
                    let placeholder = self.create_empty_section(y, Palette::empty(PaletteType::Blocks));
                    self.sections.insert(y, placeholder);
                }
                if let Some(section) = self.sections.get_mut(&y) {
                    channel.set(section, Some(data));
                }
            }
        }
        Ok(())
    }

    /// Writes this column's light as a light-update payload. All-zero arrays
    /// are flagged in the empty masks instead of being sent.
    pub fn write_light(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_varint(self.position.x);
        buffer.write_varint(self.position.z);
        if self.version.trusted_edges {
            buffer.write_bool(true);
        }

        let encoding = self.version.light_masks;
        let (sky, empty_sky) = LightChannel::Sky.masks(&self.sections, self.version);
        let (block, empty_block) = LightChannel::Block.masks(&self.sections, self.version);
        sky.write(buffer, encoding)?;
        block.write(buffer, encoding)?;
        empty_sky.write(buffer, encoding)?;
        empty_block.write(buffer, encoding)?;

        LightChannel::Sky.write_arrays(buffer, self.version, &self.sections, &sky);
        LightChannel::Block.write_arrays(buffer, self.version, &self.sections, &block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::registries;
    use crate::version::{V1_16, V1_17, V1_20};
    use assert_matches::assert_matches;

    fn block_entity(id: &str, x: i32, y: i32, z: i32) -> Tag {
        let mut tag = Tag::compound();
        tag.insert("id", Tag::String(id.to_string()));
        tag.insert("x", Tag::Int(x));
        tag.insert("y", Tag::Int(y));
        tag.insert("z", Tag::Int(z));
        tag
    }

    fn sample_column(version: &'static SchemaVersion) -> Column {
        let mut column = Column::new(ChunkPos::new(33, -2, Dimension::Overworld), version);
        let mut stone = column.create_empty_section(2, Palette::empty(PaletteType::Blocks));
        stone.set_state_at(0, 0, 0, 1).unwrap();
        stone.set_state_at(15, 15, 15, 85).unwrap();
        stone.sky_light = Some(vec![0x11; LIGHT_LEN]);
        column.set_section(stone).unwrap();
        column
            .block_entities
            .insert(BlockPos::new(528, 32, -32), block_entity("minecraft:chest", 528, 32, -32));
        column.heightmaps = Some(Tag::compound());
        column
    }

    #[test]
    fn test_set_section_respects_bound() {
        let mut column = Column::new(ChunkPos::new(0, 0, Dimension::Overworld), &V1_20);
        assert!(column.set_section(Section::new(-5, Palette::empty(PaletteType::Blocks))).is_ok());
        assert!(column.set_section(Section::new(19, Palette::empty(PaletteType::Blocks))).is_ok());
        assert_matches!(
            column.set_section(Section::new(20, Palette::empty(PaletteType::Blocks))),
            Err(WorldDiffError::SectionOutOfRange { y: 20, min: -5, max: 19 })
        );

        let mut legacy = Column::new(ChunkPos::new(0, 0, Dimension::Overworld), &V1_16);
        assert_matches!(
            legacy.set_section(Section::new(-4, Palette::empty(PaletteType::Blocks))),
            Err(WorldDiffError::SectionOutOfRange { .. })
        );
    }

    #[test]
    fn test_empty_section_factory() {
        let column = Column::new(ChunkPos::new(0, 0, Dimension::Overworld), &V1_20);
        let section = column.create_empty_section(0, Palette::empty(PaletteType::Blocks));
        assert_eq!(section.block_count(), 0);
        assert!(section.biomes.is_some());
        assert!(column.create_empty_section(-5, Palette::empty(PaletteType::Blocks)).biomes.is_none());
        let legacy = Column::new(ChunkPos::new(0, 0, Dimension::Overworld), &V1_17);
        assert!(legacy.create_empty_section(0, Palette::empty(PaletteType::Blocks)).biomes.is_none());
    }

    #[test]
    fn test_modern_nbt_round_trip() {
        let registries = registries();
        let mut column = sample_column(&V1_20);
        column.extra.insert("Status".to_string(), Tag::String("minecraft:full".into()));
        column.extra.insert("yPos".to_string(), Tag::Int(-4));

        let root = column.to_nbt(&registries).unwrap();
        assert_eq!(root.get("DataVersion"), Some(&Tag::Int(3463)));
        assert_eq!(root.get("xPos"), Some(&Tag::Int(33)));
        assert!(root.get("sections").is_some());
        assert!(root.get("Level").is_none());

        let read = Column::from_nbt(&root, Dimension::Overworld, &registries).unwrap();
        assert_eq!(read.position, column.position);
        assert_eq!(read.version.name, "1.20");
        let section = read.get_section(2).unwrap();
        assert_eq!(section.state_at(0, 0, 0), 1);
        assert_eq!(section.state_at(15, 15, 15), 85);
        assert_eq!(section.state_at(1, 0, 0), 0);
        assert_eq!(section.sky_light.as_deref(), Some(&[0x11; LIGHT_LEN][..]));
        assert_eq!(read.block_entities.len(), 1);
        assert_eq!(read.extra("Status"), Some(&Tag::String("minecraft:full".into())));
        assert_eq!(read.extra("yPos"), Some(&Tag::Int(-4)));
        assert!(read.heightmaps.is_some());
    }

    #[test]
    fn test_legacy_nbt_round_trip() {
        let registries = registries();
        let mut column = sample_column(&V1_16);
        column.biomes = Some(Tag::IntArray(vec![1; 1024]));
        column.outer.insert("ForgeCaps".to_string(), Tag::compound());

        let root = column.to_nbt(&registries).unwrap();
        let level = root.get("Level").unwrap();
        assert!(level.get("Sections").is_some());
        assert!(level.get("TileEntities").is_some());
        assert_eq!(root.get("ForgeCaps"), Some(&Tag::compound()));

        let read = Column::from_nbt(&root, Dimension::Overworld, &registries).unwrap();
        assert_eq!(read.version.name, "1.16");
        assert_eq!(read.get_section(2).unwrap().state_at(15, 15, 15), 85);
        assert_eq!(read.biomes, Some(Tag::IntArray(vec![1; 1024])));
        assert_eq!(read.outer.get("ForgeCaps"), Some(&Tag::compound()));
    }

    #[test]
    fn test_unsupported_and_malformed_roots() {
        let registries = registries();
        let mut root = Tag::compound();
        assert_matches!(
            Column::from_nbt(&root, Dimension::Overworld, &registries),
            Err(WorldDiffError::UnsupportedVersion(0))
        );
        root.insert("DataVersion", Tag::Int(1976));
        assert_matches!(
            Column::from_nbt(&root, Dimension::Overworld, &registries),
            Err(WorldDiffError::UnsupportedVersion(1976))
        );
        root.insert("DataVersion", Tag::Int(3700));
        assert_matches!(
            Column::from_nbt(&root, Dimension::Overworld, &registries),
            Err(WorldDiffError::UnexpectedTag(_))
        );
        root.insert("DataVersion", Tag::Int(2730));
        assert_matches!(
            Column::from_nbt(&root, Dimension::Overworld, &registries),
            Err(WorldDiffError::UnexpectedTag(_))
        );
    }

    #[test]
    fn test_out_of_bound_sections_are_dropped() {
        let registries = registries();
        let mut section = Tag::compound();
        section.insert("Y", Tag::Byte(25));
        let mut root = Tag::compound();
        root.insert("DataVersion", Tag::Int(3700));
        root.insert("xPos", Tag::Int(0));
        root.insert("zPos", Tag::Int(0));
        root.insert("sections", Tag::List(vec![section]));

        let column = Column::from_nbt(&root, Dimension::Overworld, &registries).unwrap();
        assert_eq!(column.sections().count(), 0);
    }

    #[test]
    fn test_chunk_sections_round_trip() {
        for version in [&V1_16, &V1_20] {
            let column = sample_column(version);
            let mut buffer = PacketBuffer::new();
            let present = column.write_chunk_sections(&mut buffer);

            let mut read = Column::new(column.position, version);
            read.read_chunk_sections(&mut buffer, &present).unwrap();
            assert_eq!(buffer.remaining(), 0);
            assert_eq!(read.get_section(2).unwrap().state_at(15, 15, 15), 85);
            assert_eq!(read.get_section(2).unwrap().block_count(), 2);
        }
        // legacy schemas skip air sections, modern ones send all 24
        assert_eq!(sample_column(&V1_16).write_chunk_sections(&mut PacketBuffer::new()).count(), 1);
        assert_eq!(sample_column(&V1_20).write_chunk_sections(&mut PacketBuffer::new()).count(), 24);
    }

    #[test]
    fn test_light_round_trip() {
        for version in [&V1_16, &V1_17, &V1_20] {
            let mut column = sample_column(version);
            let mut dark = column.create_empty_section(5, Palette::empty(PaletteType::Blocks));
            dark.block_light = Some(vec![0; LIGHT_LEN]);
            column.set_section(dark).unwrap();

            let mut buffer = PacketBuffer::new();
            column.write_light(&mut buffer).unwrap();

            let mut read = Column::new(column.position, version);
            read.update_light(&mut buffer).unwrap();
            assert_eq!(buffer.remaining(), 0);
            assert_eq!(
                read.get_section(2).unwrap().sky_light.as_deref(),
                Some(&[0x11; LIGHT_LEN][..])
            );
            assert_eq!(
                read.get_section(5).unwrap().block_light.as_deref(),
                Some(&[0; LIGHT_LEN][..])
            );
            // light-only placeholders hold air
            assert_eq!(read.get_section(2).unwrap().block_count(), 0);
            assert!(read.get_section(3).is_none());
        }
    }

    #[test]
    fn test_light_masks_on_the_wire() {
        let column = sample_column(&V1_16);
        let mut buffer = PacketBuffer::new();
        column.write_light(&mut buffer).unwrap();

        let mut wire = PacketBuffer::from_bytes(buffer.into_bytes());
        assert_eq!(wire.read_varint().unwrap(), 33);
        assert_eq!(wire.read_varint().unwrap(), -2);
        assert!(wire.read_bool().unwrap());
        // section 2 is bit 3 when bit 0 is section -1
        assert_eq!(wire.read_varint().unwrap(), 1 << 3);
        assert_eq!(wire.read_varint().unwrap(), 0);
    }

    #[test]
    fn test_light_for_wrong_column() {
        let column = sample_column(&V1_20);
        let mut buffer = PacketBuffer::new();
        column.write_light(&mut buffer).unwrap();
        let mut other = Column::new(ChunkPos::new(0, 0, Dimension::Overworld), &V1_20);
        assert_matches!(
            other.update_light(&mut buffer),
            Err(WorldDiffError::ProtocolError(_))
        );
    }
}
