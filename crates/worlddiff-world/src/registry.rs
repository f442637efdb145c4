use crate::palette::PaletteType;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use worlddiff_common::{Result, WorldDiffError};
use worlddiff_logger::{log, LogSeverity};
use worlddiff_nbt::Tag;

const NAMESPACE: &str = "minecraft:";

fn strip_namespace(name: &str) -> &str {
    name.strip_prefix(NAMESPACE).unwrap_or(name)
}

/// Read-only mapping between the persisted form of a state and its global id.
pub trait Registry: Send + Sync {
    /// Global id of a persisted palette entry. Unknown entries map to 0.
    fn state_id(&self, tag: &Tag) -> u32;

    /// Persisted palette entry for a global id.
    fn state_tag(&self, id: u32) -> Tag;
}

#[derive(Deserialize, Debug)]
struct BlockStateDef {
    name: String,
    #[serde(rename = "type")]
    state_type: String,
    num_values: usize,
    #[serde(default)]
    values: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct BlockDef {
    name: String,
    #[serde(rename = "minStateId")]
    min_state_id: u32,
    #[serde(rename = "maxStateId")]
    max_state_id: u32,
    #[serde(default)]
    states: Vec<BlockStateDef>,
    #[serde(rename = "defaultState")]
    default_state: u32,
}

#[derive(Debug, Clone)]
struct Property {
    name: String,
    values: Vec<String>,
}

#[derive(Debug, Clone)]
struct BlockEntry {
    name: String,
    min_state_id: u32,
    max_state_id: u32,
    default_state: u32,
    properties: Vec<Property>,
}

impl BlockEntry {
    fn from_def(def: BlockDef) -> Result<Self> {
        let mut properties = Vec::with_capacity(def.states.len());
        for state in def.states {
            let values = match state.state_type.as_str() {
                "bool" => vec!["true".to_owned(), "false".to_owned()],
                _ => state.values,
            };
            if values.len() != state.num_values || values.is_empty() {
                return Err(WorldDiffError::RegistryError(format!(
                    "{}.{} lists {} values but declares {}",
                    def.name,
                    state.name,
                    values.len(),
                    state.num_values
                )));
            }
            properties.push(Property {
                name: state.name,
                values,
            });
        }

        let combinations: u64 = properties.iter().map(|p| p.values.len() as u64).product();
        if def.max_state_id < def.min_state_id
            || (def.max_state_id - def.min_state_id) as u64 + 1 != combinations
        {
            return Err(WorldDiffError::RegistryError(format!(
                "{} covers states {}..={} but its properties describe {}",
                def.name, def.min_state_id, def.max_state_id, combinations
            )));
        }

        Ok(BlockEntry {
            name: strip_namespace(&def.name).to_owned(),
            min_state_id: def.min_state_id,
            max_state_id: def.max_state_id,
            default_state: def.default_state,
            properties,
        })
    }

    /// Mixed-radix state offset, first property most significant. `None` when a
    /// property is missing or holds a value this block does not know.
    fn offset_of(&self, properties: Option<&Tag>) -> Option<u32> {
        let mut offset = 0u32;
        for property in &self.properties {
            let value = properties?.get(&property.name)?.as_string()?;
            let index = property.values.iter().position(|v| v == value)?;
            offset = offset * property.values.len() as u32 + index as u32;
        }
        Some(offset)
    }

    fn tag_for(&self, id: u32) -> Tag {
        let mut tag = Tag::compound();
        tag.insert("Name", Tag::String(format!("{}{}", NAMESPACE, self.name)));
        if self.properties.is_empty() {
            return tag;
        }

        let mut offset = id - self.min_state_id;
        let mut properties = Tag::compound();
        for property in self.properties.iter().rev() {
            let radix = property.values.len() as u32;
            let value = &property.values[(offset % radix) as usize];
            properties.insert(&property.name, Tag::String(value.clone()));
            offset /= radix;
        }
        tag.insert("Properties", properties);
        tag
    }
}

/// Global block-state registry loaded from a minecraft-data `blocks.json`.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    // sorted by min_state_id
    blocks: Vec<BlockEntry>,
    by_name: HashMap<String, usize>,
}

impl BlockRegistry {
    pub fn from_json(json: &str) -> Result<Self> {
        let defs: Vec<BlockDef> = serde_json::from_str(json)
            .map_err(|e| WorldDiffError::RegistryError(format!("Invalid blocks.json: {}", e)))?;

        let mut blocks = defs
            .into_iter()
            .map(BlockEntry::from_def)
            .collect::<Result<Vec<_>>>()?;
        blocks.sort_by_key(|block| block.min_state_id);

        let by_name = blocks
            .iter()
            .enumerate()
            .map(|(index, block)| (block.name.clone(), index))
            .collect();

        Ok(BlockRegistry { blocks, by_name })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            WorldDiffError::RegistryError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Default state of a block, by name with or without namespace.
    pub fn default_state(&self, name: &str) -> Option<u32> {
        let index = self.by_name.get(strip_namespace(name))?;
        Some(self.blocks[*index].default_state)
    }

    fn block_for(&self, id: u32) -> Option<&BlockEntry> {
        let index = self
            .blocks
            .partition_point(|block| block.min_state_id <= id)
            .checked_sub(1)?;
        let block = &self.blocks[index];
        (id <= block.max_state_id).then_some(block)
    }
}

impl Registry for BlockRegistry {
    fn state_id(&self, tag: &Tag) -> u32 {
        let name = match tag.get("Name").and_then(Tag::as_string) {
            Some(name) => name,
            None => {
                log(
                    "Palette entry without a Name, using air".to_string(),
                    LogSeverity::Debug,
                );
                return 0;
            }
        };
        let block = match self.by_name.get(strip_namespace(name)) {
            Some(&index) => &self.blocks[index],
            None => {
                log(
                    format!("Unknown block {}, using air", name),
                    LogSeverity::Debug,
                );
                return 0;
            }
        };
        match block.offset_of(tag.get("Properties")) {
            Some(offset) => block.min_state_id + offset,
            None => block.default_state,
        }
    }

    fn state_tag(&self, id: u32) -> Tag {
        match self.block_for(id) {
            Some(block) => block.tag_for(id),
            None => {
                log(
                    format!("Unknown block state {}, writing air", id),
                    LogSeverity::Debug,
                );
                let mut tag = Tag::compound();
                tag.insert("Name", Tag::String(format!("{}air", NAMESPACE)));
                tag
            }
        }
    }
}

const BIOMES: [&str; 64] = [
    "the_void",
    "plains",
    "sunflower_plains",
    "snowy_plains",
    "ice_spikes",
    "desert",
    "swamp",
    "mangrove_swamp",
    "forest",
    "flower_forest",
    "birch_forest",
    "dark_forest",
    "old_growth_birch_forest",
    "old_growth_pine_taiga",
    "old_growth_spruce_taiga",
    "taiga",
    "snowy_taiga",
    "savanna",
    "savanna_plateau",
    "windswept_hills",
    "windswept_gravelly_hills",
    "windswept_forest",
    "windswept_savanna",
    "jungle",
    "sparse_jungle",
    "bamboo_jungle",
    "badlands",
    "eroded_badlands",
    "wooded_badlands",
    "meadow",
    "cherry_grove",
    "grove",
    "snowy_slopes",
    "frozen_peaks",
    "jagged_peaks",
    "stony_peaks",
    "river",
    "frozen_river",
    "beach",
    "snowy_beach",
    "stony_shore",
    "warm_ocean",
    "lukewarm_ocean",
    "deep_lukewarm_ocean",
    "ocean",
    "deep_ocean",
    "cold_ocean",
    "deep_cold_ocean",
    "frozen_ocean",
    "deep_frozen_ocean",
    "mushroom_fields",
    "dripstone_caves",
    "lush_caves",
    "deep_dark",
    "nether_wastes",
    "warped_forest",
    "crimson_forest",
    "soul_sand_valley",
    "basalt_deltas",
    "the_end",
    "end_highlands",
    "end_midlands",
    "small_end_islands",
    "end_barrens",
];

static BIOME_IDS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    BIOMES
        .iter()
        .enumerate()
        .map(|(id, name)| (*name, id as u32))
        .collect()
});

/// Built-in biome table. Biome palette entries are plain strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiomeRegistry;

impl BiomeRegistry {
    pub fn len(&self) -> usize {
        BIOMES.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Registry for BiomeRegistry {
    fn state_id(&self, tag: &Tag) -> u32 {
        let name = tag.as_string().map(|name| strip_namespace(name));
        match name.and_then(|name| BIOME_IDS.get(name)) {
            Some(&id) => id,
            None => {
                log(format!("Unknown biome {:?}", tag), LogSeverity::Debug);
                0
            }
        }
    }

    fn state_tag(&self, id: u32) -> Tag {
        let name = BIOMES.get(id as usize).unwrap_or(&BIOMES[0]);
        Tag::String(format!("{}{}", NAMESPACE, name))
    }
}

/// Both registries, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Registries {
    pub blocks: BlockRegistry,
    pub biomes: BiomeRegistry,
}

impl Registries {
    pub fn new(blocks: BlockRegistry) -> Self {
        Registries {
            blocks,
            biomes: BiomeRegistry,
        }
    }

    pub fn load(blocks_json: &Path) -> Result<Self> {
        Ok(Self::new(BlockRegistry::load(blocks_json)?))
    }

    pub fn for_type(&self, ty: PaletteType) -> &dyn Registry {
        match ty {
            PaletteType::Blocks => &self.blocks,
            PaletteType::Biomes => &self.biomes,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_matches::assert_matches;

    pub(crate) const BLOCKS_JSON: &str = r#"[
        {"id": 0, "name": "air", "minStateId": 0, "maxStateId": 0, "states": [], "defaultState": 0},
        {"id": 1, "name": "stone", "minStateId": 1, "maxStateId": 1, "states": [], "defaultState": 1},
        {"id": 2, "name": "grass_block", "minStateId": 8, "maxStateId": 9,
         "states": [{"name": "snowy", "type": "bool", "num_values": 2}], "defaultState": 9},
        {"id": 3, "name": "water", "minStateId": 80, "maxStateId": 95,
         "states": [{"name": "level", "type": "int", "num_values": 16,
                     "values": ["0","1","2","3","4","5","6","7","8","9","10","11","12","13","14","15"]}],
         "defaultState": 80},
        {"id": 4, "name": "oak_leaves", "minStateId": 237, "maxStateId": 264,
         "states": [
            {"name": "distance", "type": "int", "num_values": 7, "values": ["1","2","3","4","5","6","7"]},
            {"name": "persistent", "type": "bool", "num_values": 2},
            {"name": "waterlogged", "type": "bool", "num_values": 2}
         ],
         "defaultState": 264}
    ]"#;

    pub(crate) fn registries() -> Registries {
        Registries::new(BlockRegistry::from_json(BLOCKS_JSON).unwrap())
    }

    fn block(name: &str, properties: &[(&str, &str)]) -> Tag {
        let mut tag = Tag::compound();
        tag.insert("Name", Tag::String(name.to_string()));
        if !properties.is_empty() {
            let mut props = Tag::compound();
            for (key, value) in properties {
                props.insert(key, Tag::String(value.to_string()));
            }
            tag.insert("Properties", props);
        }
        tag
    }

    #[test]
    fn test_simple_blocks() {
        let registry = BlockRegistry::from_json(BLOCKS_JSON).unwrap();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.state_id(&block("minecraft:air", &[])), 0);
        assert_eq!(registry.state_id(&block("minecraft:stone", &[])), 1);
        assert_eq!(registry.state_id(&block("stone", &[])), 1);
        assert_eq!(registry.state_tag(1), block("minecraft:stone", &[]));
    }

    #[test]
    fn test_property_order_is_mixed_radix() {
        let registry = BlockRegistry::from_json(BLOCKS_JSON).unwrap();
        // bool properties are ordered true, false
        assert_eq!(
            registry.state_id(&block("minecraft:grass_block", &[("snowy", "true")])),
            8
        );
        assert_eq!(
            registry.state_id(&block("minecraft:grass_block", &[("snowy", "false")])),
            9
        );

        // distance is most significant: offset = d*4 + p*2 + w
        let leaves = block(
            "minecraft:oak_leaves",
            &[("distance", "3"), ("persistent", "false"), ("waterlogged", "true")],
        );
        assert_eq!(registry.state_id(&leaves), 237 + 2 * 4 + 2);
        assert_eq!(registry.state_tag(247), leaves);
        assert_eq!(registry.state_tag(264).get("Properties").unwrap().get("distance"), Some(&Tag::String("7".into())));
    }

    #[test]
    fn test_every_state_round_trips() {
        let registry = BlockRegistry::from_json(BLOCKS_JSON).unwrap();
        for id in [0u32, 1, 8, 9]
            .into_iter()
            .chain(80..=95)
            .chain(237..=264)
        {
            assert_eq!(registry.state_id(&registry.state_tag(id)), id);
        }
    }

    #[test]
    fn test_unknown_entries_fall_back() {
        let registry = BlockRegistry::from_json(BLOCKS_JSON).unwrap();
        assert_eq!(registry.state_id(&block("minecraft:unobtainium", &[])), 0);
        assert_eq!(registry.state_id(&Tag::compound()), 0);
        // missing or unknown property values use the default state
        assert_eq!(registry.state_id(&block("minecraft:grass_block", &[])), 9);
        assert_eq!(
            registry.state_id(&block("minecraft:water", &[("level", "99")])),
            80
        );
        // gaps in the id space are written as air
        assert_eq!(registry.state_tag(5), block("minecraft:air", &[]));
        assert_eq!(registry.state_tag(100_000), block("minecraft:air", &[]));
        assert_eq!(registry.default_state("minecraft:oak_leaves"), Some(264));
    }

    #[test]
    fn test_invalid_json_is_a_registry_error() {
        assert_matches!(
            BlockRegistry::from_json("{not json"),
            Err(WorldDiffError::RegistryError(_))
        );
        let inconsistent = r#"[{"id": 0, "name": "air", "minStateId": 0, "maxStateId": 3, "states": [], "defaultState": 0}]"#;
        assert_matches!(
            BlockRegistry::from_json(inconsistent),
            Err(WorldDiffError::RegistryError(_))
        );
    }

    #[test]
    fn test_missing_registry_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_matches!(
            BlockRegistry::load(&dir.path().join("blocks.json")),
            Err(WorldDiffError::RegistryError(_))
        );
    }

    #[test]
    fn test_biome_table() {
        let biomes = BiomeRegistry;
        assert_eq!(biomes.len(), 64);
        assert_eq!(biomes.state_id(&Tag::String("minecraft:the_void".into())), 0);
        assert_eq!(biomes.state_id(&Tag::String("minecraft:plains".into())), 1);
        assert_eq!(biomes.state_id(&Tag::String("minecraft:cherry_grove".into())), 30);
        assert_eq!(biomes.state_id(&Tag::String("minecraft:end_barrens".into())), 63);
        assert_eq!(biomes.state_id(&Tag::String("minecraft:nowhere".into())), 0);
        assert_eq!(biomes.state_tag(36), Tag::String("minecraft:river".into()));
    }

    #[test]
    fn test_registry_for_palette_type() {
        let registries = registries();
        assert_eq!(
            registries
                .for_type(PaletteType::Biomes)
                .state_tag(1),
            Tag::String("minecraft:plains".into())
        );
        assert_eq!(
            registries
                .for_type(PaletteType::Blocks)
                .state_id(&block("minecraft:stone", &[])),
            1
        );
    }
}
