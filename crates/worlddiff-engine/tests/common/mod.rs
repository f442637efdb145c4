use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use worlddiff_common::{ChunkPos, Dimension, RegionPos};
use worlddiff_engine::mode::Mode;
use worlddiff_engine::runner::RunConfig;
use worlddiff_nbt::Tag;
use worlddiff_world::version::V1_20;
use worlddiff_world::{BlockRegistry, Column, Palette, PaletteType, Region, Registries};

pub const AIR: u32 = 0;
pub const STONE: u32 = 1;
pub const DIRT: u32 = 10;
pub const WATER: u32 = 80;
pub const OAK_LEAVES: u32 = 237;
pub const BIRCH_LEAVES: u32 = 293;

pub const BLOCKS_JSON: &str = r#"[
    {"id": 0, "name": "air", "minStateId": 0, "maxStateId": 0, "states": [], "defaultState": 0},
    {"id": 1, "name": "stone", "minStateId": 1, "maxStateId": 1, "states": [], "defaultState": 1},
    {"id": 10, "name": "dirt", "minStateId": 10, "maxStateId": 10, "states": [], "defaultState": 10},
    {"id": 35, "name": "water", "minStateId": 80, "maxStateId": 95,
     "states": [{"name": "level", "type": "int", "num_values": 16,
                 "values": ["0","1","2","3","4","5","6","7","8","9","10","11","12","13","14","15"]}],
     "defaultState": 80},
    {"id": 60, "name": "oak_leaves", "minStateId": 237, "maxStateId": 264,
     "states": [
        {"name": "distance", "type": "int", "num_values": 7, "values": ["1","2","3","4","5","6","7"]},
        {"name": "persistent", "type": "bool", "num_values": 2},
        {"name": "waterlogged", "type": "bool", "num_values": 2}
     ],
     "defaultState": 264},
    {"id": 62, "name": "birch_leaves", "minStateId": 293, "maxStateId": 320,
     "states": [
        {"name": "distance", "type": "int", "num_values": 7, "values": ["1","2","3","4","5","6","7"]},
        {"name": "persistent", "type": "bool", "num_values": 2},
        {"name": "waterlogged", "type": "bool", "num_values": 2}
     ],
     "defaultState": 320}
]"#;

pub fn registries() -> Arc<Registries> {
    Arc::new(Registries::new(BlockRegistry::from_json(BLOCKS_JSON).unwrap()))
}

/// A column whose section `y` is filled with `id`.
pub fn filled_column(x: i32, z: i32, y: i8, id: u32) -> Column {
    let mut column = Column::new(ChunkPos::new(x, z, Dimension::Overworld), &V1_20);
    let section = column.create_empty_section(y, Palette::single(PaletteType::Blocks, id));
    column.set_section(section).unwrap();
    column
}

pub fn chest(x: i32, y: i32, z: i32, id: &str) -> Tag {
    let mut tag = Tag::compound();
    tag.insert("id", Tag::String(id.to_string()));
    tag.insert("x", Tag::Int(x));
    tag.insert("y", Tag::Int(y));
    tag.insert("z", Tag::Int(z));
    tag
}

pub fn region_path(world: &Path, pos: RegionPos) -> PathBuf {
    Dimension::Overworld.region_dir(world).join(pos.file_name())
}

/// Writes `columns` into the region file they belong to.
pub fn write_region(world: &Path, pos: RegionPos, columns: &[Column], registries: &Registries) {
    let mut region = Region::empty(pos, Dimension::Overworld);
    for column in columns {
        region.insert_column(column, registries).unwrap();
    }
    let path = region_path(world, pos);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    region.write(&path).unwrap();
}

pub fn read_column(world: &Path, pos: RegionPos, local_x: i32, local_z: i32, registries: &Registries) -> Option<Column> {
    let region = Region::read(&region_path(world, pos), Dimension::Overworld).unwrap();
    region.column(local_x, local_z, registries).unwrap()
}

pub fn run_config(root: &Path, mode: Mode) -> RunConfig {
    RunConfig {
        world1: root.join("world1"),
        world2: root.join("world2"),
        output: root.join("output"),
        mode,
        dimension: Dimension::Overworld,
    }
}
