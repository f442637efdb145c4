use crate::mode::Mode;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use worlddiff_nbt::Tag;

/// Water, every level.
pub const WATER: RangeInclusive<u32> = 80..=95;
/// Lava, every level.
pub const LAVA: RangeInclusive<u32> = 96..=111;

/// Leaf state ranges and their species. Decay distance and persistence are
/// part of the state, so every leaf block spans 28 ids.
const LEAF_RANGES: [(u32, u32, u8); 10] = [
    (349, 376, 0), // acacia
    (461, 488, 1), // azalea
    (293, 320, 2), // birch
    (377, 404, 3), // cherry
    (405, 432, 4), // dark oak
    (489, 516, 5), // flowering azalea
    (321, 348, 6), // jungle
    (433, 460, 7), // mangrove
    (237, 264, 8), // oak
    (265, 292, 9), // spruce
];

static LEAF_SPECIES: Lazy<HashMap<u32, u8>> = Lazy::new(|| {
    LEAF_RANGES
        .iter()
        .flat_map(|&(first, last, species)| (first..=last).map(move |id| (id, species)))
        .collect()
});

pub fn leaf_species(id: u32) -> Option<u8> {
    LEAF_SPECIES.get(&id).copied()
}

fn is_liquid_pair(a: u32, b: u32) -> bool {
    (WATER.contains(&a) && WATER.contains(&b)) || (LAVA.contains(&a) && LAVA.contains(&b))
}

/// True when the voxel at this position must be cleared from the output.
pub fn compare_blocks(mode: Mode, a: u32, b: u32) -> bool {
    let stay = mode == Mode::Stay;

    if let (Some(species_a), Some(species_b)) = (leaf_species(a), leaf_species(b)) {
        return stay != (species_a == species_b);
    }
    if is_liquid_pair(a, b) {
        return !stay;
    }
    stay == (a != b)
}

/// True when the block entity of the first world must be dropped. Only the
/// `id` field is compared; a missing counterpart counts as a change.
pub fn compare_block_entities(mode: Mode, a: &Tag, b: Option<&Tag>) -> bool {
    let stay = mode == Mode::Stay;
    let b = match b {
        Some(b) => b,
        None => return stay,
    };
    let id = |tag: &Tag| tag.get("id").and_then(Tag::as_string).cloned();
    stay == (id(a) != id(b))
}
