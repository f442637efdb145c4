use crate::bit_storage::BitStorage;
use crate::registry::Registry;
use worlddiff_common::{Result, WorldDiffError};
use worlddiff_nbt::Tag;
use worlddiff_protocol::PacketBuffer;

/// Widest index any palette may use.
pub const MAX_BITS: u8 = 16;

/// Which global registry a palette's ids refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteType {
    Blocks,
    Biomes,
}

impl PaletteType {
    pub fn min_bits(self) -> u8 {
        match self {
            PaletteType::Blocks => 4,
            PaletteType::Biomes => 1,
        }
    }

    /// Widths above this are sent without an entry list (direct palette).
    pub fn max_indirect_bits(self) -> u8 {
        match self {
            PaletteType::Blocks => 8,
            PaletteType::Biomes => 3,
        }
    }

    /// Values held by one container of this type.
    pub fn entries(self) -> usize {
        match self {
            PaletteType::Blocks => 4096,
            PaletteType::Biomes => 64,
        }
    }
}

/// Bits needed to store `max_index`.
fn bits_needed(max_index: usize) -> u8 {
    (usize::BITS - max_index.leading_zeros()) as u8
}

/// Width an indirect palette with `len` entries packs its indices at.
pub fn bits_for(ty: PaletteType, len: usize) -> u8 {
    ty.min_bits().max(bits_needed(len.saturating_sub(1)))
}

/// Maps local indices to global state ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Palette {
    /// Every index resolves to `id`; no index bits are stored.
    Single { ty: PaletteType, id: u32 },
    Indirect {
        ty: PaletteType,
        bits_per_entry: u8,
        entries: Vec<u32>,
    },
    /// Indices are global ids.
    Direct { ty: PaletteType, bits_per_entry: u8 },
}

impl Palette {
    /// Fresh palette holding only air, at the minimum width.
    pub fn empty(ty: PaletteType) -> Self {
        Palette::Indirect {
            ty,
            bits_per_entry: ty.min_bits(),
            entries: vec![0],
        }
    }

    pub fn single(ty: PaletteType, id: u32) -> Self {
        Palette::Single { ty, id }
    }

    /// Indirect palette sized for its entries.
    pub fn with_entries(ty: PaletteType, entries: Vec<u32>) -> Self {
        Palette::Indirect {
            ty,
            bits_per_entry: bits_for(ty, entries.len()),
            entries,
        }
    }

    /// Indirect palette with an explicit width, as read from a stream.
    ///
    /// Some non-vanilla producers declare more bits than their entry list needs.
    /// The list is padded with air entries until it implies the declared width,
    /// so every index the width can express resolves to something.
    pub fn indirect(ty: PaletteType, bits_per_entry: u8, mut entries: Vec<u32>) -> Result<Self> {
        if bits_per_entry > MAX_BITS {
            return Err(WorldDiffError::MalformedPalette(format!(
                "{} bits per entry, at most {} allowed",
                bits_per_entry, MAX_BITS
            )));
        }
        if bits_needed(entries.len().saturating_sub(1)) > bits_per_entry {
            return Err(WorldDiffError::MalformedPalette(format!(
                "{} entries do not fit in {} bits",
                entries.len(),
                bits_per_entry
            )));
        }
        while bits_per_entry > bits_for(ty, entries.len()) {
            entries.push(0);
        }
        Ok(Palette::Indirect {
            ty,
            bits_per_entry,
            entries,
        })
    }

    pub fn direct(ty: PaletteType, bits_per_entry: u8) -> Result<Self> {
        if bits_per_entry > MAX_BITS {
            return Err(WorldDiffError::MalformedPalette(format!(
                "{} bits per entry, at most {} allowed",
                bits_per_entry, MAX_BITS
            )));
        }
        Ok(Palette::Direct { ty, bits_per_entry })
    }

    pub fn ty(&self) -> PaletteType {
        match self {
            Palette::Single { ty, .. } | Palette::Indirect { ty, .. } | Palette::Direct { ty, .. } => {
                *ty
            }
        }
    }

    pub fn bits_per_entry(&self) -> u8 {
        match self {
            Palette::Single { .. } => 0,
            Palette::Indirect { bits_per_entry, .. } | Palette::Direct { bits_per_entry, .. } => {
                *bits_per_entry
            }
        }
    }

    /// Number of distinct indices this palette resolves.
    pub fn len(&self) -> usize {
        match self {
            Palette::Single { .. } => 1,
            Palette::Indirect { entries, .. } => entries.len(),
            Palette::Direct { bits_per_entry, .. } => 1 << bits_per_entry,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Global id behind `index`. Indices past the entry list resolve to air
    /// instead of failing; bad data must not bring the codec down.
    pub fn decode(&self, index: u32) -> u32 {
        match self {
            Palette::Single { id, .. } => *id,
            Palette::Indirect { entries, .. } => entries.get(index as usize).copied().unwrap_or(0),
            Palette::Direct { .. } => index,
        }
    }

    /// Local index for `id`, adding it to the palette when missing.
    ///
    /// When the palette has to widen, `storage` (the index array of the owning
    /// container) is re-packed at the new width before this returns. Widths only
    /// ever grow.
    pub fn index_for(&mut self, id: u32, storage: &mut BitStorage) -> Result<u32> {
        match self {
            Palette::Single { ty, id: current } => {
                if *current == id {
                    return Ok(0);
                }
                let ty = *ty;
                let bits_per_entry = ty.min_bits();
                *storage = storage.repacked(bits_per_entry);
                *self = Palette::Indirect {
                    ty,
                    bits_per_entry,
                    entries: vec![*current, id],
                };
                Ok(1)
            }
            Palette::Indirect {
                ty,
                bits_per_entry,
                entries,
            } => {
                if let Some(index) = entries.iter().position(|&entry| entry == id) {
                    return Ok(index as u32);
                }
                let grown = (*bits_per_entry).max(bits_for(*ty, entries.len() + 1));
                if grown > MAX_BITS {
                    return Err(WorldDiffError::MalformedPalette(format!(
                        "palette would need {} bits",
                        grown
                    )));
                }
                entries.push(id);
                if grown != *bits_per_entry {
                    *storage = storage.repacked(grown);
                    *bits_per_entry = grown;
                }
                Ok((entries.len() - 1) as u32)
            }
            Palette::Direct { bits_per_entry, .. } => {
                if *bits_per_entry < 32 && id >> *bits_per_entry != 0 {
                    return Err(WorldDiffError::MalformedPalette(format!(
                        "state {} does not fit a {}-bit direct palette",
                        id, bits_per_entry
                    )));
                }
                Ok(id)
            }
        }
    }

    /// Reads a palette in its network form: a width byte, then a single VarInt id
    /// (width 0), nothing (direct) or a VarInt-counted VarInt list (indirect).
    pub fn read(ty: PaletteType, buffer: &mut PacketBuffer) -> Result<Self> {
        let bits_per_entry = buffer.read_u8()?;
        if bits_per_entry > MAX_BITS {
            return Err(WorldDiffError::MalformedPalette(format!(
                "{} bits per entry, at most {} allowed",
                bits_per_entry, MAX_BITS
            )));
        }
        if bits_per_entry == 0 {
            return Ok(Palette::single(ty, buffer.read_varint()? as u32));
        }
        if bits_per_entry > ty.max_indirect_bits() {
            return Palette::direct(ty, bits_per_entry);
        }
        let entries = buffer
            .read_varint_array()?
            .into_iter()
            .map(|id| id as u32)
            .collect();
        // widths below the minimum are read at the minimum
        Palette::indirect(ty, bits_per_entry.max(ty.min_bits()), entries)
    }

    pub fn write(&self, buffer: &mut PacketBuffer) {
        buffer.write_u8(self.bits_per_entry());
        match self {
            Palette::Single { id, .. } => buffer.write_varint(*id as i32),
            Palette::Indirect { entries, .. } => {
                buffer.write_varint(entries.len() as i32);
                for &entry in entries {
                    buffer.write_varint(entry as i32);
                }
            }
            Palette::Direct { .. } => {}
        }
    }

    /// Entry list in persisted form. Direct palettes have no list and must be
    /// converted by their container first.
    pub fn to_nbt(&self, registry: &dyn Registry) -> Result<Tag> {
        let entries = match self {
            Palette::Single { id, .. } => vec![registry.state_tag(*id)],
            Palette::Indirect { entries, .. } => {
                entries.iter().map(|&id| registry.state_tag(id)).collect()
            }
            Palette::Direct { .. } => {
                return Err(WorldDiffError::MalformedPalette(
                    "direct palettes have no persisted entry list".to_owned(),
                ))
            }
        };
        Ok(Tag::List(entries))
    }

    /// Resolves a persisted entry list to global ids.
    pub fn ids_from_nbt(list: &[Tag], registry: &dyn Registry) -> Vec<u32> {
        list.iter().map(|tag| registry.state_id(tag)).collect()
    }
}
