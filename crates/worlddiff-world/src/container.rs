use crate::bit_storage::BitStorage;
use crate::palette::{bits_for, Palette, PaletteType};
use crate::registry::Registry;
use worlddiff_common::{Result, WorldDiffError};
use worlddiff_nbt::Tag;
use worlddiff_protocol::PacketBuffer;

/// A palette together with the packed indices it resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettedContainer {
    palette: Palette,
    storage: BitStorage,
}

impl PalettedContainer {
    pub fn new(palette: Palette) -> Self {
        let storage = BitStorage::new(palette.bits_per_entry(), palette.ty().entries());
        PalettedContainer { palette, storage }
    }

    /// Container of a single repeated id.
    pub fn filled(ty: PaletteType, id: u32) -> Self {
        Self::new(Palette::single(ty, id))
    }

    pub fn from_parts(palette: Palette, data: Vec<u64>) -> Self {
        let storage = BitStorage::from_data(palette.bits_per_entry(), palette.ty().entries(), data);
        PalettedContainer { palette, storage }
    }

    pub fn ty(&self) -> PaletteType {
        self.palette.ty()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn storage(&self) -> &BitStorage {
        &self.storage
    }

    pub fn get(&self, index: usize) -> u32 {
        self.palette.decode(self.storage.get(index))
    }

    pub fn set(&mut self, index: usize, id: u32) -> Result<()> {
        let local = self.palette.index_for(id, &mut self.storage)?;
        self.storage.set(index, local);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.ty().entries()).map(move |index| self.get(index))
    }

    /// Number of non-air values.
    pub fn count_non_air(&self) -> u16 {
        match self.palette {
            Palette::Single { id: 0, .. } => 0,
            Palette::Single { .. } => self.ty().entries() as u16,
            _ => self.iter().filter(|&id| id != 0).count() as u16,
        }
    }

    pub fn is_air(&self) -> bool {
        self.count_non_air() == 0
    }

    /// Network form: the palette followed by a VarInt-counted long array.
    pub fn read(ty: PaletteType, buffer: &mut PacketBuffer) -> Result<Self> {
        let palette = Palette::read(ty, buffer)?;
        let data = buffer.read_long_array()?;
        Ok(Self::from_parts(palette, data))
    }

    pub fn write(&self, buffer: &mut PacketBuffer) {
        match &self.palette {
            // disk palettes may hold more entries than the wire allows in a list
            Palette::Indirect {
                ty, bits_per_entry, ..
            } if *bits_per_entry > ty.max_indirect_bits() => {
                let max_id = self.iter().max().unwrap_or(0) as usize;
                let bits = (*bits_per_entry).max((usize::BITS - max_id.leading_zeros()) as u8);
                let mut storage = BitStorage::new(bits, ty.entries());
                for (index, id) in self.iter().enumerate() {
                    storage.set(index, id);
                }
                Palette::Direct {
                    ty: *ty,
                    bits_per_entry: bits,
                }
                .write(buffer);
                buffer.write_long_array(storage.data());
            }
            palette => {
                palette.write(buffer);
                buffer.write_long_array(self.storage.data());
            }
        }
    }

    /// Entry list and storage at the width a persisted palette of that length
    /// implies. Direct containers are collapsed to the ids they actually use.
    fn indirect_parts(&self) -> (Vec<u32>, BitStorage) {
        let ty = self.ty();
        match &self.palette {
            Palette::Single { id, .. } => (vec![*id], BitStorage::new(bits_for(ty, 1), ty.entries())),
            Palette::Indirect { entries, .. } => {
                let bits = bits_for(ty, entries.len());
                let storage = if self.storage.bits() == bits {
                    self.storage.clone()
                } else {
                    self.storage.repacked(bits)
                };
                (entries.clone(), storage)
            }
            Palette::Direct { .. } => {
                let mut entries: Vec<u32> = Vec::new();
                let mut indices = Vec::with_capacity(ty.entries());
                for id in self.iter() {
                    let local = match entries.iter().position(|&entry| entry == id) {
                        Some(local) => local,
                        None => {
                            entries.push(id);
                            entries.len() - 1
                        }
                    };
                    indices.push(local as u32);
                }
                let mut storage = BitStorage::new(bits_for(ty, entries.len()), ty.entries());
                for (index, local) in indices.into_iter().enumerate() {
                    storage.set(index, local);
                }
                (entries, storage)
            }
        }
    }

    fn nbt_palette(ty: PaletteType, list: Option<&Tag>, registry: &dyn Registry) -> Result<Vec<u32>> {
        let list = list
            .and_then(Tag::as_list)
            .ok_or_else(|| WorldDiffError::unexpected_tag("palette is not a list"))?;
        let ids = Palette::ids_from_nbt(list, registry);
        if ids.is_empty() {
            return Err(WorldDiffError::MalformedPalette(format!(
                "empty {:?} palette",
                ty
            )));
        }
        Ok(ids)
    }

    fn nbt_data(data: Option<&Tag>) -> Result<Vec<u64>> {
        match data {
            None => Ok(Vec::new()),
            Some(tag) => tag
                .as_long_array()
                .map(|longs| longs.iter().map(|&long| long as u64).collect())
                .ok_or_else(|| WorldDiffError::unexpected_tag("data is not a long array")),
        }
    }

    /// Reads the `{palette, data}` compound sections have used since 1.18.
    pub fn from_nbt(ty: PaletteType, tag: &Tag, registry: &dyn Registry) -> Result<Self> {
        let ids = Self::nbt_palette(ty, tag.get("palette"), registry)?;
        let data = tag.get("data");
        if ids.len() == 1 && data.is_none() {
            return Ok(Self::filled(ty, ids[0]));
        }
        let palette = Palette::indirect(ty, bits_for(ty, ids.len()), ids)?;
        Ok(Self::from_parts(palette, Self::nbt_data(data)?))
    }

    pub fn to_nbt(&self, registry: &dyn Registry) -> Result<Tag> {
        let (entries, storage) = self.indirect_parts();
        let mut tag = Tag::compound();
        if entries.len() > 1 {
            tag.insert(
                "data",
                Tag::LongArray(storage.into_data().into_iter().map(|long| long as i64).collect()),
            );
        }
        tag.insert(
            "palette",
            Palette::with_entries(self.ty(), entries).to_nbt(registry)?,
        );
        Ok(tag)
    }

    /// Reads the `Palette`/`BlockStates` pair of a pre-1.18 section. Returns
    /// `None` when the section carries no block data.
    pub fn from_legacy_nbt(section: &Tag, registry: &dyn Registry) -> Result<Option<Self>> {
        if section.get("Palette").is_none() {
            return Ok(None);
        }
        let ty = PaletteType::Blocks;
        let ids = Self::nbt_palette(ty, section.get("Palette"), registry)?;
        let palette = Palette::indirect(ty, bits_for(ty, ids.len()), ids)?;
        let data = Self::nbt_data(section.get("BlockStates"))?;
        Ok(Some(Self::from_parts(palette, data)))
    }

    /// Writes `Palette` and `BlockStates` into a pre-1.18 section compound.
    /// That layout has no single-value form; the index array is always present.
    pub fn write_legacy_nbt(&self, section: &mut Tag, registry: &dyn Registry) -> Result<()> {
        let (entries, storage) = self.indirect_parts();
        section.insert(
            "Palette",
            Palette::with_entries(self.ty(), entries).to_nbt(registry)?,
        );
        section.insert(
            "BlockStates",
            Tag::LongArray(storage.into_data().into_iter().map(|long| long as i64).collect()),
        );
        Ok(())
    }
}
