use crate::column::Column;
use crate::registry::Registries;
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use worlddiff_common::{Dimension, RegionPos, Result, WorldDiffError, REGION_SIZE};
use worlddiff_logger::time::unix_timestamp;
use worlddiff_nbt::NBTFile;

const SECTOR: usize = 4096;
const HEADER: usize = 2 * SECTOR;
const SLOTS: usize = (REGION_SIZE * REGION_SIZE) as usize;
const MAX_SECTORS: usize = 255;

const COMPRESSION_GZIP: u8 = 1;
const COMPRESSION_ZLIB: u8 = 2;
const COMPRESSION_NONE: u8 = 3;
const COMPRESSION_EXTERNAL: u8 = 128;

/// Compressed payload of one column, exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawColumn {
    timestamp: u32,
    compression: u8,
    data: Vec<u8>,
}

/// A 32x32 grid of columns backed by one `.mca` file. Columns stay compressed
/// until asked for.
#[derive(Debug, Clone)]
pub struct Region {
    pub position: RegionPos,
    pub dimension: Dimension,
    slots: Vec<Option<RawColumn>>,
}

impl Region {
    pub fn empty(position: RegionPos, dimension: Dimension) -> Self {
        Region {
            position,
            dimension,
            slots: vec![None; SLOTS],
        }
    }

    fn error(&self, msg: impl Into<String>) -> WorldDiffError {
        WorldDiffError::region(self.position.file_name(), msg)
    }

    pub fn read(path: &Path, dimension: Dimension) -> Result<Self> {
        let name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
        let position = RegionPos::from_file_name(name)
            .ok_or_else(|| WorldDiffError::region(path, "not a region file name"))?;
        let bytes = fs::read(path)?;
        Self::from_bytes(position, dimension, &bytes)
    }

    pub fn from_bytes(position: RegionPos, dimension: Dimension, bytes: &[u8]) -> Result<Self> {
        let mut region = Region::empty(position, dimension);
        // the game leaves zero-length files behind for regions it never filled
        if bytes.is_empty() {
            return Ok(region);
        }
        if bytes.len() < HEADER {
            return Err(region.error(format!("{} bytes is shorter than the header", bytes.len())));
        }

        for index in 0..SLOTS {
            let location = BigEndian::read_u32(&bytes[index * 4..]);
            let offset = (location >> 8) as usize * SECTOR;
            let sectors = (location & 0xFF) as usize;
            if offset == 0 && sectors == 0 {
                continue;
            }
            if offset < HEADER || offset + 5 > bytes.len() {
                return Err(region.error(format!("slot {} points outside the file", index)));
            }

            let length = BigEndian::read_u32(&bytes[offset..]) as usize;
            if length == 0 || length + 4 > sectors * SECTOR || offset + 4 + length > bytes.len() {
                return Err(region.error(format!(
                    "slot {} holds {} bytes in {} sectors",
                    index, length, sectors
                )));
            }
            let compression = bytes[offset + 4];
            if compression & COMPRESSION_EXTERNAL != 0 {
                return Err(region.error(format!("slot {} is stored externally", index)));
            }

            region.slots[index] = Some(RawColumn {
                timestamp: BigEndian::read_u32(&bytes[SECTOR + index * 4..]),
                compression,
                data: bytes[offset + 5..offset + 4 + length].to_vec(),
            });
        }
        Ok(region)
    }

    /// Number of generated columns.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, local_x: i32, local_z: i32) -> bool {
        self.slots[Self::slot(local_x, local_z)].is_some()
    }

    fn slot(local_x: i32, local_z: i32) -> usize {
        (local_x.rem_euclid(REGION_SIZE) + local_z.rem_euclid(REGION_SIZE) * REGION_SIZE) as usize
    }

    /// Decodes the column in slot (`local_x`, `local_z`), if generated.
    pub fn column(&self, local_x: i32, local_z: i32, registries: &Registries) -> Result<Option<Column>> {
        let raw = match &self.slots[Self::slot(local_x, local_z)] {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let mut cursor = Cursor::new(&raw.data);
        let file = match raw.compression {
            COMPRESSION_GZIP => NBTFile::read_gzip(&mut cursor)?,
            COMPRESSION_ZLIB => NBTFile::read_zlib(&mut cursor)?,
            COMPRESSION_NONE => NBTFile::read(&mut cursor)?,
            other => return Err(self.error(format!("unknown compression {}", other))),
        };
        Column::from_nbt(&file.root, self.dimension, registries).map(Some)
    }

    /// Serializes `column` into the slot its position maps to.
    pub fn insert_column(&mut self, column: &Column, registries: &Registries) -> Result<()> {
        let region = column.position.region();
        if region != self.position {
            return Err(self.error(format!(
                "column {} {} belongs to {}",
                column.position.x,
                column.position.z,
                region.file_name()
            )));
        }

        let file = NBTFile::new(String::new(), column.to_nbt(registries)?);
        let mut data = Vec::new();
        file.write_zlib(&mut data)?;
        if Self::sectors_for(data.len()) > MAX_SECTORS {
            return Err(self.error(format!(
                "column {} {} needs {} bytes",
                column.position.x,
                column.position.z,
                data.len()
            )));
        }

        self.slots[column.position.region_index()] = Some(RawColumn {
            timestamp: unix_timestamp() as u32,
            compression: COMPRESSION_ZLIB,
            data,
        });
        Ok(())
    }

    fn sectors_for(data_len: usize) -> usize {
        (data_len + 5 + SECTOR - 1) / SECTOR
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; HEADER];
        for (index, slot) in self.slots.iter().enumerate() {
            let raw = match slot {
                Some(raw) => raw,
                None => continue,
            };
            let sectors = Self::sectors_for(raw.data.len());
            if sectors > MAX_SECTORS {
                return Err(self.error(format!("slot {} needs {} sectors", index, sectors)));
            }
            let location = ((bytes.len() / SECTOR) as u32) << 8 | sectors as u32;
            BigEndian::write_u32(&mut bytes[index * 4..], location);
            BigEndian::write_u32(&mut bytes[SECTOR + index * 4..], raw.timestamp);

            bytes.write_u32::<BigEndian>(raw.data.len() as u32 + 1)?;
            bytes.write_u8(raw.compression)?;
            bytes.extend_from_slice(&raw.data);
            let padded = bytes.len().div_ceil(SECTOR) * SECTOR;
            bytes.resize(padded, 0);
        }
        Ok(bytes)
    }

    /// Writes to `<path>.tmp` first and renames it into place.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, self.to_bytes()?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
