use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub type Result<T> = std::result::Result<T, crate::error::WorldDiffError>;

/// Columns per region edge.
pub const REGION_SIZE: i32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Overworld,
    Nether,
    End,
}

impl Dimension {
    /// Directory holding this dimension's region files, relative to the world root.
    pub fn region_dir(&self, world: &Path) -> PathBuf {
        match self {
            Dimension::Overworld => world.join("region"),
            Dimension::Nether => world.join("DIM-1").join("region"),
            Dimension::End => world.join("DIM1").join("region"),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Overworld => write!(f, "overworld"),
            Dimension::Nether => write!(f, "the_nether"),
            Dimension::End => write!(f, "the_end"),
        }
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim_start_matches("minecraft:") {
            "overworld" => Ok(Dimension::Overworld),
            "nether" | "the_nether" => Ok(Dimension::Nether),
            "end" | "the_end" => Ok(Dimension::End),
            other => Err(format!("unknown dimension: {}", other)),
        }
    }
}

/// Absolute column coordinate plus the dimension it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
    pub dimension: Dimension,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32, dimension: Dimension) -> Self {
        ChunkPos { x, z, dimension }
    }

    pub fn region(&self) -> RegionPos {
        RegionPos::new(self.x.div_euclid(REGION_SIZE), self.z.div_euclid(REGION_SIZE))
    }

    /// Slot of this column inside its region's 32x32 grid.
    pub fn region_index(&self) -> usize {
        let local_x = self.x.rem_euclid(REGION_SIZE);
        let local_z = self.z.rem_euclid(REGION_SIZE);
        (local_x + local_z * REGION_SIZE) as usize
    }
}

/// Absolute block coordinate, used to key block entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        BlockPos { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    pub fn new(x: i32, z: i32) -> Self {
        RegionPos { x, z }
    }

    /// Parses `r.<x>.<z>.mca`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let mut parts = name.strip_suffix(".mca")?.split('.');
        if parts.next()? != "r" {
            return None;
        }
        let x = parts.next()?.parse().ok()?;
        let z = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(RegionPos { x, z })
    }

    pub fn file_name(&self) -> String {
        format!("r.{}.{}.mca", self.x, self.z)
    }

    /// Absolute position of the column in slot (`local_x`, `local_z`).
    pub fn chunk(&self, local_x: i32, local_z: i32, dimension: Dimension) -> ChunkPos {
        ChunkPos::new(
            self.x * REGION_SIZE + local_x,
            self.z * REGION_SIZE + local_z,
            dimension,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_file_names() {
        assert_eq!(RegionPos::from_file_name("r.0.0.mca"), Some(RegionPos::new(0, 0)));
        assert_eq!(RegionPos::from_file_name("r.-3.12.mca"), Some(RegionPos::new(-3, 12)));
        assert_eq!(RegionPos::from_file_name("r.1.2.mcr"), None);
        assert_eq!(RegionPos::from_file_name("r.1.mca"), None);
        assert_eq!(RegionPos::from_file_name("x.1.2.mca"), None);
        assert_eq!(RegionPos::from_file_name("r.1.2.3.mca"), None);
        assert_eq!(RegionPos::new(-1, 4).file_name(), "r.-1.4.mca");
    }

    #[test]
    fn test_chunk_region_mapping_with_negative_coordinates() {
        let pos = ChunkPos::new(-1, -33, Dimension::Overworld);
        assert_eq!(pos.region(), RegionPos::new(-1, -2));
        assert_eq!(pos.region_index(), 31 + 31 * 32);

        let region = RegionPos::new(-1, -2);
        assert_eq!(region.chunk(31, 31, Dimension::Overworld), pos);
    }

    #[test]
    fn test_dimension_parsing_and_dirs() {
        assert_eq!("minecraft:the_nether".parse::<Dimension>(), Ok(Dimension::Nether));
        assert_eq!("end".parse::<Dimension>(), Ok(Dimension::End));
        assert!("moon".parse::<Dimension>().is_err());
        assert_eq!(
            Dimension::Nether.region_dir(Path::new("w")),
            Path::new("w").join("DIM-1").join("region")
        );
    }
}
