pub mod error;
pub mod types;

pub use error::WorldDiffError;
pub use types::{BlockPos, ChunkPos, Dimension, RegionPos, Result, REGION_SIZE};
