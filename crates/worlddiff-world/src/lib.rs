pub mod bit_storage;
pub mod column;
pub mod container;
pub mod light;
pub mod palette;
pub mod region;
pub mod registry;
pub mod section;
pub mod version;

pub use bit_storage::BitStorage;
pub use column::Column;
pub use container::PalettedContainer;
pub use light::LightChannel;
pub use palette::{Palette, PaletteType};
pub use region::Region;
pub use registry::{BiomeRegistry, BlockRegistry, Registries, Registry};
pub use section::Section;
pub use version::{DiskLayout, SchemaVersion};
