pub mod light_mask;
pub mod packet;

pub use light_mask::{LightMask, MaskEncoding};
pub use packet::PacketBuffer;
