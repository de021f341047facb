pub mod encode;
pub mod error;
pub mod framebuffer;
pub mod palette;

pub use encode::{encode, encode_to_vec};
pub use error::{Result, SixelError};
pub use framebuffer::IndexedFrameBuffer;
pub use palette::{sixel_component, Palette, PaletteEntry, Rgb};
