/// Errors produced while building frames or encoding them to Sixel.
#[derive(Debug, thiserror::Error)]
pub enum SixelError {
    /// A frame buffer was requested with a zero width or height.
    #[error("invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    /// Two palette entries share the same color register.
    #[error("duplicate palette index: {0}")]
    DuplicatePaletteIndex(u8),

    /// A pixel refers to a color register the palette does not define.
    #[error("pixel ({x}, {y}) uses index {index}, which is not in the palette")]
    IndexOutOfPalette { x: usize, y: usize, index: u8 },

    /// Writing to the output sink failed.
    #[error("sixel output: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SixelError>;
