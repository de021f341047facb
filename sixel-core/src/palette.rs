use crate::error::{Result, SixelError};

/// An 8-bit-per-channel color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` value.
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: (hex >> 16) as u8,
            g: (hex >> 8) as u8,
            b: hex as u8,
        }
    }

    /// Channels rescaled to the 0..=100 range Sixel color definitions use.
    pub fn to_sixel(self) -> [u8; 3] {
        [
            sixel_component(self.r),
            sixel_component(self.g),
            sixel_component(self.b),
        ]
    }
}

/// Rescale an 8-bit channel to a Sixel percentage: `round(c * 100 / 255)`.
///
/// `c * 200` is always even and 510 is even, so the quotient never lands on an
/// exact half and `+ 127` rounds correctly.
pub fn sixel_component(c: u8) -> u8 {
    ((u32::from(c) * 100 + 127) / 255) as u8
}

/// One color register: the index the encoder selects with `#<index>` and its color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaletteEntry {
    pub index: u8,
    pub color: Rgb,
}

impl PaletteEntry {
    pub const fn new(index: u8, color: Rgb) -> Self {
        Self { index, color }
    }
}

/// Ordered, immutable set of color registers.
///
/// Entry order is the order color definitions and per-band color passes are
/// emitted in, so two palettes with the same entries in a different order
/// produce different (but equally valid) output.
#[derive(Clone, Debug)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
    defined: [bool; 256],
}

impl Palette {
    /// Build a palette, rejecting duplicate indices.
    pub fn new(entries: Vec<PaletteEntry>) -> Result<Self> {
        let mut defined = [false; 256];
        for entry in &entries {
            let slot = &mut defined[entry.index as usize];
            if *slot {
                return Err(SixelError::DuplicatePaletteIndex(entry.index));
            }
            *slot = true;
        }
        Ok(Self { entries, defined })
    }

    /// The 16-color TIC-80 fantasy console palette.
    pub fn tic80() -> Self {
        const COLORS: [u32; 16] = [
            0x1C1C2C, // night blue
            0x5D275D, // deep purple
            0xB13E53, // dark red
            0xEF7D57, // orange
            0xFFCD75, // yellow
            0xA7F070, // light green
            0x38B764, // green
            0x257179, // teal
            0x29366F, // dark blue
            0x3B5FC9, // blue
            0x41A6F6, // light blue
            0x73EFF7, // cyan
            0xF4F4F4, // white
            0x94B0C2, // light gray
            0x566C86, // gray
            0x333C57, // dark gray
        ];

        let mut defined = [false; 256];
        let entries = COLORS
            .iter()
            .enumerate()
            .map(|(i, &hex)| {
                defined[i] = true;
                PaletteEntry::new(i as u8, Rgb::from_hex(hex))
            })
            .collect();
        Self { entries, defined }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in emission order.
    pub fn entries(&self) -> impl Iterator<Item = &PaletteEntry> {
        self.entries.iter()
    }

    pub fn contains(&self, index: u8) -> bool {
        self.defined[index as usize]
    }

    pub fn color_at(&self, index: u8) -> Option<Rgb> {
        self.entries
            .iter()
            .find(|e| e.index == index)
            .map(|e| e.color)
    }
}
