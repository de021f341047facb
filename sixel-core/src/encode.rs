use std::io::{self, Write};

use crate::error::{Result, SixelError};
use crate::framebuffer::IndexedFrameBuffer;
use crate::palette::Palette;

/// Sixel byte for an empty column (`?`). A column mask is added to this.
pub const SIXEL_BASE: u8 = b'?';

/// Pixel rows covered by one sixel character.
pub const BAND_HEIGHT: usize = 6;

/// Runs longer than this are written as `!<count><byte>`.
pub const RLE_THRESHOLD: usize = 3;

/// Cursor home, viewport clear, then DCS entering sixel mode with square pixels.
const PREFIX: &[u8] = b"\x1b[H\x1b[12t\x1bP7;1;q";

/// String terminator leaving sixel mode.
const TERMINATOR: &[u8] = b"\x1b\\";

/// Encode one complete sixel image into `out`.
///
/// Every pixel is checked against the palette before anything is written, so
/// an invalid buffer leaves `out` untouched. Output is written in many small
/// pieces; pass a buffered sink.
pub fn encode<W: Write>(
    palette: &Palette,
    buffer: &IndexedFrameBuffer,
    out: &mut W,
) -> Result<()> {
    validate(palette, buffer)?;

    out.write_all(PREFIX)?;

    for entry in palette.entries() {
        let [r, g, b] = entry.color.to_sixel();
        out.write_all(b"#")?;
        write_decimal(out, entry.index as usize)?;
        out.write_all(b";2;")?;
        write_decimal(out, r as usize)?;
        out.write_all(b";")?;
        write_decimal(out, g as usize)?;
        out.write_all(b";")?;
        write_decimal(out, b as usize)?;
    }

    let width = buffer.width();
    for band_start in (0..buffer.height()).step_by(BAND_HEIGHT) {
        let rows = band_rows(buffer.height(), band_start);

        for entry in palette.entries() {
            out.write_all(b"#")?;
            write_decimal(out, entry.index as usize)?;

            let mut run = RunWriter::new(out);
            for x in 0..width {
                run.push(sixel_at(buffer, x, band_start, rows, entry.index))?;
            }
            run.finish()?;
        }

        out.write_all(b"-")?;
    }

    out.write_all(TERMINATOR)?;
    Ok(())
}

/// Encode into a freshly allocated byte vector.
pub fn encode_to_vec(palette: &Palette, buffer: &IndexedFrameBuffer) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(estimated_size(palette, buffer));
    encode(palette, buffer, &mut out)?;
    Ok(out)
}

/// Fail on the first pixel (in row-major order) whose index the palette lacks.
pub fn validate(palette: &Palette, buffer: &IndexedFrameBuffer) -> Result<()> {
    match buffer
        .pixels()
        .iter()
        .position(|&index| !palette.contains(index))
    {
        Some(pos) => Err(SixelError::IndexOutOfPalette {
            x: pos % buffer.width(),
            y: pos / buffer.width(),
            index: buffer.pixels()[pos],
        }),
        None => Ok(()),
    }
}

/// Rows in the band starting at `band_start`: 6, except possibly the last band.
pub fn band_rows(height: usize, band_start: usize) -> usize {
    BAND_HEIGHT.min(height - band_start)
}

/// Sixel byte for column `x` of a band: bit `i` is set when row `band_start + i` holds `index`.
#[inline]
pub fn sixel_at(
    buffer: &IndexedFrameBuffer,
    x: usize,
    band_start: usize,
    rows: usize,
    index: u8,
) -> u8 {
    debug_assert!(rows <= BAND_HEIGHT, "band of {rows} rows");
    let mut mask = 0u8;
    for i in 0..rows {
        if buffer.get(x, band_start + i) == index {
            mask |= 1 << i;
        }
    }
    SIXEL_BASE + (mask & 0x3f)
}

/// Rough output size for a frame, used to presize buffers.
pub fn estimated_size(palette: &Palette, buffer: &IndexedFrameBuffer) -> usize {
    let bands = buffer.height().div_ceil(BAND_HEIGHT);
    PREFIX.len() + TERMINATOR.len() + palette.len() * 20 + bands * (palette.len() * 8 + 1)
}

/// Run-length state for one color pass over one band.
struct RunWriter<'w, W: Write> {
    out: &'w mut W,
    pending: u8,
    count: usize,
}

impl<'w, W: Write> RunWriter<'w, W> {
    fn new(out: &'w mut W) -> Self {
        Self {
            out,
            pending: SIXEL_BASE,
            count: 0,
        }
    }

    fn push(&mut self, sixel: u8) -> io::Result<()> {
        if sixel == self.pending {
            self.count += 1;
            return Ok(());
        }
        self.flush()?;
        self.pending = sixel;
        self.count = 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.count > RLE_THRESHOLD {
            self.out.write_all(b"!")?;
            write_decimal(self.out, self.count)?;
            self.out.write_all(&[self.pending])
        } else {
            for _ in 0..self.count {
                self.out.write_all(&[self.pending])?;
            }
            Ok(())
        }
    }

    /// Write the trailing run, even an all-empty one, then return to column 0.
    fn finish(mut self) -> io::Result<()> {
        self.flush()?;
        self.out.write_all(b"$")
    }
}

/// Integer-to-ASCII without going through `fmt`.
fn write_decimal<W: Write>(out: &mut W, mut v: usize) -> io::Result<()> {
    let mut digits = [0u8; 20];
    let mut start = digits.len();
    loop {
        start -= 1;
        digits[start] = b'0' + (v % 10) as u8;
        v /= 10;
        if v == 0 {
            break;
        }
    }
    out.write_all(&digits[start..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{PaletteEntry, Rgb};

    fn two_colors() -> Palette {
        Palette::new(vec![
            PaletteEntry::new(0, Rgb::new(0, 0, 0)),
            PaletteEntry::new(1, Rgb::new(255, 128, 0)),
        ])
        .unwrap()
    }

    fn body(out: &[u8]) -> &str {
        let s = std::str::from_utf8(out).unwrap();
        let s = s.strip_prefix("\x1b[H\x1b[12t\x1bP7;1;q").unwrap();
        s.strip_suffix("\x1b\\").unwrap()
    }

    #[test]
    fn single_full_column() {
        let palette = Palette::new(vec![PaletteEntry::new(0, Rgb::new(255, 255, 255))]).unwrap();
        let fb = IndexedFrameBuffer::new(1, 6).unwrap();
        let out = encode_to_vec(&palette, &fb).unwrap();
        assert_eq!(out, b"\x1b[H\x1b[12t\x1bP7;1;q#0;2;100;100;100#0~$-\x1b\\");
        assert_eq!(out[out.len() - 5], SIXEL_BASE + 63);
    }

    #[test]
    fn color_definitions_rescaled() {
        let fb = IndexedFrameBuffer::new(1, 1).unwrap();
        let out = encode_to_vec(&two_colors(), &fb).unwrap();
        assert!(body(&out).starts_with("#0;2;0;0;0#1;2;100;50;0#0"));
    }

    #[test]
    fn run_threshold_is_exact() {
        let fb = IndexedFrameBuffer::from_pixels(7, 1, vec![0, 0, 0, 0, 1, 1, 1]).unwrap();
        let out = encode_to_vec(&two_colors(), &fb).unwrap();
        assert_eq!(body(&out), "#0;2;0;0;0#1;2;100;50;0#0!4@???$#1!4?@@@$-");
    }

    #[test]
    fn absent_color_emits_full_width_empty_run() {
        let fb = IndexedFrameBuffer::new(640, 6).unwrap();
        let out = encode_to_vec(&two_colors(), &fb).unwrap();
        assert!(body(&out).ends_with("#0!640~$#1!640?$-"));
    }

    #[test]
    fn first_column_change_flushes_nothing() {
        // Color 1 starts with a non-empty column, so the initial zero-length run is dropped.
        let fb = IndexedFrameBuffer::from_pixels(2, 1, vec![1, 0]).unwrap();
        let out = encode_to_vec(&two_colors(), &fb).unwrap();
        assert!(body(&out).ends_with("#0?@$#1@?$-"));
    }

    #[test]
    fn short_last_band() {
        let fb = IndexedFrameBuffer::new(5, 8).unwrap();
        let out = encode_to_vec(&two_colors(), &fb).unwrap();
        let bands: Vec<&str> = body(&out)
            .trim_start_matches("#0;2;0;0;0#1;2;100;50;0")
            .split_terminator('-')
            .collect();
        // Two remaining rows set bits 0 and 1: '?' + 3 = 'B'.
        assert_eq!(bands, vec!["#0!5~$#1!5?$", "#0!5B$#1!5?$"]);
    }

    #[test]
    fn band_row_counts() {
        assert_eq!(band_rows(400, 396), 4);
        assert_eq!(band_rows(12, 6), 6);
        assert_eq!(band_rows(1, 0), 1);
        let starts: Vec<usize> = (0..13).step_by(BAND_HEIGHT).collect();
        assert_eq!(starts, vec![0, 6, 12]);
    }

    #[test]
    fn bit_i_tracks_row_i() {
        let fb = IndexedFrameBuffer::from_pixels(1, 6, vec![1, 0, 1, 0, 0, 1]).unwrap();
        assert_eq!(sixel_at(&fb, 0, 0, 6, 1), SIXEL_BASE + 0b100101);
        assert_eq!(sixel_at(&fb, 0, 0, 6, 0), SIXEL_BASE + 0b011010);
        assert_eq!(sixel_at(&fb, 0, 0, 2, 0), SIXEL_BASE + 0b10);
    }

    #[test]
    fn out_of_palette_pixel_writes_nothing() {
        let mut fb = IndexedFrameBuffer::new(4, 3).unwrap();
        fb.set(1, 2, 9);
        let mut out = Vec::new();
        let err = encode(&two_colors(), &fb, &mut out).unwrap_err();
        assert!(matches!(err, SixelError::IndexOutOfPalette { x: 1, y: 2, index: 9 }));
        assert!(out.is_empty());
    }

    #[test]
    fn sink_errors_propagate() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let fb = IndexedFrameBuffer::new(2, 2).unwrap();
        let err = encode(&two_colors(), &fb, &mut Broken).unwrap_err();
        assert!(matches!(err, SixelError::Io(_)));
    }

    #[test]
    fn decimal_formatting() {
        let mut out = Vec::new();
        for v in [0, 7, 10, 640, 123456] {
            write_decimal(&mut out, v).unwrap();
            out.push(b' ');
        }
        assert_eq!(out, b"0 7 10 640 123456 ");
    }
}
