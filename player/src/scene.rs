use sixel_core::IndexedFrameBuffer;

/// Produces the next frame's pixels. Called once per tick with the seconds
/// elapsed since playback started; the whole buffer is rewritten each call.
pub trait FrameSource {
    fn render(&mut self, time: f64, buffer: &mut IndexedFrameBuffer);
}

const BALLS: usize = 5;
const RADIUS: f64 = 0.5;
const SMOOTHING: f64 = 0.5;
const OUTLINE: f64 = 0.025;

/// Palette index used outside every ball.
pub const BACKGROUND: u8 = 8;
/// Palette index of the outline drawn along the merged surface.
pub const OUTLINE_COLOR: u8 = 12;

/// Five circles orbiting the center, merged with a smooth minimum. The inside
/// cycles through all 16 colors by distance and time; the boundary is outlined.
#[derive(Default)]
pub struct Metaballs;

impl Metaballs {
    pub fn new() -> Self {
        Self
    }
}

impl FrameSource for Metaballs {
    fn render(&mut self, time: f64, buffer: &mut IndexedFrameBuffer) {
        let width = buffer.width();
        let height = buffer.height();
        let w = width as f64;
        let h = height as f64;

        let mut offsets = [(0.0, 0.0); BALLS];
        for (i, offset) in offsets.iter_mut().enumerate() {
            let t = time + i as f64;
            *offset = (t.sin(), (t * 0.707).sin());
        }

        for (y, row) in buffer.pixels_mut().chunks_exact_mut(width).enumerate() {
            let yy = (2.0 * y as f64 - h) / h;
            for (x, pixel) in row.iter_mut().enumerate() {
                // Both axes are scaled by height so circles stay round.
                let xx = (2.0 * x as f64 - w) / h;
                let d = offsets.iter().fold(1e3, |d, &(ox, oy)| {
                    let dx = xx + ox;
                    let dy = yy + oy;
                    soft_min(d, (dx * dx + dy * dy).sqrt() - RADIUS, SMOOTHING)
                });
                *pixel = shade(d, time);
            }
        }
    }
}

/// Color for a signed distance `d` from the merged surface.
pub fn shade(d: f64, time: f64) -> u8 {
    if d.abs() - OUTLINE < 0.0 {
        OUTLINE_COLOR
    } else if d < 0.0 {
        ((d + time) * 16.0).round_ties_even() as i64 as u8 & 0xF
    } else {
        BACKGROUND
    }
}

/// Polynomial smooth minimum of `a` and `b` with blend radius `k`.
pub fn soft_min(a: f64, b: f64, k: f64) -> f64 {
    let h = (0.5 + 0.5 * (b - a) / k).clamp(0.0, 1.0);
    mix(b, a, h) - k * h * (1.0 - h)
}

fn mix(a: f64, b: f64, x: f64) -> f64 {
    a + (b - a) * x
}
