use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, trace};

use sixel_core::{encode, IndexedFrameBuffer, Palette};

use crate::scene::FrameSource;

/// Checked once per tick, before the frame is generated.
pub trait ExitSignal {
    fn exit_requested(&mut self) -> anyhow::Result<bool>;
}

/// Esc, `q`, or Ctrl-C (raw mode swallows SIGINT) ends playback.
pub struct KeyboardExit;

impl ExitSignal for KeyboardExit {
    fn exit_requested(&mut self) -> anyhow::Result<bool> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) = event::read()?
            {
                match code {
                    KeyCode::Esc | KeyCode::Char('q') => return Ok(true),
                    KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),
                    _ => {}
                }
            }
        }
        Ok(false)
    }
}

/// Totals reported when playback ends.
#[derive(Debug, Clone, Copy)]
pub struct RunStats {
    pub frames: u64,
    pub elapsed: Duration,
}

impl RunStats {
    pub fn average_fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }
}

/// Drives tick → generate → encode → write at a fixed frame interval.
pub struct FrameScheduler {
    interval: Duration,
    max_frames: Option<u64>,
    frames: u64,
    started: Instant,
}

impl FrameScheduler {
    /// `fps` must be non-zero. The interval is rounded to whole milliseconds.
    pub fn new(fps: u32, max_frames: Option<u64>) -> Self {
        Self {
            interval: frame_interval(fps),
            max_frames,
            frames: 0,
            started: Instant::now(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether another frame should be rendered.
    pub fn tick(&mut self, exit: &mut impl ExitSignal) -> anyhow::Result<bool> {
        if self.max_frames.is_some_and(|max| self.frames >= max) {
            return Ok(false);
        }
        Ok(!exit.exit_requested()?)
    }

    /// Run until the exit signal fires or the frame limit is reached.
    pub fn run(
        &mut self,
        source: &mut impl FrameSource,
        palette: &Palette,
        buffer: &mut IndexedFrameBuffer,
        out: &mut impl Write,
        exit: &mut impl ExitSignal,
    ) -> anyhow::Result<RunStats> {
        self.started = Instant::now();
        let mut frame = Vec::with_capacity(256 * 1024);

        while self.tick(exit)? {
            let before = Instant::now();

            source.render(self.started.elapsed().as_secs_f64(), buffer);
            self.render_frame(palette, buffer, &mut frame, out)?;

            let elapsed = before.elapsed();
            match remaining(self.interval, elapsed) {
                Some(sleep) => thread::sleep(sleep),
                None => debug!(
                    "frame {} took {:?}, over the {:?} budget",
                    self.frames, elapsed, self.interval
                ),
            }
        }

        Ok(RunStats {
            frames: self.frames,
            elapsed: self.started.elapsed(),
        })
    }

    /// Encode one frame into `scratch` and write it out in one piece.
    pub fn render_frame(
        &mut self,
        palette: &Palette,
        buffer: &IndexedFrameBuffer,
        scratch: &mut Vec<u8>,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        scratch.clear();
        encode(palette, buffer, scratch).context("encoding frame")?;
        out.write_all(scratch)?;
        out.flush().context("writing frame")?;

        self.frames += 1;
        trace!("frame {}: {} bytes", self.frames, scratch.len());
        Ok(())
    }
}

/// `round(1000 / fps)` milliseconds.
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_millis((1000.0 / f64::from(fps)).round() as u64)
}

/// Sleep needed to fill out the frame budget; `None` when it was overrun.
pub fn remaining(interval: Duration, elapsed: Duration) -> Option<Duration> {
    interval.checked_sub(elapsed).filter(|d| !d.is_zero())
}
