mod probe;
mod scene;
mod scheduler;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::{cursor, execute, terminal};
use log::info;

use sixel_core::{IndexedFrameBuffer, Palette};

use crate::probe::CapabilityProbe;
use crate::scene::Metaballs;
use crate::scheduler::{FrameScheduler, KeyboardExit};

#[derive(Parser)]
#[command(name = "sixel-fx", about = "Animated metaballs rendered in the terminal with sixel graphics")]
struct Cli {
    /// Image width in pixels
    #[arg(long, default_value_t = 640, value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 400, value_parser = clap::value_parser!(u32).range(1..))]
    height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=1000))]
    fps: u32,

    /// How long to wait for the terminal's device attributes reply
    #[arg(long, default_value_t = 100)]
    probe_timeout_ms: u64,

    /// Render without asking the terminal whether it supports sixel
    #[arg(long)]
    skip_probe: bool,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Write log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let palette = Palette::tic80();
    let mut buffer = IndexedFrameBuffer::new(cli.width as usize, cli.height as usize)?;
    let mut scheduler = FrameScheduler::new(cli.fps, cli.frames);
    info!(
        "{}x{} at {} fps ({:?} per frame), {} colors",
        cli.width,
        cli.height,
        cli.fps,
        scheduler.interval(),
        palette.len()
    );

    // Set up panic hook for terminal cleanup
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        cleanup_terminal();
        original_hook(info);
    }));

    // Raw mode first: the probe reply arrives unbuffered and keys are read one at a time.
    terminal::enable_raw_mode().context("enable raw mode")?;
    let stdout = std::io::stdout();
    let mut stdout = BufWriter::with_capacity(256 * 1024, stdout.lock());

    if cli.skip_probe {
        info!("skipping sixel capability probe");
    } else {
        let probe = CapabilityProbe::new(Duration::from_millis(cli.probe_timeout_ms));
        let supported = probe.probe(&mut stdout);
        if !matches!(supported, Ok(true)) {
            cleanup_terminal();
            supported?;
            anyhow::bail!("terminal does not support sixel graphics");
        }
    }

    execute!(
        stdout,
        terminal::EnterAlternateScreen,
        cursor::Hide,
        terminal::Clear(terminal::ClearType::All)
    )
    .context("enter alt screen")?;

    let result = scheduler.run(
        &mut Metaballs::new(),
        &palette,
        &mut buffer,
        &mut stdout,
        &mut KeyboardExit,
    );

    // Cleanup
    stdout.write_all(b"\x1b[?25h")?; // show cursor
    stdout.write_all(b"\x1b[?1049l")?; // leave alternate screen
    stdout.flush()?;
    terminal::disable_raw_mode()?;

    let stats = result?;
    info!(
        "rendered {} frames in {:.1?} ({:.1} fps)",
        stats.frames,
        stats.elapsed,
        stats.average_fps()
    );
    Ok(())
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn cleanup_terminal() {
    let _ = std::io::stdout().write_all(b"\x1b[?25h\x1b[?1049l");
    let _ = std::io::stdout().flush();
    let _ = terminal::disable_raw_mode();
}
