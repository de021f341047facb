use std::io::{self, Read, Write};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::event;
use log::debug;

/// Primary device attributes request (DA1).
pub const DEVICE_ATTRIBUTES_QUERY: &[u8] = b"\x1b[c";

/// DA1 attribute code advertising sixel graphics.
const SIXEL_ATTRIBUTE: &str = "4";

/// Asks the terminal whether it can display sixel images.
///
/// Needs raw mode: in cooked mode the reply is held back until a newline.
pub struct CapabilityProbe {
    timeout: Duration,
}

impl CapabilityProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Send the DA1 query and wait up to the timeout for the reply.
    pub fn probe(&self, out: &mut impl Write) -> anyhow::Result<bool> {
        drain_pending_input()?;

        out.write_all(DEVICE_ATTRIBUTES_QUERY)?;
        out.flush().context("sending device attributes query")?;

        let response = read_response(self.timeout);
        debug!("device attributes response: {response:?}");
        Ok(supports_sixel(&response))
    }
}

/// Discard keys typed before the query so they are not read as the reply.
fn drain_pending_input() -> anyhow::Result<()> {
    while event::poll(Duration::ZERO)? {
        event::read()?;
    }
    Ok(())
}

/// Collect reply bytes until the final `c` or the deadline.
///
/// Stdin is read on a helper thread because it has no read timeout. The thread
/// exits once it sees the terminator; if the terminal never answers it stays
/// blocked, which only happens on the path where startup is aborted.
fn read_response(timeout: Duration) -> String {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut stdin = io::stdin().lock();
        let mut byte = [0u8; 1];
        while let Ok(1) = stdin.read(&mut byte) {
            if tx.send(byte[0]).is_err() || byte[0] == b'c' {
                break;
            }
        }
    });

    let deadline = Instant::now() + timeout;
    let mut response = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(byte) => {
                response.push(byte);
                if byte == b'c' {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&response).into_owned()
}

/// Attribute codes from a DA1 reply such as `ESC [ ? 62 ; 4 ; 22 c`.
pub fn device_attributes(response: &str) -> Vec<&str> {
    let body = match response.rfind('\x1b') {
        Some(start) => &response[start..],
        None => response,
    };
    let body = body.strip_prefix("\x1b[").unwrap_or(body);
    let body = body.strip_prefix('?').unwrap_or(body);
    let body = body.trim_end();
    let body = body.strip_suffix('c').unwrap_or(body);
    body.split(';')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .collect()
}

pub fn supports_sixel(response: &str) -> bool {
    device_attributes(response).contains(&SIXEL_ATTRIBUTE)
}
