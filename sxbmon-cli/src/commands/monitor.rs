//! Interactive serial monitor command.
//!
//! Single-threaded poll loop: keyboard events go out over the channel,
//! and whatever the monitor echoes is drained and printed between key
//! polls. Exit with Ctrl+C.

use std::io::{self, Write as _};
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use sxbmon::port::{BAUD_RATE, ECHO_CAPACITY, SerialChannel};
use sxbmon::{Channel, normalize_echo};

use crate::config::Config;
use crate::term::{RawModeGuard, raw_mode_text};
use crate::{Cli, board_model, clear_interrupted_flag, get_port, hardware_flow, was_interrupted};

/// Keyboard poll interval between echo drains.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Monitor command implementation.
pub(crate) fn cmd_monitor(cli: &Cli, config: &mut Config) -> Result<()> {
    let port = get_port(cli, config)?;
    let model = board_model(cli, config);

    eprintln!(
        "{} Monitor on {} ({} at {} baud)",
        style("📡").cyan(),
        style(&port).green(),
        model.name(),
        BAUD_RATE
    );
    eprintln!("{}", style("Press Ctrl+C to exit.").dim());

    let mut channel = SerialChannel::open(&port, hardware_flow(cli, config))
        .with_context(|| format!("Failed to open serial port {port}"))?;

    let raw_guard = RawModeGuard::enable();
    let raw = raw_guard.is_active();
    let mut echo: Vec<u8> = Vec::with_capacity(ECHO_CAPACITY);

    loop {
        if was_interrupted() {
            clear_interrupted_flag();
            break;
        }

        // Keyboard → serial
        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(KeyEvent {
                code, modifiers, ..
            }) = event::read()?
            {
                match (code, modifiers) {
                    // Ctrl+C: exit
                    (KeyCode::Char('c'), KeyModifiers::CONTROL) => break,
                    // The monitors want CR for end-of-line
                    (KeyCode::Enter, _) => channel.write_all(b"\r")?,
                    (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
                        let mut buf = [0u8; 4];
                        let bytes = c.encode_utf8(&mut buf);
                        channel.write_all(bytes.as_bytes())?;
                    },
                    (KeyCode::Backspace, _) => channel.write_all(&[0x08])?,
                    (KeyCode::Tab, _) => channel.write_all(&[0x09])?,
                    (KeyCode::Esc, _) => channel.write_all(&[0x1B])?,
                    _ => {},
                }
            }
        }

        // Serial → terminal
        if channel.drain_echo(&mut echo)? > 0 {
            normalize_echo(&mut echo);
            let text = String::from_utf8_lossy(&echo);
            let mut stdout = io::stdout();
            if raw {
                stdout.write_all(raw_mode_text(&text).as_bytes())?;
            } else {
                stdout.write_all(text.as_bytes())?;
            }
            stdout.flush()?;
        }
    }

    drop(raw_guard);
    eprintln!("{} Monitor closed.", style("👋").cyan());

    channel.close();
    Ok(())
}
