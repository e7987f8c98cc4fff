//! Terminal-side implementation of the library's console surface.

use std::io::{self, Write as _};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use indicatif::ProgressBar;
use sxbmon::Console;

use crate::was_interrupted;

/// RAII guard that enables raw terminal mode and restores it on drop
/// (even on panic).
pub(crate) struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    /// Enable raw mode; fails soft into a no-op guard when there is no
    /// terminal (pipes, CI).
    pub(crate) fn enable() -> Self {
        let active = crossterm::terminal::enable_raw_mode().is_ok();
        Self { active }
    }

    /// Whether raw mode is actually active.
    pub(crate) fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.active {
            let _ = crossterm::terminal::disable_raw_mode();
        }
    }
}

/// Rewrite `\n` to `\r\n` for raw-mode terminals.
pub(crate) fn raw_mode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if c == '\n' {
            out.push('\r');
        }
        out.push(c);
    }
    out
}

/// The CLI's upload console: forwards monitor echo to stdout (or a
/// spinner), watches the keyboard for Esc, and remembers the reported
/// start address.
pub(crate) struct TermConsole {
    raw_mode: bool,
    spinner: Option<ProgressBar>,
    chunks: usize,
    start: Option<u32>,
    cancelled: bool,
}

impl TermConsole {
    /// Echo-forwarding console; `raw_mode` controls newline rewriting.
    pub(crate) fn new(raw_mode: bool) -> Self {
        Self {
            raw_mode,
            spinner: None,
            chunks: 0,
            start: None,
            cancelled: false,
        }
    }

    /// Spinner console for `--no-echo` uploads: echo is counted, not shown.
    pub(crate) fn with_spinner(spinner: ProgressBar) -> Self {
        Self {
            raw_mode: false,
            spinner: Some(spinner),
            chunks: 0,
            start: None,
            cancelled: false,
        }
    }

    /// Start address reported by the upload driver, if any.
    pub(crate) fn start(&self) -> Option<u32> {
        self.start
    }

    /// Finish the spinner, if one is attached.
    pub(crate) fn finish(&self) {
        if let Some(pb) = &self.spinner {
            pb.finish_and_clear();
        }
    }

    /// Drain pending keyboard events, looking for Esc or Ctrl-C.
    fn poll_keys(&mut self) {
        while event::poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(KeyEvent {
                code, modifiers, ..
            })) = event::read() else {
                continue;
            };
            match (code, modifiers) {
                (KeyCode::Esc, _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                    self.cancelled = true;
                },
                _ => {},
            }
        }
    }
}

impl Console for TermConsole {
    fn append_text(&mut self, text: &str) {
        self.chunks += 1;

        if let Some(pb) = &self.spinner {
            pb.set_message(format!("{} lines", self.chunks.saturating_sub(1)));
            pb.tick();
            return;
        }

        let mut stdout = io::stdout();
        if self.raw_mode {
            let _ = stdout.write_all(raw_mode_text(text).as_bytes());
        } else {
            let _ = stdout.write_all(text.as_bytes());
        }
        let _ = stdout.flush();
    }

    fn is_cancelled(&mut self) -> bool {
        self.poll_keys();
        self.cancelled || was_interrupted()
    }

    fn clear_cancelled(&mut self) {
        self.cancelled = false;
        crate::clear_interrupted_flag();
    }

    fn set_start_address(&mut self, addr: u32) {
        self.start = Some(addr);
    }
}
