//! # sxbmon
//!
//! A library for talking to the serial monitors of the WDC single-board
//! computers (W65C265SXB and W65C134SXB).
//!
//! The monitors speak a text-line protocol over RS-232 at 9600 baud. This
//! crate provides the host side of that conversation:
//!
//! - Intel HEX and Motorola S-Record program file parsing
//! - Re-encoding into the monitor's `S2`/`S8` upload dialect
//! - The upload driver (write, echo drain, cooperative cancel)
//! - Monitor command formatting (registers, jumps, memory dumps)
//! - Serial port discovery and the 9600-8-N-1 channel
//!
//! ## Example
//!
//! ```rust,no_run
//! use sxbmon::port::SerialChannel;
//! use sxbmon::target::uploader;
//!
//! struct Quiet;
//! impl sxbmon::Console for Quiet {
//!     fn append_text(&mut self, _text: &str) {}
//!     fn is_cancelled(&mut self) -> bool { false }
//!     fn clear_cancelled(&mut self) {}
//!     fn set_start_address(&mut self, addr: u32) {
//!         println!("program starts at {addr:06X}");
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut channel = SerialChannel::open("/dev/ttyUSB0", false)?;
//!     let outcome = uploader::upload("program.hex".as_ref(), &mut channel, &mut Quiet)?;
//!     println!("sent {} records", outcome.records);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::{Arc, OnceLock};

pub mod console;
pub mod device;
pub mod error;
pub mod image;
pub mod monitor;
pub mod port;
pub mod protocol;
pub mod target;

static INTERRUPT_CHECKER: OnceLock<Arc<dyn Fn() -> bool + Send + Sync>> = OnceLock::new();

/// Register a global interruption checker used by long-running library loops.
///
/// The checker should return `true` when the current operation should stop
/// (for example after receiving Ctrl-C in CLI applications).
pub fn set_interrupt_checker<F>(checker: F)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    let _ = INTERRUPT_CHECKER.set(Arc::new(checker));
}

/// Returns whether interruption was requested by the embedding application.
#[must_use]
pub fn is_interrupt_requested() -> bool {
    INTERRUPT_CHECKER
        .get()
        .is_some_and(|checker| checker())
}

#[cfg(test)]
pub(crate) fn test_set_interrupted(value: bool) {
    use std::sync::atomic::{AtomicBool, Ordering};

    static TEST_INTERRUPT_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

    let flag = TEST_INTERRUPT_FLAG
        .get_or_init(|| {
            let shared = Arc::new(AtomicBool::new(false));
            let checker = Arc::clone(&shared);
            set_interrupt_checker(move || checker.load(Ordering::Relaxed));
            shared
        })
        .clone();

    flag.store(value, Ordering::Relaxed);
}

// Re-exports for convenience
pub use {
    console::Console,
    device::{DetectedPort, DeviceKind, detect_ports},
    error::{Error, Result},
    image::{FileFormat, RecordReader, UploadEvent},
    monitor::{MonitorSession, filter_result, normalize_echo},
    port::{Channel, SerialChannel},
    protocol::srec::TERMINATOR,
    target::{BoardModel, Register, uploader::UploadOutcome},
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_checker_default_false() {
        test_set_interrupted(false);
        assert!(!is_interrupt_requested());
    }

    #[test]
    fn test_interrupt_checker_toggle_true_false() {
        test_set_interrupted(true);
        assert!(is_interrupt_requested());

        test_set_interrupted(false);
        assert!(!is_interrupt_requested());
    }
}
