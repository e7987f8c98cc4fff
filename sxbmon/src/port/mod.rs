//! Serial channel abstraction.
//!
//! The upload driver and monitor session need very little from the
//! transport: an open check, a blocking write, a bounded echo drain, and
//! the pacing delay that gives the 9600-baud monitor time to respond.
//! That contract is the [`Channel`] trait; the native implementation over
//! the `serialport` crate lives in [`native`]. Keeping the seam this
//! narrow lets the drivers run unchanged against an in-memory fake in
//! tests.

pub mod native;

use std::thread;
use std::time::Duration;

use crate::error::Result;

/// Monitor serial speed, fixed for both board models.
pub const BAUD_RATE: u32 = 9600;

/// Bytes requested per drain read.
pub const DRAIN_CHUNK: usize = 256;

/// Cumulative drain cut-off; a chattering peer cannot stall a record.
pub const DRAIN_LIMIT: usize = 2048;

/// Suggested capacity for echo buffers handed to [`Channel::drain_echo`].
pub const ECHO_CAPACITY: usize = 4096;

/// Fixed component of the per-write pacing delay, in milliseconds.
pub const PACE_BASE_MS: u64 = 20;

/// Byte channel to the board monitor.
pub trait Channel {
    /// Whether the channel is open for traffic.
    fn is_open(&self) -> bool;

    /// Write all bytes, blocking until the OS accepts them, then pace.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read one chunk of whatever is currently available into `buf`,
    /// returning 0 when the line is idle.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Delay roughly `20 + bytes` milliseconds, matching the monitor's
    /// response cadence.
    fn pace(&self, bytes: usize) {
        thread::sleep(Duration::from_millis(PACE_BASE_MS + bytes as u64));
    }

    /// Drain pending echo into `out` (cleared first), reading chunks of
    /// [`DRAIN_CHUNK`] bytes until the line goes idle or [`DRAIN_LIMIT`]
    /// bytes have accumulated. Returns the number of bytes drained.
    fn drain_echo(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        out.clear();
        let mut chunk = [0u8; DRAIN_CHUNK];
        loop {
            let n = self.read_available(&mut chunk)?;
            if n == 0 {
                break;
            }
            self.pace(n);
            out.extend_from_slice(&chunk[..n]);
            if out.len() > DRAIN_LIMIT {
                break;
            }
        }
        Ok(out.len())
    }
}

// Re-export the native implementation
pub use native::SerialChannel;
