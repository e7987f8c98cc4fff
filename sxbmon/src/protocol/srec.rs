//! The monitor's S-Record upload dialect.
//!
//! Both SXB monitors accept program uploads as a sequence of `S2` data
//! records closed by a single `S8` termination record:
//!
//! ```text
//! Data record (ASCII, two uppercase hex digits per byte):
//! +----+-------+-----+-----+-----+-----------+-------+----+
//! | S2 | count | a23 | a15 | a7  | payload…  | cksum | \n |
//! +----+-------+-----+-----+-----+-----------+-------+----+
//! count = payload length + 4 (3 address bytes + checksum)
//! cksum = 0xFF - ((count + address bytes + payload bytes) & 0xFF)
//! ```

use std::fmt::Write as _;

/// Fixed termination record closing every upload session.
pub const TERMINATOR: &[u8] = b"S804000000FB\n";

/// Bytes the count field covers beyond the payload: address + checksum.
const COUNT_OVERHEAD: usize = 4;

/// Largest payload a single record can carry without overflowing count.
pub const MAX_RECORD_PAYLOAD: usize = 0xFF - COUNT_OVERHEAD;

/// Checksum over the count field, the three address bytes, and the payload.
#[allow(clippy::cast_possible_truncation)]
pub fn record_checksum(count: u8, addr: u32, payload: &[u8]) -> u8 {
    let mut acc = u32::from(count);
    acc += (addr >> 16) & 0xFF;
    acc += (addr >> 8) & 0xFF;
    acc += addr & 0xFF;
    for &byte in payload {
        acc += u32::from(byte);
    }
    0xFF - (acc & 0xFF) as u8
}

/// Encode one data record as a complete `S2` line, newline included.
///
/// The encoder never splits records; callers hand it payloads of at most
/// [`MAX_RECORD_PAYLOAD`] bytes (the record formats parsed upstream cannot
/// exceed that).
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::unwrap_used)] // Writing to a String cannot fail
pub fn encode_record(addr: u32, payload: &[u8]) -> String {
    debug_assert!(!payload.is_empty());
    debug_assert!(payload.len() <= MAX_RECORD_PAYLOAD);

    let count = (payload.len() + COUNT_OVERHEAD) as u8;
    let mut line = String::with_capacity(2 * (payload.len() + 5) + 3);

    write!(
        line,
        "S2{:02X}{:02X}{:02X}{:02X}",
        count,
        (addr >> 16) & 0xFF,
        (addr >> 8) & 0xFF,
        addr & 0xFF
    )
    .unwrap();

    for &byte in payload {
        write!(line, "{byte:02X}").unwrap();
    }

    writeln!(line, "{:02X}", record_checksum(count, addr, payload)).unwrap();
    line
}
