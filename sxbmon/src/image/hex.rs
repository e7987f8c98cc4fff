//! Intel HEX record reader.
//!
//! Line grammar after the `:` start mark, all fields ASCII hex:
//! byte count (1 byte), load address (2 bytes, big-endian), record type
//! (1 byte), `count` data bytes, one checksum byte. Only types `00`
//! (data) and `04` (extended linear address) are meaningful here; other
//! types are skipped. A count of zero ends the file.

use std::io::BufRead;

use log::trace;

use crate::error::Result;
use crate::image::{UploadEvent, read_byte, read_hex_u8, read_hex_u16, skip_line};

/// Intel HEX record types honored by the uploader.
const TYPE_DATA: u8 = 0x00;
const TYPE_LINEAR_SEGMENT: u8 = 0x04;

/// Streaming Intel HEX reader.
#[derive(Debug)]
pub struct HexReader<R: BufRead> {
    input: R,
    segment: u16,
    start: Option<u32>,
    done: bool,
}

impl<R: BufRead> HexReader<R> {
    /// Wrap `input` with segment state cleared.
    pub fn new(input: R) -> Self {
        Self {
            input,
            segment: 0,
            start: None,
            done: false,
        }
    }

    /// Produce the next event; see [`crate::image::RecordReader::next_event`].
    pub fn next_event(&mut self) -> Result<UploadEvent> {
        if self.done {
            return Ok(UploadEvent::EndOfFile { start: self.start });
        }
        match self.scan_record() {
            Ok(event) => Ok(event),
            Err(err) => {
                // A parse error ends the stream; report it exactly once.
                self.done = true;
                Err(err)
            },
        }
    }

    fn scan_record(&mut self) -> Result<UploadEvent> {
        loop {
            // Hunt for the start-of-record mark; anything else is noise.
            let Some(byte) = read_byte(&mut self.input)? else {
                return self.finish();
            };
            if byte != b':' {
                continue;
            }

            let count = read_hex_u8(&mut self.input)?;
            if count == 0 {
                // End-of-file record.
                return self.finish();
            }

            let address = read_hex_u16(&mut self.input)?;
            let code = read_hex_u8(&mut self.input)?;

            match code {
                TYPE_LINEAR_SEGMENT => {
                    // The SXB toolchains put the segment in the address
                    // field of the 04 record; the two payload bytes are
                    // not decoded separately.
                    self.segment = address;
                    skip_line(&mut self.input)?;
                    trace!("linear segment -> {address:04X}");
                    return Ok(UploadEvent::SetLinearSegment(address));
                },
                TYPE_DATA => {
                    let mut payload = Vec::with_capacity(usize::from(count));
                    for _ in 0..count {
                        payload.push(read_hex_u8(&mut self.input)?);
                    }
                    let addr = (u32::from(self.segment) << 16) | u32::from(address);
                    if self.start.is_none() {
                        self.start = Some(addr);
                    }
                    skip_line(&mut self.input)?;
                    return Ok(UploadEvent::DataBlock { addr, payload });
                },
                other => {
                    trace!("skipping record type {other:02X}");
                    skip_line(&mut self.input)?;
                },
            }
        }
    }

    fn finish(&mut self) -> Result<UploadEvent> {
        self.done = true;
        Ok(UploadEvent::EndOfFile { start: self.start })
    }
}
