//! Motorola S-Record reader.
//!
//! Lines begin with `S` and a single digit. Only `S1` (16-bit address)
//! and `S2` (24-bit address) carry data for the uploader; `S0` headers
//! are skipped and any other digit ends the stream — that is how the
//! `S7`/`S8`/`S9` termination family is recognized. The raw byte count
//! covers address and checksum, so the payload length is the count minus
//! 3 (`S1`) or minus 4 (`S2`); a payload length of zero (or less) also
//! ends the stream.

use std::io::BufRead;

use log::trace;

use crate::error::Result;
use crate::image::{UploadEvent, read_byte, read_hex_u8, read_hex_u16, read_hex_u24, skip_line};

/// Streaming S-Record reader.
#[derive(Debug)]
pub struct SrecReader<R: BufRead> {
    input: R,
    start: Option<u32>,
    done: bool,
}

impl<R: BufRead> SrecReader<R> {
    /// Wrap `input`.
    pub fn new(input: R) -> Self {
        Self {
            input,
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
                self.done = true;
                Err(err)
            },
        }
    }

    fn scan_record(&mut self) -> Result<UploadEvent> {
        loop {
            let Some(first) = read_byte(&mut self.input)? else {
                return self.finish();
            };
            // Tolerate bare line separators between records.
            if first == b'\n' || first == b'\r' {
                continue;
            }
            let Some(kind) = read_byte(&mut self.input)? else {
                return self.finish();
            };
            if first != b'S' {
                return self.finish();
            }

            let digit = kind.wrapping_sub(b'0');
            if digit > 2 {
                // S7/S8/S9 termination records, or anything unrecognized.
                trace!("record S{} ends the stream", char::from(kind));
                return self.finish();
            }

            let count_raw = read_hex_u8(&mut self.input)?;

            if digit == 0 {
                if count_raw == 0 {
                    return self.finish();
                }
                // Header record.
                skip_line(&mut self.input)?;
                continue;
            }

            // Payload length: raw count minus address width and checksum.
            let overhead = if digit == 1 { 3 } else { 4 };
            let Some(count) = usize::from(count_raw).checked_sub(overhead) else {
                return self.finish();
            };
            if count == 0 {
                return self.finish();
            }

            let addr = if digit == 1 {
                u32::from(read_hex_u16(&mut self.input)?)
            } else {
                read_hex_u24(&mut self.input)?
            };

            let mut payload = Vec::with_capacity(count);
            for _ in 0..count {
                payload.push(read_hex_u8(&mut self.input)?);
            }
            if self.start.is_none() {
                self.start = Some(addr);
            }

            // Source checksum rides in the skipped tail.
            skip_line(&mut self.input)?;
            return Ok(UploadEvent::DataBlock { addr, payload });
        }
    }

    fn finish(&mut self) -> Result<UploadEvent> {
        self.done = true;
        Ok(UploadEvent::EndOfFile { start: self.start })
    }
}
