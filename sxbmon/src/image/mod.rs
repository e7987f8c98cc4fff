//! Program image parsing.
//!
//! The monitor accepts uploads only in its own `S2`/`S8` dialect, so the
//! two common assembler output formats are parsed here and normalized into
//! a single stream of [`UploadEvent`]s for the upload driver:
//!
//! - **Intel HEX** (`.hex`): `:`-prefixed lines, 16-bit addresses plus an
//!   extended-linear-address record selecting the upper 16 bits
//! - **Motorola S-Record** (`.srec`): `S1` (16-bit) and `S2` (24-bit)
//!   data records
//!
//! Source checksums are not verified; they are discarded and recomputed
//! when the records are re-encoded for the wire.

pub mod hex;
pub mod srec;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};

/// Upper bound on the payload of a single record (S-Record count field).
pub const MAX_PAYLOAD: usize = 255;

/// Bytes scanned past a record before giving up on finding its newline.
const LINE_SKIP_LIMIT: usize = 256;

/// A normalized event from a record parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// Select the upper 16 bits of subsequent Intel HEX data addresses.
    SetLinearSegment(u16),
    /// One record worth of program bytes at a 24-bit address.
    DataBlock {
        /// Composed 24-bit load address.
        addr: u32,
        /// Record payload, never empty, at most [`MAX_PAYLOAD`] bytes.
        payload: Vec<u8>,
    },
    /// End of the input stream.
    EndOfFile {
        /// Address of the first data record, if any was seen.
        start: Option<u32>,
    },
}

/// Input record format, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Intel HEX (`.hex`).
    IntelHex,
    /// Motorola S-Record (`.srec`).
    Srec,
}

impl FileFormat {
    /// Detect the format from the path extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        if ext.eq_ignore_ascii_case("hex") {
            Ok(Self::IntelHex)
        } else if ext.eq_ignore_ascii_case("srec") {
            Ok(Self::Srec)
        } else {
            Err(Error::UnsupportedFormat(path.display().to_string()))
        }
    }
}

/// Streaming record reader over either dialect.
#[derive(Debug)]
pub enum RecordReader<R: BufRead> {
    /// Intel HEX input.
    IntelHex(hex::HexReader<R>),
    /// Motorola S-Record input.
    Srec(srec::SrecReader<R>),
}

impl RecordReader<BufReader<File>> {
    /// Open `path`, selecting the dialect by extension.
    ///
    /// The extension is checked before any file I/O, so an unsupported
    /// format never touches the filesystem.
    pub fn open(path: &Path) -> Result<Self> {
        let format = FileFormat::from_path(path)?;
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_reader(BufReader::new(file), format))
    }
}

impl<R: BufRead> RecordReader<R> {
    /// Wrap an already-open reader as `format`.
    pub fn from_reader(input: R, format: FileFormat) -> Self {
        match format {
            FileFormat::IntelHex => Self::IntelHex(hex::HexReader::new(input)),
            FileFormat::Srec => Self::Srec(srec::SrecReader::new(input)),
        }
    }

    /// Produce the next event.
    ///
    /// [`UploadEvent::EndOfFile`] is the final event of a stream; calling
    /// again after it (or after an error) yields `EndOfFile` again. A
    /// truncated or malformed record is reported once as [`Error::Parse`].
    pub fn next_event(&mut self) -> Result<UploadEvent> {
        match self {
            Self::IntelHex(r) => r.next_event(),
            Self::Srec(r) => r.next_event(),
        }
    }
}

/// Read one byte, `None` at end of input.
pub(crate) fn read_byte<R: BufRead>(input: &mut R) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        return match input.read(&mut byte) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => Err(e.into()),
        };
    }
}

fn hex_digit(byte: u8) -> Result<u8> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(Error::Parse(format!(
            "invalid hex digit {:?}",
            char::from(byte)
        ))),
    }
}

/// Read a two-digit hex field.
pub(crate) fn read_hex_u8<R: BufRead>(input: &mut R) -> Result<u8> {
    let mut value = 0u8;
    for _ in 0..2 {
        let byte = read_byte(input)?
            .ok_or_else(|| Error::Parse("unexpected end of file inside record".into()))?;
        value = (value << 4) | hex_digit(byte)?;
    }
    Ok(value)
}

/// Read a four-digit hex field.
pub(crate) fn read_hex_u16<R: BufRead>(input: &mut R) -> Result<u16> {
    let high = read_hex_u8(input)?;
    let low = read_hex_u8(input)?;
    Ok(u16::from_be_bytes([high, low]))
}

/// Read a six-digit hex field.
pub(crate) fn read_hex_u24<R: BufRead>(input: &mut R) -> Result<u32> {
    let high = read_hex_u8(input)?;
    let rest = read_hex_u16(input)?;
    Ok((u32::from(high) << 16) | u32::from(rest))
}

/// Discard trailing bytes (source checksum included) up to and including
/// the next newline, bounded by [`LINE_SKIP_LIMIT`].
pub(crate) fn skip_line<R: BufRead>(input: &mut R) -> Result<()> {
    for _ in 0..LINE_SKIP_LIMIT {
        match read_byte(input)? {
            None | Some(b'\n') => break,
            Some(_) => {},
        }
    }
    Ok(())
}
