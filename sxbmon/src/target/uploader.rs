//! The program-upload driver.
//!
//! Streams a HEX or S-Record file through the `S2` encoder and out over
//! the serial channel, interleaving each transmitted record with the
//! monitor's echo, and polling a cooperative cancel flag between records.
//! Whatever ends the stream — natural end of file, cancellation, a parse
//! error, even a failed serial write — the `S8` terminator is written (or
//! attempted) exactly once, so the monitor is left expecting a command
//! rather than more record bytes.
//!
//! Ordering guarantee: the line for record *i* is fully written and its
//! echo fully drained and forwarded before record *i + 1* is parsed.

use std::path::Path;

use log::{debug, trace, warn};

use crate::console::Console;
use crate::error::{Error, Result};
use crate::image::{RecordReader, UploadEvent};
use crate::monitor::normalize_echo;
use crate::port::{Channel, ECHO_CAPACITY};
use crate::protocol::srec;

/// Status line shown when an upload starts.
pub const UPLOAD_BANNER: &str = ">> Uploading Program, ESC to cancel.\n";

/// Result of a completed upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Address of the first data record, absent if no data was sent.
    pub start: Option<u32>,
    /// Number of data records transmitted.
    pub records: usize,
    /// Whether the user cancelled before the input was exhausted.
    pub cancelled: bool,
}

/// Upload the program at `path` to the monitor over `channel`,
/// reporting echo and status into `ui`.
///
/// Every started record is completed end-to-end; the cancel flag is
/// observed only between records and cleared once seen.
pub fn upload<C, U>(path: &Path, channel: &mut C, ui: &mut U) -> Result<UploadOutcome>
where
    C: Channel,
    U: Console + ?Sized,
{
    if !channel.is_open() {
        return Err(Error::NotConnected);
    }

    ui.append_text(UPLOAD_BANNER);

    let mut reader = RecordReader::open(path)?;
    debug!("uploading {}", path.display());

    let mut start: Option<u32> = None;
    let mut records = 0usize;
    let mut cancelled = false;
    let mut failure: Option<Error> = None;
    let mut echo = Vec::with_capacity(ECHO_CAPACITY);

    loop {
        match reader.next_event() {
            Ok(UploadEvent::SetLinearSegment(segment)) => {
                trace!("linear segment {segment:04X}");
            },
            Ok(UploadEvent::DataBlock { addr, payload }) => {
                let line = srec::encode_record(addr, &payload);
                if let Err(err) = send_record(channel, line.as_bytes(), &mut echo, ui) {
                    failure = Some(err);
                    break;
                }
                if start.is_none() {
                    start = Some(addr);
                }
                records += 1;
            },
            Ok(UploadEvent::EndOfFile { start: parsed }) => {
                if start.is_none() {
                    start = parsed;
                }
                break;
            },
            Err(err) => {
                failure = Some(err);
                break;
            },
        }

        if ui.is_cancelled() {
            ui.clear_cancelled();
            cancelled = true;
            debug!("upload cancelled after {records} records");
            break;
        }
    }

    if let Some(err) = &failure {
        ui.append_text(&format!(">> {err}\n"));
    }

    // Resynchronize the monitor no matter how the stream ended.
    let terminator = channel.write_all(srec::TERMINATOR);
    if let Err(err) = &terminator {
        warn!("terminator write failed: {err}");
    }

    if let Some(addr) = start {
        ui.set_start_address(addr);
    }

    if let Some(err) = failure {
        return Err(err);
    }
    terminator?;

    debug!("upload complete: {records} records, start {start:06X?}");
    Ok(UploadOutcome {
        start,
        records,
        cancelled,
    })
}

/// Transmit one encoded line and forward its echo: write, drain,
/// normalize CR to LF, append to the console.
fn send_record<C, U>(channel: &mut C, line: &[u8], echo: &mut Vec<u8>, ui: &mut U) -> Result<()>
where
    C: Channel,
    U: Console + ?Sized,
{
    channel.write_all(line)?;
    channel.drain_echo(echo)?;
    if !echo.is_empty() {
        normalize_echo(echo);
        ui.append_text(&String::from_utf8_lossy(echo));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Write as _;

    /// Fake serial peer: scripted echo bytes, recorded wire traffic.
    struct FakeChannel {
        open: bool,
        echo_script: VecDeque<Vec<u8>>,
        wire: Vec<u8>,
        fail_writes_after: Option<usize>,
        writes: usize,
    }

    impl FakeChannel {
        fn new() -> Self {
            Self {
                open: true,
                echo_script: VecDeque::new(),
                wire: Vec::new(),
                fail_writes_after: None,
                writes: 0,
            }
        }

        fn with_echoes(echoes: &[&[u8]]) -> Self {
            let mut channel = Self::new();
            channel.echo_script = echoes.iter().map(|e| e.to_vec()).collect();
            channel
        }

        fn wire_lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.wire)
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Channel for FakeChannel {
        fn is_open(&self) -> bool {
            self.open
        }

        fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
            if let Some(limit) = self.fail_writes_after {
                if self.writes >= limit {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "wire gone",
                    )));
                }
            }
            self.writes += 1;
            self.wire.extend_from_slice(bytes);
            Ok(())
        }

        fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
            let Some(front) = self.echo_script.front_mut() else {
                return Ok(0);
            };
            let n = buf.len().min(front.len());
            buf[..n].copy_from_slice(&front[..n]);
            front.drain(..n);
            if front.is_empty() {
                self.echo_script.pop_front();
            }
            Ok(n)
        }

        fn pace(&self, _bytes: usize) {}
    }

    /// Recording console with a scripted cancel point.
    struct FakeConsole {
        text: String,
        start: Option<u32>,
        cancel_after_records: Option<usize>,
        records_seen: usize,
        cancelled: bool,
    }

    impl FakeConsole {
        fn new() -> Self {
            Self {
                text: String::new(),
                start: None,
                cancel_after_records: None,
                records_seen: 0,
                cancelled: false,
            }
        }

        fn cancelling_after(records: usize) -> Self {
            let mut console = Self::new();
            console.cancel_after_records = Some(records);
            console
        }
    }

    impl Console for FakeConsole {
        fn append_text(&mut self, text: &str) {
            self.text.push_str(text);
        }

        fn is_cancelled(&mut self) -> bool {
            self.records_seen += 1;
            if let Some(after) = self.cancel_after_records {
                if self.records_seen >= after {
                    self.cancelled = true;
                }
            }
            self.cancelled
        }

        fn clear_cancelled(&mut self) {
            self.cancelled = false;
        }

        fn set_start_address(&mut self, addr: u32) {
            self.start = Some(addr);
        }
    }

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("sxbmon_uploader_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}_{name}", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_hex_single_record_end_to_end() {
        let path = write_temp("single.hex", ":0400100000AABBCCDD68\n:00000001FF\n");
        let mut channel = FakeChannel::with_echoes(&[b"S208000010AABBCCDDD9\r"]);
        let mut ui = FakeConsole::new();

        let outcome = upload(&path, &mut channel, &mut ui).unwrap();

        assert_eq!(
            channel.wire_lines(),
            vec!["S208000010AABBCCDDD9", "S804000000FB"]
        );
        assert_eq!(outcome.start, Some(0x000010));
        assert_eq!(outcome.records, 1);
        assert!(!outcome.cancelled);
        assert_eq!(ui.start, Some(0x000010));
        // Banner first, then the normalized echo.
        assert!(ui.text.starts_with(UPLOAD_BANNER));
        assert!(ui.text.contains("S208000010AABBCCDDD9\n"));
    }

    #[test]
    fn test_hex_linear_segment_addresses() {
        let path = write_temp(
            "segment.hex",
            ":020000040001F9\n:04001000AABBCCDD00\n:00000001FF\n",
        );
        let mut channel = FakeChannel::new();
        let mut ui = FakeConsole::new();

        let outcome = upload(&path, &mut channel, &mut ui).unwrap();

        assert_eq!(
            channel.wire_lines(),
            vec!["S208010010AABBCCDDD8", "S804000000FB"]
        );
        assert_eq!(outcome.start, Some(0x010010));
    }

    #[test]
    fn test_srec_s1_input_reencoded() {
        let path = write_temp("s1.srec", "S1070010AABBCCDDE5\nS9030000FC\n");
        let mut channel = FakeChannel::new();
        let mut ui = FakeConsole::new();

        let outcome = upload(&path, &mut channel, &mut ui).unwrap();

        assert_eq!(
            channel.wire_lines(),
            vec!["S208000010AABBCCDDD9", "S804000000FB"]
        );
        assert_eq!(outcome.start, Some(0x000010));
    }

    #[test]
    fn test_srec_s2_round_trip_preserves_addr_and_payload() {
        let path = write_temp("s2.srec", "S2080A0010AABBCCDD29\nS804000000FB\n");
        let mut channel = FakeChannel::new();
        let mut ui = FakeConsole::new();

        let outcome = upload(&path, &mut channel, &mut ui).unwrap();

        // Same address and payload, checksum recomputed locally.
        let lines = channel.wire_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("S2080A0010AABBCCDD"));
        assert_eq!(lines[1], "S804000000FB");
        assert_eq!(outcome.start, Some(0x0A0010));
    }

    #[test]
    fn test_records_keep_parser_order() {
        let input = ":0100100011DE\n:0100200022BD\n:0100300033AC\n:00000001FF\n";
        let path = write_temp("order.hex", input);
        let mut channel = FakeChannel::new();
        let mut ui = FakeConsole::new();

        let outcome = upload(&path, &mut channel, &mut ui).unwrap();

        assert_eq!(
            channel.wire_lines(),
            vec![
                "S20500001011D9",
                "S20500002022B8",
                "S2050000303397",
                "S804000000FB"
            ]
        );
        assert_eq!(outcome.records, 3);
    }

    #[test]
    fn test_cancel_mid_stream_stops_cleanly() {
        // 10 one-byte records; cancel observed after the 4th drain.
        let mut input = String::new();
        for i in 0..10u32 {
            let addr = 0x10 + i;
            input.push_str(&format!(":01{addr:04X}00AA{:02X}\n", 0u8));
        }
        input.push_str(":00000001FF\n");
        let path = write_temp("cancel.hex", &input);

        let mut channel = FakeChannel::new();
        let mut ui = FakeConsole::cancelling_after(4);

        let outcome = upload(&path, &mut channel, &mut ui).unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.records, 4);
        let lines = channel.wire_lines();
        // Records 1..=4 then the terminator; no partial record 5.
        assert_eq!(lines.len(), 5);
        assert_eq!(lines.last().unwrap(), "S804000000FB");
        // Flag is cleared for the next session.
        assert!(!ui.cancelled);
        // Start still reported.
        assert_eq!(ui.start, Some(0x000010));
    }

    #[test]
    fn test_parse_error_still_sends_terminator() {
        let path = write_temp("bad.hex", ":0100100011DE\n:04001000AABB");
        let mut channel = FakeChannel::new();
        let mut ui = FakeConsole::new();

        let err = upload(&path, &mut channel, &mut ui).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));

        let lines = channel.wire_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "S20500001011D9");
        assert_eq!(lines[1], "S804000000FB");
        // Error surfaced on the console, start address still reported.
        assert!(ui.text.contains(">> Parse error"));
        assert_eq!(ui.start, Some(0x000010));
    }

    #[test]
    fn test_not_connected_sends_nothing() {
        let path = write_temp("noconn.hex", ":0100100011DE\n:00000001FF\n");
        let mut channel = FakeChannel::new();
        channel.open = false;
        let mut ui = FakeConsole::new();

        let err = upload(&path, &mut channel, &mut ui).unwrap_err();
        assert!(matches!(err, Error::NotConnected));
        assert!(channel.wire.is_empty());
        assert!(ui.text.is_empty());
    }

    #[test]
    fn test_unsupported_extension_sends_nothing() {
        let path = write_temp("prog.bin", "not a record file");
        let mut channel = FakeChannel::new();
        let mut ui = FakeConsole::new();

        let err = upload(&path, &mut channel, &mut ui).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert!(channel.wire.is_empty());
    }

    #[test]
    fn test_write_error_attempts_terminator_once() {
        let path = write_temp("werr.hex", ":0100100011DE\n:0100200022BD\n:00000001FF\n");
        let mut channel = FakeChannel::new();
        // First record succeeds, second write (record 2) fails; the
        // terminator attempt is the next write after that.
        channel.fail_writes_after = Some(1);
        let mut ui = FakeConsole::new();

        let err = upload(&path, &mut channel, &mut ui).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        // Only record 1 made it to the wire; the terminator attempt also
        // failed, but it was made exactly once.
        assert_eq!(channel.wire_lines(), vec!["S20500001011D9"]);
    }

    #[test]
    fn test_empty_input_reports_no_start() {
        let path = write_temp("empty.hex", ":00000001FF\n");
        let mut channel = FakeChannel::new();
        let mut ui = FakeConsole::new();

        let outcome = upload(&path, &mut channel, &mut ui).unwrap();
        assert_eq!(outcome.start, None);
        assert_eq!(outcome.records, 0);
        assert_eq!(ui.start, None);
        assert_eq!(channel.wire_lines(), vec!["S804000000FB"]);
    }
}
