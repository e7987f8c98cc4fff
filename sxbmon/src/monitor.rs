//! Monitor session primitives and echo-text helpers.

use log::debug;

use crate::error::Result;
use crate::port::{Channel, ECHO_CAPACITY};
use crate::target::{BoardModel, Register, command};

/// Normalize monitor echo in place: carriage returns become newlines.
///
/// The monitors end their lines with CR; host consoles want LF.
pub fn normalize_echo(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        if *byte == b'\r' {
            *byte = b'\n';
        }
    }
}

/// Keep only the characters register readouts are made of: decimal
/// digits, uppercase letters, and spaces.
pub fn filter_result(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_digit() || c.is_ascii_uppercase() || *c == ' ')
        .collect()
}

/// A command-level session with a board monitor.
///
/// Wraps an open [`Channel`] and drives single request/echo exchanges:
/// write the command, wait the pacing delay, drain whatever the monitor
/// echoed, and hand the normalized text back.
pub struct MonitorSession<C: Channel> {
    channel: C,
    model: BoardModel,
    echo: Vec<u8>,
}

impl<C: Channel> MonitorSession<C> {
    /// Wrap an open channel for `model`.
    pub fn new(channel: C, model: BoardModel) -> Self {
        Self {
            channel,
            model,
            echo: Vec::with_capacity(ECHO_CAPACITY),
        }
    }

    /// Board model this session talks to.
    pub fn model(&self) -> BoardModel {
        self.model
    }

    /// Mutable access to the underlying channel.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Consume the session and return the underlying channel.
    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Send `cmd` and return whatever the monitor echoed back.
    pub fn exchange(&mut self, cmd: &str) -> Result<String> {
        debug!("monitor <- {cmd:?}");
        self.channel.write_all(cmd.as_bytes())?;

        let mut echo = std::mem::take(&mut self.echo);
        let result = self.channel.drain_echo(&mut echo);
        normalize_echo(&mut echo);
        let text = String::from_utf8_lossy(&echo).into_owned();
        self.echo = echo;
        result?;

        debug!("monitor -> {} bytes", text.len());
        Ok(text)
    }

    /// Read the monitor's register display, filtered to the readout chars.
    pub fn read_registers(&mut self) -> Result<String> {
        let raw = self.exchange(command::show_registers(self.model))?;
        Ok(filter_result(&raw))
    }

    /// Assign `value` to `reg`, then request a fresh register display.
    pub fn write_register(&mut self, reg: Register, value: u32) -> Result<String> {
        let cmd = command::set_register(self.model, reg, value)?;
        self.exchange(&cmd)?;
        // Both monitors redisplay the register line on R.
        self.exchange("R")
    }

    /// Long jump (`G`) to `addr`; control does not come back.
    pub fn jump_long(&mut self, addr: u32) -> Result<String> {
        self.exchange(&command::jump_long(self.model, addr))
    }

    /// Subroutine jump (`J`) to `addr`.
    pub fn jump_subroutine(&mut self, addr: u32) -> Result<String> {
        self.exchange(&command::jump_subroutine(self.model, addr))
    }

    /// Dump the 256-byte page at `addr`, returning the monitor's listing.
    pub fn dump_page(&mut self, addr: u32) -> Result<String> {
        self.exchange(&command::dump_page(self.model, addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[test]
    fn test_normalize_echo_rewrites_cr() {
        let mut buf = b"PC 1000\rA 12\r".to_vec();
        normalize_echo(&mut buf);
        assert_eq!(buf, b"PC 1000\nA 12\n");
    }

    #[test]
    fn test_normalize_echo_leaves_lf_alone() {
        let mut buf = b"already\nfine\n".to_vec();
        normalize_echo(&mut buf);
        assert_eq!(buf, b"already\nfine\n");
    }

    #[test]
    fn test_filter_result_keeps_readout_chars() {
        let noisy = ".\r\nPC=01 A 12 x 3F\x07";
        assert_eq!(filter_result(noisy), "PC01 A 12  3F");
    }

    #[test]
    fn test_filter_result_empty() {
        assert_eq!(filter_result("\r\n\x1b[2J"), "");
    }

    /// Scripted channel: echoes a canned response per exchange.
    struct ScriptChannel {
        pending: VecDeque<u8>,
        written: Vec<u8>,
    }

    impl ScriptChannel {
        fn new(response: &[u8]) -> Self {
            Self {
                pending: response.iter().copied().collect(),
                written: Vec::new(),
            }
        }
    }

    impl Channel for ScriptChannel {
        fn is_open(&self) -> bool {
            true
        }

        fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
            let n = buf.len().min(self.pending.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.pending.pop_front().unwrap();
            }
            Ok(n)
        }

        fn pace(&self, _bytes: usize) {}
    }

    #[test]
    fn test_exchange_writes_command_and_normalizes_echo() {
        let channel = ScriptChannel::new(b"| \rPC 00:1000\r");
        let mut session = MonitorSession::new(channel, BoardModel::Sxb265);

        let echo = session.exchange("| ").unwrap();
        assert_eq!(echo, "| \nPC 00:1000\n");
        assert_eq!(session.channel_mut().written, b"| ");
    }

    #[test]
    fn test_read_registers_filters() {
        let channel = ScriptChannel::new(b"R\r00 31 FF 00 12\r.");
        let mut session = MonitorSession::new(channel, BoardModel::Sxb134);

        let regs = session.read_registers().unwrap();
        assert_eq!(regs, "R00 31 FF 00 12");
        assert_eq!(session.channel_mut().written, b"R");
    }

    #[test]
    fn test_write_register_sends_assignment_then_display() {
        let channel = ScriptChannel::new(b"");
        let mut session = MonitorSession::new(channel, BoardModel::Sxb265);

        session.write_register(Register::A, 0x1234).unwrap();
        assert_eq!(session.channel_mut().written, b"|A1234R");
    }

    #[test]
    fn test_jump_and_dump_wire_bytes() {
        let channel = ScriptChannel::new(b"");
        let mut session = MonitorSession::new(channel, BoardModel::Sxb134);

        session.jump_subroutine(0x0300).unwrap();
        session.dump_page(0x0200).unwrap();
        assert_eq!(session.channel_mut().written, b"J0300D020002FF");
    }
}
