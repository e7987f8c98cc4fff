//! Native serial channel over the `serialport` crate.
//!
//! Opens the port at the monitor's fixed 9600-8-N-1 framing, with
//! RTS/CTS hardware flow control as an option for boards wired for it.

use std::io::{Read, Write};
use std::time::Duration;

use log::trace;

use crate::error::{Error, Result};
use crate::port::{BAUD_RATE, Channel};

/// Read timeout; an expired read means the line is idle.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Serial channel owning an open port.
pub struct SerialChannel {
    port: Option<Box<dyn serialport::SerialPort>>,
    name: String,
}

impl SerialChannel {
    /// Open `port_name` at 9600-8-N-1, optionally with RTS/CTS.
    pub fn open(port_name: &str, hardware_flow: bool) -> Result<Self> {
        let flow_control = if hardware_flow {
            serialport::FlowControl::Hardware
        } else {
            serialport::FlowControl::None
        };

        let port = serialport::new(port_name, BAUD_RATE)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(flow_control)
            .timeout(READ_TIMEOUT)
            .open()?;

        trace!("opened {port_name} at {BAUD_RATE} baud (flow: {flow_control:?})");

        Ok(Self {
            port: Some(port),
            name: port_name.to_string(),
        })
    }

    /// Port name this channel was opened on.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Close the channel and release the port.
    pub fn close(&mut self) {
        // Take ownership of the port and let it drop (close)
        self.port.take();
    }
}

impl Channel for SerialChannel {
    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;
        port.write_all(bytes)?;
        port.flush()?;
        self.pace(bytes.len());
        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;
        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
