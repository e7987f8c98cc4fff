//! Serial device discovery and classification.
//!
//! The SXB boards themselves have plain RS-232 headers, so the host side
//! almost always goes through a USB-to-serial bridge. Enumerating ports
//! with USB metadata and recognizing the common bridge chips lets the CLI
//! offer a sensible default instead of a bare device list.

use log::debug;

/// Known USB-to-serial bridge kinds seen in front of SXB boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// FTDI FT232/FT2232/FT4232 converter.
    Ftdi,
    /// CH340/CH341 converter.
    Ch340,
    /// Silicon Labs CP210x converter.
    Cp210x,
    /// Prolific PL2303 converter.
    Prolific,
    /// Unknown device.
    Unknown,
}

/// Known USB VID/PID pairs for common USB-to-UART bridges.
const KNOWN_USB_DEVICES: &[(u16, &[u16], DeviceKind)] = &[
    (
        0x0403,
        &[0x6001, 0x6010, 0x6011, 0x6014, 0x6015],
        DeviceKind::Ftdi,
    ),
    (
        0x1A86,
        &[0x7523, 0x7522, 0x5523, 0x5512],
        DeviceKind::Ch340,
    ),
    (0x10C4, &[0xEA60, 0xEA70, 0xEA71, 0xEA63], DeviceKind::Cp210x),
    (0x067B, &[0x2303, 0x23A3, 0x23C3, 0x23D3], DeviceKind::Prolific),
];

impl DeviceKind {
    /// Classify a VID/PID combination.
    #[must_use]
    pub fn from_vid_pid(vid: u16, pid: u16) -> Self {
        for (known_vid, pids, device) in KNOWN_USB_DEVICES {
            if vid == *known_vid && (pids.is_empty() || pids.contains(&pid)) {
                return *device;
            }
        }
        Self::Unknown
    }

    /// Human-readable name for the device kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ftdi => "FTDI",
            Self::Ch340 => "CH340/CH341",
            Self::Cp210x => "CP210x",
            Self::Prolific => "PL2303",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether this is a recognized bridge kind.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Discovered serial endpoint information.
#[derive(Debug, Clone)]
pub struct DetectedPort {
    /// Endpoint name/path (e.g., "/dev/ttyUSB0" or "COM3").
    pub name: String,
    /// Classified device kind.
    pub device: DeviceKind,
    /// USB vendor ID (if available).
    pub vid: Option<u16>,
    /// USB product ID (if available).
    pub pid: Option<u16>,
    /// Manufacturer string (if available).
    pub manufacturer: Option<String>,
    /// Product string (if available).
    pub product: Option<String>,
    /// Serial number (if available).
    pub serial: Option<String>,
}

/// Enumerate serial ports with USB metadata where the OS provides it.
#[must_use]
pub fn detect_ports() -> Vec<DetectedPort> {
    let ports = serialport::available_ports().unwrap_or_default();
    debug!("enumerated {} serial ports", ports.len());

    ports
        .into_iter()
        .map(|p| {
            let (vid, pid, manufacturer, product, serial) = match &p.port_type {
                serialport::SerialPortType::UsbPort(info) => (
                    Some(info.vid),
                    Some(info.pid),
                    info.manufacturer.clone(),
                    info.product.clone(),
                    info.serial_number.clone(),
                ),
                _ => (None, None, None, None, None),
            };

            let device = match (vid, pid) {
                (Some(vid), Some(pid)) => DeviceKind::from_vid_pid(vid, pid),
                _ => DeviceKind::Unknown,
            };

            DetectedPort {
                name: p.port_name,
                device,
                vid,
                pid,
                manufacturer,
                product,
                serial,
            }
        })
        .collect()
}

/// Pick the single best port candidate: the first recognized bridge, or
/// the only port present.
#[must_use]
pub fn auto_detect_port() -> Option<DetectedPort> {
    let ports = detect_ports();

    if let Some(known) = ports.iter().find(|p| p.device.is_known()) {
        return Some(known.clone());
    }

    if ports.len() == 1 {
        return ports.into_iter().next();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_bridges() {
        assert_eq!(DeviceKind::from_vid_pid(0x0403, 0x6001), DeviceKind::Ftdi);
        assert_eq!(DeviceKind::from_vid_pid(0x1A86, 0x7523), DeviceKind::Ch340);
        assert_eq!(DeviceKind::from_vid_pid(0x10C4, 0xEA60), DeviceKind::Cp210x);
        assert_eq!(
            DeviceKind::from_vid_pid(0x067B, 0x2303),
            DeviceKind::Prolific
        );
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(
            DeviceKind::from_vid_pid(0x9999, 0x9999),
            DeviceKind::Unknown
        );
        // Known VID with unlisted PID is not classified.
        assert_eq!(
            DeviceKind::from_vid_pid(0x0403, 0x0000),
            DeviceKind::Unknown
        );
    }

    #[test]
    fn test_kind_names_and_known_flag() {
        assert_eq!(DeviceKind::Ftdi.name(), "FTDI");
        assert!(DeviceKind::Ftdi.is_known());
        assert!(!DeviceKind::Unknown.is_known());
    }

    #[test]
    fn test_detect_ports_does_not_panic() {
        let _ = detect_ports();
    }
}
