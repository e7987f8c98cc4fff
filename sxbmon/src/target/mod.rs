//! Board/target abstraction for the two SXB monitor dialects.

pub mod command;
pub mod uploader;

use std::fmt;

/// Supported SXB board models.
///
/// Both boards expose the same upload dialect; register and jump command
/// syntax differs between the two monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BoardModel {
    /// W65C265SXB (W65C816 core, 24-bit addressing).
    #[default]
    Sxb265,
    /// W65C134SXB (W65C02 core, 16-bit addressing).
    Sxb134,
}

impl BoardModel {
    /// Monitor serial speed; both boards talk at 9600 baud.
    #[must_use]
    pub fn baud_rate(&self) -> u32 {
        9600
    }

    /// Human-readable board name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sxb265 => "W65C265SXB",
            Self::Sxb134 => "W65C134SXB",
        }
    }

    /// Address bits the monitor's jump and dump commands understand.
    #[must_use]
    pub fn address_bits(&self) -> u32 {
        match self {
            Self::Sxb265 => 24,
            Self::Sxb134 => 16,
        }
    }

    /// Registers the monitor exposes on this board.
    #[must_use]
    pub fn registers(&self) -> &'static [Register] {
        match self {
            Self::Sxb265 => &[
                Register::Pc,
                Register::A,
                Register::X,
                Register::Y,
                Register::Sp,
                Register::Dp,
                Register::Sr,
                Register::Db,
            ],
            Self::Sxb134 => &[
                Register::Pc,
                Register::Sr,
                Register::A,
                Register::X,
                Register::Y,
                Register::Sp,
            ],
        }
    }
}

impl fmt::Display for BoardModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// CPU registers addressable through the monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Program counter (bank:offset on the 265).
    Pc,
    /// Accumulator.
    A,
    /// X index register.
    X,
    /// Y index register.
    Y,
    /// Stack pointer.
    Sp,
    /// Direct page register (265 only).
    Dp,
    /// Status register.
    Sr,
    /// Data bank register (265 only).
    Db,
}

impl Register {
    /// Canonical register name as shown by the monitors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pc => "PC",
            Self::A => "A",
            Self::X => "X",
            Self::Y => "Y",
            Self::Sp => "SP",
            Self::Dp => "DP",
            Self::Sr => "SR",
            Self::Db => "DB",
        }
    }

    /// Parse a register name, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "PC" => Some(Self::Pc),
            "A" => Some(Self::A),
            "X" => Some(Self::X),
            "Y" => Some(Self::Y),
            "SP" | "S" => Some(Self::Sp),
            "DP" | "D" => Some(Self::Dp),
            "SR" | "F" => Some(Self::Sr),
            "DB" | "B" => Some(Self::Db),
            _ => None,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_defaults() {
        assert_eq!(BoardModel::default(), BoardModel::Sxb265);
        assert_eq!(BoardModel::Sxb265.baud_rate(), 9600);
        assert_eq!(BoardModel::Sxb134.baud_rate(), 9600);
    }

    #[test]
    fn test_address_bits() {
        assert_eq!(BoardModel::Sxb265.address_bits(), 24);
        assert_eq!(BoardModel::Sxb134.address_bits(), 16);
    }

    #[test]
    fn test_register_sets() {
        assert!(BoardModel::Sxb265.registers().contains(&Register::Db));
        assert!(!BoardModel::Sxb134.registers().contains(&Register::Db));
        assert!(!BoardModel::Sxb134.registers().contains(&Register::Dp));
    }

    #[test]
    fn test_register_from_name() {
        assert_eq!(Register::from_name("pc"), Some(Register::Pc));
        assert_eq!(Register::from_name("SP"), Some(Register::Sp));
        assert_eq!(Register::from_name("db"), Some(Register::Db));
        assert_eq!(Register::from_name("Z"), None);
    }
}
