//! Monitor command formatting.
//!
//! The 265 monitor takes `|`-prefixed register assignments and a bare
//! `| ` to redisplay the register line; the 134 monitor drives its
//! `A` (alter registers) prompt with fixed-width fields. Jump and dump
//! commands share their letters (`G`, `J`, `D`) but not their address
//! widths. The exact byte sequences matter: the monitors echo and parse
//! them character by character.

use crate::error::{Error, Result};
use crate::target::{BoardModel, Register};

/// Command that asks the monitor to display the register set.
#[must_use]
pub fn show_registers(model: BoardModel) -> &'static str {
    match model {
        BoardModel::Sxb265 => "| ",
        BoardModel::Sxb134 => "R",
    }
}

/// Command that assigns `value` to `reg`.
///
/// Fails with [`Error::Unsupported`] for registers the 134 monitor does
/// not have (DP, DB).
pub fn set_register(model: BoardModel, reg: Register, value: u32) -> Result<String> {
    match model {
        BoardModel::Sxb265 => Ok(match reg {
            Register::Pc => format!("|P{:02X}:{:04X}", (value >> 16) & 0xFF, value & 0xFFFF),
            Register::A => format!("|A{:04X}", value & 0xFFFF),
            Register::X => format!("|X{:04X}", value & 0xFFFF),
            Register::Y => format!("|Y{:04X}", value & 0xFFFF),
            Register::Sp => format!("|S{:04X}", value & 0xFFFF),
            Register::Dp => format!("|D{:04X}", value & 0xFFFF),
            Register::Sr => format!("|F{:02X}", value & 0xFF),
            Register::Db => format!("|B{:02X}", value & 0xFF),
        }),
        BoardModel::Sxb134 => match reg {
            // The 134 alter prompt is positional: each register slot is
            // reached by its column in the fixed-width line.
            Register::Pc => Ok(format!("A{:04X}     ", value & 0xFFFF)),
            Register::Sr => Ok(format!("A {:02X}    ", value & 0xFF)),
            Register::A => Ok(format!("A  {:02X}   ", value & 0xFF)),
            Register::X => Ok(format!("A   {:02X}  ", value & 0xFF)),
            Register::Y => Ok(format!("A    {:02X} ", value & 0xFF)),
            Register::Sp => Ok(format!("A     {:02X}", value & 0xFF)),
            Register::Dp | Register::Db => Err(Error::Unsupported(format!(
                "register {} does not exist on the {}",
                reg.name(),
                model.name()
            ))),
        },
    }
}

/// Long-jump command (`G`): control does not return to the monitor.
#[must_use]
pub fn jump_long(model: BoardModel, addr: u32) -> String {
    match model {
        BoardModel::Sxb265 => format!("G{:02X}{:04X}", (addr >> 16) & 0xFF, addr & 0xFFFF),
        BoardModel::Sxb134 => format!("G{:04X}", addr & 0xFFFF),
    }
}

/// Subroutine-jump command (`J`): the monitor regains control on return.
#[must_use]
pub fn jump_subroutine(model: BoardModel, addr: u32) -> String {
    match model {
        BoardModel::Sxb265 => format!("J{:02X}{:04X}", (addr >> 16) & 0xFF, addr & 0xFFFF),
        BoardModel::Sxb134 => format!("J{:04X}", addr & 0xFFFF),
    }
}

/// Memory-dump command covering the 256-byte page at `addr`.
#[must_use]
pub fn dump_page(model: BoardModel, addr: u32) -> String {
    let end = addr.wrapping_add(0xFF);
    match model {
        BoardModel::Sxb265 => format!(
            "D{:02X}{:04X}{:02X}{:04X}\n",
            (addr >> 16) & 0xFF,
            addr & 0xFFFF,
            (end >> 16) & 0xFF,
            end & 0xFFFF
        ),
        BoardModel::Sxb134 => format!("D{:04X}{:04X}", addr & 0xFFFF, end & 0xFFFF),
    }
}

/// Local banner printed before a dump listing.
#[must_use]
pub fn dump_banner(addr: u32) -> String {
    let end = addr.wrapping_add(0xFF);
    format!(
        "\nMemory dump from {:02X}:{:04X} - {:02X}:{:04X}\n",
        (addr >> 16) & 0xFF,
        addr & 0xFFFF,
        (end >> 16) & 0xFF,
        end & 0xFFFF
    )
}
