//! Register, jump, and dump command implementations.

use anyhow::{Context, Result};
use console::style;
use log::debug;
use sxbmon::port::SerialChannel;
use sxbmon::target::command;
use sxbmon::{MonitorSession, Register};

use crate::config::Config;
use crate::{Cli, board_model, get_port, hardware_flow};

/// A parsed `REG=HEX` assignment from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RegAssignment {
    /// Target register.
    pub reg: Register,
    /// Value to assign (hex on the command line).
    pub value: u32,
}

/// Open a monitor session on the selected port.
fn open_session(cli: &Cli, config: &mut Config) -> Result<MonitorSession<SerialChannel>> {
    let port = get_port(cli, config)?;
    let model = board_model(cli, config);
    debug!("opening monitor session on {port} ({model})");

    let channel = SerialChannel::open(&port, hardware_flow(cli, config))
        .with_context(|| format!("Failed to open serial port {port}"))?;

    Ok(MonitorSession::new(channel, model))
}

/// Regs command implementation.
pub(crate) fn cmd_regs(
    cli: &Cli,
    config: &mut Config,
    assignments: &[RegAssignment],
    json: bool,
) -> Result<()> {
    let mut session = open_session(cli, config)?;

    for assignment in assignments {
        debug!("setting {} = {:X}", assignment.reg, assignment.value);
        session
            .write_register(assignment.reg, assignment.value)
            .with_context(|| format!("Failed to set register {}", assignment.reg))?;
    }

    let readout = session.read_registers().context("Failed to read registers")?;

    if json {
        let info = serde_json::json!({
            "model": session.model().name(),
            "registers": readout,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&info).unwrap_or_default()
        );
    } else {
        if !cli.quiet {
            eprintln!(
                "{} {} registers:",
                style("ℹ").blue(),
                session.model().name()
            );
        }
        println!("{readout}");
    }

    session.into_channel().close();
    Ok(())
}

/// Jump command implementation.
pub(crate) fn cmd_jump(
    cli: &Cli,
    config: &mut Config,
    address: u32,
    subroutine: bool,
) -> Result<()> {
    let mut session = open_session(cli, config)?;

    if !cli.quiet {
        let kind = if subroutine { "subroutine" } else { "long jump" };
        eprintln!(
            "{} {} to {:02X}:{:04X}",
            style("→").green(),
            kind,
            (address >> 16) & 0xFF,
            address & 0xFFFF
        );
    }

    let echo = if subroutine {
        session.jump_subroutine(address)?
    } else {
        session.jump_long(address)?
    };

    if !echo.is_empty() {
        print!("{echo}");
    }

    session.into_channel().close();
    Ok(())
}

/// Dump command implementation.
pub(crate) fn cmd_dump(cli: &Cli, config: &mut Config, address: u32) -> Result<()> {
    let mut session = open_session(cli, config)?;

    if !cli.quiet {
        eprint!("{}", command::dump_banner(address));
    }

    let listing = session
        .dump_page(address)
        .context("Failed to dump memory")?;
    print!("{listing}");

    session.into_channel().close();
    Ok(())
}
