//! Upload command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use sxbmon::image::FileFormat;
use sxbmon::port::{BAUD_RATE, SerialChannel};
use sxbmon::MonitorSession;
use sxbmon::target::uploader;

use crate::config::Config;
use crate::term::{RawModeGuard, TermConsole};
use crate::{Cli, board_model, get_port, hardware_flow, use_fancy_output};

/// Upload command implementation.
pub(crate) fn cmd_upload(
    cli: &Cli,
    config: &mut Config,
    file: &Path,
    no_echo: bool,
    run_after: bool,
) -> Result<()> {
    // Cheap validation first: an unsupported extension should fail before
    // any port is touched.
    FileFormat::from_path(file)?;

    let port = get_port(cli, config)?;
    let model = board_model(cli, config);

    if !cli.quiet {
        eprintln!(
            "{} Connecting to {} on {} at {} baud",
            style("🔌").cyan(),
            model.name(),
            style(&port).green(),
            BAUD_RATE
        );
    }

    let mut channel = SerialChannel::open(&port, hardware_flow(cli, config))
        .with_context(|| format!("Failed to open serial port {port}"))?;

    if !cli.quiet {
        eprintln!("{} Connected to SXB at {} baud.", style("✓").green(), BAUD_RATE);
    }

    // Echo mode forwards the monitor's output; --no-echo counts records
    // on a spinner instead.
    let (mut console, raw_guard) = if no_echo {
        let pb = if cli.quiet || !use_fancy_output() {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            #[allow(clippy::unwrap_used)] // Static template string
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} uploading {msg}")
                    .unwrap(),
            );
            pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            pb
        };
        (TermConsole::with_spinner(pb), None)
    } else {
        let guard = RawModeGuard::enable();
        let raw = guard.is_active();
        (TermConsole::new(raw), Some(guard))
    };

    let result = uploader::upload(file, &mut channel, &mut console);
    console.finish();
    drop(raw_guard);

    let outcome = result.with_context(|| format!("Upload of {} failed", file.display()))?;

    if !cli.quiet {
        if outcome.cancelled {
            eprintln!(
                "{} Upload cancelled after {} records.",
                style("⚠").yellow(),
                outcome.records
            );
        } else {
            eprintln!(
                "{} Uploaded {} records.",
                style("✓").green(),
                outcome.records
            );
        }
        if let Some(start) = outcome.start {
            eprintln!(
                "{} Start address {:02X}:{:04X}",
                style("→").green(),
                (start >> 16) & 0xFF,
                start & 0xFFFF
            );
        }
    }

    if run_after && !outcome.cancelled {
        if let Some(start) = outcome.start {
            debug!("jumping to start address {start:06X}");
            let mut session = MonitorSession::new(channel, model);
            let echo = session.jump_long(start)?;
            if !echo.is_empty() && !cli.quiet {
                print!("{echo}");
            }
            session.into_channel().close();
            return Ok(());
        }
        anyhow::bail!("No start address to run: the input had no data records");
    }

    channel.close();
    Ok(())
}
