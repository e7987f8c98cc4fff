//! sxbmon CLI - interactive front-end for the WDC SXB board monitors.
//!
//! ## Features
//!
//! - Upload Intel HEX / Motorola S-Record programs to the monitor
//! - Read and change CPU registers
//! - Jump to addresses (long jump or subroutine call)
//! - Dump board memory
//! - Interactive serial terminal
//! - Shell completion generation

use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use console::style;
use env_logger::Env;
use log::{debug, warn};
use sxbmon::BoardModel;

mod commands;
mod config;
mod serial;
mod term;

use commands::board::RegAssignment;
use config::Config;
use serial::{SerialOptions, ask_remember_port, select_serial_port};

/// Interrupt flag set by the Ctrl-C handler.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Whether Ctrl-C has been pressed since the last clear.
pub(crate) fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::Relaxed)
}

/// Reset the Ctrl-C flag after it has been acted on.
pub(crate) fn clear_interrupted_flag() {
    INTERRUPTED.store(false, Ordering::Relaxed);
}

/// Whether stderr is a terminal (set once at startup).
static STDERR_IS_TTY: AtomicBool = AtomicBool::new(true);

/// Check if spinners/animations should be used (TTY and colors enabled).
pub(crate) fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(Ordering::Relaxed) && console::colors_enabled_stderr()
}

/// CLI-level error classes that map to distinct exit codes.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    /// Invalid usage or environment/setup problem (exit code 2).
    #[error("{0}")]
    Usage(String),
    /// User cancelled an interactive prompt (exit code 130).
    #[error("{0}")]
    Cancelled(String),
}

/// sxbmon - talk to the monitors of the WDC SXB single-board computers.
///
/// Environment variables:
///   SXBMON_PORT              - Default serial port
///   SXBMON_MODEL             - Default board model (sxb265, sxb134)
///   SXBMON_NON_INTERACTIVE   - Non-interactive mode (disable prompts)
#[derive(Parser)]
#[command(name = "sxbmon")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = "The monitors talk at a fixed 9600-8-N-1.")]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct Cli {
    /// Serial port to use (auto-detected if not specified).
    #[arg(short, long, global = true, env = "SXBMON_PORT")]
    port: Option<String>,

    /// Board model (defaults to the configured or W65C265SXB board).
    #[arg(short, long, global = true, env = "SXBMON_MODEL")]
    model: Option<Model>,

    /// Use RTS/CTS hardware flow control.
    #[arg(long, global = true)]
    hardware_flow: bool,

    /// Verbose output level (-v, -vv, -vvv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Non-interactive mode (fail instead of prompting).
    #[arg(long, global = true, env = "SXBMON_NON_INTERACTIVE")]
    non_interactive: bool,

    /// Confirm port selection even for auto-detected ports.
    #[arg(long, global = true)]
    confirm_port: bool,

    /// List all available ports (including unknown types).
    #[arg(long, global = true)]
    list_all_ports: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Supported board models.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Model {
    /// W65C265SXB (W65C816 core, default).
    Sxb265,
    /// W65C134SXB (W65C02 core).
    Sxb134,
}

impl From<Model> for BoardModel {
    fn from(model: Model) -> Self {
        match model {
            Model::Sxb265 => BoardModel::Sxb265,
            Model::Sxb134 => BoardModel::Sxb134,
        }
    }
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Upload a HEX or S-Record program to the monitor.
    Upload {
        /// Path to the .hex or .srec file.
        file: PathBuf,

        /// Suppress monitor echo and show a progress spinner instead.
        #[arg(long)]
        no_echo: bool,

        /// Jump to the program's start address once the upload finishes.
        #[arg(long)]
        run: bool,
    },

    /// Show (and optionally change) the CPU registers.
    Regs {
        /// Set a register first, e.g. --set PC=1000 or --set A=12 (hex).
        #[arg(long = "set", value_name = "REG=HEX", value_parser = parse_reg_assignment)]
        set: Vec<RegAssignment>,

        /// Output the register readout as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Jump to an address on the board.
    Jump {
        /// Target address (hex, e.g. 0x00E000).
        #[arg(value_parser = parse_hex_u32)]
        address: u32,

        /// Call as a subroutine so the monitor regains control on return.
        #[arg(long)]
        subroutine: bool,
    },

    /// Dump the 256-byte page of board memory at an address.
    Dump {
        /// Start address (hex).
        #[arg(value_parser = parse_hex_u32)]
        address: u32,
    },

    /// Open an interactive monitor terminal.
    Monitor,

    /// List available serial ports.
    ListPorts {
        /// Output port list as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type for completions.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parse a `REG=HEX` register assignment.
fn parse_reg_assignment(s: &str) -> Result<RegAssignment, String> {
    let Some((name, value)) = s.split_once('=') else {
        return Err(format!(
            "Invalid format: '{s}'. Expected 'REG=HEX' (e.g., 'PC=1000')"
        ));
    };

    let reg = sxbmon::Register::from_name(name.trim())
        .ok_or_else(|| format!("Unknown register: '{}'", name.trim()))?;
    let value = parse_hex_u32(value)?;

    Ok(RegAssignment { reg, value })
}

/// Parse a hexadecimal value (supports 0x prefix and underscores).
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let s = s.trim_start_matches("0x").trim_start_matches("0X");
    // Support underscore separators like 0x00_E0_00
    let s: String = s.chars().filter(|c| *c != '_').collect();
    u32::from_str_radix(&s, 16).map_err(|e| format!("Invalid hex value: {e}"))
}

fn main() {
    let code = match run() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{} {err:#}", style("Error:").red().bold());
            match err.downcast_ref::<CliError>() {
                Some(CliError::Usage(_)) => 2,
                Some(CliError::Cancelled(_)) => 130,
                None => 1,
            }
        },
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // --- NO_COLOR and TTY detection ---
    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, Ordering::Relaxed);

    if env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    // Setup logging based on verbosity
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();

    debug!(
        "sxbmon v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    // Route Ctrl-C through the library's interrupt checker so long loops
    // (upload, monitor) can stop cooperatively.
    if let Err(err) = ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::Relaxed)) {
        warn!("could not install Ctrl-C handler: {err}");
    }
    sxbmon::set_interrupt_checker(was_interrupted);

    // Load configuration
    let mut config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };

    match &cli.command {
        Commands::Upload { file, no_echo, run } => {
            commands::upload::cmd_upload(&cli, &mut config, file, *no_echo, *run)?;
        },
        Commands::Regs { set, json } => {
            commands::board::cmd_regs(&cli, &mut config, set, *json)?;
        },
        Commands::Jump {
            address,
            subroutine,
        } => {
            commands::board::cmd_jump(&cli, &mut config, *address, *subroutine)?;
        },
        Commands::Dump { address } => {
            commands::board::cmd_dump(&cli, &mut config, *address)?;
        },
        Commands::Monitor => {
            commands::monitor::cmd_monitor(&cli, &mut config)?;
        },
        Commands::ListPorts { json } => {
            commands::ports::cmd_list_ports(*json);
        },
        Commands::Completions { shell } => {
            cmd_completions(*shell);
        },
    }

    Ok(())
}

/// Get serial port from CLI args or interactive selection.
pub(crate) fn get_port(cli: &Cli, config: &mut Config) -> Result<String> {
    let options = SerialOptions {
        port: cli.port.clone(),
        list_all_ports: cli.list_all_ports,
        non_interactive: cli.non_interactive,
        confirm_port: cli.confirm_port,
    };

    let selected = select_serial_port(&options, config)?;

    // Ask to remember if not a known device and interactive mode
    if !selected.is_known && !cli.non_interactive {
        ask_remember_port(&selected.port, config)?;
    }

    Ok(selected.port.name)
}

/// Resolve the board model: CLI flag, then config, then the 265 default.
pub(crate) fn board_model(cli: &Cli, config: &Config) -> BoardModel {
    if let Some(model) = cli.model {
        return model.into();
    }

    if let Some(name) = &config.board.model {
        match name.to_ascii_lowercase().as_str() {
            "sxb265" | "265" => return BoardModel::Sxb265,
            "sxb134" | "134" => return BoardModel::Sxb134,
            other => warn!("unknown board model {other:?} in config, using default"),
        }
    }

    BoardModel::default()
}

/// Resolve hardware flow control: CLI flag or configured default.
pub(crate) fn hardware_flow(cli: &Cli, config: &Config) -> bool {
    cli.hardware_flow
        || config
            .port
            .connection
            .hardware_flow
            .unwrap_or(false)
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use clap::CommandFactory;

    // ---- clap validation ----

    #[test]
    fn test_cli_command_is_valid() {
        // Verifies that all derive macros produce a valid clap Command
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_upload() {
        let cli = Cli::try_parse_from([
            "sxbmon",
            "--port",
            "/dev/ttyUSB0",
            "upload",
            "program.hex",
        ])
        .unwrap();
        assert_eq!(cli.port.as_deref(), Some("/dev/ttyUSB0"));
        if let Commands::Upload { file, no_echo, run } = cli.command {
            assert_eq!(file.to_str().unwrap(), "program.hex");
            assert!(!no_echo);
            assert!(!run);
        } else {
            panic!("Expected Upload command");
        }
    }

    #[test]
    fn test_cli_parse_upload_flags() {
        let cli =
            Cli::try_parse_from(["sxbmon", "upload", "p.srec", "--no-echo", "--run"]).unwrap();
        if let Commands::Upload { no_echo, run, .. } = cli.command {
            assert!(no_echo);
            assert!(run);
        } else {
            panic!("Expected Upload command");
        }
    }

    #[test]
    fn test_cli_parse_regs_with_set() {
        let cli = Cli::try_parse_from(["sxbmon", "regs", "--set", "PC=1000", "--set", "A=12"])
            .unwrap();
        if let Commands::Regs { set, json } = cli.command {
            assert_eq!(set.len(), 2);
            assert_eq!(set[0].reg, sxbmon::Register::Pc);
            assert_eq!(set[0].value, 0x1000);
            assert_eq!(set[1].reg, sxbmon::Register::A);
            assert_eq!(set[1].value, 0x12);
            assert!(!json);
        } else {
            panic!("Expected Regs command");
        }
    }

    #[test]
    fn test_cli_parse_regs_rejects_bad_assignment() {
        assert!(Cli::try_parse_from(["sxbmon", "regs", "--set", "PC"]).is_err());
        assert!(Cli::try_parse_from(["sxbmon", "regs", "--set", "Q=12"]).is_err());
        assert!(Cli::try_parse_from(["sxbmon", "regs", "--set", "A=XYZ"]).is_err());
    }

    #[test]
    fn test_cli_parse_jump() {
        let cli = Cli::try_parse_from(["sxbmon", "jump", "0x00E000", "--subroutine"]).unwrap();
        if let Commands::Jump {
            address,
            subroutine,
        } = cli.command
        {
            assert_eq!(address, 0x00E000);
            assert!(subroutine);
        } else {
            panic!("Expected Jump command");
        }
    }

    #[test]
    fn test_cli_parse_dump() {
        let cli = Cli::try_parse_from(["sxbmon", "dump", "E000"]).unwrap();
        if let Commands::Dump { address } = cli.command {
            assert_eq!(address, 0xE000);
        } else {
            panic!("Expected Dump command");
        }
    }

    #[test]
    fn test_cli_parse_model() {
        let cli = Cli::try_parse_from(["sxbmon", "--model", "sxb134", "monitor"]).unwrap();
        assert!(matches!(cli.model, Some(Model::Sxb134)));
    }

    #[test]
    fn test_cli_parse_list_ports_json() {
        let cli = Cli::try_parse_from(["sxbmon", "list-ports", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::ListPorts { json: true }));
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["sxbmon", "list-ports"]).unwrap();
        assert!(cli.port.is_none());
        assert!(cli.model.is_none());
        assert!(!cli.hardware_flow);
        assert!(!cli.quiet);
        assert!(!cli.non_interactive);
        assert!(!cli.confirm_port);
        assert!(!cli.list_all_ports);
        assert!(cli.config_path.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_missing_subcommand() {
        assert!(Cli::try_parse_from(["sxbmon"]).is_err());
    }

    #[test]
    fn test_cli_invalid_model() {
        assert!(Cli::try_parse_from(["sxbmon", "--model", "sxb999", "monitor"]).is_err());
    }

    // ---- parse_hex_u32 ----

    #[test]
    fn test_parse_hex_u32_with_prefix() {
        assert_eq!(parse_hex_u32("0x00E000").unwrap(), 0x00E000);
        assert_eq!(parse_hex_u32("0X00E000").unwrap(), 0x00E000);
    }

    #[test]
    fn test_parse_hex_u32_without_prefix() {
        assert_eq!(parse_hex_u32("E000").unwrap(), 0xE000);
        assert_eq!(parse_hex_u32("ff").unwrap(), 0xFF);
    }

    #[test]
    fn test_parse_hex_u32_with_underscores() {
        assert_eq!(parse_hex_u32("0x00_E0_00").unwrap(), 0x00E000);
    }

    #[test]
    fn test_parse_hex_u32_invalid() {
        assert!(parse_hex_u32("not_hex").is_err());
        assert!(parse_hex_u32("0xGG").is_err());
    }

    // ---- parse_reg_assignment ----

    #[test]
    fn test_parse_reg_assignment_valid() {
        let a = parse_reg_assignment("sp=01FF").unwrap();
        assert_eq!(a.reg, sxbmon::Register::Sp);
        assert_eq!(a.value, 0x01FF);
    }

    #[test]
    fn test_parse_reg_assignment_missing_equals() {
        assert!(parse_reg_assignment("PC1000").is_err());
    }

    // ---- board_model resolution ----

    #[test]
    fn test_board_model_cli_wins() {
        let cli = Cli::try_parse_from(["sxbmon", "--model", "sxb134", "monitor"]).unwrap();
        let mut config = Config::default();
        config.board.model = Some("sxb265".to_string());
        assert_eq!(board_model(&cli, &config), BoardModel::Sxb134);
    }

    #[test]
    fn test_board_model_from_config() {
        let cli = Cli::try_parse_from(["sxbmon", "monitor"]).unwrap();
        let mut config = Config::default();
        config.board.model = Some("134".to_string());
        assert_eq!(board_model(&cli, &config), BoardModel::Sxb134);
    }

    #[test]
    fn test_board_model_default() {
        let cli = Cli::try_parse_from(["sxbmon", "monitor"]).unwrap();
        assert_eq!(board_model(&cli, &Config::default()), BoardModel::Sxb265);
    }

    // ---- Model conversion ----

    #[test]
    fn test_model_to_board_model() {
        assert_eq!(BoardModel::from(Model::Sxb265), BoardModel::Sxb265);
        assert_eq!(BoardModel::from(Model::Sxb134), BoardModel::Sxb134);
    }
}
