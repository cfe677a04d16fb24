//! Strata CLI: runs the lowering pipeline over circuit documents.
//!
//! `strata lower` reads a circuit document (JSON), lowers its aggregate
//! types and, unless told to stop there, lowers it to the structural form,
//! then writes the result as another document.

#![warn(missing_docs)]

mod lower;

use std::process;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use strata_config::PreserveAggregate;

/// Strata: aggregate type lowering and structural lowering for hardware IR.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Strata hardware IR lowering")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `strata.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lower a circuit document.
    Lower(LowerArgs),
}

/// Arguments for the `strata lower` subcommand.
#[derive(Parser, Debug)]
pub struct LowerArgs {
    /// Circuit document to lower.
    pub input: String,

    /// Where to write the result; standard output if omitted.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Last stage to run.
    #[arg(long, value_enum, default_value_t = Stage::Hw)]
    pub stage: Stage,

    /// Which aggregates type lowering keeps whole
    /// (`none`, `onedimvec`, `vec` or `all`).
    #[arg(long, value_parser = PreserveAggregate::from_str)]
    pub preserve_aggregate: Option<PreserveAggregate>,

    /// Let public modules keep aggregate ports when the preservation mode
    /// allows it.
    #[arg(long)]
    pub no_preserve_public_types: bool,

    /// Record source-level names of decomposed values.
    #[arg(long)]
    pub insert_debug_info: bool,

    /// Emit arrays indexing without synthesis mux pragmas.
    #[arg(long)]
    pub strip_mux_pragmas: bool,

    /// Emit `ifElseFatal` assertions as properties.
    #[arg(long)]
    pub emit_chisel_asserts_as_sva: bool,

    /// Leave memories uninitialized in simulation.
    #[arg(long)]
    pub disable_mem_randomization: bool,

    /// Leave registers uninitialized in simulation.
    #[arg(long)]
    pub disable_reg_randomization: bool,
}

/// Pipeline stop point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    /// Stop after aggregate type lowering.
    Types,
    /// Run structural lowering as well.
    Hw,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

impl GlobalArgs {
    /// The log level implied by `--quiet` and `--verbose`.
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::env::var_os("TERM").is_some() && std::env::var_os("NO_COLOR").is_none(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let _ = env_logger::Builder::new()
        .filter_level(global.log_level())
        .parse_default_env()
        .try_init();

    let result = match cli.command {
        Command::Lower(ref args) => lower::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
