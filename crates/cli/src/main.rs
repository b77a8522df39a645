use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use pcode_cli::commands::{disasm_command, list_languages_command, translate_command, DecodeArgs};
use pcode_cli::{load_settings, parse_address};

/// Disassemble machine code and lift it to P-Code.
///
/// This CLI is a thin wrapper around `pcode-core`. Decoding needs a build with
/// the `native-engine` feature; listing languages works in every build.
#[derive(Parser, Debug)]
#[command(name = "pcode", version, about = "Disassemble and lift machine code to P-Code", long_about = None)]
struct Cli {
    /// Processor tree root (`<arch>/data/languages/*.ldefs`). Overrides the
    /// config file and PCODE_PROCESSORS_DIR.
    #[arg(long, global = true)]
    processors: Option<PathBuf>,

    /// JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct DecodeOpts {
    /// Language id, e.g. `x86:LE:32:default`. Defaults to the configured language.
    #[arg(long)]
    lid: Option<String>,

    /// Bytes to decode as hex, e.g. "90 90 c3".
    #[arg(long)]
    data: String,

    /// Address of the first byte (hex with 0x, or decimal).
    #[arg(long, value_parser = parse_base)]
    base: Option<u64>,

    /// Maximum number of instructions to decode.
    #[arg(long)]
    max: Option<u32>,

    /// Emit JSON instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the languages found in the processor tree.
    Languages {
        /// Emit JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Disassemble bytes into instructions.
    Disasm {
        #[command(flatten)]
        opts: DecodeOpts,
    },

    /// Lift bytes to P-Code.
    Translate {
        #[command(flatten)]
        opts: DecodeOpts,

        /// Stop at the end of the first basic block.
        #[arg(long, default_value_t = false)]
        bb_terminating: bool,
    },
}

fn parse_base(text: &str) -> Result<u64, String> {
    parse_address(text).map_err(|err| err.to_string())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_settings(cli.config.as_deref(), cli.processors.as_deref())?;
    log::debug!("processors directory: {}", config.processors_dir.display());

    match cli.command {
        Command::Languages { json } => list_languages_command(&config.processors_dir, json)?,
        Command::Disasm { opts } => {
            let json = opts.json;
            let args = DecodeArgs {
                json,
                ..DecodeArgs::from_options(&config, opts.lid, opts.data, opts.base, opts.max)
            };
            disasm_command(&config, &args)?
        }
        Command::Translate { opts, bb_terminating } => {
            let json = opts.json;
            let args = DecodeArgs {
                json,
                bb_terminating,
                ..DecodeArgs::from_options(&config, opts.lid, opts.data, opts.base, opts.max)
            };
            translate_command(&config, &args)?
        }
    }

    Ok(())
}
