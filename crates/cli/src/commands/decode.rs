use std::io::Write;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde::Serialize;

use pcode_core::config::PcodeConfig;
use pcode_core::model::{PcodeOp, StorageKey};
use pcode_core::{Catalog, Context, Engine, TranslateFlags, Translation};

use crate::commands::util::{load_catalog, open_engine, resolve_language};
use crate::parse_hex_data;

/// Inputs shared by `disasm` and `translate`.
#[derive(Debug, Clone)]
pub struct DecodeArgs {
    pub language: String,
    /// Hex text as given on the command line.
    pub data: String,
    pub base_address: u64,
    pub max_instructions: u32,
    pub bb_terminating: bool,
    pub json: bool,
}

impl DecodeArgs {
    /// Fill unset options from the config.
    pub fn from_options(
        config: &PcodeConfig,
        language: Option<String>,
        data: String,
        base_address: Option<u64>,
        max_instructions: Option<u32>,
    ) -> Self {
        Self {
            language: language.unwrap_or_else(|| config.default_language.clone()),
            data,
            base_address: base_address.unwrap_or(config.base_address),
            max_instructions: max_instructions.unwrap_or(config.max_instructions),
            bb_terminating: false,
            json: false,
        }
    }
}

/// JSON view of one op.
#[derive(Debug, Serialize)]
pub struct OpView {
    pub opcode: &'static str,
    pub output: Option<StorageKey>,
    pub inputs: Vec<StorageKey>,
    pub text: String,
}

impl OpView {
    fn new(op: &PcodeOp, translation: &Translation<'_>) -> Self {
        Self {
            opcode: op.opcode.name(),
            output: op.output.as_ref().map(|vn| vn.key()),
            inputs: op.inputs.iter().map(|vn| vn.key()).collect(),
            text: translation.format(op),
        }
    }
}

pub fn disasm_command(config: &PcodeConfig, args: &DecodeArgs) -> Result<()> {
    let bytes = parse_hex_data(&args.data)?;
    let catalog = load_catalog(&config.processors_dir)?;
    resolve_language(&catalog, &args.language)?;
    let engine = open_engine()?;

    let stdout = std::io::stdout();
    run_disasm(&catalog, engine, &bytes, args, &mut stdout.lock())
}

pub fn translate_command(config: &PcodeConfig, args: &DecodeArgs) -> Result<()> {
    let bytes = parse_hex_data(&args.data)?;
    let catalog = load_catalog(&config.processors_dir)?;
    resolve_language(&catalog, &args.language)?;
    let engine = open_engine()?;

    let stdout = std::io::stdout();
    run_translate(&catalog, engine, &bytes, args, &mut stdout.lock())
}

/// Disassemble `bytes` and write one line per instruction (or a JSON array).
pub fn run_disasm(
    catalog: &Catalog,
    engine: Arc<dyn Engine>,
    bytes: &[u8],
    args: &DecodeArgs,
    out: &mut impl Write,
) -> Result<()> {
    let ctx = Context::create(catalog, engine, &args.language)?;
    let disasm = ctx.disassemble(bytes, args.base_address, args.max_instructions)?;

    if args.json {
        let serialized = serde_json::to_string_pretty(disasm.instructions())
            .context("Failed to serialize instructions to JSON")?;
        writeln!(out, "{serialized}")?;
        return Ok(());
    }

    for insn in &disasm {
        let line = format!("{:#x}: {} {}", insn.address, insn.mnemonic, insn.body);
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}

/// Lift `bytes` to P-Code and write one formatted op per line (or a JSON array).
pub fn run_translate(
    catalog: &Catalog,
    engine: Arc<dyn Engine>,
    bytes: &[u8],
    args: &DecodeArgs,
    out: &mut impl Write,
) -> Result<()> {
    let flags = if args.bb_terminating {
        TranslateFlags::BB_TERMINATING
    } else {
        TranslateFlags::empty()
    };

    let ctx = Context::create(catalog, engine, &args.language)?;
    let translation = ctx.translate(bytes, args.base_address, args.max_instructions, flags)?;

    if args.json {
        let views: Vec<OpView> = translation.iter().map(|op| OpView::new(op, &translation)).collect();
        let serialized =
            serde_json::to_string_pretty(&views).context("Failed to serialize ops to JSON")?;
        writeln!(out, "{serialized}")?;
        return Ok(());
    }

    for line in translation.lines() {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
