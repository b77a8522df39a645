use std::path::Path;

use anyhow::{bail, Context, Result};
use pcode_core::config::PcodeConfig;

pub mod commands;

/// Parse a hex byte string such as `"90 90 c3"`, `"9090c3"` or `"0x90, 0x90"`.
pub fn parse_hex_data(data: &str) -> Result<Vec<u8>> {
    let digits: String = data
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| chunk.strip_prefix("0x").or_else(|| chunk.strip_prefix("0X")).unwrap_or(chunk))
        .collect();

    if digits.is_empty() {
        bail!("data is empty");
    }
    hex::decode(&digits).context("data is not a valid hex string")
}

/// Parse an address given in hex (`0x401000`) or decimal.
pub fn parse_address(text: &str) -> Result<u64> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    parsed.with_context(|| format!("invalid address '{text}'"))
}

/// Load settings: defaults, then the optional file, then the environment,
/// then an explicit processors directory.
pub fn load_settings(config: Option<&Path>, processors: Option<&Path>) -> Result<PcodeConfig> {
    let config = PcodeConfig::load(config)?;
    Ok(config.with_processors_override(processors.map(Path::to_path_buf)))
}
