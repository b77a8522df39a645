use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use pcode_core::Catalog;

use crate::commands::util::load_catalog;

/// List every language found under `processors_dir`.
pub fn list_languages_command(processors_dir: &Path, json: bool) -> Result<()> {
    let catalog = load_catalog(processors_dir)?;
    let stdout = std::io::stdout();
    write_languages(&catalog, json, &mut stdout.lock())
}

pub fn write_languages(catalog: &Catalog, json: bool, out: &mut impl Write) -> Result<()> {
    let summaries = catalog.summaries();

    if json {
        let serialized = serde_json::to_string_pretty(&summaries)
            .context("Failed to serialize languages to JSON")?;
        writeln!(out, "{serialized}")?;
        return Ok(());
    }

    writeln!(out, "Languages ({}):", summaries.len())?;
    if summaries.is_empty() {
        writeln!(out, "  (none)")?;
        return Ok(());
    }
    for lang in summaries {
        writeln!(out, "  - {} - {}", lang.id, lang.description)?;
    }
    Ok(())
}
