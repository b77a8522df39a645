use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use pcode_core::{default_engine, Catalog, Engine, LanguageDescriptor};

/// Load the language catalog from a processors directory.
pub fn load_catalog(processors_dir: &Path) -> Result<Catalog> {
    let catalog = Catalog::load(processors_dir).with_context(|| {
        format!("Failed to load processor specifications from {}", processors_dir.display())
    })?;
    log::info!("{} languages available", catalog.len());
    Ok(catalog)
}

/// Resolve a language id, with the front end's wording for a miss.
pub fn resolve_language<'c>(catalog: &'c Catalog, id: &str) -> Result<&'c Arc<LanguageDescriptor>> {
    catalog.get(id).ok_or_else(|| anyhow!("unknown language '{id}'"))
}

/// The engine compiled into this binary.
pub fn open_engine() -> Result<Arc<dyn Engine>> {
    default_engine().context("Failed to initialize the decoding engine")
}
