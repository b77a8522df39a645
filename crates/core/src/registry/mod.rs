//! Specification registry: the catalog of decodable languages.
//!
//! A processor tree looks like
//!
//! ```text
//! <root>/<arch>/data/languages/*.ldefs
//! <root>/<arch>/data/languages/<name>.pspec
//! <root>/<arch>/data/languages/<name>.sla
//! ```
//!
//! [`Catalog::load`] walks every architecture under `<root>`, reads each
//! `*.ldefs` file, and for every `<language>` entry loads the referenced
//! processor spec (for default context variables) and compiled `.sla` blob.
//! Plain files directly under `<root>` are ignored. An architecture directory
//! without `data/languages`, or any missing or malformed artifact, fails the
//! whole load.
//!
//! The catalog is an immutable value. Build it once and share it by reference
//! or `Arc`; lookups need no synchronisation.

pub mod documents;

use std::collections::HashMap;
use std::fs;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use documents::{LanguageEntry, ProcessorSpec};

/// Relative location of the language files inside an architecture directory.
const LANGUAGES_SUBDIR: &str = "data/languages";
const LDEFS_EXTENSION: &str = "ldefs";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::DeError,
    },

    /// Two descriptors claim the same (lowercased) language id.
    #[error("language `{0}` is defined more than once")]
    DuplicateLanguage(String),

    #[error("language `{0}` not found")]
    LanguageNotFound(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// A named context variable default, kept as written in the processor spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextVariable {
    pub name: String,
    pub value: String,
}

impl ContextVariable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    /// Parse the value as an unsigned 32-bit number (decimal, or hex with `0x`).
    pub fn parse_value(&self) -> Result<u32, ParseIntError> {
        let text = self.value.trim();
        match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => text.parse::<u32>(),
        }
    }
}

/// Everything needed to bring up a decoder for one instruction-set variant.
#[derive(Clone, PartialEq, Eq)]
pub struct LanguageDescriptor {
    /// Lowercase identifier, e.g. `x86:le:32:default`.
    pub id: String,
    pub description: String,
    pub processor: String,
    pub endian: String,
    pub size: String,
    pub variant: String,
    /// Descriptor version with `1.1` normalised to `1.0`.
    pub version: String,
    pub sla_file: String,
    pub processor_spec_file: String,
    pub manual_index_file: Option<String>,
    /// `<context_set>` defaults applied when a context is created.
    pub context_defaults: Vec<ContextVariable>,
    /// `<tracked_set>` register values assumed at function entry.
    pub tracked_defaults: Vec<ContextVariable>,
    /// Compiled specification handed to the engine.
    pub sla: Arc<[u8]>,
}

impl LanguageDescriptor {
    /// Build a descriptor from an `.ldefs` entry, its parsed processor spec, and its blob.
    pub fn from_parts(entry: LanguageEntry, pspec: &ProcessorSpec, sla: Vec<u8>) -> Self {
        let to_var = |s: &documents::SetEntry| ContextVariable::new(&s.name, &s.val);
        Self {
            id: normalize_id(&entry.id),
            description: entry.description.trim().to_string(),
            processor: entry.processor,
            endian: entry.endian,
            size: entry.size,
            variant: entry.variant,
            version: entry.version,
            sla_file: entry.sla_file,
            processor_spec_file: entry.processor_spec,
            manual_index_file: entry.manual_index_file,
            context_defaults: pspec.context_sets().map(to_var).collect(),
            tracked_defaults: pspec.tracked_sets().map(to_var).collect(),
            sla: sla.into(),
        }
    }

    pub fn summary(&self) -> LanguageSummary {
        LanguageSummary {
            id: self.id.clone(),
            description: self.description.clone(),
            processor: self.processor.clone(),
            endian: self.endian.clone(),
            size: self.size.clone(),
            variant: self.variant.clone(),
        }
    }
}

impl std::fmt::Debug for LanguageDescriptor {
    // The blob can be megabytes; print its length only.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageDescriptor")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("version", &self.version)
            .field("context_defaults", &self.context_defaults)
            .field("tracked_defaults", &self.tracked_defaults)
            .field("sla_len", &self.sla.len())
            .finish()
    }
}

/// Serializable listing entry for a language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageSummary {
    pub id: String,
    pub description: String,
    pub processor: String,
    pub endian: String,
    pub size: String,
    pub variant: String,
}

/// Language ids are stored and compared in lowercase.
pub fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

/// Immutable catalog of language descriptors.
#[derive(Debug, Default)]
pub struct Catalog {
    languages: Vec<Arc<LanguageDescriptor>>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from already-assembled descriptors, keeping their order.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = LanguageDescriptor>,
    ) -> RegistryResult<Self> {
        let mut catalog = Catalog::default();
        for descriptor in descriptors {
            catalog.insert(descriptor)?;
        }
        Ok(catalog)
    }

    /// Discover and load every language under a processors directory.
    pub fn load(root: impl AsRef<Path>) -> RegistryResult<Self> {
        let root = root.as_ref();
        let mut catalog = Catalog::default();

        for arch_dir in sorted_entries(root)? {
            if !arch_dir.is_dir() {
                continue;
            }
            load_architecture(&arch_dir, &mut catalog)?;
        }

        log::debug!("loaded {} languages from {}", catalog.len(), root.display());
        Ok(catalog)
    }

    fn insert(&mut self, mut descriptor: LanguageDescriptor) -> RegistryResult<()> {
        descriptor.id = normalize_id(&descriptor.id);
        if self.by_id.contains_key(&descriptor.id) {
            return Err(RegistryError::DuplicateLanguage(descriptor.id));
        }
        self.by_id.insert(descriptor.id.clone(), self.languages.len());
        self.languages.push(Arc::new(descriptor));
        Ok(())
    }

    /// Look up a language; the query is lowercased before matching.
    pub fn resolve(&self, id: &str) -> RegistryResult<&Arc<LanguageDescriptor>> {
        self.get(id).ok_or_else(|| RegistryError::LanguageNotFound(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<&Arc<LanguageDescriptor>> {
        self.by_id.get(&normalize_id(id)).map(|&idx| &self.languages[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Descriptors in load order.
    pub fn languages(&self) -> &[Arc<LanguageDescriptor>] {
        &self.languages
    }

    pub fn summaries(&self) -> Vec<LanguageSummary> {
        self.languages.iter().map(|l| l.summary()).collect()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> RegistryError + '_ {
    move |source| RegistryError::Io { path: path.to_path_buf(), source }
}

/// Directory entries sorted by file name, so load order is stable across platforms.
fn sorted_entries(dir: &Path) -> RegistryResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        paths.push(entry.map_err(io_error(dir))?.path());
    }
    paths.sort();
    Ok(paths)
}

fn load_architecture(arch_dir: &Path, catalog: &mut Catalog) -> RegistryResult<()> {
    let languages_dir = arch_dir.join(LANGUAGES_SUBDIR);
    let ldefs: Vec<PathBuf> = sorted_entries(&languages_dir)?
        .into_iter()
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == LDEFS_EXTENSION))
        .collect();

    for path in ldefs {
        load_ldefs_file(&languages_dir, &path, catalog)?;
    }
    Ok(())
}

fn load_ldefs_file(languages_dir: &Path, path: &Path, catalog: &mut Catalog) -> RegistryResult<()> {
    let text = fs::read_to_string(path).map_err(io_error(path))?;
    let entries = documents::parse_language_definitions(&text)
        .map_err(|source| RegistryError::Xml { path: path.to_path_buf(), source })?;

    for entry in entries {
        let descriptor = load_language(languages_dir, entry)?;
        log::debug!("registered language {}", descriptor.id);
        catalog.insert(descriptor)?;
    }
    Ok(())
}

fn load_language(languages_dir: &Path, entry: LanguageEntry) -> RegistryResult<LanguageDescriptor> {
    let pspec_path = languages_dir.join(&entry.processor_spec);
    let pspec_text = fs::read_to_string(&pspec_path).map_err(io_error(&pspec_path))?;
    let pspec = documents::parse_processor_spec(&pspec_text)
        .map_err(|source| RegistryError::Xml { path: pspec_path.clone(), source })?;

    let sla_path = languages_dir.join(&entry.sla_file);
    let sla = fs::read(&sla_path).map_err(io_error(&sla_path))?;

    Ok(LanguageDescriptor::from_parts(entry, &pspec, sla))
}
