//! Serde shapes for the descriptor documents shipped with each processor.
//!
//! Only the parts the registry consumes are modelled; everything else in the
//! documents (compiler specs, register data, symbols, ...) is ignored.

use serde::Deserialize;

/// Descriptor version the parser treats as canonical for `1.1` documents.
const COMPAT_VERSION_FROM: &str = "1.1";
const COMPAT_VERSION_TO: &str = "1.0";

/// Root of a `*.ldefs` file.
#[derive(Debug, Deserialize)]
pub struct LanguageDefinitions {
    #[serde(rename = "language", default)]
    pub languages: Vec<LanguageEntry>,
}

/// One `<language>` element of a `*.ldefs` file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LanguageEntry {
    #[serde(rename = "@processor", default)]
    pub processor: String,
    #[serde(rename = "@endian", default)]
    pub endian: String,
    #[serde(rename = "@size", default)]
    pub size: String,
    #[serde(rename = "@variant", default)]
    pub variant: String,
    #[serde(rename = "@version", default)]
    pub version: String,
    #[serde(rename = "@slafile")]
    pub sla_file: String,
    #[serde(rename = "@processorspec")]
    pub processor_spec: String,
    #[serde(rename = "@manualindexfile", default)]
    pub manual_index_file: Option<String>,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default)]
    pub description: String,
}

/// Root of a `*.pspec` file.
#[derive(Debug, Default, Deserialize)]
pub struct ProcessorSpec {
    #[serde(default)]
    pub context_data: Option<ContextData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContextData {
    #[serde(default)]
    pub context_set: Vec<SetGroup>,
    #[serde(default)]
    pub tracked_set: Vec<SetGroup>,
}

/// A `<context_set>` or `<tracked_set>` element.
#[derive(Debug, Default, Deserialize)]
pub struct SetGroup {
    #[serde(rename = "@space", default)]
    pub space: String,
    #[serde(rename = "set", default)]
    pub sets: Vec<SetEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SetEntry {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@val")]
    pub val: String,
}

impl ProcessorSpec {
    /// All `<context_set>` entries in document order.
    pub fn context_sets(&self) -> impl Iterator<Item = &SetEntry> {
        self.context_data.iter().flat_map(|cd| cd.context_set.iter()).flat_map(|g| g.sets.iter())
    }

    /// All `<tracked_set>` entries in document order.
    pub fn tracked_sets(&self) -> impl Iterator<Item = &SetEntry> {
        self.context_data.iter().flat_map(|cd| cd.tracked_set.iter()).flat_map(|g| g.sets.iter())
    }
}

/// Map the `1.1` descriptor version onto `1.0`; both share one schema.
pub fn normalize_version(version: &str) -> &str {
    if version == COMPAT_VERSION_FROM {
        COMPAT_VERSION_TO
    } else {
        version
    }
}

/// Parse the text of a `*.ldefs` file.
pub fn parse_language_definitions(xml: &str) -> Result<Vec<LanguageEntry>, quick_xml::DeError> {
    let defs: LanguageDefinitions = quick_xml::de::from_str(xml)?;
    Ok(defs
        .languages
        .into_iter()
        .map(|mut entry| {
            let normalized = normalize_version(&entry.version);
            if normalized != entry.version {
                log::debug!(
                    "language {}: descriptor version {} read as {}",
                    entry.id,
                    entry.version,
                    normalized
                );
                entry.version = normalized.to_string();
            }
            entry
        })
        .collect())
}

/// Parse the text of a `*.pspec` file.
pub fn parse_processor_spec(xml: &str) -> Result<ProcessorSpec, quick_xml::DeError> {
    quick_xml::de::from_str(xml)
}
