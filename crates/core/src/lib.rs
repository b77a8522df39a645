//! pcode-core
//!
//! Core library for working with P-Code, the register-transfer IR produced by
//! SLEIGH-based decoders.
//!
//! This crate defines the language registry, the storage-location model, the
//! boundary to the external decoding engine, owned decode results, and the
//! pretty-printer. Decoding itself happens in the engine; everything on this
//! side of the boundary is plain Rust and testable without it.

pub mod config;
pub mod context;
pub mod engine;
pub mod format;
pub mod model;
pub mod registry;
pub mod results;

pub use context::{Context, ContextError};
pub use engine::{default_engine, Engine, EngineError, TranslateFlags};
pub use format::{NameResolver, PcodePrinter};
pub use registry::{Catalog, LanguageDescriptor, RegistryError};
pub use results::{Disassembly, Translation};

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
