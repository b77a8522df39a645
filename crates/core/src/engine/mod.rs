//! Boundary to the external decoding engine.
//!
//! The engine matches bytes against a compiled processor specification and
//! emits instructions or P-Code. This crate does not decode anything itself; it
//! only defines the contract an engine must satisfy:
//!
//! - handles are opaque and never leave the crate's public wrappers,
//! - decode results come back as records already copied into owned values,
//! - every result handle is handed back through [`Engine::release`].
//!
//! The native binding over `libpcode` lives in [`native`] behind the
//! `native-engine` feature.

use std::sync::Arc;

use bitflags::bitflags;
use thiserror::Error;

#[cfg(feature = "native-engine")]
pub mod native;

#[cfg(feature = "native-engine")]
pub use native::NativeEngine;

/// Opaque handle to an engine-side decoding context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub usize);

/// Opaque handle to an engine-side decode result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultHandle(pub usize);

/// Engine-native identity of an address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpaceId(pub usize);

bitflags! {
    /// Options for [`Engine::translate`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TranslateFlags: u32 {
        /// Stop after the first basic block instead of running to the cap.
        const BB_TERMINATING = 0x1;
    }
}

/// Which kind of result a [`ResultHandle`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Disassembly,
    Translation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceRecord {
    pub id: SpaceId,
    pub name: String,
    pub index: u32,
    pub address_size: u32,
    pub word_size: u32,
    pub flags: u32,
    pub highest: u64,
    pub pointer_lower_bound: u64,
    pub pointer_upper_bound: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarnodeRecord {
    pub space: SpaceRecord,
    pub offset: u64,
    pub size: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpRecord {
    /// Raw wire opcode; validated by the caller.
    pub opcode: u32,
    pub output: Option<VarnodeRecord>,
    pub inputs: Vec<VarnodeRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionRecord {
    pub address: u64,
    pub length: u64,
    pub mnemonic: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRecord {
    pub name: String,
    pub varnode: VarnodeRecord,
}

/// Records produced by one decode call, plus the handle that owns them engine-side.
#[derive(Debug)]
pub struct RecordBatch<T> {
    pub handle: ResultHandle,
    pub records: Vec<T>,
}

/// Arguments of a decode call.
///
/// `bytes` is never empty and `max_instructions` never zero when an engine
/// sees a request; the context rejects both earlier.
#[derive(Debug, Clone, Copy)]
pub struct DecodeRequest<'a> {
    pub bytes: &'a [u8],
    pub base_address: u64,
    pub max_instructions: u32,
    pub flags: TranslateFlags,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no decoding engine is available in this build (enable the `native-engine` feature)")]
    Unavailable,
    #[error("engine `{engine}` rejected the specification blob")]
    OpenFailed { engine: &'static str },
    #[error("specification blob is empty")]
    EmptySpecification,
}

/// A decoding engine.
///
/// Implementations must be callable from several threads at once for the
/// read-only queries (`register_name`, `space_from_const`).
pub trait Engine: Send + Sync {
    /// Human-readable name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Create a decoding context from a compiled specification blob.
    fn open(&self, sla: &[u8]) -> Result<ContextHandle, EngineError>;

    /// Destroy a context. Called exactly once per successful `open`.
    fn close(&self, ctx: ContextHandle);

    fn set_variable_default(&self, ctx: ContextHandle, name: &str, value: u32);

    /// Every register the specification defines, in engine order.
    fn registers(&self, ctx: ContextHandle) -> Vec<RegisterRecord>;

    /// Name of the register covering exactly this storage, if any.
    fn register_name(
        &self,
        ctx: ContextHandle,
        space: SpaceId,
        offset: u64,
        size: i32,
    ) -> Option<String>;

    /// Decode the address space encoded in a `const`-space offset.
    fn space_from_const(&self, ctx: ContextHandle, offset: u64) -> Option<SpaceRecord>;

    /// `None` signals a decode failure (invalid or truncated input).
    fn disassemble(
        &self,
        ctx: ContextHandle,
        request: &DecodeRequest<'_>,
    ) -> Option<RecordBatch<InstructionRecord>>;

    /// `None` signals a decode failure (invalid or truncated input).
    fn translate(
        &self,
        ctx: ContextHandle,
        request: &DecodeRequest<'_>,
    ) -> Option<RecordBatch<OpRecord>>;

    /// Free a result produced by `disassemble` or `translate`. Called exactly once per handle.
    fn release(&self, kind: ResultKind, handle: ResultHandle);
}

/// The engine compiled into this build.
///
/// Returns [`EngineError::Unavailable`] when the crate was built without a
/// native engine; callers that bring their own engine never need this.
pub fn default_engine() -> Result<Arc<dyn Engine>, EngineError> {
    #[cfg(feature = "native-engine")]
    {
        Ok(Arc::new(NativeEngine::new()))
    }
    #[cfg(not(feature = "native-engine"))]
    {
        Err(EngineError::Unavailable)
    }
}
