//! Decoding context: one engine handle bound to one resolved language.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace, warn};
use thiserror::Error;

use crate::engine::{
    ContextHandle, DecodeRequest, Engine, EngineError, OpRecord, ResultKind, TranslateFlags,
};
use crate::format::NameResolver;
use crate::model::{AddressSpace, OpCode, PcodeOp, Register, SpaceInterner, StorageKey, VarNode};
use crate::registry::{Catalog, LanguageDescriptor};
use crate::results::{Disassembly, ResultGuard, Translation};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("unknown language '{0}'")]
    LanguageNotFound(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("no input bytes")]
    EmptyInput,

    #[error("max_instructions must be at least 1")]
    InvalidInstructionCap,

    #[error("input of {len} bytes exceeds the engine limit of {max} bytes", max = u32::MAX)]
    InputTooLarge { len: usize },

    #[error("failed to disassemble at {address:#x}")]
    DisassemblyFailed { address: u64 },

    #[error("failed to translate at {address:#x}")]
    TranslationFailed { address: u64 },

    #[error("engine produced unknown opcode {0}")]
    UnknownOpcode(u32),

    #[error("decoding context has been destroyed")]
    Destroyed,
}

pub type ContextResult<T> = Result<T, ContextError>;

/// A live decoder for one language.
///
/// The register table is read once at creation and cached. Results returned by
/// [`Context::disassemble`] and [`Context::translate`] borrow the context, so
/// it cannot be destroyed while any of them is alive.
pub struct Context {
    engine: Arc<dyn Engine>,
    handle: Option<ContextHandle>,
    language: Arc<LanguageDescriptor>,
    interner: Arc<SpaceInterner>,
    registers: Vec<Register>,
    register_index: HashMap<StorageKey, usize>,
}

impl Context {
    /// Resolve `language_id` in `catalog` and open a context on `engine`.
    pub fn create(
        catalog: &Catalog,
        engine: Arc<dyn Engine>,
        language_id: &str,
    ) -> ContextResult<Self> {
        Self::with_interner(catalog, engine, Arc::new(SpaceInterner::new()), language_id)
    }

    /// Like [`Context::create`], sharing an existing space intern table.
    pub fn with_interner(
        catalog: &Catalog,
        engine: Arc<dyn Engine>,
        interner: Arc<SpaceInterner>,
        language_id: &str,
    ) -> ContextResult<Self> {
        let language = catalog
            .get(language_id)
            .cloned()
            .ok_or_else(|| ContextError::LanguageNotFound(language_id.to_string()))?;

        let handle = engine.open(&language.sla)?;
        debug!("opened {} context for {}", engine.name(), language.id);

        for var in &language.context_defaults {
            let value = var.parse_value().unwrap_or_else(|err| {
                warn!(
                    "{}: context variable {} has invalid value {:?} ({err}); using 0",
                    language.id, var.name, var.value
                );
                0
            });
            engine.set_variable_default(handle, &var.name, value);
        }

        let registers: Vec<Register> = engine
            .registers(handle)
            .iter()
            .map(|r| Register::new(&r.name, VarNode::from_record(&r.varnode, &interner)))
            .collect();
        // Aliased storage keeps the first register in engine order.
        let mut register_index = HashMap::with_capacity(registers.len());
        for (i, register) in registers.iter().enumerate() {
            register_index.entry(register.key()).or_insert(i);
        }
        debug!("{}: cached {} registers", language.id, registers.len());

        Ok(Self { engine, handle: Some(handle), language, interner, registers, register_index })
    }

    pub fn language(&self) -> &Arc<LanguageDescriptor> {
        &self.language
    }

    pub fn interner(&self) -> &Arc<SpaceInterner> {
        &self.interner
    }

    pub fn is_destroyed(&self) -> bool {
        self.handle.is_none()
    }

    fn handle(&self) -> ContextResult<ContextHandle> {
        self.handle.ok_or(ContextError::Destroyed)
    }

    /// Every register the language defines, in engine order.
    pub fn all_registers(&self) -> &[Register] {
        &self.registers
    }

    /// The cached register with exactly this storage, if any.
    pub fn register_at(&self, node: &VarNode) -> Option<&Register> {
        self.register_index.get(&node.key()).map(|&i| &self.registers[i])
    }

    /// Name of the register at (`space`, `offset`, `size`), asking the engine on a cache miss.
    pub fn register_name(
        &self,
        space: &AddressSpace,
        offset: u64,
        size: i32,
    ) -> ContextResult<Option<String>> {
        let key = StorageKey { space: space.name.clone(), offset, size };
        if let Some(&i) = self.register_index.get(&key) {
            return Ok(Some(self.registers[i].name.clone()));
        }
        self.engine_register_name(space, offset, size)
    }

    /// Ask the engine directly, skipping the cached register table.
    pub fn engine_register_name(
        &self,
        space: &AddressSpace,
        offset: u64,
        size: i32,
    ) -> ContextResult<Option<String>> {
        let handle = self.handle()?;
        trace!("register_name round trip for {}[{offset:#x}:{size}]", space.name);
        Ok(self.engine.register_name(handle, space.id, offset, size))
    }

    pub fn set_variable_default(&self, name: &str, value: u32) -> ContextResult<()> {
        let handle = self.handle()?;
        self.engine.set_variable_default(handle, name, value);
        Ok(())
    }

    /// The address space encoded in a `const`-space offset.
    pub fn space_from_const(&self, offset: u64) -> ContextResult<Option<Arc<AddressSpace>>> {
        let handle = self.handle()?;
        Ok(self.engine.space_from_const(handle, offset).map(|record| self.interner.intern(&record)))
    }

    fn request<'a>(
        &self,
        bytes: &'a [u8],
        base_address: u64,
        max_instructions: u32,
        flags: TranslateFlags,
    ) -> ContextResult<(ContextHandle, DecodeRequest<'a>)> {
        validate_input(bytes.len(), max_instructions)?;
        let handle = self.handle()?;
        Ok((handle, DecodeRequest { bytes, base_address, max_instructions, flags }))
    }

    /// Disassemble up to `max_instructions` instructions starting at `base_address`.
    pub fn disassemble(
        &self,
        bytes: &[u8],
        base_address: u64,
        max_instructions: u32,
    ) -> ContextResult<Disassembly<'_>> {
        let (handle, request) =
            self.request(bytes, base_address, max_instructions, TranslateFlags::empty())?;
        trace!("disassemble {} bytes at {base_address:#x}", bytes.len());

        let batch = self
            .engine
            .disassemble(handle, &request)
            .ok_or(ContextError::DisassemblyFailed { address: base_address })?;
        let guard = ResultGuard::new(self.engine.as_ref(), ResultKind::Disassembly, batch.handle);

        let instructions = batch.records.into_iter().map(Into::into).collect();
        Ok(Disassembly::new(instructions, guard))
    }

    /// Lift up to `max_instructions` instructions to P-Code.
    pub fn translate(
        &self,
        bytes: &[u8],
        base_address: u64,
        max_instructions: u32,
        flags: TranslateFlags,
    ) -> ContextResult<Translation<'_>> {
        let (handle, request) = self.request(bytes, base_address, max_instructions, flags)?;
        trace!("translate {} bytes at {base_address:#x} ({flags:?})", bytes.len());

        let batch = self
            .engine
            .translate(handle, &request)
            .ok_or(ContextError::TranslationFailed { address: base_address })?;
        // Guard first: an unknown opcode below must still release the result.
        let guard = ResultGuard::new(self.engine.as_ref(), ResultKind::Translation, batch.handle);

        let ops = batch
            .records
            .iter()
            .map(|r| self.op_from_record(r))
            .collect::<ContextResult<Vec<_>>>()?;
        Ok(Translation::new(ops, guard, self))
    }

    fn op_from_record(&self, record: &OpRecord) -> ContextResult<PcodeOp> {
        let opcode = OpCode::try_from(record.opcode).map_err(ContextError::UnknownOpcode)?;
        let output = record.output.as_ref().map(|vn| VarNode::from_record(vn, &self.interner));
        let inputs = record.inputs.iter().map(|vn| VarNode::from_record(vn, &self.interner)).collect();
        Ok(PcodeOp::new(opcode, output, inputs))
    }

    /// Close the engine handle. Safe to call more than once.
    pub fn destroy(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.engine.close(handle);
            debug!("closed context for {}", self.language.id);
        }
    }
}

/// Checks shared by every decode call, run before the engine is touched.
fn validate_input(len: usize, max_instructions: u32) -> ContextResult<()> {
    if len == 0 {
        return Err(ContextError::EmptyInput);
    }
    if max_instructions == 0 {
        return Err(ContextError::InvalidInstructionCap);
    }
    if u32::try_from(len).is_err() {
        return Err(ContextError::InputTooLarge { len });
    }
    Ok(())
}

impl Drop for Context {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("engine", &self.engine.name())
            .field("language", &self.language.id)
            .field("registers", &self.registers.len())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl NameResolver for Context {
    fn register_name(&self, node: &VarNode) -> Option<String> {
        Context::register_name(self, &node.space, node.offset, node.size).ok().flatten()
    }

    fn space_from_const(&self, node: &VarNode) -> Option<Arc<AddressSpace>> {
        Context::space_from_const(self, node.offset).ok().flatten()
    }
}
