//! Owned decode results.
//!
//! Instructions and ops are copied out of the engine when a result is built,
//! so they stay usable after [`Disassembly::release`] / [`Translation::release`].
//! The engine-side result is released exactly once: explicitly, or on drop.

use crate::context::Context;
use crate::engine::{Engine, InstructionRecord, ResultHandle, ResultKind};
use crate::format::PcodePrinter;
use crate::model::{Instruction, PcodeOp};

/// Releases an engine result exactly once.
pub(crate) struct ResultGuard<'ctx> {
    engine: &'ctx dyn Engine,
    kind: ResultKind,
    handle: Option<ResultHandle>,
}

impl<'ctx> ResultGuard<'ctx> {
    pub(crate) fn new(engine: &'ctx dyn Engine, kind: ResultKind, handle: ResultHandle) -> Self {
        Self { engine, kind, handle: Some(handle) }
    }

    /// Returns `true` if this call released the result.
    fn release(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                self.engine.release(self.kind, handle);
                true
            }
            None => false,
        }
    }

    fn is_released(&self) -> bool {
        self.handle.is_none()
    }
}

impl Drop for ResultGuard<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl From<InstructionRecord> for Instruction {
    fn from(record: InstructionRecord) -> Self {
        Instruction {
            address: record.address,
            length: record.length,
            mnemonic: record.mnemonic,
            body: record.body,
        }
    }
}

/// Disassembled instructions, in address order.
pub struct Disassembly<'ctx> {
    instructions: Vec<Instruction>,
    guard: ResultGuard<'ctx>,
}

impl<'ctx> Disassembly<'ctx> {
    pub(crate) fn new(instructions: Vec<Instruction>, guard: ResultGuard<'ctx>) -> Self {
        Self { instructions, guard }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Release the engine-side result. Returns `false` if it was already released.
    pub fn release(&mut self) -> bool {
        self.guard.release()
    }

    pub fn is_released(&self) -> bool {
        self.guard.is_released()
    }

    /// Release the engine-side result and keep the instructions.
    pub fn into_instructions(mut self) -> Vec<Instruction> {
        self.guard.release();
        std::mem::take(&mut self.instructions)
    }
}

impl<'a> IntoIterator for &'a Disassembly<'_> {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// P-Code for a run of instructions, in emission order.
pub struct Translation<'ctx> {
    ops: Vec<PcodeOp>,
    guard: ResultGuard<'ctx>,
    context: &'ctx Context,
}

impl<'ctx> Translation<'ctx> {
    pub(crate) fn new(ops: Vec<PcodeOp>, guard: ResultGuard<'ctx>, context: &'ctx Context) -> Self {
        Self { ops, guard, context }
    }

    pub fn ops(&self) -> &[PcodeOp] {
        &self.ops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PcodeOp> {
        self.ops.iter()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Render one op with register names from the owning context.
    pub fn format(&self, op: &PcodeOp) -> String {
        self.printer().format_op(op)
    }

    /// Every op rendered, in order.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        let printer = self.printer();
        self.ops.iter().map(move |op| printer.format_op(op))
    }

    pub fn printer(&self) -> PcodePrinter<'ctx, Context> {
        PcodePrinter::new(self.context)
    }

    pub fn release(&mut self) -> bool {
        self.guard.release()
    }

    pub fn is_released(&self) -> bool {
        self.guard.is_released()
    }

    pub fn into_ops(mut self) -> Vec<PcodeOp> {
        self.guard.release();
        std::mem::take(&mut self.ops)
    }
}

impl<'a> IntoIterator for &'a Translation<'_> {
    type Item = &'a PcodeOp;
    type IntoIter = std::slice::Iter<'a, PcodeOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for Disassembly<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disassembly")
            .field("instructions", &self.instructions)
            .field("released", &self.is_released())
            .finish()
    }
}

impl std::fmt::Debug for Translation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translation")
            .field("ops", &self.ops)
            .field("released", &self.is_released())
            .finish()
    }
}
