use serde::Serialize;

use crate::model::opcode::OpCode;
use crate::model::varnode::VarNode;

/// One decoded machine instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub address: u64,
    pub length: u64,
    pub mnemonic: String,
    /// Operand text, without the mnemonic.
    pub body: String,
}

/// One P-Code operation.
///
/// Input order is semantically significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcodeOp {
    pub opcode: OpCode,
    pub output: Option<VarNode>,
    pub inputs: Vec<VarNode>,
}

impl PcodeOp {
    pub fn new(opcode: OpCode, output: Option<VarNode>, inputs: Vec<VarNode>) -> Self {
        Self { opcode, output, inputs }
    }

    pub fn input(&self, index: usize) -> Option<&VarNode> {
        self.inputs.get(index)
    }
}
