//! Storage-location and operation model for decoded P-Code.
//!
//! - `AddressSpace`: a named storage domain, interned per engine identity.
//! - `VarNode`: a sized reference into a space.
//! - `Register`: a named `VarNode`.
//! - `OpCode` / `PcodeOp`: the operation stream.
//! - `Instruction`: one line of disassembly.

pub mod op;
pub mod opcode;
pub mod space;
pub mod varnode;

pub use op::{Instruction, PcodeOp};
pub use opcode::{opcode_name, OpCode};
pub use space::{AddressSpace, SpaceFlags, SpaceInterner, CONST_SPACE, REGISTER_SPACE};
pub use varnode::{Register, StorageKey, VarNode};
