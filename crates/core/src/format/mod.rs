//! Human-readable rendering of P-Code operations.
//!
//! Each opcode maps to a [`Strategy`]; opcodes without an entry render with
//! the generic `NAME a, b, ...` form. An op with an output is prefixed with
//! `<out> = `.

use std::sync::Arc;

use crate::model::{AddressSpace, OpCode, PcodeOp, VarNode};

/// Name lookups the printer needs to render storage references.
///
/// Implementations must be safe to call from several threads at once.
pub trait NameResolver {
    /// Register name for a storage reference in the register space.
    fn register_name(&self, node: &VarNode) -> Option<String>;

    /// The address space encoded in a `const`-space reference.
    fn space_from_const(&self, node: &VarNode) -> Option<Arc<AddressSpace>>;
}

/// How one opcode is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `<op><a0>`
    Unary(&'static str),
    /// `<a0> <op> <a1>`
    Binary(&'static str),
    /// `<name>(<a0>, <a1>, ...)`
    Function(&'static str),
    /// Control flow and memory access, one shape per opcode.
    Special,
}

impl Strategy {
    /// The rendering strategy for `opcode`, or `None` for the generic form.
    pub fn for_opcode(opcode: OpCode) -> Option<Strategy> {
        use OpCode::*;
        use Strategy::*;

        let strategy = match opcode {
            Copy => Unary(""),
            Int2Comp => Unary("-"),
            IntNegate => Unary("~"),
            BoolNegate => Unary("!"),
            FloatNeg => Unary("f-"),

            IntAdd => Binary("+"),
            IntSub => Binary("-"),
            IntMult => Binary("*"),
            IntDiv => Binary("/"),
            IntSdiv => Binary("s/"),
            IntRem => Binary("%"),
            IntSrem => Binary("s%"),
            IntAnd => Binary("&"),
            IntOr => Binary("|"),
            IntXor => Binary("^"),
            IntLeft => Binary("<<"),
            IntRight => Binary(">>"),
            IntSright => Binary("s>>"),
            IntEqual => Binary("=="),
            IntNotequal => Binary("!="),
            IntLess => Binary("<"),
            IntLessequal => Binary("<="),
            IntSless => Binary("s<"),
            IntSlessequal => Binary("s<="),
            BoolAnd => Binary("&&"),
            BoolOr => Binary("||"),
            BoolXor => Binary("^^"),
            FloatAdd => Binary("f+"),
            FloatSub => Binary("f-"),
            FloatMult => Binary("f*"),
            FloatDiv => Binary("f/"),
            FloatEqual => Binary("f=="),
            FloatNotequal => Binary("f!="),
            FloatLess => Binary("f<"),
            FloatLessequal => Binary("f<="),

            IntZext => Function("zext"),
            IntSext => Function("sext"),
            IntCarry => Function("carry"),
            IntScarry => Function("scarry"),
            IntSborrow => Function("sborrow"),
            FloatAbs => Function("abs"),
            FloatSqrt => Function("sqrt"),
            FloatCeil => Function("ceil"),
            FloatFloor => Function("floor"),
            FloatRound => Function("round"),
            FloatTrunc => Function("trunc"),
            FloatNan => Function("nan"),
            FloatInt2Float => Function("int2float"),
            FloatFloat2Float => Function("float2float"),
            Cpoolref => Function("cpool"),
            New => Function("newobject"),
            Popcount => Function("popcount"),
            Lzcount => Function("lzcount"),

            Branch | Branchind | Call | Callind | Cbranch | Load | Store | Return => Special,

            _ => return None,
        };
        Some(strategy)
    }
}

/// Renders ops against a [`NameResolver`].
///
/// The printer holds no state of its own; sharing one across threads is fine
/// whenever the resolver is `Sync`.
#[derive(Debug)]
pub struct PcodePrinter<'a, R: NameResolver + ?Sized> {
    resolver: &'a R,
}

impl<R: NameResolver + ?Sized> Clone for PcodePrinter<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: NameResolver + ?Sized> Copy for PcodePrinter<'_, R> {}

impl<'a, R: NameResolver + ?Sized> PcodePrinter<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self { resolver }
    }

    pub fn format_op(&self, op: &PcodeOp) -> String {
        let body = Strategy::for_opcode(op.opcode)
            .and_then(|strategy| self.apply(strategy, op))
            .unwrap_or_else(|| self.generic(op));

        match &op.output {
            Some(out) => format!("{} = {}", self.format_varnode(out), body),
            None => body,
        }
    }

    /// `0x<hex>` for constants, the register name for registers,
    /// `<space>[<hex>:<size>]` for everything else.
    pub fn format_varnode(&self, node: &VarNode) -> String {
        if node.is_const() {
            return format!("{:#x}", node.offset);
        }
        if node.is_register() {
            if let Some(name) = self.resolver.register_name(node) {
                return name;
            }
        }
        format!("{}[{:x}:{}]", node.space.name, node.offset, node.size)
    }

    /// `None` when the op does not have the shape the strategy expects.
    fn apply(&self, strategy: Strategy, op: &PcodeOp) -> Option<String> {
        let arg = |i: usize| op.input(i).map(|vn| self.format_varnode(vn));

        let rendered = match strategy {
            Strategy::Unary(token) => format!("{token}{}", arg(0)?),
            Strategy::Binary(token) => format!("{} {token} {}", arg(0)?, arg(1)?),
            Strategy::Function(name) => format!("{name}({})", self.join_inputs(op)),
            Strategy::Special => match op.opcode {
                OpCode::Branch => format!("goto {}", arg(0)?),
                OpCode::Branchind => format!("goto [{}]", arg(0)?),
                OpCode::Call => format!("call {}", arg(0)?),
                OpCode::Callind => format!("call [{}]", arg(0)?),
                OpCode::Cbranch => format!("if ({}) goto {}", arg(1)?, arg(0)?),
                OpCode::Return => format!("return {}", arg(0)?),
                OpCode::Load => format!("*[{}]{}", self.target_space(op)?, arg(1)?),
                OpCode::Store => {
                    format!("*[{}]{} = {}", self.target_space(op)?, arg(1)?, arg(2)?)
                }
                _ => return None,
            },
        };
        Some(rendered)
    }

    /// Space name carried by the constant in input 0 of LOAD/STORE.
    fn target_space(&self, op: &PcodeOp) -> Option<String> {
        let selector = op.input(0).filter(|vn| vn.is_const())?;
        self.resolver.space_from_const(selector).map(|space| space.name.clone())
    }

    fn generic(&self, op: &PcodeOp) -> String {
        if op.inputs.is_empty() {
            op.opcode.name().to_string()
        } else {
            format!("{} {}", op.opcode.name(), self.join_inputs(op))
        }
    }

    fn join_inputs(&self, op: &PcodeOp) -> String {
        op.inputs.iter().map(|vn| self.format_varnode(vn)).collect::<Vec<_>>().join(", ")
    }
}
