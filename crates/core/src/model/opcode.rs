use serde::{Serialize, Serializer};
use strum::{Display, EnumIter, FromRepr, IntoStaticStr};

/// P-Code operation codes.
///
/// The discriminants are the engine's wire encoding and must never be renumbered.
/// Slot 45 is unused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, IntoStaticStr, EnumIter, FromRepr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum OpCode {
    /// Instruction boundary marker.
    Imark = 0,
    Copy = 1,
    Load = 2,
    /// Store at a pointer into a specified address space.
    Store = 3,

    Branch = 4,
    Cbranch = 5,
    /// Indirect branch (jumptable).
    Branchind = 6,

    Call = 7,
    Callind = 8,
    /// User-defined operation.
    Callother = 9,
    Return = 10,

    IntEqual = 11,
    IntNotequal = 12,
    IntSless = 13,
    IntSlessequal = 14,
    /// Unsigned less-than; also the borrow of an unsigned subtraction.
    IntLess = 15,
    IntLessequal = 16,
    IntZext = 17,
    IntSext = 18,
    IntAdd = 19,
    IntSub = 20,
    IntCarry = 21,
    IntScarry = 22,
    IntSborrow = 23,
    #[strum(serialize = "INT_2COMP")]
    Int2Comp = 24,
    IntNegate = 25,
    IntXor = 26,
    IntAnd = 27,
    IntOr = 28,
    IntLeft = 29,
    IntRight = 30,
    IntSright = 31,
    IntMult = 32,
    IntDiv = 33,
    IntSdiv = 34,
    IntRem = 35,
    IntSrem = 36,

    BoolNegate = 37,
    BoolXor = 38,
    BoolAnd = 39,
    BoolOr = 40,

    FloatEqual = 41,
    FloatNotequal = 42,
    FloatLess = 43,
    FloatLessequal = 44,
    FloatNan = 46,

    FloatAdd = 47,
    FloatDiv = 48,
    FloatMult = 49,
    FloatSub = 50,
    FloatNeg = 51,
    FloatAbs = 52,
    FloatSqrt = 53,

    #[strum(serialize = "FLOAT_INT2FLOAT")]
    FloatInt2Float = 54,
    #[strum(serialize = "FLOAT_FLOAT2FLOAT")]
    FloatFloat2Float = 55,
    FloatTrunc = 56,
    FloatCeil = 57,
    FloatFloor = 58,
    FloatRound = 59,

    // Analysis-only opcodes; not normally produced by a direct translation.
    /// Phi-node.
    Multiequal = 60,
    Indirect = 61,
    Piece = 62,
    Subpiece = 63,
    Cast = 64,
    Ptradd = 65,
    Ptrsub = 66,
    Segmentop = 67,
    Cpoolref = 68,
    New = 69,
    Insert = 70,
    Extract = 71,
    Popcount = 72,
    Lzcount = 73,
}

impl OpCode {
    /// One past the largest defined code.
    pub const MAX: u32 = 74;

    pub fn from_code(code: u32) -> Option<Self> {
        Self::from_repr(code)
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    /// Symbolic name, e.g. `INT_ADD`.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Whether the operation ends a straight-line block.
    pub fn is_block_terminator(self) -> bool {
        matches!(
            self,
            OpCode::Branch
                | OpCode::Cbranch
                | OpCode::Branchind
                | OpCode::Call
                | OpCode::Callind
                | OpCode::Return
        )
    }
}

impl TryFrom<u32> for OpCode {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_repr(code).ok_or(code)
    }
}

impl Serialize for OpCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Render a raw code, falling back to `unknown opcode N` outside the table.
pub fn opcode_name(code: u32) -> String {
    match OpCode::from_code(code) {
        Some(op) => op.name().to_string(),
        None => format!("unknown opcode {code}"),
    }
}
