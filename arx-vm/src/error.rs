//! VM fault kinds.

use arx_asm::Word;

/// A fatal execution fault. Any of these moves the machine to the
/// `Faulted` terminal state; output already written stays written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmFault {
    /// Push on a full data stack.
    #[error("data stack overflow")]
    StackOverflow,

    /// Pop on an empty data stack.
    #[error("data stack underflow")]
    StackUnderflow,

    /// Load or store outside linear memory.
    #[error("memory access out of bounds at slot {0}")]
    MemoryAccess(Word),

    /// The opcode nibble does not decode.
    #[error("invalid instruction {0:#04x}")]
    InvalidInstruction(u8),

    /// The `OPR` operand does not select an operation.
    #[error("invalid operation sub-code {0:#x}")]
    InvalidOperation(Word),

    /// Call-frame depth cap exceeded.
    #[error("call stack overflow")]
    CallStackOverflow,

    /// Frame pop with corrupted frame bookkeeping.
    #[error("call stack underflow")]
    CallStackUnderflow,

    /// The loaded literal pool exceeds the VM's capacity.
    #[error("string table full")]
    StringTableFull,

    /// A jump or call targets an instruction index out of range.
    #[error("jump or call target {0} out of range")]
    InvalidAddress(Word),

    /// Integer division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// `OBJ_NEW` popped a class id the registry does not know.
    #[error("unknown class id {0:#018x}")]
    UnknownClass(Word),

    /// Method dispatch found no method of this name.
    #[error("unresolved method `{0}`")]
    UnresolvedMethod(String),

    /// Field access named a field the receiver's class chain lacks.
    #[error("unknown field `{0}`")]
    UnknownField(String),

    /// No free run of slots left in the object region.
    #[error("object region exhausted")]
    ObjectRegionExhausted,

    /// Instruction-count guard tripped; quality-of-service bound, not
    /// language semantics.
    #[error("step limit of {0} instructions exceeded")]
    StepLimit(u64),

    /// PC-stuck guard tripped.
    #[error("program counter stuck at {0}")]
    StuckProgramCounter(usize),

    /// Host I/O failed under an input or output intrinsic.
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for VmFault {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
