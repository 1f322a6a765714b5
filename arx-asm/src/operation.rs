use crate::Word;
use core::fmt;

/// Operation sub-code selected by the operand of an
/// [`Opr`](crate::Opcode::Opr) instruction.
///
/// Arithmetic and comparison operations consume two slots and push one;
/// `Neg`, `Not` and `Odd` consume one and push one; I/O operations consume
/// their printed value (or push the read value); object operations are
/// documented on the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Operation {
    /// Return from the current call frame.
    Ret = 0x00,

    /// Pop `b`, pop `a`, push `a + b`.
    Add = 0x01,
    /// Pop `b`, pop `a`, push `a - b`.
    Sub = 0x02,
    /// Pop `b`, pop `a`, push `a * b`.
    Mul = 0x03,
    /// Pop `b`, pop `a`, push `a / b`. Division by zero is a VM fault.
    Div = 0x04,
    /// Pop `b`, pop `a`, push `a ^ b` by repeated multiplication.
    Pow = 0x05,
    /// Pop `b`, pop `a`, push `a % b`. Modulo by zero is a VM fault.
    Mod = 0x06,
    /// Pop `a`, push `-a`.
    Neg = 0x07,

    /// Pop `b`, pop `a`, push `a == b`.
    Eq = 0x08,
    /// Pop `b`, pop `a`, push `a != b`.
    Neq = 0x09,
    /// Pop `b`, pop `a`, push `a < b` (signed).
    Less = 0x0a,
    /// Pop `b`, pop `a`, push `a <= b` (signed).
    Leq = 0x0b,
    /// Pop `b`, pop `a`, push `a > b` (signed).
    Greater = 0x0c,
    /// Pop `b`, pop `a`, push `a >= b` (signed).
    Geq = 0x0d,

    /// Pop `b`, pop `a`, push `a && b` (non-zero is true).
    And = 0x0e,
    /// Pop `b`, pop `a`, push `a || b`.
    Or = 0x0f,
    /// Pop `a`, push `!a`.
    Not = 0x10,
    /// Pop `a`, push `a & 1`.
    Odd = 0x11,

    /// Pop `b`, pop `a`, push `a << b`.
    Shl = 0x12,
    /// Pop `b`, pop `a`, push `a >> b`.
    Shr = 0x13,

    /// Pop a value and print it as a string (string object, literal-pool
    /// id, or decimal fallback).
    OutString = 0x14,
    /// Pop a value and print it as a signed decimal integer.
    OutInt = 0x15,
    /// Pop a value and print its low byte as a character.
    OutChar = 0x16,
    /// Print a newline.
    Writeln = 0x17,
    /// Read a decimal integer from standard input and push it.
    InInt = 0x18,
    /// Read one character from standard input and push it.
    InChar = 0x19,

    /// Pop two string values (right then left), push the address of a fresh
    /// string object holding their concatenation.
    StrConcat = 0x1a,
    /// Pop a string value, push its length in bytes.
    StrLen = 0x1b,
    /// Pop two string values, push byte equality.
    StrEq = 0x1c,
    /// Pop two string values, push their lexicographic ordering as -1/0/1.
    StrCmp = 0x1d,
    /// Pop an integer, push the address of its decimal string object.
    IntToStr = 0x1e,
    /// Pop a string value, push its parsed integer value (0 when malformed).
    StrToInt = 0x1f,

    /// Pop a class id, allocate a zero-filled instance, push its address.
    ObjNew = 0x20,
    /// Pop a method-name id, resolve against the receiver's class, move the
    /// arguments into the callee's locals, push a frame and jump.
    ObjCallMethod = 0x21,
    /// Pop a field-name id, pop an object address, push the field value.
    ObjGetField = 0x22,
    /// Pop a field-name id, pop a value, pop an object address, store the
    /// value into the field.
    ObjSetField = 0x23,
    /// Push the receiver of the current call frame.
    ObjSelf = 0x24,
}

impl Operation {
    /// Lowest byte value that does not map to an operation.
    pub const COUNT: u8 = 0x25;

    /// Number of stack slots the operation consumes.
    pub const fn arity(&self) -> usize {
        use Operation::*;
        match self {
            Ret | Writeln | InInt | InChar | ObjSelf => 0,
            Neg | Not | Odd | OutString | OutInt | OutChar | StrLen | IntToStr
            | StrToInt | ObjNew => 1,
            Add | Sub | Mul | Div | Pow | Mod | Eq | Neq | Less | Leq | Greater
            | Geq | And | Or | Shl | Shr | StrConcat | StrEq | StrCmp
            | ObjGetField => 2,
            ObjSetField => 3,
            // Consumes the name id plus `param_count` arguments and the
            // receiver; the variable part is resolved at dispatch time.
            ObjCallMethod => 1,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = match self {
            Self::Ret => "RET",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Pow => "POW",
            Self::Mod => "MOD",
            Self::Neg => "NEG",
            Self::Eq => "EQ",
            Self::Neq => "NEQ",
            Self::Less => "LESS",
            Self::Leq => "LEQ",
            Self::Greater => "GREATER",
            Self::Geq => "GEQ",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Odd => "ODD",
            Self::Shl => "SHL",
            Self::Shr => "SHR",
            Self::OutString => "OUTSTRING",
            Self::OutInt => "OUTINT",
            Self::OutChar => "OUTCHAR",
            Self::Writeln => "WRITELN",
            Self::InInt => "ININT",
            Self::InChar => "INCHAR",
            Self::StrConcat => "STR_CONCAT",
            Self::StrLen => "STR_LEN",
            Self::StrEq => "STR_EQ",
            Self::StrCmp => "STR_CMP",
            Self::IntToStr => "INT_TO_STR",
            Self::StrToInt => "STR_TO_INT",
            Self::ObjNew => "OBJ_NEW",
            Self::ObjCallMethod => "OBJ_CALL_METHOD",
            Self::ObjGetField => "OBJ_GET_FIELD",
            Self::ObjSetField => "OBJ_SET_FIELD",
            Self::ObjSelf => "OBJ_SELF",
        };
        f.write_str(mnemonic)
    }
}

impl TryFrom<u8> for Operation {
    type Error = InvalidOperation;

    fn try_from(b: u8) -> Result<Self, InvalidOperation> {
        use Operation::*;
        match b {
            0x00 => Ok(Ret),
            0x01 => Ok(Add),
            0x02 => Ok(Sub),
            0x03 => Ok(Mul),
            0x04 => Ok(Div),
            0x05 => Ok(Pow),
            0x06 => Ok(Mod),
            0x07 => Ok(Neg),
            0x08 => Ok(Eq),
            0x09 => Ok(Neq),
            0x0a => Ok(Less),
            0x0b => Ok(Leq),
            0x0c => Ok(Greater),
            0x0d => Ok(Geq),
            0x0e => Ok(And),
            0x0f => Ok(Or),
            0x10 => Ok(Not),
            0x11 => Ok(Odd),
            0x12 => Ok(Shl),
            0x13 => Ok(Shr),
            0x14 => Ok(OutString),
            0x15 => Ok(OutInt),
            0x16 => Ok(OutChar),
            0x17 => Ok(Writeln),
            0x18 => Ok(InInt),
            0x19 => Ok(InChar),
            0x1a => Ok(StrConcat),
            0x1b => Ok(StrLen),
            0x1c => Ok(StrEq),
            0x1d => Ok(StrCmp),
            0x1e => Ok(IntToStr),
            0x1f => Ok(StrToInt),
            0x20 => Ok(ObjNew),
            0x21 => Ok(ObjCallMethod),
            0x22 => Ok(ObjGetField),
            0x23 => Ok(ObjSetField),
            0x24 => Ok(ObjSelf),
            _ => Err(InvalidOperation(b)),
        }
    }
}

impl TryFrom<Word> for Operation {
    type Error = InvalidOperation;

    fn try_from(w: Word) -> Result<Self, InvalidOperation> {
        let b = u8::try_from(w).map_err(|_| InvalidOperation(u8::MAX))?;
        Self::try_from(b)
    }
}

impl From<Operation> for u8 {
    fn from(op: Operation) -> u8 {
        op as u8
    }
}

impl From<Operation> for Word {
    fn from(op: Operation) -> Word {
        op as u8 as Word
    }
}

/// The byte does not map to any known [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvalidOperation(pub u8);

impl fmt::Display for InvalidOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid operation sub-code 0x{:02x}", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidOperation {}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn operation_byte_round_trip() {
        for op in Operation::iter() {
            let b = op as u8;
            assert_eq!(Operation::try_from(b), Ok(op));
            assert_eq!(Operation::try_from(b as Word), Ok(op));
        }
        for b in Operation::COUNT..=u8::MAX {
            assert_eq!(Operation::try_from(b), Err(InvalidOperation(b)));
        }
    }

    #[test]
    fn binary_operations_consume_two_slots() {
        for op in [
            Operation::Add,
            Operation::Sub,
            Operation::Mul,
            Operation::Div,
            Operation::Pow,
            Operation::Mod,
            Operation::Eq,
            Operation::Less,
            Operation::StrConcat,
        ] {
            assert_eq!(op.arity(), 2);
        }
    }
}
