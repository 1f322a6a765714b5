use crate::{InvalidOpcode, InvalidOperation, Opcode, Operation, Word};

use core::fmt;

#[cfg(feature = "std")]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::{io, iter};

/// A packed VM instruction: opcode in the low nibble, lexical level in the
/// high nibble, and a 64-bit operand.
///
/// The operand of a jump holds either an unresolved label id (during code
/// generation) or a resolved instruction index (after label resolution).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    repr: u8,
    operand: Word,
}

impl Instruction {
    /// Serialized size of an instruction in bytes.
    pub const LEN: usize = 9;

    /// Build an instruction from an opcode, a lexical level and an operand.
    ///
    /// Only the low nibble of `level` is representable; higher bits are
    /// discarded.
    pub const fn new(opcode: Opcode, level: u8, operand: Word) -> Self {
        Self {
            repr: ((level & 0x0f) << 4) | (opcode as u8),
            operand,
        }
    }

    /// Rebuild an instruction from its packed opcode/level byte and operand.
    pub const fn from_parts(repr: u8, operand: Word) -> Self {
        Self { repr, operand }
    }

    /// The packed opcode/level byte.
    pub const fn repr(&self) -> u8 {
        self.repr
    }

    /// The opcode nibble, undecoded.
    pub const fn opcode_u8(&self) -> u8 {
        self.repr & 0x0f
    }

    /// The lexical level nibble.
    pub const fn level(&self) -> u8 {
        (self.repr >> 4) & 0x0f
    }

    /// The 64-bit operand.
    pub const fn operand(&self) -> Word {
        self.operand
    }

    /// Decode the opcode nibble.
    pub fn opcode(&self) -> Result<Opcode, InvalidOpcode> {
        Opcode::try_from(self.opcode_u8())
    }

    /// Decode the operand as an [`Operation`] sub-code (meaningful for
    /// [`Opcode::Opr`] instructions only).
    pub fn operation(&self) -> Result<Operation, InvalidOperation> {
        Operation::try_from(self.operand)
    }

    /// Replace the operand, keeping opcode and level. Used by label
    /// resolution and linking.
    pub const fn with_operand(self, operand: Word) -> Self {
        Self {
            repr: self.repr,
            operand,
        }
    }

    /// `LIT` — push a literal value or string-id.
    pub const fn lit(value: Word) -> Self {
        Self::new(Opcode::Lit, 0, value)
    }

    /// `OPR` — execute an operation sub-code.
    pub const fn opr(op: Operation) -> Self {
        Self::new(Opcode::Opr, 0, op as u8 as Word)
    }

    /// `LOD` — load a slot relative to the level base.
    pub const fn lod(level: u8, slot: Word) -> Self {
        Self::new(Opcode::Lod, level, slot)
    }

    /// `STO` — store to a slot relative to the level base.
    pub const fn sto(level: u8, slot: Word) -> Self {
        Self::new(Opcode::Sto, level, slot)
    }

    /// `CAL` — push a frame and jump.
    pub const fn cal(level: u8, target: Word) -> Self {
        Self::new(Opcode::Cal, level, target)
    }

    /// `INT` — grow the data stack.
    pub const fn int(slots: Word) -> Self {
        Self::new(Opcode::Int, 0, slots)
    }

    /// `JMP` — unconditional jump.
    pub const fn jmp(target: Word) -> Self {
        Self::new(Opcode::Jmp, 0, target)
    }

    /// `JPC` — jump when the popped value is zero.
    pub const fn jpc(target: Word) -> Self {
        Self::new(Opcode::Jpc, 0, target)
    }

    /// `LODX` — indexed load.
    pub const fn lodx(level: u8, slot: Word) -> Self {
        Self::new(Opcode::Lodx, level, slot)
    }

    /// `STOX` — indexed store.
    pub const fn stox(level: u8, slot: Word) -> Self {
        Self::new(Opcode::Stox, level, slot)
    }

    /// `HALT` — stop execution.
    pub const fn halt() -> Self {
        Self::new(Opcode::Halt, 0, 0)
    }

    /// Serialize to the 9-byte wire form: packed byte, then the operand in
    /// little-endian order.
    pub fn to_bytes(self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        bytes[0] = self.repr;
        bytes[1..].copy_from_slice(&self.operand.to_le_bytes());
        bytes
    }
}

impl From<[u8; Instruction::LEN]> for Instruction {
    fn from(bytes: [u8; Instruction::LEN]) -> Self {
        let mut operand = [0u8; 8];
        operand.copy_from_slice(&bytes[1..]);
        Self {
            repr: bytes[0],
            operand: Word::from_le_bytes(operand),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode() {
            Ok(Opcode::Opr) => match self.operation() {
                Ok(op) => write!(f, "OPR {op}"),
                Err(_) => write!(f, "OPR {:#x}", self.operand),
            },
            Ok(op @ (Opcode::Lod | Opcode::Sto | Opcode::Cal | Opcode::Lodx | Opcode::Stox)) => {
                write!(f, "{op} {}, {}", self.level(), self.operand)
            }
            Ok(Opcode::Halt) => f.write_str("HALT"),
            Ok(op) => write!(f, "{op} {}", self.operand),
            Err(_) => write!(f, "??? {:#04x} {:#x}", self.repr, self.operand),
        }
    }
}

#[cfg(feature = "std")]
impl Instruction {
    /// Deserialize an instruction from the head of a byte slice.
    ///
    /// Fails when fewer than [`Instruction::LEN`] bytes are available.
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let head: [u8; Self::LEN] = bytes
            .get(..Self::LEN)
            .and_then(|head| head.try_into().ok())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "the provided buffer is not big enough",
                )
            })?;

        Ok(Self::from(head))
    }

    /// Deserialize a sequence of instructions from an iterator of bytes.
    ///
    /// A trailing partial record is consumed but not parsed.
    pub fn from_bytes_iter<I>(bytes: I) -> Vec<Self>
    where
        I: IntoIterator<Item = u8>,
    {
        let mut bytes = bytes.into_iter();
        let mut buf = [0u8; Self::LEN];
        let mut ret = Vec::with_capacity(bytes.size_hint().0 / Self::LEN);

        loop {
            let n = bytes
                .by_ref()
                .take(Self::LEN)
                .zip(buf.as_mut().iter_mut())
                .fold(0, |n, (x, b)| {
                    *b = x;
                    n + 1
                });

            if n < Self::LEN {
                break;
            }

            ret.push(Self::from(buf));
        }

        ret
    }
}

#[cfg(feature = "std")]
impl iter::FromIterator<Instruction> for Vec<u8> {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Instruction>,
    {
        iter.into_iter().flat_map(Instruction::to_bytes).collect()
    }
}
