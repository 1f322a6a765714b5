//! Atomic types of the ARX virtual machine: opcodes, `OPR` operation
//! sub-codes and the packed instruction encoding shared by the compiler,
//! the module container and the interpreter.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

extern crate alloc;

mod instruction;
mod opcode;
mod operation;


pub use instruction::Instruction;
pub use opcode::{InvalidOpcode, Opcode};
pub use operation::{InvalidOperation, Operation};

/// Word size of the VM: every stack slot, memory slot and instruction
/// operand is one `Word`.
pub type Word = u64;

/// Address of the virtual "system" receiver used to route intrinsic calls
/// such as `writeln`.
pub const SYSTEM_OBJECT: Word = 0xFFFF_FFFF;
