//! String operations over the object region and the literal pool.

use super::Interpreter;
use crate::consts::{OBJECT_REGION_BASE, OBJ_TYPE_STRING};
use crate::error::VmFault;

use arx_asm::{Operation, Word};

use std::io::{BufRead, Write};

impl<R, W> Interpreter<R, W>
where
    R: BufRead,
    W: Write,
{
    pub(super) fn string_op(&mut self, op: Operation) -> Result<(), VmFault> {
        match op {
            Operation::StrConcat => {
                let right = self.pop()?;
                let left = self.pop()?;
                let mut bytes = self.materialize(left)?;
                bytes.extend(self.materialize(right)?);
                let address = self.allocate_string(&bytes)?;
                self.push(address)
            }

            Operation::StrLen => {
                let value = self.pop()?;
                let bytes = self.materialize(value)?;
                self.push(bytes.len() as Word)
            }

            Operation::StrEq => {
                let right = self.pop()?;
                let left = self.pop()?;
                let equal = self.materialize(left)? == self.materialize(right)?;
                self.push(equal as Word)
            }

            Operation::StrCmp => {
                let right = self.pop()?;
                let left = self.pop()?;
                let ordering = self.materialize(left)?.cmp(&self.materialize(right)?);
                self.push(ordering as i64 as Word)
            }

            Operation::IntToStr => {
                let value = self.pop()?;
                let rendered = (value as i64).to_string();
                let address = self.allocate_string(rendered.as_bytes())?;
                self.push(address)
            }

            Operation::StrToInt => {
                let value = self.pop()?;
                let bytes = self.materialize(value)?;
                let parsed = String::from_utf8_lossy(&bytes)
                    .trim()
                    .parse::<i64>()
                    .unwrap_or(0);
                self.push(parsed as Word)
            }

            other => Err(VmFault::InvalidOperation(other as u8 as Word)),
        }
    }

    /// Turn a stack value into string bytes.
    ///
    /// A string-object address wins; a valid literal-pool index is the
    /// legacy compatibility path; anything else renders as its signed
    /// decimal value (how integer operands reach `writeln`).
    pub(crate) fn materialize(&self, value: Word) -> Result<Vec<u8>, VmFault> {
        let address = value as usize;
        if address >= OBJECT_REGION_BASE
            && address + 1 < self.memory.len()
            && self.memory[address] == OBJ_TYPE_STRING
        {
            let length = self.memory[address + 1] as usize;
            let end = address
                .checked_add(2)
                .and_then(|s| s.checked_add(length))
                .ok_or(VmFault::MemoryAccess(value))?;
            if end > self.memory.len() {
                return Err(VmFault::MemoryAccess(value));
            }
            return Ok(self.memory[address + 2..end]
                .iter()
                .map(|&slot| slot as u8)
                .collect());
        }

        if let Some(literal) = u32::try_from(value)
            .ok()
            .and_then(|id| self.strings.get(id))
        {
            return Ok(literal.as_bytes().to_vec());
        }

        Ok((value as i64).to_string().into_bytes())
    }

    /// Allocate a string object: tag slot, length slot, one byte per slot,
    /// zero terminator.
    pub(crate) fn allocate_string(&mut self, bytes: &[u8]) -> Result<Word, VmFault> {
        let size = bytes.len() as Word + 3;
        let handle = self
            .objects
            .allocate(0, size, self.steps)
            .ok_or(VmFault::ObjectRegionExhausted)?;

        let start = handle.address as usize;
        self.memory[start] = OBJ_TYPE_STRING;
        self.memory[start + 1] = bytes.len() as Word;
        for (i, &b) in bytes.iter().enumerate() {
            self.memory[start + 2 + i] = Word::from(b);
        }
        self.memory[start + 2 + bytes.len()] = 0;

        Ok(handle.address)
    }
}
