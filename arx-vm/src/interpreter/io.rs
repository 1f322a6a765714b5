//! I/O intrinsics. Each print op flushes so output is observable in
//! instruction order; `ININT`/`INCHAR` block on the input source.

use super::Interpreter;
use crate::error::VmFault;

use arx_asm::{Operation, Word};

use std::io::{BufRead, Read, Write};

impl<R, W> Interpreter<R, W>
where
    R: BufRead,
    W: Write,
{
    pub(super) fn io_op(&mut self, op: Operation) -> Result<(), VmFault> {
        match op {
            Operation::OutString => {
                let value = self.pop()?;
                let bytes = self.materialize(value)?;
                self.write_bytes(&bytes)
            }

            Operation::OutInt => {
                let value = self.pop()?;
                let rendered = (value as i64).to_string();
                self.write_bytes(rendered.as_bytes())
            }

            Operation::OutChar => {
                let value = self.pop()?;
                self.write_bytes(&[value as u8])
            }

            Operation::Writeln => self.write_bytes(b"\n"),

            Operation::InInt => {
                let mut line = String::new();
                self.input.read_line(&mut line)?;
                let parsed = line.trim().parse::<i64>().unwrap_or(0);
                self.push(parsed as Word)
            }

            Operation::InChar => {
                let mut byte = [0u8; 1];
                let read = self.input.read(&mut byte)?;
                self.push(if read == 0 { 0 } else { Word::from(byte[0]) })
            }

            other => Err(VmFault::InvalidOperation(other as u8 as Word)),
        }
    }

    /// Write bytes to the output sink, honoring the UTF-8/ASCII switch,
    /// and flush.
    pub(super) fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), VmFault> {
        if self.params.utf8_output {
            self.output.write_all(bytes)?;
        } else {
            let filtered: Vec<u8> =
                bytes.iter().copied().filter(u8::is_ascii).collect();
            self.output.write_all(&filtered)?;
        }
        self.output.flush()?;
        Ok(())
    }
}
