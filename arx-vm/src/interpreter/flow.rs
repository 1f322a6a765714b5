//! Control flow: raw calls, method dispatch and returns.

use super::Interpreter;
use crate::call::CallFrame;
use crate::consts::{LOCALS_PER_FRAME, VAR_REGION_BASE};
use crate::error::VmFault;
use crate::state::ExecuteState;

use arx_asm::{Word, SYSTEM_OBJECT};

use std::io::{BufRead, Write};

impl<R, W> Interpreter<R, W>
where
    R: BufRead,
    W: Write,
{
    /// `CAL` — push a procedure frame and jump. The callee inherits the
    /// caller's receiver.
    pub(super) fn call_raw(&mut self, level: u8, target: Word) -> Result<ExecuteState, VmFault> {
        if self.frames.len() >= self.params.call_depth {
            return Err(VmFault::CallStackOverflow);
        }

        let frame = CallFrame::new(
            self.pc + 1,
            self.stack.len(),
            level,
            self.current_receiver(),
            false,
        );
        self.frames.push(frame);
        self.jump_to(target)?;
        Ok(ExecuteState::Jumped)
    }

    /// `OPR RET` — pop the frame, restore the program counter and the
    /// data-stack snapshot. A function's return value is re-pushed after
    /// the restore. With no frame left this is the clean fall-off of the
    /// entry method.
    pub(super) fn ret(&mut self) -> Result<ExecuteState, VmFault> {
        let Some(frame) = self.frames.pop() else {
            return Ok(ExecuteState::Halt);
        };

        let return_value = if frame.returns_value() {
            Some(self.pop()?)
        } else {
            None
        };

        if frame.stack_top() > self.stack.len() {
            return Err(VmFault::CallStackUnderflow);
        }
        self.stack.truncate(frame.stack_top());

        if let Some(value) = return_value {
            self.push(value)?;
        }

        self.pc = frame.return_pc();
        Ok(ExecuteState::Jumped)
    }

    /// `OPR OBJ_CALL_METHOD` — dynamic dispatch.
    ///
    /// Stack on entry: `receiver, arg0..argN-1, name_id` (receiver pushed
    /// first, then the arguments, then the interned method-name id). The
    /// name resolves against the receiver's class walking the parent chain;
    /// the arguments move into the callee's local slots N-1 down to 0.
    pub(super) fn call_method(&mut self) -> Result<ExecuteState, VmFault> {
        let name_id = self.pop()?;
        let name = u32::try_from(name_id)
            .ok()
            .and_then(|id| self.strings.get(id))
            .map(str::to_string)
            .ok_or(VmFault::UnresolvedMethod(format!("#{name_id}")))?;

        // The receiver sits under the arguments, and the argument count
        // comes from the manifest; take the parameter count from the first
        // method of this name, then re-resolve against the receiver's
        // class once it is reachable.
        let param_count = self
            .registry
            .any_method(&name)
            .ok_or_else(|| VmFault::UnresolvedMethod(name.clone()))?
            .param_count as usize;

        let mut args = vec![0; param_count];
        for slot in (0..param_count).rev() {
            args[slot] = self.pop()?;
        }
        let receiver = self.pop()?;

        if receiver == SYSTEM_OBJECT {
            // Intrinsics lower at compile time; a late system call has
            // nothing to dispatch to.
            return Err(VmFault::UnresolvedMethod(name));
        }

        let resolved = match self.objects.entry_by_address(receiver) {
            Some(entry) => self
                .registry
                .resolve_method(entry.class_id, &name)
                .ok_or_else(|| VmFault::UnresolvedMethod(name.clone()))?,
            // No object entry: the receiver is not a managed object, fall
            // back to the name's first declaration.
            None => self
                .registry
                .any_method(&name)
                .ok_or_else(|| VmFault::UnresolvedMethod(name.clone()))?,
        };
        let offset = resolved.offset;
        let returns_value = resolved.is_function();

        if self.frames.len() >= self.params.call_depth {
            return Err(VmFault::CallStackOverflow);
        }

        // Arguments become the callee's locals under its slot numbering,
        // in the window the frame about to be pushed will address.
        let base = VAR_REGION_BASE + (self.frames.len() + 1) * LOCALS_PER_FRAME;
        for (slot, value) in args.into_iter().enumerate() {
            let address = base + slot;
            if address >= self.memory.len() {
                return Err(VmFault::MemoryAccess(address as Word));
            }
            self.memory[address] = value;
        }

        let frame = CallFrame::new(
            self.pc + 1,
            self.stack.len(),
            0,
            receiver,
            returns_value,
        );
        self.frames.push(frame);
        self.jump_to(offset)?;
        Ok(ExecuteState::Jumped)
    }
}
