//! The execution engine: decode/dispatch loop, data stack, call frames and
//! linear memory.

use crate::call::CallFrame;
use crate::consts::*;
use crate::error::VmFault;
use crate::loader::ModuleImage;
use crate::object::{CollectStats, ObjectManager};
use crate::registry::ClassRegistry;
use crate::state::{ExecuteState, VmState};

use arx_asm::{Instruction, Opcode, Operation, Word};
use arx_mod::StringTable;

use std::io::{BufRead, Write};

mod alu;
mod flow;
mod io;
mod object;
mod strings;

/// Tunable execution parameters.
///
/// The step and PC-stuck limits are quality-of-service bounds against
/// runaway programs, not part of the language semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmParams {
    /// Linear memory size in slots.
    pub memory_slots: usize,
    /// Data-stack capacity in slots.
    pub stack_slots: usize,
    /// Call-frame depth cap.
    pub call_depth: usize,
    /// Instruction-count guard.
    pub step_limit: u64,
    /// Consecutive same-PC steps tolerated before giving up.
    pub pc_stuck_limit: u32,
    /// Maximum literal-pool entries accepted at load time.
    pub string_table_capacity: usize,
    /// Pass string bytes through as UTF-8; ASCII-filter otherwise.
    pub utf8_output: bool,
    /// Emit a `tracing` event per executed instruction.
    pub trace: bool,
}

impl Default for VmParams {
    fn default() -> Self {
        Self {
            memory_slots: MEMORY_SLOTS,
            stack_slots: STACK_SLOTS,
            call_depth: CALL_STACK_DEPTH,
            step_limit: DEFAULT_STEP_LIMIT,
            pc_stuck_limit: PC_STUCK_LIMIT,
            string_table_capacity: STRING_TABLE_CAPACITY,
            utf8_output: true,
            trace: false,
        }
    }
}

/// The ARX virtual machine.
///
/// Owns every piece of runtime state exclusively: instruction vector, data
/// stack, call stack, linear memory, literal pool, class registry and the
/// object manager. Strictly single-threaded; input and output are the only
/// blocking points.
#[derive(Debug)]
pub struct Interpreter<R, W> {
    instructions: Vec<Instruction>,
    strings: StringTable,
    registry: ClassRegistry,
    objects: ObjectManager,
    memory: Vec<Word>,
    stack: Vec<Word>,
    frames: Vec<CallFrame>,
    pc: usize,
    state: VmState,
    steps: u64,
    stuck_count: u32,
    entry_point: usize,
    library: bool,
    params: VmParams,
    input: R,
    output: W,
}

impl<R, W> Interpreter<R, W>
where
    R: BufRead,
    W: Write,
{
    /// Build a VM over a loaded module image.
    ///
    /// Fails with [`VmFault::StringTableFull`] when the module's literal
    /// pool exceeds the configured capacity.
    pub fn new(
        image: ModuleImage,
        params: VmParams,
        input: R,
        output: W,
    ) -> Result<Self, VmFault> {
        if image.strings.len() > params.string_table_capacity {
            return Err(VmFault::StringTableFull);
        }

        let entry_point = image.header.entry_point as usize;
        let library = image.header.is_library();

        Ok(Self {
            instructions: image.instructions,
            strings: image.strings,
            registry: image.registry,
            objects: ObjectManager::new(OBJECT_REGION_BASE, params.memory_slots),
            memory: vec![0; params.memory_slots],
            stack: Vec::with_capacity(params.stack_slots),
            frames: Vec::with_capacity(params.call_depth),
            pc: entry_point,
            state: VmState::Ready,
            steps: 0,
            stuck_count: 0,
            entry_point,
            library,
            params,
            input,
            output,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> VmState {
        self.state
    }

    /// Current program counter.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The loaded instruction vector.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The data stack, bottom first.
    pub fn stack(&self) -> &[Word] {
        &self.stack
    }

    /// The call stack, outermost frame first.
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    /// Linear memory.
    pub fn memory(&self) -> &[Word] {
        &self.memory
    }

    /// The object manager.
    pub fn objects(&self) -> &ObjectManager {
        &self.objects
    }

    /// The literal pool.
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// The output sink.
    pub fn output(&self) -> &W {
        &self.output
    }

    /// Consume the VM, returning the output sink.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Whether the loaded module is a library.
    pub fn is_library(&self) -> bool {
        self.library
    }

    /// Run an explicit sweep pass over the object table.
    pub fn garbage_collect(&mut self) -> CollectStats {
        self.objects.collect(&mut self.memory)
    }

    /// Increment the reference count of the object at `address`.
    pub fn reference_object(&mut self, address: Word) -> bool {
        self.objects.retain(address)
    }

    /// Decrement the reference count of the object at `address`; a count of
    /// zero marks the object dead.
    pub fn release_object(&mut self, address: Word) -> bool {
        self.objects.release(address)
    }

    /// Execute until a terminal state.
    ///
    /// A library module prints `library module loaded` and halts without
    /// executing a single instruction.
    pub fn run(&mut self) -> Result<VmState, VmFault> {
        if self.library {
            self.write_bytes(b"library module loaded\n")?;
            self.state = VmState::Halted;
            return Ok(self.state);
        }

        if self.entry_point >= self.instructions.len() && !self.instructions.is_empty() {
            self.state = VmState::Faulted;
            return Err(VmFault::InvalidAddress(self.entry_point as Word));
        }

        while !self.state.is_terminal() {
            self.step()?;
        }
        Ok(self.state)
    }

    /// Execute one instruction. Terminal states are sticky.
    pub fn step(&mut self) -> Result<ExecuteState, VmFault> {
        if self.state.is_terminal() {
            return Ok(ExecuteState::Halt);
        }
        self.state = VmState::Running;

        match self.step_inner() {
            Ok(ExecuteState::Halt) => {
                self.state = VmState::Halted;
                Ok(ExecuteState::Halt)
            }
            Ok(state) => Ok(state),
            Err(fault) => {
                self.state = VmState::Faulted;
                tracing::debug!(pc = self.pc, %fault, "execution faulted");
                Err(fault)
            }
        }
    }

    fn step_inner(&mut self) -> Result<ExecuteState, VmFault> {
        // Falling off the end of the stream is a clean halt.
        if self.pc >= self.instructions.len() {
            return Ok(ExecuteState::Halt);
        }

        self.steps += 1;
        if self.steps > self.params.step_limit {
            return Err(VmFault::StepLimit(self.params.step_limit));
        }

        let ins = self.instructions[self.pc];
        if self.params.trace {
            tracing::trace!(pc = self.pc, instruction = %ins, "execute");
        }

        let before = self.pc;
        let state = self.execute(ins)?;
        if let ExecuteState::Proceed = state {
            self.pc += 1;
        }

        if self.pc == before && state.should_continue() {
            self.stuck_count += 1;
            if self.stuck_count >= self.params.pc_stuck_limit {
                return Err(VmFault::StuckProgramCounter(self.pc));
            }
        } else {
            self.stuck_count = 0;
        }

        Ok(state)
    }

    fn execute(&mut self, ins: Instruction) -> Result<ExecuteState, VmFault> {
        let opcode = ins
            .opcode()
            .map_err(|e| VmFault::InvalidInstruction(e.0))?;
        let level = ins.level();
        let operand = ins.operand();

        match opcode {
            Opcode::Lit => {
                self.push(operand)?;
                Ok(ExecuteState::Proceed)
            }

            Opcode::Opr => {
                let operation = Operation::try_from(operand)
                    .map_err(|_| VmFault::InvalidOperation(operand))?;
                self.operation(operation)
            }

            Opcode::Lod => {
                let value = self.read_slot(level, operand)?;
                self.push(value)?;
                Ok(ExecuteState::Proceed)
            }

            Opcode::Sto => {
                let value = self.pop()?;
                self.write_slot(level, operand, value)?;
                Ok(ExecuteState::Proceed)
            }

            Opcode::Cal => self.call_raw(level, operand),

            Opcode::Int => {
                let grow = operand as usize;
                if self.stack.len() + grow > self.params.stack_slots {
                    return Err(VmFault::StackOverflow);
                }
                self.stack.resize(self.stack.len() + grow, 0);
                Ok(ExecuteState::Proceed)
            }

            Opcode::Jmp => {
                self.jump_to(operand)?;
                Ok(ExecuteState::Jumped)
            }

            Opcode::Jpc => {
                let cond = self.pop()?;
                if cond == 0 {
                    self.jump_to(operand)?;
                    Ok(ExecuteState::Jumped)
                } else {
                    Ok(ExecuteState::Proceed)
                }
            }

            Opcode::Lodx => {
                let index = self.pop()?;
                let value = self.read_slot(level, operand.wrapping_add(index))?;
                self.push(value)?;
                Ok(ExecuteState::Proceed)
            }

            Opcode::Stox => {
                let value = self.pop()?;
                let index = self.pop()?;
                self.write_slot(level, operand.wrapping_add(index), value)?;
                Ok(ExecuteState::Proceed)
            }

            Opcode::Halt => Ok(ExecuteState::Halt),
        }
    }

    fn operation(&mut self, op: Operation) -> Result<ExecuteState, VmFault> {
        use Operation::*;
        match op {
            Ret => self.ret(),
            ObjCallMethod => self.call_method(),

            Add | Sub | Mul | Div | Pow | Mod | Eq | Neq | Less | Leq | Greater
            | Geq | And | Or | Shl | Shr => {
                self.binary_alu(op)?;
                Ok(ExecuteState::Proceed)
            }
            Neg | Not | Odd => {
                self.unary_alu(op)?;
                Ok(ExecuteState::Proceed)
            }

            OutString | OutInt | OutChar | Writeln | InInt | InChar => {
                self.io_op(op)?;
                Ok(ExecuteState::Proceed)
            }

            StrConcat | StrLen | StrEq | StrCmp | IntToStr | StrToInt => {
                self.string_op(op)?;
                Ok(ExecuteState::Proceed)
            }

            ObjNew | ObjGetField | ObjSetField | ObjSelf => {
                self.object_op(op)?;
                Ok(ExecuteState::Proceed)
            }
        }
    }

    pub(crate) fn push(&mut self, value: Word) -> Result<(), VmFault> {
        if self.stack.len() >= self.params.stack_slots {
            return Err(VmFault::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<Word, VmFault> {
        self.stack.pop().ok_or(VmFault::StackUnderflow)
    }

    /// Base of the current frame's local-slot window. Each frame gets its
    /// own window inside the variable region; the entry method's window
    /// starts at the region base.
    pub(crate) fn locals_base(&self) -> usize {
        VAR_REGION_BASE + self.frames.len() * LOCALS_PER_FRAME
    }

    fn slot_address(&self, level: u8, slot: Word) -> Result<usize, VmFault> {
        let base = if level == 0 {
            if slot >= LOCALS_PER_FRAME as Word {
                return Err(VmFault::MemoryAccess(slot));
            }
            self.locals_base()
        } else {
            level_base(level)
        };
        let address = (base as Word).wrapping_add(slot);
        if (address as usize) < self.memory.len() {
            Ok(address as usize)
        } else {
            Err(VmFault::MemoryAccess(address))
        }
    }

    fn read_slot(&self, level: u8, slot: Word) -> Result<Word, VmFault> {
        let address = self.slot_address(level, slot)?;
        Ok(self.memory[address])
    }

    fn write_slot(&mut self, level: u8, slot: Word, value: Word) -> Result<(), VmFault> {
        let address = self.slot_address(level, slot)?;
        self.memory[address] = value;
        Ok(())
    }

    pub(crate) fn read_memory(&self, address: Word) -> Result<Word, VmFault> {
        self.memory
            .get(address as usize)
            .copied()
            .ok_or(VmFault::MemoryAccess(address))
    }

    pub(crate) fn jump_to(&mut self, target: Word) -> Result<(), VmFault> {
        if (target as usize) < self.instructions.len() {
            self.pc = target as usize;
            Ok(())
        } else {
            Err(VmFault::InvalidAddress(target))
        }
    }

    pub(crate) fn current_receiver(&self) -> Word {
        self.frames.last().map(CallFrame::receiver).unwrap_or(0)
    }
}
