//! Runtime state representation for the VM.

/// Lifecycle state of a VM instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VmState {
    /// Module loaded, program counter at the entry point.
    Ready,
    /// At least one step executed, none terminal yet.
    Running,
    /// Terminal: `HALT` executed or the entry method finished cleanly.
    Halted,
    /// Terminal: a fault was raised.
    Faulted,
}

impl VmState {
    /// Whether the machine reached a terminal state.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Halted | Self::Faulted)
    }
}

/// Resulting state of a single instruction execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecuteState {
    /// Fall through to the next instruction.
    Proceed,
    /// Control transferred; the program counter is already set.
    Jumped,
    /// Execution finished cleanly.
    Halt,
}

impl ExecuteState {
    /// Return true if the VM execution should continue.
    pub const fn should_continue(&self) -> bool {
        !matches!(self, Self::Halt)
    }
}
