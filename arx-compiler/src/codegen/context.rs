use arx_asm::{Instruction, Word};

use std::collections::HashMap;

/// Start/end instruction range of one compiled method body, local to its
/// class context until the merge shifts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MethodPosition {
    pub(crate) name: String,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

/// Per-class code-generation context.
///
/// Each class compiles into its own instruction buffer with its own label
/// bindings, local-slot table and method positions; the whole context is a
/// value consumed by the merge, which shifts label bindings and method
/// positions by the class's base offset as they are copied out.
#[derive(Debug, Default)]
pub(crate) struct ClassContext {
    pub(crate) class_name: String,
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) labels: HashMap<u32, usize>,
    pub(crate) positions: Vec<MethodPosition>,
    locals: HashMap<String, Word>,
    next_slot: Word,
    field_names: Vec<String>,
}

impl ClassContext {
    pub(crate) fn new(class_name: &str, field_names: Vec<String>) -> Self {
        Self {
            class_name: class_name.to_string(),
            field_names,
            ..Self::default()
        }
    }

    /// Current emission point, local to this context.
    pub(crate) fn pc(&self) -> usize {
        self.instructions.len()
    }

    pub(crate) fn emit(&mut self, ins: Instruction) -> usize {
        let at = self.instructions.len();
        self.instructions.push(ins);
        at
    }

    /// Bind (or re-bind) a label to the current emission point.
    pub(crate) fn bind_label(&mut self, id: u32) {
        self.labels.insert(id, self.pc());
    }

    /// Reset the local-slot table for a fresh method body. Slot numbering
    /// restarts at zero so parameters land in the slots the call sequence
    /// fills.
    pub(crate) fn begin_method(&mut self) {
        self.locals.clear();
        self.next_slot = 0;
    }

    /// Slot of a local, allocating the next slot on first use.
    pub(crate) fn local_slot(&mut self, name: &str) -> Word {
        if let Some(&slot) = self.locals.get(name) {
            return slot;
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        self.locals.insert(name.to_string(), slot);
        slot
    }

    pub(crate) fn lookup_local(&self, name: &str) -> Option<Word> {
        self.locals.get(name).copied()
    }

    /// Whether the enclosing class declares this object variable.
    pub(crate) fn is_field(&self, name: &str) -> bool {
        self.field_names.iter().any(|f| f == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_allocate_once_and_monotonically() {
        let mut ctx = ClassContext::new("App", Vec::new());
        ctx.begin_method();
        assert_eq!(ctx.local_slot("a"), 0);
        assert_eq!(ctx.local_slot("b"), 1);
        assert_eq!(ctx.local_slot("a"), 0);

        ctx.begin_method();
        assert_eq!(ctx.lookup_local("a"), None);
        assert_eq!(ctx.local_slot("c"), 0);
    }

    #[test]
    fn labels_rebind_to_latest_position() {
        let mut ctx = ClassContext::new("App", Vec::new());
        ctx.bind_label(3);
        ctx.emit(Instruction::lit(1));
        ctx.bind_label(3);
        assert_eq!(ctx.labels[&3], 1);
    }
}
