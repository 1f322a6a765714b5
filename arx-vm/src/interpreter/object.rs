//! Object operations: allocation, field access, receiver access.

use super::Interpreter;
use crate::error::VmFault;

use arx_asm::{Operation, Word};
use arx_mod::FIELD_SIZE;

use std::io::{BufRead, Write};

impl<R, W> Interpreter<R, W>
where
    R: BufRead,
    W: Write,
{
    pub(super) fn object_op(&mut self, op: Operation) -> Result<(), VmFault> {
        match op {
            Operation::ObjNew => self.obj_new(),
            Operation::ObjGetField => self.obj_get_field(),
            Operation::ObjSetField => self.obj_set_field(),
            Operation::ObjSelf => self.push(self.current_receiver()),
            other => Err(VmFault::InvalidOperation(other as u8 as Word)),
        }
    }

    /// Pop a class id, allocate a zero-filled instance in the object
    /// region, push its address.
    fn obj_new(&mut self) -> Result<(), VmFault> {
        let class_id = self.pop()?;
        let slots = self
            .registry
            .instance_slots(class_id)
            .ok_or(VmFault::UnknownClass(class_id))?;

        // Field-less classes still get one slot so the instance has a
        // distinct address for identity and bookkeeping.
        let slots = slots.max(1);
        let handle = self
            .objects
            .allocate(class_id, slots, self.steps)
            .ok_or(VmFault::ObjectRegionExhausted)?;

        let start = handle.address as usize;
        self.memory[start..start + slots as usize].fill(0);

        self.push(handle.address)
    }

    /// Stack: `object, name_id` → field value.
    fn obj_get_field(&mut self) -> Result<(), VmFault> {
        let (address, slot) = self.field_slot()?;
        let value = self.read_memory(address.wrapping_add(slot))?;
        self.push(value)
    }

    /// Stack: `object, value, name_id` → nothing.
    fn obj_set_field(&mut self) -> Result<(), VmFault> {
        let name = self.pop_field_name()?;
        let value = self.pop()?;
        let object = self.pop()?;
        let slot = self.resolve_field(object, &name)?;

        let target = object.wrapping_add(slot) as usize;
        if target >= self.memory.len() {
            return Err(VmFault::MemoryAccess(target as Word));
        }
        self.memory[target] = value;
        Ok(())
    }

    fn pop_field_name(&mut self) -> Result<String, VmFault> {
        let name_id = self.pop()?;
        u32::try_from(name_id)
            .ok()
            .and_then(|id| self.strings.get(id))
            .map(str::to_string)
            .ok_or(VmFault::UnknownField(format!("#{name_id}")))
    }

    fn field_slot(&mut self) -> Result<(Word, Word), VmFault> {
        let name = self.pop_field_name()?;
        let object = self.pop()?;
        let slot = self.resolve_field(object, &name)?;
        Ok((object, slot))
    }

    /// Slot offset of a named field of the object at `address`, from the
    /// manifest's explicit byte offsets.
    fn resolve_field(&self, address: Word, name: &str) -> Result<Word, VmFault> {
        let entry = self
            .objects
            .entry_by_address(address)
            .ok_or(VmFault::MemoryAccess(address))?;
        let offset = self
            .registry
            .field_offset(entry.class_id, name)
            .ok_or_else(|| VmFault::UnknownField(name.to_string()))?;
        Ok(offset / FIELD_SIZE)
    }
}
