//! The link step: verifies call sites against the class manifest, decides
//! the module kind and stamps the entry point.

use crate::codegen::CompiledModule;
use crate::error::LinkError;

use arx_asm::{Opcode, Operation};
use arx_mod::ModuleFlags;

/// Finalize a compiled module in place.
///
/// Verifies that every `OBJ_CALL_METHOD` site whose preceding `LIT` carries
/// a string-table index resolves by name somewhere in the manifest (the
/// bytecode keeps the name form; dispatch resolves against the receiver's
/// class at call time). Then stamps the module kind: a manifest with
/// `App.Main` becomes EXECUTABLE with that method's offset as entry point;
/// anything else becomes LIBRARY with entry point zero. A module already
/// marked executable whose manifest lacks `Main` refuses to finalize.
///
/// Linking an already-linked module is a no-op.
pub fn link(module: &mut CompiledModule) -> Result<(), LinkError> {
    if module.is_linked() {
        return Ok(());
    }

    verify_call_sites(module)?;

    match module.manifest.method("App", "Main").map(|m| m.offset) {
        Some(offset) => {
            module.flags = ModuleFlags::EXECUTABLE;
            module.entry_point = offset;
        }
        None => {
            if module.flags.contains(ModuleFlags::EXECUTABLE) {
                return Err(LinkError::MissingMain);
            }
            module.flags = ModuleFlags::LIBRARY;
            module.entry_point = 0;
        }
    }

    module.linked = true;
    tracing::debug!(
        module = %module.name,
        executable = module.flags.contains(ModuleFlags::EXECUTABLE),
        entry_point = module.entry_point,
        "module linked"
    );
    Ok(())
}

fn verify_call_sites(module: &CompiledModule) -> Result<(), LinkError> {
    for (i, ins) in module.instructions.iter().enumerate() {
        let is_call = ins.opcode() == Ok(Opcode::Opr)
            && ins.operation() == Ok(Operation::ObjCallMethod);
        if !is_call {
            continue;
        }

        let Some(prev) = i.checked_sub(1).map(|p| module.instructions[p]) else {
            continue;
        };
        if prev.opcode() != Ok(Opcode::Lit) {
            continue;
        }
        let Ok(id) = u32::try_from(prev.operand()) else {
            continue;
        };
        // An operand past the pool is an already-patched offset, not a name.
        let Some(name) = module.strings.get(id) else {
            continue;
        };

        if module.manifest.any_method(name).is_none() {
            return Err(LinkError::UnresolvedMethod(name.to_string()));
        }
    }
    Ok(())
}
