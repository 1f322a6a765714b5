//! AST walk producing the instruction stream, interned string pool and
//! class manifest of one module.

use crate::ast::{Class, Expr, Method, Module, Stmt};
use crate::error::CodegenWarning;

use arx_asm::{Instruction, Opcode, Word};
use arx_mod::{
    class_id, method_id, ArxmodWriter, ClassDef, ClassEntry, ClassManifest,
    EncodeError, FieldEntry, MethodEntry, ModuleFlags, StringTable, FIELD_SIZE,
};

use itertools::Itertools;

use std::collections::HashMap;
use std::mem;
use std::path::Path;

mod context;
mod emit;

pub(crate) use context::{ClassContext, MethodPosition};

/// The compiler back end's output: everything the linker and the container
/// writer need.
#[derive(Debug)]
pub struct CompiledModule {
    /// Module name; used for id hashing and the APP section.
    pub name: String,
    /// Merged, label-resolved instruction stream.
    pub instructions: Vec<Instruction>,
    /// Interned string-literal pool, shared across classes.
    pub strings: StringTable,
    /// Class manifest in declaration order.
    pub manifest: ClassManifest,
    /// LIBRARY/EXECUTABLE kind; finalized by the linker.
    pub flags: ModuleFlags,
    /// Entry-point instruction index; stamped by the linker.
    pub entry_point: u64,
    /// Recoverable diagnostics collected during generation.
    pub warnings: Vec<CodegenWarning>,
    pub(crate) linked: bool,
}

impl CompiledModule {
    /// Whether the link step has finalized this module.
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Serialize to a `.arxmod` image.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let mut writer = ArxmodWriter::new();
        writer
            .set_flags(self.flags)
            .set_entry_point(self.entry_point)
            .set_app(&self.name, Vec::new());
        writer.code(&self.instructions)?;
        writer.strings(&self.strings)?;
        writer.classes(&self.manifest)?;
        writer.finalize()
    }

    /// Serialize to a `.arxmod` file on disk.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EncodeError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

/// Decide whether a source-level `+` is string concatenation.
///
/// The source-shape heuristic of the reference front end: any string-literal
/// operand, a nested `+` on the left, or an identifier on the right means
/// concatenation. Kept as a free function so a type checker can replace the
/// decision point wholesale.
pub fn plus_is_concat(lhs: &Expr, rhs: &Expr) -> bool {
    matches!(lhs, Expr::StrLiteral(_))
        || matches!(rhs, Expr::StrLiteral(_))
        || matches!(
            lhs,
            Expr::Binary {
                op: crate::ast::BinaryOp::Add,
                ..
            }
        )
        || matches!(rhs, Expr::Ident(_))
}

/// Compile a module AST into an unlinked [`CompiledModule`].
///
/// Generation is total: malformed shapes degrade to warnings and
/// best-effort emission, never an error.
pub fn compile(module: &Module) -> CompiledModule {
    let mut gen = CodeGen::new(module);
    for class in &module.classes {
        gen.compile_class(class);
    }
    gen.finish()
}

pub(crate) struct CodeGen<'a> {
    module: &'a Module,
    instructions: Vec<Instruction>,
    strings: StringTable,
    labels: HashMap<u32, usize>,
    next_label: u32,
    manifest: ClassManifest,
    warnings: Vec<CodegenWarning>,
    pub(crate) ctx: ClassContext,
    in_class: bool,
    tmp_counter: u32,
}

impl<'a> CodeGen<'a> {
    fn new(module: &'a Module) -> Self {
        Self {
            module,
            instructions: Vec::new(),
            strings: StringTable::new(),
            labels: HashMap::new(),
            next_label: 0,
            manifest: ClassManifest::default(),
            warnings: Vec::new(),
            ctx: ClassContext::default(),
            in_class: false,
            tmp_counter: 0,
        }
    }

    pub(crate) fn module_name(&self) -> &str {
        &self.module.name
    }

    pub(crate) fn module_ast(&self) -> &'a Module {
        self.module
    }

    pub(crate) fn emit(&mut self, ins: Instruction) {
        self.ctx.emit(ins);
    }

    pub(crate) fn intern(&mut self, s: &str) -> Word {
        Word::from(self.strings.intern(s))
    }

    pub(crate) fn warn(&mut self, warning: CodegenWarning) {
        tracing::warn!(class = %self.ctx.class_name, "{warning}");
        self.warnings.push(warning);
    }

    pub(crate) fn in_class(&self) -> bool {
        self.in_class
    }

    /// Allocate a hidden local slot, outside the source namespace.
    pub(crate) fn scratch_slot(&mut self) -> Word {
        let name = format!("$obj{}", self.tmp_counter);
        self.tmp_counter += 1;
        self.ctx.local_slot(&name)
    }

    /// Next id from the module-wide label counter. Module-wide so merged
    /// label tables never collide across classes.
    pub(crate) fn create_label(&mut self) -> u32 {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    pub(crate) fn set_label(&mut self, id: u32) {
        self.ctx.bind_label(id);
    }

    fn compile_class(&mut self, class: &Class) {
        let field_names = class.fields.iter().map(|f| f.name.clone()).collect();
        self.ctx = ClassContext::new(&class.name, field_names);
        self.in_class = true;

        for method in &class.methods {
            self.compile_method(method);
        }

        let ctx = mem::take(&mut self.ctx);
        self.in_class = false;
        self.merge(ctx, class);
    }

    fn compile_method(&mut self, method: &Method) {
        self.ctx.begin_method();
        for param in &method.params {
            self.ctx.local_slot(&param.name);
        }

        let start = self.ctx.pc();
        for stmt in &method.body {
            self.stmt(stmt);
        }
        if !matches!(method.body.last(), Some(Stmt::Return(_))) {
            self.emit(Instruction::opr(arx_asm::Operation::Ret));
        }
        let end = self.ctx.pc();

        self.ctx.positions.push(MethodPosition {
            name: method.name.clone(),
            start,
            end,
        });
    }

    /// Append a class context to the module stream, shifting its label
    /// bindings and method positions by the base offset, and emit the
    /// class's manifest records.
    fn merge(&mut self, ctx: ClassContext, class: &Class) {
        let base = self.instructions.len();

        for (id, pc) in ctx.labels {
            self.labels.insert(id, pc + base);
        }

        let fields: Vec<FieldEntry> = class
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| FieldEntry {
                name: f.name.clone(),
                type_id: nominal_type_id(&f.type_name),
                offset: i as u64 * FIELD_SIZE,
            })
            .collect();

        let methods: Vec<MethodEntry> = class
            .methods
            .iter()
            .zip(&ctx.positions)
            .map(|(method, pos)| {
                debug_assert_eq!(method.name, pos.name);
                debug_assert!(pos.end >= pos.start);
                let param_types = method
                    .params
                    .iter()
                    .map(|p| p.type_name.as_str())
                    .join(",");
                let param_count = if param_types.is_empty() {
                    0
                } else {
                    param_types.matches(',').count() as u32 + 1
                };
                let return_type = method.return_type.clone().unwrap_or_default();
                MethodEntry {
                    method_id: method_id(
                        &self.module.name,
                        &class.name,
                        &method.name,
                        &param_types,
                        &return_type,
                    ),
                    name: method.name.clone(),
                    param_count,
                    flags: 0,
                    param_types,
                    return_type,
                    offset: (pos.start + base) as u64,
                }
            })
            .collect();

        self.manifest.classes.push(ClassDef {
            entry: ClassEntry {
                name: class.name.clone(),
                class_id: class_id(&self.module.name, &class.name),
                parent_class_id: class
                    .parent
                    .as_deref()
                    .map(|p| class_id(&self.module.name, p))
                    .unwrap_or(0),
                instance_size: fields.len() as u64 * FIELD_SIZE,
                flags: 0,
            },
            methods,
            fields,
        });

        self.instructions.extend(ctx.instructions);
    }

    /// Final pass rewriting every jump operand from label id to instruction
    /// index. The label table is consumed, so running the pass again is a
    /// no-op.
    fn resolve_labels(&mut self) {
        let labels = mem::take(&mut self.labels);
        if labels.is_empty() {
            return;
        }

        let mut unbound = Vec::new();
        for ins in &mut self.instructions {
            if matches!(ins.opcode(), Ok(Opcode::Jmp | Opcode::Jpc)) {
                let id = ins.operand() as u32;
                match labels.get(&id) {
                    Some(&pc) => *ins = ins.with_operand(pc as Word),
                    None => unbound.push(id),
                }
            }
        }
        for label in unbound {
            self.warn(CodegenWarning::UnboundLabel { label });
        }
    }

    fn finish(mut self) -> CompiledModule {
        self.resolve_labels();

        let flags = if self.manifest.method("App", "Main").is_some() {
            ModuleFlags::EXECUTABLE
        } else {
            ModuleFlags::LIBRARY
        };

        tracing::debug!(
            module = %self.module.name,
            instructions = self.instructions.len(),
            strings = self.strings.len(),
            classes = self.manifest.classes.len(),
            "code generation finished"
        );

        CompiledModule {
            name: self.module.name.clone(),
            instructions: self.instructions,
            strings: self.strings,
            manifest: self.manifest,
            flags,
            entry_point: 0,
            warnings: self.warnings,
            linked: false,
        }
    }
}

fn nominal_type_id(name: &str) -> u32 {
    match name {
        "integer" => 1,
        "string" => 2,
        "boolean" => 3,
        "byte" => 4,
        _ => 0,
    }
}
