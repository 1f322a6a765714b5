use crate::bytes::{put_fixed_str, put_u32, put_u64, ByteReader};
use crate::{EncodeError, LoadError};

use sha3::{Digest, Keccak256};
use std::collections::HashSet;

/// Maximum byte length of a class, method or field name.
pub const CLASS_NAME_MAX: usize = 31;
/// Maximum byte length of a parameter-types signature.
pub const PARAM_TYPES_MAX: usize = 63;
/// Maximum byte length of a return-type name.
pub const RETURN_TYPE_MAX: usize = 31;

const NAME_FIELD: usize = CLASS_NAME_MAX + 1;
const PARAM_TYPES_FIELD: usize = PARAM_TYPES_MAX + 1;
const RETURN_TYPE_FIELD: usize = RETURN_TYPE_MAX + 1;

fn keccak_id(parts: &[&str]) -> u64 {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

/// Stable 64-bit class id: a pure function of module and class name.
pub fn class_id(module: &str, class: &str) -> u64 {
    keccak_id(&[module, ":", class])
}

/// Stable 64-bit method id over the full signature.
pub fn method_id(
    module: &str,
    class: &str,
    method: &str,
    param_types: &str,
    return_type: &str,
) -> u64 {
    keccak_id(&[
        module,
        ":",
        class,
        ".",
        method,
        "(",
        param_types,
        ")",
        ":",
        return_type,
    ])
}

/// Per-class manifest record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassEntry {
    /// Class name; at most [`CLASS_NAME_MAX`] bytes.
    pub name: String,
    /// Stable class id, see [`class_id`].
    pub class_id: u64,
    /// Parent class id; zero when the class has no parent.
    pub parent_class_id: u64,
    /// Instance size in bytes: 8 × field count.
    pub instance_size: u64,
    /// Reserved class flags; kept zero.
    pub flags: u32,
}

/// Per-method manifest record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodEntry {
    /// Method name; at most [`CLASS_NAME_MAX`] bytes.
    pub name: String,
    /// Stable method id, see [`method_id`].
    pub method_id: u64,
    /// Number of declared parameters.
    pub param_count: u32,
    /// Reserved method flags; kept zero.
    pub flags: u32,
    /// Comma-separated parameter-type names.
    pub param_types: String,
    /// Return-type name; empty for procedures.
    pub return_type: String,
    /// Instruction index of the first instruction of the method body.
    pub offset: u64,
}

impl MethodEntry {
    /// Whether the method returns a value.
    pub fn is_function(&self) -> bool {
        !self.return_type.is_empty()
    }
}

/// Per-field manifest record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldEntry {
    /// Field name; at most [`CLASS_NAME_MAX`] bytes.
    pub name: String,
    /// Nominal type id; the VM is untyped and ignores it.
    pub type_id: u32,
    /// Byte offset of the field within the instance, sequential in
    /// declaration order and advancing by 8.
    pub offset: u64,
}

/// A class with its methods and fields, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassDef {
    /// The class record.
    pub entry: ClassEntry,
    /// Methods in source order.
    pub methods: Vec<MethodEntry>,
    /// Fields in source order.
    pub fields: Vec<FieldEntry>,
}

/// The class manifest persisted in the CLASSES section, in
/// class-declaration order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassManifest {
    /// All classes of the module.
    pub classes: Vec<ClassDef>,
}

impl ClassManifest {
    /// Find a class by name.
    pub fn find_class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.entry.name == name)
    }

    /// Find a class by id.
    pub fn find_class_by_id(&self, id: u64) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.entry.class_id == id)
    }

    /// Find a method of a named class.
    pub fn method(&self, class: &str, method: &str) -> Option<&MethodEntry> {
        self.find_class(class)?
            .methods
            .iter()
            .find(|m| m.name == method)
    }

    /// Find any method with the given name, scanning classes in order.
    /// Used by the linker's conservative name-resolution check.
    pub fn any_method(&self, name: &str) -> Option<&MethodEntry> {
        self.classes
            .iter()
            .flat_map(|c| c.methods.iter())
            .find(|m| m.name == name)
    }

    /// Serialize the manifest: `class_count: u32`, all class records, then
    /// method records grouped in class order, then field records grouped in
    /// class order.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut seen = HashSet::new();
        for class in &self.classes {
            if !seen.insert(class.entry.class_id) {
                return Err(EncodeError::DuplicateClassId(class.entry.class_id));
            }
        }

        let mut buf = Vec::new();
        put_u32(&mut buf, self.classes.len() as u32);

        for class in &self.classes {
            put_fixed_str(&mut buf, &class.entry.name, NAME_FIELD)?;
            put_u64(&mut buf, class.entry.class_id);
            put_u64(&mut buf, class.entry.parent_class_id);
            put_u32(&mut buf, class.fields.len() as u32);
            put_u32(&mut buf, class.methods.len() as u32);
            put_u64(&mut buf, class.entry.instance_size);
            put_u32(&mut buf, class.entry.flags);
            put_u32(&mut buf, 0);
        }

        for class in &self.classes {
            for m in &class.methods {
                put_fixed_str(&mut buf, &m.name, NAME_FIELD)?;
                put_u64(&mut buf, m.method_id);
                put_u32(&mut buf, m.param_count);
                put_u32(&mut buf, m.flags);
                put_fixed_str(&mut buf, &m.param_types, PARAM_TYPES_FIELD)?;
                put_fixed_str(&mut buf, &m.return_type, RETURN_TYPE_FIELD)?;
                put_u64(&mut buf, m.offset);
            }
        }

        for class in &self.classes {
            for f in &class.fields {
                put_fixed_str(&mut buf, &f.name, NAME_FIELD)?;
                put_u32(&mut buf, f.type_id);
                put_u32(&mut buf, 0);
                put_u64(&mut buf, f.offset);
            }
        }

        Ok(buf)
    }

    /// Deserialize a manifest written by [`ClassManifest::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut r = ByteReader::new(bytes);
        let class_count = r.u32()? as usize;

        struct RawClass {
            entry: ClassEntry,
            field_count: usize,
            method_count: usize,
        }

        // Counts come from untrusted bytes; grow as records actually parse.
        let mut raw = Vec::new();
        for _ in 0..class_count {
            let name = r.fixed_str(NAME_FIELD)?;
            let class_id = r.u64()?;
            let parent_class_id = r.u64()?;
            let field_count = r.u32()? as usize;
            let method_count = r.u32()? as usize;
            let instance_size = r.u64()?;
            let flags = r.u32()?;
            let _reserved = r.u32()?;

            raw.push(RawClass {
                entry: ClassEntry {
                    name,
                    class_id,
                    parent_class_id,
                    instance_size,
                    flags,
                },
                field_count,
                method_count,
            });
        }

        let mut classes = Vec::with_capacity(raw.len());
        for rc in &raw {
            let mut methods = Vec::new();
            for _ in 0..rc.method_count {
                let name = r.fixed_str(NAME_FIELD)?;
                let method_id = r.u64()?;
                let param_count = r.u32()?;
                let flags = r.u32()?;
                let param_types = r.fixed_str(PARAM_TYPES_FIELD)?;
                let return_type = r.fixed_str(RETURN_TYPE_FIELD)?;
                let offset = r.u64()?;
                methods.push(MethodEntry {
                    name,
                    method_id,
                    param_count,
                    flags,
                    param_types,
                    return_type,
                    offset,
                });
            }
            classes.push(ClassDef {
                entry: rc.entry.clone(),
                methods,
                fields: Vec::new(),
            });
        }

        for (i, rc) in raw.iter().enumerate() {
            for _ in 0..rc.field_count {
                let name = r.fixed_str(NAME_FIELD)?;
                let type_id = r.u32()?;
                let _reserved = r.u32()?;
                let offset = r.u64()?;
                classes[i].fields.push(FieldEntry {
                    name,
                    type_id,
                    offset,
                });
            }
        }

        Ok(Self { classes })
    }
}
