//! Class registry: the runtime view of the class manifest, driving method
//! dispatch and field-offset lookup.

use arx_mod::{ClassEntry, ClassManifest, FieldEntry, MethodEntry};

/// One hydrated class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredClass {
    /// The manifest class record.
    pub entry: ClassEntry,
    /// Methods in manifest order.
    pub methods: Vec<MethodEntry>,
    /// Fields in manifest order.
    pub fields: Vec<FieldEntry>,
}

/// All classes of the loaded module, in manifest order.
#[derive(Debug, Default, Clone)]
pub struct ClassRegistry {
    classes: Vec<RegisteredClass>,
}

impl ClassRegistry {
    /// Hydrate a registry from a decoded manifest.
    pub fn from_manifest(manifest: &ClassManifest) -> Self {
        let classes = manifest
            .classes
            .iter()
            .map(|c| RegisteredClass {
                entry: c.entry.clone(),
                methods: c.methods.clone(),
                fields: c.fields.clone(),
            })
            .collect();
        Self { classes }
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Registered classes in manifest order.
    pub fn classes(&self) -> &[RegisteredClass] {
        &self.classes
    }

    /// Class by id.
    pub fn class(&self, class_id: u64) -> Option<&RegisteredClass> {
        self.classes.iter().find(|c| c.entry.class_id == class_id)
    }

    /// Resolve a method by name against a class, walking the
    /// `parent_class_id` chain for inherited methods.
    pub fn resolve_method(&self, class_id: u64, name: &str) -> Option<&MethodEntry> {
        let mut current = class_id;
        // The chain cannot be longer than the class count unless it cycles.
        for _ in 0..=self.classes.len() {
            let class = self.class(current)?;
            if let Some(method) = class.methods.iter().find(|m| m.name == name) {
                return Some(method);
            }
            if class.entry.parent_class_id == 0 {
                return None;
            }
            current = class.entry.parent_class_id;
        }
        None
    }

    /// First method with the given name anywhere in the registry, in class
    /// order. Fallback for receivers with no object entry.
    pub fn any_method(&self, name: &str) -> Option<&MethodEntry> {
        self.classes
            .iter()
            .flat_map(|c| c.methods.iter())
            .find(|m| m.name == name)
    }

    /// Byte offset of a field, walking the parent chain.
    pub fn field_offset(&self, class_id: u64, name: &str) -> Option<u64> {
        let mut current = class_id;
        for _ in 0..=self.classes.len() {
            let class = self.class(current)?;
            if let Some(field) = class.fields.iter().find(|f| f.name == name) {
                return Some(field.offset);
            }
            if class.entry.parent_class_id == 0 {
                return None;
            }
            current = class.entry.parent_class_id;
        }
        None
    }

    /// Instance size of a class, in slots.
    pub fn instance_slots(&self, class_id: u64) -> Option<u64> {
        self.class(class_id)
            .map(|c| c.entry.instance_size / arx_mod::FIELD_SIZE)
    }
}
