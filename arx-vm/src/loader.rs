//! Module loading: hydrates VM tables from a `.arxmod` file. The loader
//! never executes anything.

use crate::registry::ClassRegistry;

use arx_asm::Instruction;
use arx_mod::{AppInfo, ArxmodReader, LoadError, ModuleHeader, StringTable};

use std::path::Path;

/// Everything the VM needs from a validated module file.
#[derive(Debug)]
pub struct ModuleImage {
    /// The validated header, entry point included.
    pub header: ModuleHeader,
    /// Decoded CODE section.
    pub instructions: Vec<Instruction>,
    /// Decoded STRINGS section.
    pub strings: StringTable,
    /// Class registry hydrated from the CLASSES section.
    pub registry: ClassRegistry,
    /// APP metadata, when present.
    pub app: Option<AppInfo>,
}

impl ModuleImage {
    /// Load every section of an already-validated reader. Fails atomically:
    /// either all tables hydrate or none do.
    pub fn load(reader: &ArxmodReader) -> Result<Self, LoadError> {
        let header = reader.header().clone();
        let instructions = reader.code()?;
        let strings = reader.strings()?;
        let manifest = reader.classes()?;
        let app = reader.app()?;

        tracing::debug!(
            instructions = instructions.len(),
            strings = strings.len(),
            classes = manifest.classes.len(),
            executable = header.is_executable(),
            "module image loaded"
        );

        Ok(Self {
            header,
            instructions,
            strings,
            registry: ClassRegistry::from_manifest(&manifest),
            app,
        })
    }

    /// Read, validate and load a module file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Self::load(&ArxmodReader::from_file(path)?)
    }

    /// Parse, validate and load a module image from memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, LoadError> {
        Self::load(&ArxmodReader::from_bytes(bytes)?)
    }

    /// Whether the module is a library (no entry point; nothing to run).
    pub fn is_library(&self) -> bool {
        self.header.is_library()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arx_asm::Operation;
    use arx_mod::{ArxmodWriter, ModuleFlags};

    #[test]
    fn load_hydrates_all_tables() {
        let mut w = ArxmodWriter::new();
        w.set_flags(ModuleFlags::EXECUTABLE)
            .set_entry_point(0)
            .set_app("demo", Vec::new());
        w.code(&[
            Instruction::lit(0),
            Instruction::opr(Operation::OutString),
            Instruction::opr(Operation::Ret),
        ])
        .unwrap();
        let mut strings = StringTable::new();
        strings.intern("hi");
        w.strings(&strings).unwrap();

        let image = ModuleImage::from_bytes(w.finalize().unwrap()).unwrap();
        assert_eq!(image.instructions.len(), 3);
        assert_eq!(image.strings.get(0), Some("hi"));
        assert!(image.registry.is_empty());
        assert_eq!(image.app.as_ref().map(|a| a.name.as_str()), Some("demo"));
        assert!(!image.is_library());
    }

    #[test]
    fn corrupt_files_never_produce_an_image() {
        assert!(ModuleImage::from_bytes(b"not a module".to_vec()).is_err());
    }
}
