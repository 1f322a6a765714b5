use crate::bytes::{align_up, pad_to_alignment};
use crate::{
    ClassManifest, EncodeError, ModuleFlags, ModuleHeader, SectionKind, StringTable,
    TocEntry, HEADER_SIZE, TOC_ENTRY_SIZE,
};

use arx_asm::Instruction;

use std::collections::HashMap;
use std::path::Path;

/// Builder for a `.arxmod` file.
///
/// Sections are staged in memory; [`finalize`](ArxmodWriter::finalize)
/// computes the aligned section placement, writes the table of contents and
/// rewrites the header in place. Sections that were never staged are
/// emitted empty so readers always see the full canonical section list.
#[derive(Debug, Default)]
pub struct ArxmodWriter {
    flags: ModuleFlags,
    entry_point: u64,
    app_name: String,
    app_data: Vec<u8>,
    sections: HashMap<SectionKind, Vec<u8>>,
}

impl ArxmodWriter {
    /// Start a new module; the kind defaults to LIBRARY until
    /// [`set_flags`](ArxmodWriter::set_flags) marks it executable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the module kind flags.
    pub fn set_flags(&mut self, flags: ModuleFlags) -> &mut Self {
        self.flags = flags;
        self
    }

    /// Record the entry-point instruction index (zero for libraries).
    pub fn set_entry_point(&mut self, entry_point: u64) -> &mut Self {
        self.entry_point = entry_point;
        self
    }

    /// Stage the application name and optional payload for the APP section.
    pub fn set_app(&mut self, name: &str, payload: Vec<u8>) -> &mut Self {
        self.app_name = name.to_string();
        self.app_data = payload;
        self
    }

    /// Stage a raw section payload.
    pub fn add_section(
        &mut self,
        kind: SectionKind,
        bytes: Vec<u8>,
    ) -> Result<&mut Self, EncodeError> {
        if self.sections.contains_key(&kind) {
            return Err(EncodeError::DuplicateSection(kind.name()));
        }
        self.sections.insert(kind, bytes);
        Ok(self)
    }

    /// Stage the CODE section from an instruction stream.
    pub fn code(&mut self, instructions: &[Instruction]) -> Result<&mut Self, EncodeError> {
        let bytes: Vec<u8> = instructions.iter().copied().collect();
        self.add_section(SectionKind::Code, bytes)
    }

    /// Stage the STRINGS section from an interning pool.
    pub fn strings(&mut self, table: &StringTable) -> Result<&mut Self, EncodeError> {
        self.add_section(SectionKind::Strings, table.encode())
    }

    /// Stage the CLASSES section from a manifest.
    pub fn classes(&mut self, manifest: &ClassManifest) -> Result<&mut Self, EncodeError> {
        let bytes = manifest.encode()?;
        self.add_section(SectionKind::Classes, bytes)
    }

    /// Assemble the finished module image.
    pub fn finalize(mut self) -> Result<Vec<u8>, EncodeError> {
        if !self.app_name.is_empty() || !self.app_data.is_empty() {
            let mut app = Vec::with_capacity(self.app_name.len() + self.app_data.len());
            app.extend_from_slice(self.app_name.as_bytes());
            app.extend_from_slice(&self.app_data);
            if self.sections.contains_key(&SectionKind::App) {
                return Err(EncodeError::DuplicateSection(SectionKind::App.name()));
            }
            self.sections.insert(SectionKind::App, app);
        }

        let toc_offset = HEADER_SIZE;
        let toc_size = SectionKind::ALL.len() * TOC_ENTRY_SIZE;
        let data_offset = align_up(toc_offset + toc_size);

        let mut toc = Vec::with_capacity(SectionKind::ALL.len());
        let mut data = Vec::new();
        for kind in SectionKind::ALL {
            let payload = self.sections.remove(&kind).unwrap_or_default();
            toc.push(TocEntry {
                kind,
                offset: data.len() as u64,
                size: payload.len() as u64,
                flags: 0,
                reserved: 0,
            });
            data.extend_from_slice(&payload);
            pad_to_alignment(&mut data);
        }

        let header = ModuleHeader {
            flags: self.flags,
            toc_offset: toc_offset as u64,
            toc_size: toc_size as u64,
            data_offset: data_offset as u64,
            data_size: data.len() as u64,
            app_name_len: self.app_name.len() as u64,
            app_data_size: self.app_data.len() as u64,
            entry_point: self.entry_point,
        };

        let mut out = Vec::with_capacity(data_offset + data.len());
        out.extend_from_slice(&header.encode());
        for entry in &toc {
            out.extend_from_slice(&entry.encode()?);
        }
        out.resize(data_offset, 0);
        out.extend_from_slice(&data);

        tracing::debug!(
            sections = toc.len(),
            data_size = header.data_size,
            entry_point = header.entry_point,
            "finalized module image"
        );

        Ok(out)
    }

    /// Finalize and write the module to disk.
    pub fn write_to_file<P: AsRef<Path>>(self, path: P) -> Result<(), EncodeError> {
        let bytes = self.finalize()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArxmodReader;
    use arx_asm::Operation;

    #[test]
    fn empty_module_has_all_sections() {
        let bytes = ArxmodWriter::new().finalize().unwrap();
        let reader = ArxmodReader::from_bytes(bytes).unwrap();

        assert_eq!(reader.toc().len(), SectionKind::ALL.len());
        for entry in reader.toc() {
            assert_eq!(entry.size, 0);
        }
        assert!(reader.header().is_library());
    }

    #[test]
    fn section_offsets_are_aligned() {
        let mut w = ArxmodWriter::new();
        w.code(&[Instruction::lit(0), Instruction::opr(Operation::OutString)])
            .unwrap();
        let bytes = w.finalize().unwrap();
        let reader = ArxmodReader::from_bytes(bytes).unwrap();

        assert_eq!(reader.header().data_offset % 16, 0);
        for entry in reader.toc() {
            assert_eq!(entry.offset % 16, 0);
        }
    }

    #[test]
    fn data_size_is_sum_of_aligned_sections() {
        let mut w = ArxmodWriter::new();
        w.code(&[Instruction::halt()]).unwrap();
        let mut strings = StringTable::new();
        strings.intern("Hello, World");
        w.strings(&strings).unwrap();

        let bytes = w.finalize().unwrap();
        let reader = ArxmodReader::from_bytes(bytes).unwrap();

        let total: u64 = reader
            .toc()
            .iter()
            .map(|e| align_up(e.size as usize) as u64)
            .sum();
        assert_eq!(reader.header().data_size, total);
    }

    #[test]
    fn duplicate_section_is_rejected() {
        let mut w = ArxmodWriter::new();
        w.code(&[]).unwrap();
        assert!(matches!(
            w.code(&[]),
            Err(EncodeError::DuplicateSection("CODE"))
        ));
    }
}
