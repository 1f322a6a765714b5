use crate::{
    ClassManifest, LoadError, ModuleHeader, SectionKind, StringTable, TocEntry,
    TOC_ENTRY_SIZE,
};

use arx_asm::Instruction;

use std::path::Path;

/// Application metadata from the APP section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    /// Application name.
    pub name: String,
    /// Opaque payload following the name.
    pub payload: Vec<u8>,
}

/// Validating reader over a `.arxmod` image.
///
/// Construction validates the header (magic, version, header size), the
/// flags, and every TOC entry against the data region before any section is
/// handed out; a failure rejects the whole file.
#[derive(Debug)]
pub struct ArxmodReader {
    header: ModuleHeader,
    toc: Vec<TocEntry>,
    bytes: Vec<u8>,
}

impl ArxmodReader {
    /// Parse and validate a module image.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, LoadError> {
        let header = ModuleHeader::decode(&bytes)?;
        header.validate_flags()?;

        let toc_start = header.toc_offset as usize;
        let toc_len = header.toc_size as usize;
        let toc_end = toc_start.saturating_add(toc_len);
        let toc_bytes = bytes.get(toc_start..toc_end).ok_or(LoadError::Truncated {
            offset: toc_start,
            needed: toc_len,
        })?;

        let mut toc = Vec::with_capacity(toc_len / TOC_ENTRY_SIZE);
        for chunk in toc_bytes.chunks_exact(TOC_ENTRY_SIZE) {
            toc.push(TocEntry::decode(chunk)?);
        }

        let data_start = header.data_offset as usize;
        let data_end = data_start.saturating_add(header.data_size as usize);
        if bytes.len() < data_end {
            return Err(LoadError::Truncated {
                offset: bytes.len(),
                needed: data_end - bytes.len(),
            });
        }

        for entry in &toc {
            let end = entry.offset.saturating_add(entry.size);
            if end > header.data_size {
                return Err(LoadError::SectionBounds {
                    name: entry.kind.name(),
                    offset: entry.offset,
                    size: entry.size,
                });
            }
        }

        tracing::debug!(
            sections = toc.len(),
            data_size = header.data_size,
            "module image validated"
        );

        Ok(Self { header, toc, bytes })
    }

    /// Read and validate a module file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// The validated module header.
    pub fn header(&self) -> &ModuleHeader {
        &self.header
    }

    /// The validated table of contents.
    pub fn toc(&self) -> &[TocEntry] {
        &self.toc
    }

    /// Raw payload of a section, when present.
    pub fn section(&self, kind: SectionKind) -> Option<&[u8]> {
        let entry = self.toc.iter().find(|e| e.kind == kind)?;
        let start = self.header.data_offset as usize + entry.offset as usize;
        let end = start + entry.size as usize;
        // Bounds were validated at construction.
        self.bytes.get(start..end)
    }

    /// Decode the CODE section into an instruction vector.
    pub fn code(&self) -> Result<Vec<Instruction>, LoadError> {
        let bytes = self.section(SectionKind::Code).unwrap_or_default();
        if bytes.len() % Instruction::LEN != 0 {
            return Err(LoadError::MalformedSection(SectionKind::Code.name()));
        }
        Ok(Instruction::from_bytes_iter(bytes.iter().copied()))
    }

    /// Decode the STRINGS section; an absent or empty section yields an
    /// empty pool.
    pub fn strings(&self) -> Result<StringTable, LoadError> {
        match self.section(SectionKind::Strings) {
            None | Some([]) => Ok(StringTable::new()),
            Some(bytes) => StringTable::decode(bytes),
        }
    }

    /// Decode the CLASSES section; an absent or empty section yields an
    /// empty manifest.
    pub fn classes(&self) -> Result<ClassManifest, LoadError> {
        match self.section(SectionKind::Classes) {
            None | Some([]) => Ok(ClassManifest::default()),
            Some(bytes) => ClassManifest::decode(bytes),
        }
    }

    /// Decode the APP section using the name length recorded in the header.
    pub fn app(&self) -> Result<Option<AppInfo>, LoadError> {
        let bytes = match self.section(SectionKind::App) {
            None | Some([]) => return Ok(None),
            Some(bytes) => bytes,
        };

        let name_len = self.header.app_name_len as usize;
        if bytes.len() < name_len {
            return Err(LoadError::MalformedSection(SectionKind::App.name()));
        }
        let name = String::from_utf8(bytes[..name_len].to_vec())?;
        let payload = bytes[name_len..].to_vec();
        Ok(Some(AppInfo { name, payload }))
    }
}
