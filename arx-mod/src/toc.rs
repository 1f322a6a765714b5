use crate::bytes::{put_u32, ByteReader};
use crate::{EncodeError, LoadError};

/// Size of a packed table-of-contents entry in bytes.
pub const TOC_ENTRY_SIZE: usize = 32;

const SECTION_NAME_LEN: usize = 16;

/// The sections a module file may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum SectionKind {
    /// Packed instruction stream.
    Code,
    /// Interned string-literal pool.
    Strings,
    /// Reserved symbol data; may be empty.
    Symbols,
    /// Reserved debug data; may be empty.
    Debug,
    /// Class/method/field manifest.
    Classes,
    /// Application name and payload.
    App,
}

impl SectionKind {
    /// Canonical on-disk section order.
    pub const ALL: [SectionKind; 6] = [
        SectionKind::Code,
        SectionKind::Strings,
        SectionKind::Symbols,
        SectionKind::Debug,
        SectionKind::Classes,
        SectionKind::App,
    ];

    /// Section name as stored in the TOC.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Code => "CODE",
            Self::Strings => "STRINGS",
            Self::Symbols => "SYMBOLS",
            Self::Debug => "DEBUG",
            Self::Classes => "CLASSES",
            Self::App => "APP",
        }
    }

    fn name_bytes(&self) -> [u8; SECTION_NAME_LEN] {
        let mut out = [0u8; SECTION_NAME_LEN];
        let name = self.name().as_bytes();
        out[..name.len()].copy_from_slice(name);
        out
    }

    fn from_name(name: &str) -> Result<Self, LoadError> {
        match name {
            "CODE" => Ok(Self::Code),
            "STRINGS" => Ok(Self::Strings),
            "SYMBOLS" => Ok(Self::Symbols),
            "DEBUG" => Ok(Self::Debug),
            "CLASSES" => Ok(Self::Classes),
            "APP" => Ok(Self::App),
            other => Err(LoadError::UnknownSection(other.to_string())),
        }
    }
}

/// One 32-byte table-of-contents entry: `name[16]`, offset, size, flags,
/// reserved, each a little-endian `u32`. Offsets are relative to the data
/// region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocEntry {
    /// Which section this entry describes.
    pub kind: SectionKind,
    /// Offset of the section payload within the data region.
    pub offset: u64,
    /// Unpadded payload size in bytes.
    pub size: u64,
    /// Per-section flags; unused, kept zero.
    pub flags: u32,
    /// Reserved; kept zero.
    pub reserved: u32,
}

impl TocEntry {
    /// Serialize to the fixed wire layout. Fails when the offset or size
    /// does not fit the 32-bit wire field.
    pub fn encode(&self) -> Result<[u8; TOC_ENTRY_SIZE], EncodeError> {
        let offset = u32::try_from(self.offset)
            .map_err(|_| EncodeError::SectionTooLarge(self.kind.name()))?;
        let size = u32::try_from(self.size)
            .map_err(|_| EncodeError::SectionTooLarge(self.kind.name()))?;

        let mut buf = Vec::with_capacity(TOC_ENTRY_SIZE);
        buf.extend_from_slice(&self.kind.name_bytes());
        put_u32(&mut buf, offset);
        put_u32(&mut buf, size);
        put_u32(&mut buf, self.flags);
        put_u32(&mut buf, self.reserved);

        let mut out = [0u8; TOC_ENTRY_SIZE];
        out.copy_from_slice(&buf);
        Ok(out)
    }

    /// Deserialize one entry; unknown section names reject the whole file.
    pub fn decode(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut r = ByteReader::new(bytes);
        let name = r.fixed_str(SECTION_NAME_LEN)?;
        Ok(Self {
            kind: SectionKind::from_name(&name)?,
            offset: u64::from(r.u32()?),
            size: u64::from(r.u32()?),
            flags: r.u32()?,
            reserved: r.u32()?,
        })
    }
}
