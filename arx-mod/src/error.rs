use std::io;

/// A module file was rejected while reading. Loads fail atomically: no
/// partial state survives any of these.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The first eight bytes are not the `ARXMOD` magic.
    #[error("bad magic bytes in module header")]
    BadMagic,

    /// The format version is not supported by this reader.
    #[error("unsupported module version {0}")]
    UnsupportedVersion(u32),

    /// The header declares a size other than the fixed 80 bytes.
    #[error("unexpected header size {0}")]
    BadHeaderSize(u64),

    /// The header flags are not a valid LIBRARY/EXECUTABLE combination.
    #[error("invalid module flags {0:#x}: exactly one of LIBRARY and EXECUTABLE must be set")]
    BadFlags(u32),

    /// The file ended before a structure could be read completely.
    #[error("file truncated: needed {needed} more bytes at offset {offset}")]
    Truncated {
        /// Byte offset at which the read started.
        offset: usize,
        /// Bytes still required by the structure.
        needed: usize,
    },

    /// A TOC entry names a section this reader does not know.
    #[error("unknown section name {0:?}")]
    UnknownSection(String),

    /// A TOC entry points outside the data region.
    #[error("section {name} out of bounds: offset {offset}, size {size}")]
    SectionBounds {
        /// Section name from the TOC entry.
        name: &'static str,
        /// Offset relative to the data region.
        offset: u64,
        /// Declared size in bytes.
        size: u64,
    },

    /// A section is present but its contents do not parse.
    #[error("malformed {0} section")]
    MalformedSection(&'static str),

    /// String data in the container is not valid UTF-8.
    #[error("string data is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The underlying file could not be read.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A module could not be serialized.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// A manifest name exceeds its fixed-width field.
    #[error("name `{name}` exceeds the {max}-byte limit")]
    NameTooLong {
        /// The offending name.
        name: String,
        /// Maximum byte length for this field.
        max: usize,
    },

    /// The same section was added twice.
    #[error("duplicate {0} section")]
    DuplicateSection(&'static str),

    /// Two classes in the manifest hash to the same class id.
    #[error("duplicate class id {0:#018x} in manifest")]
    DuplicateClassId(u64),

    /// A section payload does not fit the 32-bit TOC offset/size fields.
    #[error("{0} section exceeds the 32-bit TOC size field")]
    SectionTooLarge(&'static str),

    /// The finished module could not be written out.
    #[error(transparent)]
    Io(#[from] io::Error),
}
