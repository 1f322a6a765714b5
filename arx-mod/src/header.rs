use crate::bytes::{put_u32, put_u64, ByteReader};
use crate::LoadError;

/// Magic bytes at offset zero of every module file.
pub const MAGIC: [u8; 8] = *b"ARXMOD\0\0";

/// The only container format version this crate reads and writes.
pub const VERSION: u32 = 1;

/// Fixed size of the packed module header in bytes.
pub const HEADER_SIZE: usize = 80;

bitflags::bitflags! {
    /// Module kind flags. Exactly one of `LIBRARY` and `EXECUTABLE` is set
    /// on a well-formed module.
    pub struct ModuleFlags: u32 {
        /// The module has no entry point and only contributes classes.
        const LIBRARY = 0x01;
        /// The module has an `App.Main` entry point.
        const EXECUTABLE = 0x02;
    }
}

impl Default for ModuleFlags {
    fn default() -> Self {
        Self::LIBRARY
    }
}

/// The packed 80-byte module header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHeader {
    /// Module kind flags.
    pub flags: ModuleFlags,
    /// Absolute offset of the table of contents.
    pub toc_offset: u64,
    /// Size of the table of contents in bytes.
    pub toc_size: u64,
    /// Absolute offset of the data region.
    pub data_offset: u64,
    /// Size of the data region: the sum of the aligned section sizes.
    pub data_size: u64,
    /// Length of the application name stored in the APP section.
    pub app_name_len: u64,
    /// Size of the application payload stored after the name.
    pub app_data_size: u64,
    /// Instruction index of `App.Main`; zero for libraries.
    pub entry_point: u64,
}

impl ModuleHeader {
    /// Serialize to the fixed wire layout.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        buf.extend_from_slice(&MAGIC);
        put_u32(&mut buf, VERSION);
        put_u32(&mut buf, self.flags.bits());
        put_u64(&mut buf, HEADER_SIZE as u64);
        put_u64(&mut buf, self.toc_offset);
        put_u64(&mut buf, self.toc_size);
        put_u64(&mut buf, self.data_offset);
        put_u64(&mut buf, self.data_size);
        put_u64(&mut buf, self.app_name_len);
        put_u64(&mut buf, self.app_data_size);
        put_u64(&mut buf, self.entry_point);

        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    /// Deserialize and validate magic, version and header size. Nothing
    /// after the header is trusted until these pass.
    pub fn decode(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut r = ByteReader::new(bytes);

        let magic: [u8; 8] = r.array()?;
        if magic != MAGIC {
            return Err(LoadError::BadMagic);
        }

        let version = r.u32()?;
        if version != VERSION {
            return Err(LoadError::UnsupportedVersion(version));
        }

        let raw_flags = r.u32()?;
        let header_size = r.u64()?;
        if header_size != HEADER_SIZE as u64 {
            return Err(LoadError::BadHeaderSize(header_size));
        }

        let flags =
            ModuleFlags::from_bits(raw_flags).ok_or(LoadError::BadFlags(raw_flags))?;

        Ok(Self {
            flags,
            toc_offset: r.u64()?,
            toc_size: r.u64()?,
            data_offset: r.u64()?,
            data_size: r.u64()?,
            app_name_len: r.u64()?,
            app_data_size: r.u64()?,
            entry_point: r.u64()?,
        })
    }

    /// Check the LIBRARY/EXECUTABLE invariant: exactly one of the two.
    pub fn validate_flags(&self) -> Result<(), LoadError> {
        let lib = self.flags.contains(ModuleFlags::LIBRARY);
        let exe = self.flags.contains(ModuleFlags::EXECUTABLE);
        if lib == exe {
            return Err(LoadError::BadFlags(self.flags.bits()));
        }
        Ok(())
    }

    /// Whether the module carries an entry point.
    pub fn is_executable(&self) -> bool {
        self.flags.contains(ModuleFlags::EXECUTABLE)
    }

    /// Whether the module is a library.
    pub fn is_library(&self) -> bool {
        self.flags.contains(ModuleFlags::LIBRARY)
    }
}
