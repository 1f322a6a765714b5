use crate::bytes::{put_u32, ByteReader};
use crate::LoadError;

use std::collections::HashMap;

/// Deduplicating string-literal pool with stable insertion-order ids.
///
/// The code generator interns literals at emit time; the container persists
/// the pool; the VM uses it only as the literal lookup behind `LIT`
/// instructions that carry a string id.
#[derive(Debug, Default, Clone)]
pub struct StringTable {
    index: HashMap<String, u32>,
    entries: Vec<String>,
}

impl StringTable {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its stable id. Equal byte sequences
    /// always receive the same id; distinct ones receive distinct ids.
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let id = self.entries.len() as u32;
        self.entries.push(s.to_string());
        self.index.insert(s.to_string(), id);
        id
    }

    /// Look up a string by id.
    pub fn get(&self, id: u32) -> Option<&str> {
        self.entries.get(id as usize).map(String::as_str)
    }

    /// Look up the id of an already-interned string.
    pub fn id_of(&self, s: &str) -> Option<u32> {
        self.index.get(s).copied()
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the strings in id order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Serialize as `count: u32`, then per string `len: u32` + UTF-8 bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        put_u32(&mut buf, self.entries.len() as u32);
        for s in &self.entries {
            put_u32(&mut buf, s.len() as u32);
            buf.extend_from_slice(s.as_bytes());
        }
        buf
    }

    /// Deserialize a pool; ids are re-assigned in stored order so they are
    /// identical to the writer's.
    pub fn decode(bytes: &[u8]) -> Result<Self, LoadError> {
        let mut r = ByteReader::new(bytes);
        let count = r.u32()?;

        let mut table = Self::new();
        for _ in 0..count {
            let len = r.u32()? as usize;
            let s = String::from_utf8(r.take(len)?.to_vec())?;
            table.intern(&s);
        }
        Ok(table)
    }
}

impl PartialEq for StringTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for StringTable {}
