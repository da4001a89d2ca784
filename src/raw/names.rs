//! The WLD name table: an XOR-obfuscated, NUL-separated string pool shared
//! by every fragment in one file.
//!
//! Fragments carry an `i32` name reference: `0` means unnamed, a negative
//! value is the byte offset of the tag within the de-obfuscated pool, and
//! the reserved offset [`DEFAULT_TAG_REF`] stands for the engine's
//! well-known default tag. Offsets are only stable within one decode or
//! encode pass.

use std::collections::HashMap;

/// Repeating XOR key applied to the name blob and to strings embedded in
/// fragment payloads.
pub const XOR_KEY: [u8; 8] = [0x95, 0x3A, 0xC5, 0x2A, 0x95, 0x7A, 0x95, 0x6A];

/// Reserved name reference for the engine default tag.
pub const DEFAULT_TAG_REF: i32 = -0x00FF_FFFF;

/// The tag the reserved reference stands for.
pub const DEFAULT_TAG: &str = "DEFAULT";

/// XOR a buffer against [`XOR_KEY`] in place. The transform is its own
/// inverse.
pub fn apply_key(data: &mut [u8]) {
    for (i, b) in data.iter_mut().enumerate() {
        *b ^= XOR_KEY[i % XOR_KEY.len()];
    }
}

/// Decoded name pool with offset lookup.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NameTable {
    blob: Vec<u8>,
    by_offset: HashMap<u32, String>,
}

impl NameTable {
    /// Decode an obfuscated name blob. Cannot fail: a zero-length blob
    /// yields an empty table, and non-UTF-8 runs decode lossily.
    pub fn decode(obfuscated: &[u8]) -> Self {
        let mut blob = obfuscated.to_vec();
        apply_key(&mut blob);
        Self::from_plain_blob(blob)
    }

    /// Build a table from an already de-obfuscated blob.
    pub fn from_plain_blob(blob: Vec<u8>) -> Self {
        let mut by_offset = HashMap::new();
        let mut start = 0usize;
        for (i, &b) in blob.iter().enumerate() {
            if b == 0 {
                let s = String::from_utf8_lossy(&blob[start..i]).into_owned();
                by_offset.insert(start as u32, s);
                start = i + 1;
            }
        }
        Self { blob, by_offset }
    }

    /// Look up a fragment name reference. Returns `None` for `0`, the
    /// default tag for the reserved reference, and `None` for offsets that
    /// do not land on a string boundary.
    pub fn name(&self, name_ref: i32) -> Option<&str> {
        if name_ref >= 0 {
            return None;
        }
        if name_ref == DEFAULT_TAG_REF {
            return Some(DEFAULT_TAG);
        }
        self.by_offset.get(&(-name_ref as u32)).map(String::as_str)
    }

    /// Size of the de-obfuscated blob in bytes.
    pub fn blob_len(&self) -> u32 {
        self.blob.len() as u32
    }

    /// Number of distinct names in the pool.
    pub fn len(&self) -> usize {
        self.by_offset.len()
    }

    /// Whether the pool holds no names.
    pub fn is_empty(&self) -> bool {
        self.by_offset.is_empty()
    }

    /// Re-obfuscated blob bytes, byte-identical to the decoded input.
    pub fn to_obfuscated_bytes(&self) -> Vec<u8> {
        let mut out = self.blob.clone();
        apply_key(&mut out);
        out
    }
}

/// Accumulates tags during one logical→raw emission pass and assigns each
/// distinct string exactly one offset. Owned by the encode context, never
/// shared across passes.
#[derive(Debug, Default)]
pub struct NameBuilder {
    blob: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl NameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a tag and return its name reference. Empty strings map to
    /// `0` (unnamed) and the default tag maps to its reserved reference.
    pub fn add(&mut self, name: &str) -> i32 {
        if name.is_empty() {
            return 0;
        }
        if name == DEFAULT_TAG {
            return DEFAULT_TAG_REF;
        }
        if let Some(&off) = self.offsets.get(name) {
            return -(off as i32);
        }
        let off = self.blob.len() as u32;
        self.blob.extend_from_slice(name.as_bytes());
        self.blob.push(0);
        self.offsets.insert(name.to_string(), off);
        -(off as i32)
    }

    /// Number of distinct interned names.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Finish the pass, producing the lookup table for the blob just built.
    pub fn into_table(self) -> NameTable {
        NameTable::from_plain_blob(self.blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_blob_decodes_to_empty_table() {
        let table = NameTable::decode(&[]);
        assert!(table.is_empty());
        assert_eq!(table.name(0), None);
    }

    #[test]
    fn test_builder_offsets_survive_decode() {
        let mut builder = NameBuilder::new();
        let a = builder.add("MYMESH_DMSPRITEDEF");
        let b = builder.add("MYPAL_MP");
        let a2 = builder.add("MYMESH_DMSPRITEDEF");
        assert_eq!(a, a2);
        assert_ne!(a, b);

        let table = builder.into_table();
        let redecoded = NameTable::decode(&table.to_obfuscated_bytes());
        assert_eq!(redecoded.name(a), Some("MYMESH_DMSPRITEDEF"));
        assert_eq!(redecoded.name(b), Some("MYPAL_MP"));
    }

    #[test]
    fn test_default_tag_uses_reserved_ref() {
        let mut builder = NameBuilder::new();
        assert_eq!(builder.add("DEFAULT"), DEFAULT_TAG_REF);
        assert_eq!(builder.add(""), 0);
        let table = builder.into_table();
        assert_eq!(table.name(DEFAULT_TAG_REF), Some("DEFAULT"));
    }

    #[test]
    fn test_xor_is_involutive() {
        let mut data = b"SOME_TAG\0OTHER\0".to_vec();
        let original = data.clone();
        apply_key(&mut data);
        assert_ne!(data, original);
        apply_key(&mut data);
        assert_eq!(data, original);
    }
}
