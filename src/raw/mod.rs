//! Raw WLD stream layer.
//!
//! [`WldRaw`] is a faithful, positional view of a WLD file: the envelope
//! header, the obfuscated name table and every fragment in stream order.
//! Cross-references at this layer are 1-based fragment indices; nothing
//! is resolved or folded yet. The logical graph in [`crate::world`] is
//! built on top of this.

pub mod fragment;
pub mod fragments;
pub mod names;

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use fragment::{FragContext, FragPayload, FragmentRegistry, WldVersion};
use names::NameTable;

/// First envelope word of every WLD file.
pub const WLD_MAGIC: u32 = 0x54503D02;

/// Stream type code written for skipped slots on re-encode. Real files
/// use 0x00 as filler; decoding it produces an empty slot silently.
const FILLER_CODE: i32 = 0x00;

/// A parsed WLD file at stream granularity.
///
/// Fragment identity is positional: `fragments[i]` is fragment `i + 1` in
/// reference terms. `None` slots are fragments whose type code had no
/// registered decoder (or filler); they keep their position so that every
/// surviving cross-reference stays valid.
#[derive(Debug, Clone, PartialEq)]
pub struct WldRaw {
    pub version: WldVersion,
    /// Preserved verbatim from the header, not interpreted here.
    pub region_count: u32,
    /// Preserved verbatim from the header, not interpreted here.
    pub max_object_bytes: u32,
    /// Preserved verbatim from the header, not interpreted here.
    pub string_count: u32,
    pub names: NameTable,
    pub fragments: Vec<Option<FragPayload>>,
}

impl WldRaw {
    /// Parse a WLD byte stream with the standard fragment registry.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with(data, &FragmentRegistry::standard())
    }

    /// Parse a WLD byte stream using a caller-supplied registry.
    pub fn from_bytes_with(data: &[u8], registry: &FragmentRegistry) -> Result<Self> {
        let cur = &mut Cursor::new(data);

        let magic = cur.read_u32::<LittleEndian>()?;
        if magic != WLD_MAGIC {
            return Err(Error::InvalidWldMagic(magic));
        }
        let version = WldVersion::from_word(cur.read_u32::<LittleEndian>()?)?;
        let fragment_count = cur.read_u32::<LittleEndian>()?;
        let region_count = cur.read_u32::<LittleEndian>()?;
        let max_object_bytes = cur.read_u32::<LittleEndian>()?;
        let name_hash_size = cur.read_u32::<LittleEndian>()? as usize;
        let string_count = cur.read_u32::<LittleEndian>()?;

        let mut blob = vec![0u8; name_hash_size];
        std::io::Read::read_exact(cur, &mut blob)?;
        let names = NameTable::decode(&blob);

        let ctx = FragContext { version };
        let mut fragments = Vec::with_capacity(fragment_count as usize);
        for index in 1..=fragment_count {
            let size = cur.read_u32::<LittleEndian>()? as usize;
            let code = cur.read_i32::<LittleEndian>()?;
            let start = cur.position() as usize;
            let end = start
                .checked_add(size)
                .filter(|&e| e <= data.len())
                .ok_or(Error::UnexpectedEof)?;
            let payload = &data[start..end];
            cur.set_position(end as u64);

            if code == FILLER_CODE {
                fragments.push(None);
                continue;
            }
            match registry.decode(code, payload, &ctx) {
                Ok(Some(frag)) => fragments.push(Some(frag)),
                Ok(None) => {
                    tracing::warn!(index, code = format_args!("{code:#04x}"), "skipping fragment with unknown type code");
                    fragments.push(None);
                }
                Err(err) => {
                    return Err(Error::FragmentDecode {
                        index,
                        code,
                        message: err.to_string(),
                    });
                }
            }
        }

        Ok(Self { version, region_count, max_object_bytes, string_count, names, fragments })
    }

    /// Serialize back to the wire format. Empty slots are written as
    /// zero-length filler fragments so positions are preserved.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let ctx = FragContext { version: self.version };
        let blob = self.names.to_obfuscated_bytes();

        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(WLD_MAGIC)?;
        out.write_u32::<LittleEndian>(self.version.as_word())?;
        out.write_u32::<LittleEndian>(self.fragments.len() as u32)?;
        out.write_u32::<LittleEndian>(self.region_count)?;
        out.write_u32::<LittleEndian>(self.max_object_bytes)?;
        out.write_u32::<LittleEndian>(blob.len() as u32)?;
        out.write_u32::<LittleEndian>(self.string_count)?;
        out.extend_from_slice(&blob);

        for slot in &self.fragments {
            match slot {
                Some(frag) => {
                    let payload = frag.encode(&ctx)?;
                    out.write_u32::<LittleEndian>(payload.len() as u32)?;
                    out.write_i32::<LittleEndian>(frag.code())?;
                    out.extend_from_slice(&payload);
                }
                None => {
                    out.write_u32::<LittleEndian>(0)?;
                    out.write_i32::<LittleEndian>(FILLER_CODE)?;
                }
            }
        }
        Ok(out)
    }

    /// Look up a fragment by 1-based stream index. `None` for index 0,
    /// out-of-range indices and skipped slots.
    pub fn fragment(&self, index: u32) -> Option<&FragPayload> {
        if index == 0 {
            return None;
        }
        self.fragments.get(index as usize - 1)?.as_ref()
    }

    /// Resolve a fragment's name reference against the name table.
    pub fn fragment_name(&self, frag: &FragPayload) -> Option<&str> {
        self.names.name(frag.name_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fragments::{MaterialDef, Sphere};
    use names::NameBuilder;
    use pretty_assertions::assert_eq;

    fn sample_raw() -> WldRaw {
        let mut names = NameBuilder::new();
        let mat_ref = names.add("MYMAT_MDF");
        let sphere_ref = names.add("MYSPHERE");
        WldRaw {
            version: WldVersion::New,
            region_count: 0,
            max_object_bytes: 0,
            string_count: 2,
            names: names.into_table(),
            fragments: vec![
                Some(FragPayload::MaterialDef(MaterialDef {
                    name_ref: mat_ref,
                    flags: 0,
                    render_method: 0x0000_0007,
                    rgb_pen: 0x00FF_00FF,
                    brightness: 0.0,
                    scaled_ambient: 0.75,
                    sprite_ref: 0,
                    uv_shift: None,
                })),
                None,
                Some(FragPayload::Sphere(Sphere { name_ref: sphere_ref, radius: 12.0 })),
            ],
        }
    }

    #[test]
    fn test_envelope_round_trip() {
        let raw = sample_raw();
        let bytes = raw.to_bytes().unwrap();
        let back = WldRaw::from_bytes(&bytes).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_bad_magic_is_fatal() {
        let raw = sample_raw();
        let mut bytes = raw.to_bytes().unwrap();
        bytes[0] = 0xFF;
        assert!(matches!(WldRaw::from_bytes(&bytes), Err(Error::InvalidWldMagic(_))));
    }

    #[test]
    fn test_bad_version_is_fatal() {
        let raw = sample_raw();
        let mut bytes = raw.to_bytes().unwrap();
        bytes[4..8].copy_from_slice(&0x1234_5678u32.to_le_bytes());
        assert!(matches!(WldRaw::from_bytes(&bytes), Err(Error::UnsupportedWldVersion(0x1234_5678))));
    }

    #[test]
    fn test_unknown_code_keeps_position() {
        let raw = sample_raw();
        let mut bytes = raw.to_bytes().unwrap();
        // Rewrite the Sphere fragment's type code to something unregistered.
        let ctx = FragContext { version: WldVersion::New };
        let mat_len = raw.fragments[0].as_ref().unwrap().encode(&ctx).unwrap().len();
        let header_len = 28 + raw.names.blob_len() as usize;
        let sphere_entry = header_len + 8 + mat_len + 8;
        bytes[sphere_entry + 4..sphere_entry + 8].copy_from_slice(&0x7Fi32.to_le_bytes());

        let back = WldRaw::from_bytes(&bytes).unwrap();
        assert_eq!(back.fragments.len(), 3);
        assert!(back.fragments[2].is_none());
        assert!(back.fragment(1).is_some());
        assert!(back.fragment(3).is_none());
    }

    #[test]
    fn test_truncated_payload_is_fatal() {
        let raw = sample_raw();
        let bytes = raw.to_bytes().unwrap();
        assert!(matches!(
            WldRaw::from_bytes(&bytes[..bytes.len() - 2]),
            Err(Error::UnexpectedEof | Error::Io(_))
        ));
    }

    #[test]
    fn test_fragment_name_lookup() {
        let raw = sample_raw();
        let mat = raw.fragment(1).unwrap();
        assert_eq!(raw.fragment_name(mat), Some("MYMAT_MDF"));
        assert!(raw.fragment(0).is_none());
        assert!(raw.fragment(2).is_none());
        assert!(raw.fragment(99).is_none());
    }
}
