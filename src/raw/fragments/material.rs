//! Material fragments: `MaterialDef` (0x30) and `MaterialPalette` (0x31).

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Result;
use crate::raw::fragment::FragContext;

/// 0x30 — surface material. References a `SimpleSprite` instance for its
/// texture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialDef {
    pub name_ref: i32,
    pub flags: u32,
    pub render_method: u32,
    pub rgb_pen: u32,
    pub brightness: f32,
    pub scaled_ambient: f32,
    /// Index of a `SimpleSprite` (0x05) fragment, 0 for untextured.
    pub sprite_ref: i32,
    /// Per-millisecond UV scroll, present when `flags & 0x02`.
    pub uv_shift: Option<[f32; 2]>,
}

impl MaterialDef {
    pub const CODE: i32 = 0x30;
    pub const UV_SHIFT_FLAG: u32 = 0x02;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let render_method = cur.read_u32::<LittleEndian>()?;
        let rgb_pen = cur.read_u32::<LittleEndian>()?;
        let brightness = cur.read_f32::<LittleEndian>()?;
        let scaled_ambient = cur.read_f32::<LittleEndian>()?;
        let sprite_ref = cur.read_i32::<LittleEndian>()?;
        let uv_shift = if flags & Self::UV_SHIFT_FLAG != 0 {
            Some([cur.read_f32::<LittleEndian>()?, cur.read_f32::<LittleEndian>()?])
        } else {
            None
        };
        Ok(Self {
            name_ref,
            flags,
            render_method,
            rgb_pen,
            brightness,
            scaled_ambient,
            sprite_ref,
            uv_shift,
        })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut flags = self.flags & !Self::UV_SHIFT_FLAG;
        if self.uv_shift.is_some() {
            flags |= Self::UV_SHIFT_FLAG;
        }
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(flags)?;
        out.write_u32::<LittleEndian>(self.render_method)?;
        out.write_u32::<LittleEndian>(self.rgb_pen)?;
        out.write_f32::<LittleEndian>(self.brightness)?;
        out.write_f32::<LittleEndian>(self.scaled_ambient)?;
        out.write_i32::<LittleEndian>(self.sprite_ref)?;
        if let Some([u, v]) = self.uv_shift {
            out.write_f32::<LittleEndian>(u)?;
            out.write_f32::<LittleEndian>(v)?;
        }
        Ok(out)
    }
}

/// 0x31 — ordered list of material fragment references shared by meshes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialPalette {
    pub name_ref: i32,
    pub flags: u32,
    pub material_refs: Vec<i32>,
}

impl MaterialPalette {
    pub const CODE: i32 = 0x31;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let count = cur.read_u32::<LittleEndian>()? as usize;
        let mut material_refs = Vec::with_capacity(count);
        for _ in 0..count {
            material_refs.push(cur.read_i32::<LittleEndian>()?);
        }
        Ok(Self { name_ref, flags, material_refs })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(self.flags)?;
        out.write_u32::<LittleEndian>(self.material_refs.len() as u32)?;
        for &r in &self.material_refs {
            out.write_i32::<LittleEndian>(r)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::fragment::WldVersion;

    #[test]
    fn test_material_def_codec() {
        let ctx = FragContext { version: WldVersion::New };
        let def = MaterialDef {
            name_ref: -12,
            flags: 0x01,
            render_method: 0x02,
            rgb_pen: 0x00FF00FF,
            brightness: 0.5,
            scaled_ambient: 0.75,
            sprite_ref: 3,
            uv_shift: Some([0.1, -0.2]),
        };
        let bytes = def.encode(&ctx).unwrap();
        let back = MaterialDef::decode(&bytes, &ctx).unwrap();
        // the uv-shift presence bit is recomputed on encode
        assert_eq!(back.flags & MaterialDef::UV_SHIFT_FLAG, MaterialDef::UV_SHIFT_FLAG);
        assert_eq!(back.uv_shift, def.uv_shift);
        assert_eq!(back.sprite_ref, 3);
    }

    #[test]
    fn test_palette_codec() {
        let ctx = FragContext { version: WldVersion::Old };
        let pal = MaterialPalette { name_ref: -4, flags: 0, material_refs: vec![1, 2, 5] };
        let bytes = pal.encode(&ctx).unwrap();
        assert_eq!(MaterialPalette::decode(&bytes, &ctx).unwrap(), pal);
    }
}
