//! Collision polyhedron fragments: `PolyhedronDef` (0x17) and its
//! instance wrapper `Polyhedron` (0x18).

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;

use super::{read_vec3, write_vec3};
use crate::error::Result;
use crate::raw::fragment::FragContext;

/// 0x17 — convex collision volume.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolyhedronDef {
    pub name_ref: i32,
    pub flags: u32,
    pub bounding_radius: f32,
    pub scale_factor: f32,
    pub vertices: Vec<Vec3>,
    /// Each face is a vertex index loop.
    pub faces: Vec<Vec<u32>>,
}

impl PolyhedronDef {
    pub const CODE: i32 = 0x17;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let bounding_radius = cur.read_f32::<LittleEndian>()?;
        let scale_factor = cur.read_f32::<LittleEndian>()?;
        let vertex_count = cur.read_u32::<LittleEndian>()? as usize;
        let face_count = cur.read_u32::<LittleEndian>()? as usize;
        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            vertices.push(read_vec3(cur)?);
        }
        let mut faces = Vec::with_capacity(face_count);
        for _ in 0..face_count {
            let count = cur.read_u32::<LittleEndian>()? as usize;
            let mut loop_indices = Vec::with_capacity(count);
            for _ in 0..count {
                loop_indices.push(cur.read_u32::<LittleEndian>()?);
            }
            faces.push(loop_indices);
        }
        Ok(Self { name_ref, flags, bounding_radius, scale_factor, vertices, faces })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(self.flags)?;
        out.write_f32::<LittleEndian>(self.bounding_radius)?;
        out.write_f32::<LittleEndian>(self.scale_factor)?;
        out.write_u32::<LittleEndian>(self.vertices.len() as u32)?;
        out.write_u32::<LittleEndian>(self.faces.len() as u32)?;
        for &v in &self.vertices {
            write_vec3(&mut out, v)?;
        }
        for face in &self.faces {
            out.write_u32::<LittleEndian>(face.len() as u32)?;
            for &i in face {
                out.write_u32::<LittleEndian>(i)?;
            }
        }
        Ok(out)
    }
}

/// 0x18 — instance wrapper around a `PolyhedronDef`. Folded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyhedron {
    pub name_ref: i32,
    pub def_ref: i32,
    pub flags: u32,
    pub scale_factor: f32,
}

impl Polyhedron {
    pub const CODE: i32 = 0x18;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        Ok(Self {
            name_ref: cur.read_i32::<LittleEndian>()?,
            def_ref: cur.read_i32::<LittleEndian>()?,
            flags: cur.read_u32::<LittleEndian>()?,
            scale_factor: cur.read_f32::<LittleEndian>()?,
        })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_i32::<LittleEndian>(self.def_ref)?;
        out.write_u32::<LittleEndian>(self.flags)?;
        out.write_f32::<LittleEndian>(self.scale_factor)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::fragment::WldVersion;

    #[test]
    fn test_polyhedron_def_codec() {
        let ctx = FragContext { version: WldVersion::Old };
        let def = PolyhedronDef {
            name_ref: -14,
            flags: 0,
            bounding_radius: 2.0,
            scale_factor: 1.0,
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            faces: vec![vec![0, 1, 2], vec![0, 2, 3, 1]],
        };
        let bytes = def.encode(&ctx).unwrap();
        assert_eq!(PolyhedronDef::decode(&bytes, &ctx).unwrap(), def);
    }
}
