//! Mesh fragments: `DmSpriteDef2` (0x36), its instance wrapper `DmSprite`
//! (0x2D), and per-vertex color animation tracks (0x32/0x33).
//!
//! Mesh geometry is quantized: vertices are `i16` triples and UVs are
//! `i16`/`i32` pairs (old/new sub-format) scaled by `1 / 2^fp_scale`,
//! normals are `i8` triples scaled by 127, colors are packed RGBA words.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;

use super::{read_vec3, write_vec3};
use crate::error::Result;
use crate::raw::fragment::{FragContext, WldVersion};

/// One triangle with its face flags (0x10 marks passable geometry).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Face {
    pub flags: u16,
    pub indices: [u16; 3],
}

/// Mesh post-processing operation entry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeshOp {
    pub vertex_a: u16,
    pub vertex_b: u16,
    pub offset: f32,
    pub param: u8,
    pub op_code: u8,
}

/// 0x36 — the primary mesh definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DmSpriteDef2 {
    pub name_ref: i32,
    pub flags: u32,
    /// Index of a `MaterialPalette` (0x31) fragment.
    pub material_palette_ref: i32,
    /// Vertex animation reference, carried verbatim.
    pub dm_track_ref: i32,
    pub center_offset: Vec3,
    pub params2: [u32; 3],
    pub max_distance: f32,
    pub min: Vec3,
    pub max: Vec3,
    /// Fixed-point exponent for vertices and UVs.
    pub fp_scale: u16,
    pub vertices: Vec<[i16; 3]>,
    pub uvs: Vec<[i32; 2]>,
    pub normals: Vec<[i8; 3]>,
    pub colors: Vec<u32>,
    pub faces: Vec<Face>,
    /// `(bone, vertex_count)` runs assigning vertices to skeleton bones.
    pub skin_groups: Vec<(u16, u16)>,
    /// `(face_count, palette_slot)` runs.
    pub face_material_groups: Vec<(u16, u16)>,
    /// `(vertex_count, palette_slot)` runs.
    pub vertex_material_groups: Vec<(u16, u16)>,
    pub meshops: Vec<MeshOp>,
}

impl DmSpriteDef2 {
    pub const CODE: i32 = 0x36;

    pub fn decode(data: &[u8], ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let material_palette_ref = cur.read_i32::<LittleEndian>()?;
        let dm_track_ref = cur.read_i32::<LittleEndian>()?;
        let center_offset = read_vec3(cur)?;
        let params2 = [
            cur.read_u32::<LittleEndian>()?,
            cur.read_u32::<LittleEndian>()?,
            cur.read_u32::<LittleEndian>()?,
        ];
        let max_distance = cur.read_f32::<LittleEndian>()?;
        let min = read_vec3(cur)?;
        let max = read_vec3(cur)?;
        let vertex_count = cur.read_u16::<LittleEndian>()? as usize;
        let uv_count = cur.read_u16::<LittleEndian>()? as usize;
        let normal_count = cur.read_u16::<LittleEndian>()? as usize;
        let color_count = cur.read_u16::<LittleEndian>()? as usize;
        let face_count = cur.read_u16::<LittleEndian>()? as usize;
        let skin_group_count = cur.read_u16::<LittleEndian>()? as usize;
        let face_mat_count = cur.read_u16::<LittleEndian>()? as usize;
        let vert_mat_count = cur.read_u16::<LittleEndian>()? as usize;
        let meshop_count = cur.read_u16::<LittleEndian>()? as usize;
        let fp_scale = cur.read_u16::<LittleEndian>()?;

        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            vertices.push([
                cur.read_i16::<LittleEndian>()?,
                cur.read_i16::<LittleEndian>()?,
                cur.read_i16::<LittleEndian>()?,
            ]);
        }
        let mut uvs = Vec::with_capacity(uv_count);
        for _ in 0..uv_count {
            let uv = match ctx.version {
                WldVersion::Old => [
                    i32::from(cur.read_i16::<LittleEndian>()?),
                    i32::from(cur.read_i16::<LittleEndian>()?),
                ],
                WldVersion::New => {
                    [cur.read_i32::<LittleEndian>()?, cur.read_i32::<LittleEndian>()?]
                }
            };
            uvs.push(uv);
        }
        let mut normals = Vec::with_capacity(normal_count);
        for _ in 0..normal_count {
            normals.push([cur.read_i8()?, cur.read_i8()?, cur.read_i8()?]);
        }
        let mut colors = Vec::with_capacity(color_count);
        for _ in 0..color_count {
            colors.push(cur.read_u32::<LittleEndian>()?);
        }
        let mut faces = Vec::with_capacity(face_count);
        for _ in 0..face_count {
            faces.push(Face {
                flags: cur.read_u16::<LittleEndian>()?,
                indices: [
                    cur.read_u16::<LittleEndian>()?,
                    cur.read_u16::<LittleEndian>()?,
                    cur.read_u16::<LittleEndian>()?,
                ],
            });
        }
        let mut skin_groups = Vec::with_capacity(skin_group_count);
        for _ in 0..skin_group_count {
            skin_groups.push((cur.read_u16::<LittleEndian>()?, cur.read_u16::<LittleEndian>()?));
        }
        let mut face_material_groups = Vec::with_capacity(face_mat_count);
        for _ in 0..face_mat_count {
            face_material_groups
                .push((cur.read_u16::<LittleEndian>()?, cur.read_u16::<LittleEndian>()?));
        }
        let mut vertex_material_groups = Vec::with_capacity(vert_mat_count);
        for _ in 0..vert_mat_count {
            vertex_material_groups
                .push((cur.read_u16::<LittleEndian>()?, cur.read_u16::<LittleEndian>()?));
        }
        let mut meshops = Vec::with_capacity(meshop_count);
        for _ in 0..meshop_count {
            meshops.push(MeshOp {
                vertex_a: cur.read_u16::<LittleEndian>()?,
                vertex_b: cur.read_u16::<LittleEndian>()?,
                offset: cur.read_f32::<LittleEndian>()?,
                param: cur.read_u8()?,
                op_code: cur.read_u8()?,
            });
        }

        Ok(Self {
            name_ref,
            flags,
            material_palette_ref,
            dm_track_ref,
            center_offset,
            params2,
            max_distance,
            min,
            max,
            fp_scale,
            vertices,
            uvs,
            normals,
            colors,
            faces,
            skin_groups,
            face_material_groups,
            vertex_material_groups,
            meshops,
        })
    }

    pub fn encode(&self, ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(self.flags)?;
        out.write_i32::<LittleEndian>(self.material_palette_ref)?;
        out.write_i32::<LittleEndian>(self.dm_track_ref)?;
        write_vec3(&mut out, self.center_offset)?;
        for p in self.params2 {
            out.write_u32::<LittleEndian>(p)?;
        }
        out.write_f32::<LittleEndian>(self.max_distance)?;
        write_vec3(&mut out, self.min)?;
        write_vec3(&mut out, self.max)?;
        out.write_u16::<LittleEndian>(self.vertices.len() as u16)?;
        out.write_u16::<LittleEndian>(self.uvs.len() as u16)?;
        out.write_u16::<LittleEndian>(self.normals.len() as u16)?;
        out.write_u16::<LittleEndian>(self.colors.len() as u16)?;
        out.write_u16::<LittleEndian>(self.faces.len() as u16)?;
        out.write_u16::<LittleEndian>(self.skin_groups.len() as u16)?;
        out.write_u16::<LittleEndian>(self.face_material_groups.len() as u16)?;
        out.write_u16::<LittleEndian>(self.vertex_material_groups.len() as u16)?;
        out.write_u16::<LittleEndian>(self.meshops.len() as u16)?;
        out.write_u16::<LittleEndian>(self.fp_scale)?;
        for v in &self.vertices {
            for &c in v {
                out.write_i16::<LittleEndian>(c)?;
            }
        }
        for uv in &self.uvs {
            match ctx.version {
                WldVersion::Old => {
                    out.write_i16::<LittleEndian>(uv[0] as i16)?;
                    out.write_i16::<LittleEndian>(uv[1] as i16)?;
                }
                WldVersion::New => {
                    out.write_i32::<LittleEndian>(uv[0])?;
                    out.write_i32::<LittleEndian>(uv[1])?;
                }
            }
        }
        for n in &self.normals {
            for &c in n {
                out.write_i8(c)?;
            }
        }
        for &c in &self.colors {
            out.write_u32::<LittleEndian>(c)?;
        }
        for f in &self.faces {
            out.write_u16::<LittleEndian>(f.flags)?;
            for &i in &f.indices {
                out.write_u16::<LittleEndian>(i)?;
            }
        }
        for &(a, b) in &self.skin_groups {
            out.write_u16::<LittleEndian>(a)?;
            out.write_u16::<LittleEndian>(b)?;
        }
        for &(a, b) in &self.face_material_groups {
            out.write_u16::<LittleEndian>(a)?;
            out.write_u16::<LittleEndian>(b)?;
        }
        for &(a, b) in &self.vertex_material_groups {
            out.write_u16::<LittleEndian>(a)?;
            out.write_u16::<LittleEndian>(b)?;
        }
        for op in &self.meshops {
            out.write_u16::<LittleEndian>(op.vertex_a)?;
            out.write_u16::<LittleEndian>(op.vertex_b)?;
            out.write_f32::<LittleEndian>(op.offset)?;
            out.write_u8(op.param)?;
            out.write_u8(op.op_code)?;
        }
        Ok(out)
    }
}

/// 0x2D — instance wrapper around a mesh definition. Folded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DmSprite {
    pub name_ref: i32,
    pub def_ref: i32,
    pub params: u32,
}

impl DmSprite {
    pub const CODE: i32 = 0x2D;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        Ok(Self {
            name_ref: cur.read_i32::<LittleEndian>()?,
            def_ref: cur.read_i32::<LittleEndian>()?,
            params: cur.read_u32::<LittleEndian>()?,
        })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_i32::<LittleEndian>(self.def_ref)?;
        out.write_u32::<LittleEndian>(self.params)?;
        Ok(out)
    }
}

/// 0x32 — per-vertex RGBA animation frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DmRgbTrackDef {
    pub name_ref: i32,
    pub flags: u32,
    pub sleep: u32,
    /// `frames[frame][vertex]`, packed RGBA.
    pub frames: Vec<Vec<u32>>,
}

impl DmRgbTrackDef {
    pub const CODE: i32 = 0x32;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let frame_count = cur.read_u32::<LittleEndian>()? as usize;
        let sleep = cur.read_u32::<LittleEndian>()?;
        let vertex_count = cur.read_u32::<LittleEndian>()? as usize;
        let mut frames = Vec::with_capacity(frame_count);
        for _ in 0..frame_count {
            let mut colors = Vec::with_capacity(vertex_count);
            for _ in 0..vertex_count {
                colors.push(cur.read_u32::<LittleEndian>()?);
            }
            frames.push(colors);
        }
        Ok(Self { name_ref, flags, sleep, frames })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let vertex_count = self.frames.first().map_or(0, Vec::len);
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(self.flags)?;
        out.write_u32::<LittleEndian>(self.frames.len() as u32)?;
        out.write_u32::<LittleEndian>(self.sleep)?;
        out.write_u32::<LittleEndian>(vertex_count as u32)?;
        for frame in &self.frames {
            for &c in frame {
                out.write_u32::<LittleEndian>(c)?;
            }
        }
        Ok(out)
    }
}

/// 0x33 — instance wrapper around a `DmRgbTrackDef`. Folded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DmRgbTrack {
    pub name_ref: i32,
    pub def_ref: i32,
    pub flags: u32,
}

impl DmRgbTrack {
    pub const CODE: i32 = 0x33;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        Ok(Self {
            name_ref: cur.read_i32::<LittleEndian>()?,
            def_ref: cur.read_i32::<LittleEndian>()?,
            flags: cur.read_u32::<LittleEndian>()?,
        })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_i32::<LittleEndian>(self.def_ref)?;
        out.write_u32::<LittleEndian>(self.flags)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mesh() -> DmSpriteDef2 {
        DmSpriteDef2 {
            name_ref: -30,
            flags: 0x00018003,
            material_palette_ref: 2,
            center_offset: Vec3::new(0.0, 0.0, 5.0),
            max_distance: 300.0,
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
            fp_scale: 6,
            vertices: vec![[64, -128, 32], [0, 0, 0]],
            uvs: vec![[256, 256], [0, 0]],
            normals: vec![[0, 0, 127], [0, 127, 0]],
            colors: vec![0xFFFFFFFF, 0x80808080],
            faces: vec![Face { flags: 0x10, indices: [0, 1, 0] }],
            face_material_groups: vec![(1, 0)],
            vertex_material_groups: vec![(2, 0)],
            meshops: vec![MeshOp { vertex_a: 0, vertex_b: 1, offset: 0.5, param: 1, op_code: 4 }],
            ..DmSpriteDef2::default()
        }
    }

    #[test]
    fn test_mesh_codec_new_format() {
        let ctx = FragContext { version: WldVersion::New };
        let mesh = sample_mesh();
        let bytes = mesh.encode(&ctx).unwrap();
        assert_eq!(DmSpriteDef2::decode(&bytes, &ctx).unwrap(), mesh);
    }

    #[test]
    fn test_mesh_codec_old_format_narrows_uvs() {
        let ctx = FragContext { version: WldVersion::Old };
        let mesh = sample_mesh();
        let bytes = mesh.encode(&ctx).unwrap();
        let back = DmSpriteDef2::decode(&bytes, &ctx).unwrap();
        assert_eq!(back, mesh);
        // old-format payload is 4 bytes smaller per UV pair
        let new_bytes = mesh.encode(&FragContext { version: WldVersion::New }).unwrap();
        assert_eq!(new_bytes.len() - bytes.len(), mesh.uvs.len() * 4);
    }

    #[test]
    fn test_rgb_track_def_codec() {
        let ctx = FragContext { version: WldVersion::New };
        let def = DmRgbTrackDef {
            name_ref: -2,
            flags: 1,
            sleep: 200,
            frames: vec![vec![1, 2, 3], vec![4, 5, 6]],
        };
        let bytes = def.encode(&ctx).unwrap();
        assert_eq!(DmRgbTrackDef::decode(&bytes, &ctx).unwrap(), def);
    }
}
