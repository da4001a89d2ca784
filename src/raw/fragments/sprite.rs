//! Sprite fragments: texture file lists (0x03), animated 2-D sprites
//! (0x04/0x05) and camera-style 3-D sprites with BSP render nodes
//! (0x08/0x09).

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;

use super::{read_hash_string, read_vec3, write_hash_string, write_vec3};
use crate::error::Result;
use crate::raw::fragment::FragContext;

/// 0x03 — list of texture file names (obfuscated with the name-table key).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BmInfo {
    pub name_ref: i32,
    pub file_names: Vec<String>,
}

impl BmInfo {
    pub const CODE: i32 = 0x03;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let count = cur.read_u32::<LittleEndian>()? as usize;
        let mut file_names = Vec::with_capacity(count);
        for _ in 0..count {
            file_names.push(read_hash_string(cur)?);
        }
        Ok(Self { name_ref, file_names })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(self.file_names.len() as u32)?;
        for name in &self.file_names {
            write_hash_string(&mut out, name)?;
        }
        Ok(out)
    }
}

/// 0x04 — animated sprite definition referencing one `BmInfo` per frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleSpriteDef {
    pub name_ref: i32,
    pub flags: u32,
    /// Present when `flags & 0x04`.
    pub current_frame: Option<i32>,
    /// Frame delay in milliseconds, present when `flags & 0x08`.
    pub sleep: Option<u32>,
    pub frame_refs: Vec<i32>,
}

impl SimpleSpriteDef {
    pub const CODE: i32 = 0x04;
    pub const CURRENT_FRAME_FLAG: u32 = 0x04;
    pub const SLEEP_FLAG: u32 = 0x08;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let count = cur.read_u32::<LittleEndian>()? as usize;
        let current_frame = if flags & Self::CURRENT_FRAME_FLAG != 0 {
            Some(cur.read_i32::<LittleEndian>()?)
        } else {
            None
        };
        let sleep = if flags & Self::SLEEP_FLAG != 0 {
            Some(cur.read_u32::<LittleEndian>()?)
        } else {
            None
        };
        let mut frame_refs = Vec::with_capacity(count);
        for _ in 0..count {
            frame_refs.push(cur.read_i32::<LittleEndian>()?);
        }
        Ok(Self { name_ref, flags, current_frame, sleep, frame_refs })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut flags = self.flags & !(Self::CURRENT_FRAME_FLAG | Self::SLEEP_FLAG);
        if self.current_frame.is_some() {
            flags |= Self::CURRENT_FRAME_FLAG;
        }
        if self.sleep.is_some() {
            flags |= Self::SLEEP_FLAG;
        }
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(flags)?;
        out.write_u32::<LittleEndian>(self.frame_refs.len() as u32)?;
        if let Some(f) = self.current_frame {
            out.write_i32::<LittleEndian>(f)?;
        }
        if let Some(s) = self.sleep {
            out.write_u32::<LittleEndian>(s)?;
        }
        for &r in &self.frame_refs {
            out.write_i32::<LittleEndian>(r)?;
        }
        Ok(out)
    }
}

/// 0x05 — instance wrapper pointing a referencing fragment at a
/// `SimpleSpriteDef`. Folded into the referencing logical record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleSprite {
    pub name_ref: i32,
    pub def_ref: i32,
    pub flags: u32,
}

impl SimpleSprite {
    pub const CODE: i32 = 0x05;

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

/// Render properties attached to a BSP render node. Each field's presence
/// is driven by a bit in `flags`; the bits are recomputed on encode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderInfo {
    pub render_method: u32,
    pub flags: u8,
    pub pen: Option<u32>,
    pub brightness: Option<f32>,
    pub scaled_ambient: Option<f32>,
    /// Index of a `SimpleSprite` (0x05) fragment.
    pub sprite_ref: Option<i32>,
    /// Texture plane: origin, U axis, V axis.
    pub uv_origin: Option<[Vec3; 3]>,
    /// Explicit per-vertex UV map; the presence bit is set iff non-empty.
    pub uv_map: Vec<[f32; 2]>,
    pub two_sided: bool,
}

impl RenderInfo {
    pub const PEN_FLAG: u8 = 0x01;
    pub const BRIGHTNESS_FLAG: u8 = 0x02;
    pub const SCALED_AMBIENT_FLAG: u8 = 0x04;
    pub const SPRITE_FLAG: u8 = 0x08;
    pub const UV_ORIGIN_FLAG: u8 = 0x10;
    pub const UV_MAP_FLAG: u8 = 0x20;
    pub const TWO_SIDED_FLAG: u8 = 0x40;

    pub fn decode(cur: &mut Cursor<&[u8]>) -> Result<Self> {
        let render_method = cur.read_u32::<LittleEndian>()?;
        let flags = cur.read_u8()?;
        let pen = if flags & Self::PEN_FLAG != 0 {
            Some(cur.read_u32::<LittleEndian>()?)
        } else {
            None
        };
        let brightness = if flags & Self::BRIGHTNESS_FLAG != 0 {
            Some(cur.read_f32::<LittleEndian>()?)
        } else {
            None
        };
        let scaled_ambient = if flags & Self::SCALED_AMBIENT_FLAG != 0 {
            Some(cur.read_f32::<LittleEndian>()?)
        } else {
            None
        };
        let sprite_ref = if flags & Self::SPRITE_FLAG != 0 {
            Some(cur.read_i32::<LittleEndian>()?)
        } else {
            None
        };
        let uv_origin = if flags & Self::UV_ORIGIN_FLAG != 0 {
            Some([read_vec3(cur)?, read_vec3(cur)?, read_vec3(cur)?])
        } else {
            None
        };
        let mut uv_map = Vec::new();
        if flags & Self::UV_MAP_FLAG != 0 {
            let count = cur.read_u32::<LittleEndian>()? as usize;
            uv_map.reserve(count);
            for _ in 0..count {
                uv_map.push([cur.read_f32::<LittleEndian>()?, cur.read_f32::<LittleEndian>()?]);
            }
        }
        let two_sided = flags & Self::TWO_SIDED_FLAG != 0;
        Ok(Self {
            render_method,
            flags,
            pen,
            brightness,
            scaled_ambient,
            sprite_ref,
            uv_origin,
            uv_map,
            two_sided,
        })
    }

    pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        let mut flags = 0u8;
        if self.pen.is_some() {
            flags |= Self::PEN_FLAG;
        }
        if self.brightness.is_some() {
            flags |= Self::BRIGHTNESS_FLAG;
        }
        if self.scaled_ambient.is_some() {
            flags |= Self::SCALED_AMBIENT_FLAG;
        }
        if self.sprite_ref.is_some() {
            flags |= Self::SPRITE_FLAG;
        }
        if self.uv_origin.is_some() {
            flags |= Self::UV_ORIGIN_FLAG;
        }
        if !self.uv_map.is_empty() {
            flags |= Self::UV_MAP_FLAG;
        }
        if self.two_sided {
            flags |= Self::TWO_SIDED_FLAG;
        }
        out.write_u32::<LittleEndian>(self.render_method)?;
        out.write_u8(flags)?;
        if let Some(pen) = self.pen {
            out.write_u32::<LittleEndian>(pen)?;
        }
        if let Some(b) = self.brightness {
            out.write_f32::<LittleEndian>(b)?;
        }
        if let Some(a) = self.scaled_ambient {
            out.write_f32::<LittleEndian>(a)?;
        }
        if let Some(r) = self.sprite_ref {
            out.write_i32::<LittleEndian>(r)?;
        }
        if let Some([o, u, v]) = self.uv_origin {
            write_vec3(out, o)?;
            write_vec3(out, u)?;
            write_vec3(out, v)?;
        }
        if !self.uv_map.is_empty() {
            out.write_u32::<LittleEndian>(self.uv_map.len() as u32)?;
            for [u, v] in &self.uv_map {
                out.write_f32::<LittleEndian>(*u)?;
                out.write_f32::<LittleEndian>(*v)?;
            }
        }
        Ok(())
    }
}

/// BSP render node inside a `Sprite3DDef`. Front/back of 0 means leaf.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sprite3DNode {
    pub vertex_indices: Vec<u32>,
    pub front_tree: u32,
    pub back_tree: u32,
    pub render: RenderInfo,
}

/// 0x08 — 3-D sprite definition (fixed geometry with nested render info).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sprite3DDef {
    pub name_ref: i32,
    pub flags: u32,
    pub sphere_list_ref: i32,
    /// Present when `flags & 0x01`.
    pub center_offset: Option<Vec3>,
    /// Present when `flags & 0x02`.
    pub bounding_radius: Option<f32>,
    pub vertices: Vec<Vec3>,
    pub nodes: Vec<Sprite3DNode>,
}

impl Sprite3DDef {
    pub const CODE: i32 = 0x08;
    pub const CENTER_OFFSET_FLAG: u32 = 0x01;
    pub const BOUNDING_RADIUS_FLAG: u32 = 0x02;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let vertex_count = cur.read_u32::<LittleEndian>()? as usize;
        let node_count = cur.read_u32::<LittleEndian>()? as usize;
        let sphere_list_ref = cur.read_i32::<LittleEndian>()?;
        let center_offset = if flags & Self::CENTER_OFFSET_FLAG != 0 {
            Some(read_vec3(cur)?)
        } else {
            None
        };
        let bounding_radius = if flags & Self::BOUNDING_RADIUS_FLAG != 0 {
            Some(cur.read_f32::<LittleEndian>()?)
        } else {
            None
        };
        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            vertices.push(read_vec3(cur)?);
        }
        let mut nodes = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            let index_count = cur.read_u32::<LittleEndian>()? as usize;
            let front_tree = cur.read_u32::<LittleEndian>()?;
            let back_tree = cur.read_u32::<LittleEndian>()?;
            let mut vertex_indices = Vec::with_capacity(index_count);
            for _ in 0..index_count {
                vertex_indices.push(cur.read_u32::<LittleEndian>()?);
            }
            let render = RenderInfo::decode(cur)?;
            nodes.push(Sprite3DNode { vertex_indices, front_tree, back_tree, render });
        }
        Ok(Self {
            name_ref,
            flags,
            sphere_list_ref,
            center_offset,
            bounding_radius,
            vertices,
            nodes,
        })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut flags = self.flags & !(Self::CENTER_OFFSET_FLAG | Self::BOUNDING_RADIUS_FLAG);
        if self.center_offset.is_some() {
            flags |= Self::CENTER_OFFSET_FLAG;
        }
        if self.bounding_radius.is_some() {
            flags |= Self::BOUNDING_RADIUS_FLAG;
        }
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(flags)?;
        out.write_u32::<LittleEndian>(self.vertices.len() as u32)?;
        out.write_u32::<LittleEndian>(self.nodes.len() as u32)?;
        out.write_i32::<LittleEndian>(self.sphere_list_ref)?;
        if let Some(c) = self.center_offset {
            write_vec3(&mut out, c)?;
        }
        if let Some(r) = self.bounding_radius {
            out.write_f32::<LittleEndian>(r)?;
        }
        for &v in &self.vertices {
            write_vec3(&mut out, v)?;
        }
        for node in &self.nodes {
            out.write_u32::<LittleEndian>(node.vertex_indices.len() as u32)?;
            out.write_u32::<LittleEndian>(node.front_tree)?;
            out.write_u32::<LittleEndian>(node.back_tree)?;
            for &i in &node.vertex_indices {
                out.write_u32::<LittleEndian>(i)?;
            }
            node.render.encode(&mut out)?;
        }
        Ok(out)
    }
}

/// 0x09 — instance wrapper around a `Sprite3DDef`. Folded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sprite3D {
    pub name_ref: i32,
    pub def_ref: i32,
    pub flags: u32,
}

impl Sprite3D {
    pub const CODE: i32 = 0x09;

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
    use crate::raw::fragment::WldVersion;

    fn ctx() -> FragContext {
        FragContext { version: WldVersion::New }
    }

    #[test]
    fn test_bminfo_file_names_survive_obfuscation() {
        let info = BmInfo {
            name_ref: -8,
            file_names: vec!["WALL1.BMP".to_string(), "WALL2.BMP".to_string()],
        };
        let bytes = info.encode(&ctx()).unwrap();
        assert_eq!(BmInfo::decode(&bytes, &ctx()).unwrap(), info);
    }

    #[test]
    fn test_simple_sprite_def_optional_fields() {
        let def = SimpleSpriteDef {
            name_ref: -1,
            flags: 0,
            current_frame: None,
            sleep: Some(100),
            frame_refs: vec![2, 3],
        };
        let bytes = def.encode(&ctx()).unwrap();
        let back = SimpleSpriteDef::decode(&bytes, &ctx()).unwrap();
        assert_eq!(back.sleep, Some(100));
        assert_eq!(back.current_frame, None);
        assert_eq!(back.frame_refs, vec![2, 3]);
    }

    #[test]
    fn test_sprite3d_def_with_render_info() {
        let def = Sprite3DDef {
            name_ref: -20,
            flags: 0,
            sphere_list_ref: 0,
            center_offset: Some(Vec3::new(1.0, 2.0, 3.0)),
            bounding_radius: None,
            vertices: vec![Vec3::ZERO, Vec3::ONE],
            nodes: vec![Sprite3DNode {
                vertex_indices: vec![0, 1],
                front_tree: 0,
                back_tree: 0,
                render: RenderInfo {
                    render_method: 7,
                    pen: Some(11),
                    uv_map: vec![[0.0, 0.0], [1.0, 1.0]],
                    two_sided: true,
                    ..RenderInfo::default()
                },
            }],
        };
        let bytes = def.encode(&ctx()).unwrap();
        let back = Sprite3DDef::decode(&bytes, &ctx()).unwrap();
        assert_eq!(back.center_offset, def.center_offset);
        assert_eq!(back.nodes[0].render.pen, Some(11));
        assert!(back.nodes[0].render.two_sided);
        assert_eq!(back.nodes[0].render.uv_map, def.nodes[0].render.uv_map);
    }
}
