//! World structure fragments: the BSP `WorldTree` (0x21), its leaf
//! `Region`s (0x22) and named region groups (`Zone`, 0x29).

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;

use super::{read_user_data, read_vec3, write_user_data, write_vec3};
use crate::error::Result;
use crate::raw::fragment::FragContext;

/// One BSP split plane. `front`/`back` are 1-based node numbers within the
/// same tree, 0 for a leaf side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldTreeNode {
    pub normal: Vec3,
    pub dist: f32,
    /// Index of a `Region` (0x22) fragment, 0 for none.
    pub region_ref: i32,
    pub front: u32,
    pub back: u32,
}

/// 0x21 — the zone's BSP tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldTree {
    pub name_ref: i32,
    pub nodes: Vec<WorldTreeNode>,
}

impl WorldTree {
    pub const CODE: i32 = 0x21;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let count = cur.read_u32::<LittleEndian>()? as usize;
        let mut nodes = Vec::with_capacity(count);
        for _ in 0..count {
            nodes.push(WorldTreeNode {
                normal: read_vec3(cur)?,
                dist: cur.read_f32::<LittleEndian>()?,
                region_ref: cur.read_i32::<LittleEndian>()?,
                front: cur.read_u32::<LittleEndian>()?,
                back: cur.read_u32::<LittleEndian>()?,
            });
        }
        Ok(Self { name_ref, nodes })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(self.nodes.len() as u32)?;
        for n in &self.nodes {
            write_vec3(&mut out, n.normal)?;
            out.write_f32::<LittleEndian>(n.dist)?;
            out.write_i32::<LittleEndian>(n.region_ref)?;
            out.write_u32::<LittleEndian>(n.front)?;
            out.write_u32::<LittleEndian>(n.back)?;
        }
        Ok(out)
    }
}

/// 0x22 — BSP leaf region with visibility lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    pub name_ref: i32,
    pub flags: u32,
    /// Index of an `AmbientLight` (0x2A) fragment, 0 for none.
    pub ambient_light_ref: i32,
    /// Index of a `DmSprite` (0x2D) fragment for region geometry, 0 for
    /// none.
    pub mesh_ref: i32,
    /// Present when `flags & 0x01`: `(x, y, z, radius)`.
    pub sphere: Option<[f32; 4]>,
    /// Present when `flags & 0x02`.
    pub reverb_volume: Option<f32>,
    pub vertices: Vec<Vec3>,
    /// Visible-region range lists, one `u16` run-length list per entry.
    pub vis_lists: Vec<Vec<u16>>,
    pub user_data: String,
}

impl Region {
    pub const CODE: i32 = 0x22;
    pub const SPHERE_FLAG: u32 = 0x01;
    pub const REVERB_FLAG: u32 = 0x02;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let ambient_light_ref = cur.read_i32::<LittleEndian>()?;
        let vertex_count = cur.read_u32::<LittleEndian>()? as usize;
        let vis_list_count = cur.read_u32::<LittleEndian>()? as usize;
        let sphere = if flags & Self::SPHERE_FLAG != 0 {
            let mut s = [0f32; 4];
            for v in &mut s {
                *v = cur.read_f32::<LittleEndian>()?;
            }
            Some(s)
        } else {
            None
        };
        let reverb_volume = if flags & Self::REVERB_FLAG != 0 {
            Some(cur.read_f32::<LittleEndian>()?)
        } else {
            None
        };
        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            vertices.push(read_vec3(cur)?);
        }
        let mut vis_lists = Vec::with_capacity(vis_list_count);
        for _ in 0..vis_list_count {
            let range_count = cur.read_u16::<LittleEndian>()? as usize;
            let mut ranges = Vec::with_capacity(range_count);
            for _ in 0..range_count {
                ranges.push(cur.read_u16::<LittleEndian>()?);
            }
            vis_lists.push(ranges);
        }
        let mesh_ref = cur.read_i32::<LittleEndian>()?;
        let user_data = read_user_data(cur)?;
        Ok(Self {
            name_ref,
            flags,
            ambient_light_ref,
            mesh_ref,
            sphere,
            reverb_volume,
            vertices,
            vis_lists,
            user_data,
        })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut flags = self.flags & !(Self::SPHERE_FLAG | Self::REVERB_FLAG);
        if self.sphere.is_some() {
            flags |= Self::SPHERE_FLAG;
        }
        if self.reverb_volume.is_some() {
            flags |= Self::REVERB_FLAG;
        }
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(flags)?;
        out.write_i32::<LittleEndian>(self.ambient_light_ref)?;
        out.write_u32::<LittleEndian>(self.vertices.len() as u32)?;
        out.write_u32::<LittleEndian>(self.vis_lists.len() as u32)?;
        if let Some(s) = self.sphere {
            for v in s {
                out.write_f32::<LittleEndian>(v)?;
            }
        }
        if let Some(r) = self.reverb_volume {
            out.write_f32::<LittleEndian>(r)?;
        }
        for &v in &self.vertices {
            write_vec3(&mut out, v)?;
        }
        for list in &self.vis_lists {
            out.write_u16::<LittleEndian>(list.len() as u16)?;
            for &r in list {
                out.write_u16::<LittleEndian>(r)?;
            }
        }
        out.write_i32::<LittleEndian>(self.mesh_ref)?;
        write_user_data(&mut out, &self.user_data)?;
        Ok(out)
    }
}

/// 0x29 — named group of regions, addressed by ordinal like
/// `AmbientLight`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Zone {
    pub name_ref: i32,
    pub flags: u32,
    pub regions: Vec<u32>,
    pub user_data: String,
}

impl Zone {
    pub const CODE: i32 = 0x29;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let count = cur.read_u32::<LittleEndian>()? as usize;
        let mut regions = Vec::with_capacity(count);
        for _ in 0..count {
            regions.push(cur.read_u32::<LittleEndian>()?);
        }
        let user_data = read_user_data(cur)?;
        Ok(Self { name_ref, flags, regions, user_data })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(self.flags)?;
        out.write_u32::<LittleEndian>(self.regions.len() as u32)?;
        for &r in &self.regions {
            out.write_u32::<LittleEndian>(r)?;
        }
        write_user_data(&mut out, &self.user_data)?;
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
    fn test_world_tree_codec() {
        let tree = WorldTree {
            name_ref: 0,
            nodes: vec![
                WorldTreeNode {
                    normal: Vec3::Z,
                    dist: -10.0,
                    region_ref: 0,
                    front: 2,
                    back: 3,
                },
                WorldTreeNode { normal: Vec3::ZERO, dist: 0.0, region_ref: 5, front: 0, back: 0 },
            ],
        };
        let bytes = tree.encode(&ctx()).unwrap();
        assert_eq!(WorldTree::decode(&bytes, &ctx()).unwrap(), tree);
    }

    #[test]
    fn test_region_codec() {
        let region = Region {
            name_ref: -1,
            flags: 0,
            ambient_light_ref: 3,
            mesh_ref: 7,
            sphere: Some([1.0, 2.0, 3.0, 50.0]),
            reverb_volume: None,
            vertices: vec![Vec3::ONE],
            vis_lists: vec![vec![1, 4], vec![]],
            user_data: "WT_ZONE".to_string(),
        };
        let bytes = region.encode(&ctx()).unwrap();
        assert_eq!(Region::decode(&bytes, &ctx()).unwrap(), region);
    }

    #[test]
    fn test_zone_codec() {
        let zone = Zone {
            name_ref: -2,
            flags: 0,
            regions: vec![0, 3, 4],
            user_data: String::new(),
        };
        let bytes = zone.encode(&ctx()).unwrap();
        assert_eq!(Zone::decode(&bytes, &ctx()).unwrap(), zone);
    }
}
