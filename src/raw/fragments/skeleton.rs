//! Skeleton and animation fragments: `HierarchicalSpriteDef` (0x10), its
//! instance wrapper (0x11), and the track pair `TrackDef` (0x12) /
//! `Track` (0x13).

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;

use super::{read_vec3, write_vec3};
use crate::error::Result;
use crate::raw::fragment::FragContext;

/// One bone in a hierarchical sprite. `sub_bones` holds 0-based indices
/// into the definition's bone list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bone {
    pub name_ref: i32,
    pub flags: u32,
    /// Index of a `Track` (0x13) fragment.
    pub track_ref: i32,
    /// Index of a `DmSprite` (0x2D) or `Sprite3D` (0x09) fragment, 0 for
    /// none.
    pub sprite_ref: i32,
    pub sub_bones: Vec<u32>,
}

/// 0x10 — skeleton definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchicalSpriteDef {
    pub name_ref: i32,
    pub flags: u32,
    /// Index of a `Polyhedron` (0x18) or `PolyhedronDef` (0x17) fragment.
    pub collision_volume_ref: i32,
    /// Present when `flags & 0x01`.
    pub center_offset: Option<Vec3>,
    /// Present when `flags & 0x02`.
    pub bounding_radius: Option<f32>,
    pub bones: Vec<Bone>,
    /// `(mesh ref, link update)` pairs, present when `flags & 0x200`.
    pub skins: Vec<(i32, u32)>,
}

impl HierarchicalSpriteDef {
    pub const CODE: i32 = 0x10;
    pub const CENTER_OFFSET_FLAG: u32 = 0x01;
    pub const BOUNDING_RADIUS_FLAG: u32 = 0x02;
    pub const SKINS_FLAG: u32 = 0x200;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let bone_count = cur.read_u32::<LittleEndian>()? as usize;
        let collision_volume_ref = cur.read_i32::<LittleEndian>()?;
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
        let mut bones = Vec::with_capacity(bone_count);
        for _ in 0..bone_count {
            let name_ref = cur.read_i32::<LittleEndian>()?;
            let flags = cur.read_u32::<LittleEndian>()?;
            let track_ref = cur.read_i32::<LittleEndian>()?;
            let sprite_ref = cur.read_i32::<LittleEndian>()?;
            let sub_count = cur.read_u32::<LittleEndian>()? as usize;
            let mut sub_bones = Vec::with_capacity(sub_count);
            for _ in 0..sub_count {
                sub_bones.push(cur.read_u32::<LittleEndian>()?);
            }
            bones.push(Bone { name_ref, flags, track_ref, sprite_ref, sub_bones });
        }
        let mut skins = Vec::new();
        if flags & Self::SKINS_FLAG != 0 {
            let skin_count = cur.read_u32::<LittleEndian>()? as usize;
            let mut refs = Vec::with_capacity(skin_count);
            for _ in 0..skin_count {
                refs.push(cur.read_i32::<LittleEndian>()?);
            }
            for r in refs {
                skins.push((r, cur.read_u32::<LittleEndian>()?));
            }
        }
        Ok(Self {
            name_ref,
            flags,
            collision_volume_ref,
            center_offset,
            bounding_radius,
            bones,
            skins,
        })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut flags = self.flags
            & !(Self::CENTER_OFFSET_FLAG | Self::BOUNDING_RADIUS_FLAG | Self::SKINS_FLAG);
        if self.center_offset.is_some() {
            flags |= Self::CENTER_OFFSET_FLAG;
        }
        if self.bounding_radius.is_some() {
            flags |= Self::BOUNDING_RADIUS_FLAG;
        }
        if !self.skins.is_empty() {
            flags |= Self::SKINS_FLAG;
        }
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(flags)?;
        out.write_u32::<LittleEndian>(self.bones.len() as u32)?;
        out.write_i32::<LittleEndian>(self.collision_volume_ref)?;
        if let Some(c) = self.center_offset {
            write_vec3(&mut out, c)?;
        }
        if let Some(r) = self.bounding_radius {
            out.write_f32::<LittleEndian>(r)?;
        }
        for bone in &self.bones {
            out.write_i32::<LittleEndian>(bone.name_ref)?;
            out.write_u32::<LittleEndian>(bone.flags)?;
            out.write_i32::<LittleEndian>(bone.track_ref)?;
            out.write_i32::<LittleEndian>(bone.sprite_ref)?;
            out.write_u32::<LittleEndian>(bone.sub_bones.len() as u32)?;
            for &s in &bone.sub_bones {
                out.write_u32::<LittleEndian>(s)?;
            }
        }
        if !self.skins.is_empty() {
            out.write_u32::<LittleEndian>(self.skins.len() as u32)?;
            for &(r, _) in &self.skins {
                out.write_i32::<LittleEndian>(r)?;
            }
            for &(_, link) in &self.skins {
                out.write_u32::<LittleEndian>(link)?;
            }
        }
        Ok(out)
    }
}

/// 0x11 — instance wrapper around a skeleton definition. Folded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchicalSprite {
    pub name_ref: i32,
    pub def_ref: i32,
    pub flags: u32,
    /// Present when `flags & 0x01`.
    pub bounding_radius: Option<f32>,
}

impl HierarchicalSprite {
    pub const CODE: i32 = 0x11;
    pub const BOUNDING_RADIUS_FLAG: u32 = 0x01;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let def_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let bounding_radius = if flags & Self::BOUNDING_RADIUS_FLAG != 0 {
            Some(cur.read_f32::<LittleEndian>()?)
        } else {
            None
        };
        Ok(Self { name_ref, def_ref, flags, bounding_radius })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut flags = self.flags & !Self::BOUNDING_RADIUS_FLAG;
        if self.bounding_radius.is_some() {
            flags |= Self::BOUNDING_RADIUS_FLAG;
        }
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_i32::<LittleEndian>(self.def_ref)?;
        out.write_u32::<LittleEndian>(flags)?;
        if let Some(r) = self.bounding_radius {
            out.write_f32::<LittleEndian>(r)?;
        }
        Ok(out)
    }
}

/// One keyframe in legacy fixed-point form: rotation quaternion components
/// over 16384, translation components over `shift_denom`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackFrame {
    pub rot_denom: i16,
    pub rot_x: i16,
    pub rot_y: i16,
    pub rot_z: i16,
    pub shift_x: i16,
    pub shift_y: i16,
    pub shift_z: i16,
    pub shift_denom: i16,
}

/// 0x12 — animation track definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackDef {
    pub name_ref: i32,
    pub flags: u32,
    pub frames: Vec<TrackFrame>,
}

impl TrackDef {
    pub const CODE: i32 = 0x12;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let frame_count = cur.read_u32::<LittleEndian>()? as usize;
        let mut frames = Vec::with_capacity(frame_count);
        for _ in 0..frame_count {
            frames.push(TrackFrame {
                rot_denom: cur.read_i16::<LittleEndian>()?,
                rot_x: cur.read_i16::<LittleEndian>()?,
                rot_y: cur.read_i16::<LittleEndian>()?,
                rot_z: cur.read_i16::<LittleEndian>()?,
                shift_x: cur.read_i16::<LittleEndian>()?,
                shift_y: cur.read_i16::<LittleEndian>()?,
                shift_z: cur.read_i16::<LittleEndian>()?,
                shift_denom: cur.read_i16::<LittleEndian>()?,
            });
        }
        Ok(Self { name_ref, flags, frames })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(self.flags)?;
        out.write_u32::<LittleEndian>(self.frames.len() as u32)?;
        for f in &self.frames {
            out.write_i16::<LittleEndian>(f.rot_denom)?;
            out.write_i16::<LittleEndian>(f.rot_x)?;
            out.write_i16::<LittleEndian>(f.rot_y)?;
            out.write_i16::<LittleEndian>(f.rot_z)?;
            out.write_i16::<LittleEndian>(f.shift_x)?;
            out.write_i16::<LittleEndian>(f.shift_y)?;
            out.write_i16::<LittleEndian>(f.shift_z)?;
            out.write_i16::<LittleEndian>(f.shift_denom)?;
        }
        Ok(out)
    }
}

/// 0x13 — animation track instance. Exposed as a logical record (bones
/// reference the instance, and many instances can share one definition).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub name_ref: i32,
    pub def_ref: i32,
    pub flags: u32,
    /// Frame delay in milliseconds, present when `flags & 0x01`.
    pub sleep: Option<u32>,
}

impl Track {
    pub const CODE: i32 = 0x13;
    pub const SLEEP_FLAG: u32 = 0x01;
    pub const REVERSE_FLAG: u32 = 0x02;
    pub const INTERPOLATE_FLAG: u32 = 0x04;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let def_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let sleep = if flags & Self::SLEEP_FLAG != 0 {
            Some(cur.read_u32::<LittleEndian>()?)
        } else {
            None
        };
        Ok(Self { name_ref, def_ref, flags, sleep })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut flags = self.flags & !Self::SLEEP_FLAG;
        if self.sleep.is_some() {
            flags |= Self::SLEEP_FLAG;
        }
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_i32::<LittleEndian>(self.def_ref)?;
        out.write_u32::<LittleEndian>(flags)?;
        if let Some(s) = self.sleep {
            out.write_u32::<LittleEndian>(s)?;
        }
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
    fn test_skeleton_codec_with_skins() {
        let def = HierarchicalSpriteDef {
            name_ref: -40,
            flags: 0,
            collision_volume_ref: 9,
            center_offset: None,
            bounding_radius: Some(3.5),
            bones: vec![
                Bone { name_ref: -50, flags: 0, track_ref: 4, sprite_ref: 0, sub_bones: vec![1] },
                Bone { name_ref: -60, flags: 0, track_ref: 5, sprite_ref: 6, sub_bones: vec![] },
            ],
            skins: vec![(7, 1), (8, 0)],
        };
        let bytes = def.encode(&ctx()).unwrap();
        let back = HierarchicalSpriteDef::decode(&bytes, &ctx()).unwrap();
        assert_eq!(back.bones, def.bones);
        assert_eq!(back.skins, def.skins);
        assert_eq!(back.bounding_radius, Some(3.5));
        assert_eq!(back.center_offset, None);
    }

    #[test]
    fn test_track_def_codec() {
        let def = TrackDef {
            name_ref: -3,
            flags: 0,
            frames: vec![TrackFrame {
                rot_denom: 16384,
                rot_x: 0,
                rot_y: 0,
                rot_z: 8192,
                shift_x: 256,
                shift_y: -512,
                shift_z: 0,
                shift_denom: 256,
            }],
        };
        let bytes = def.encode(&ctx()).unwrap();
        assert_eq!(TrackDef::decode(&bytes, &ctx()).unwrap(), def);
    }

    #[test]
    fn test_track_instance_sleep_flag() {
        let track = Track { name_ref: -1, def_ref: 2, flags: Track::REVERSE_FLAG, sleep: Some(90) };
        let bytes = track.encode(&ctx()).unwrap();
        let back = Track::decode(&bytes, &ctx()).unwrap();
        assert_eq!(back.sleep, Some(90));
        assert_ne!(back.flags & Track::REVERSE_FLAG, 0);
        assert_ne!(back.flags & Track::SLEEP_FLAG, 0);
    }
}
