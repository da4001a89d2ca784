//! Actor fragments: `ActorDef` (0x14), `Actor` instance (0x15) and the
//! `Sphere` bounding volume (0x16) both may reference.
//!
//! Actor instances reference their definition by *name*, not by fragment
//! index: placed-object files routinely reference definitions living in a
//! different WLD file entirely.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{read_user_data, write_user_data};
use crate::error::Result;
use crate::raw::fragment::FragContext;

/// One level-of-detail action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorAction {
    /// Minimum view distances, one per level of detail.
    pub min_distances: Vec<f32>,
}

/// 0x14 — actor definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorDef {
    pub name_ref: i32,
    pub flags: u32,
    /// Name reference of the engine callback, e.g. `SPRITECALLBACK`.
    pub callback_name_ref: i32,
    /// Index of a `Sphere` (0x16) fragment, 0 for none.
    pub bounds_ref: i32,
    /// Present when `flags & 0x01`.
    pub current_action: Option<u32>,
    /// Placement `(x, y, z, rx, ry, rz)`, present when `flags & 0x02`.
    pub location: Option<[f32; 6]>,
    pub actions: Vec<ActorAction>,
    /// Sprite fragment indices; kinds are re-derived during resolution.
    pub sprite_refs: Vec<i32>,
    pub user_data: String,
}

impl ActorDef {
    pub const CODE: i32 = 0x14;
    pub const CURRENT_ACTION_FLAG: u32 = 0x01;
    pub const LOCATION_FLAG: u32 = 0x02;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let callback_name_ref = cur.read_i32::<LittleEndian>()?;
        let action_count = cur.read_u32::<LittleEndian>()? as usize;
        let sprite_ref_count = cur.read_u32::<LittleEndian>()? as usize;
        let bounds_ref = cur.read_i32::<LittleEndian>()?;
        let current_action = if flags & Self::CURRENT_ACTION_FLAG != 0 {
            Some(cur.read_u32::<LittleEndian>()?)
        } else {
            None
        };
        let location = if flags & Self::LOCATION_FLAG != 0 {
            let mut loc = [0f32; 6];
            for v in &mut loc {
                *v = cur.read_f32::<LittleEndian>()?;
            }
            Some(loc)
        } else {
            None
        };
        let mut actions = Vec::with_capacity(action_count);
        for _ in 0..action_count {
            let lod_count = cur.read_u32::<LittleEndian>()? as usize;
            let mut min_distances = Vec::with_capacity(lod_count);
            for _ in 0..lod_count {
                min_distances.push(cur.read_f32::<LittleEndian>()?);
            }
            actions.push(ActorAction { min_distances });
        }
        let mut sprite_refs = Vec::with_capacity(sprite_ref_count);
        for _ in 0..sprite_ref_count {
            sprite_refs.push(cur.read_i32::<LittleEndian>()?);
        }
        let user_data = read_user_data(cur)?;
        Ok(Self {
            name_ref,
            flags,
            callback_name_ref,
            bounds_ref,
            current_action,
            location,
            actions,
            sprite_refs,
            user_data,
        })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut flags = self.flags & !(Self::CURRENT_ACTION_FLAG | Self::LOCATION_FLAG);
        if self.current_action.is_some() {
            flags |= Self::CURRENT_ACTION_FLAG;
        }
        if self.location.is_some() {
            flags |= Self::LOCATION_FLAG;
        }
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(flags)?;
        out.write_i32::<LittleEndian>(self.callback_name_ref)?;
        out.write_u32::<LittleEndian>(self.actions.len() as u32)?;
        out.write_u32::<LittleEndian>(self.sprite_refs.len() as u32)?;
        out.write_i32::<LittleEndian>(self.bounds_ref)?;
        if let Some(a) = self.current_action {
            out.write_u32::<LittleEndian>(a)?;
        }
        if let Some(loc) = self.location {
            for v in loc {
                out.write_f32::<LittleEndian>(v)?;
            }
        }
        for action in &self.actions {
            out.write_u32::<LittleEndian>(action.min_distances.len() as u32)?;
            for &d in &action.min_distances {
                out.write_f32::<LittleEndian>(d)?;
            }
        }
        for &r in &self.sprite_refs {
            out.write_i32::<LittleEndian>(r)?;
        }
        write_user_data(&mut out, &self.user_data)?;
        Ok(out)
    }
}

/// 0x15 — placed actor instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Actor {
    pub name_ref: i32,
    /// Name reference of the actor definition tag (cross-file by design).
    pub actor_def_name_ref: i32,
    pub flags: u32,
    /// Index of a `Sphere` (0x16) fragment, 0 for none.
    pub sphere_ref: i32,
    /// Index of a `DmRgbTrack` (0x33) fragment, 0 for none.
    pub rgb_track_ref: i32,
    /// Present when `flags & 0x01`.
    pub current_action: Option<u32>,
    /// Present when `flags & 0x02`.
    pub location: Option<[f32; 6]>,
    /// Present when `flags & 0x04`.
    pub bounding_radius: Option<f32>,
    /// Present when `flags & 0x08`.
    pub scale_factor: Option<f32>,
    pub user_data: String,
}

impl Actor {
    pub const CODE: i32 = 0x15;
    pub const CURRENT_ACTION_FLAG: u32 = 0x01;
    pub const LOCATION_FLAG: u32 = 0x02;
    pub const BOUNDING_RADIUS_FLAG: u32 = 0x04;
    pub const SCALE_FACTOR_FLAG: u32 = 0x08;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let actor_def_name_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let sphere_ref = cur.read_i32::<LittleEndian>()?;
        let current_action = if flags & Self::CURRENT_ACTION_FLAG != 0 {
            Some(cur.read_u32::<LittleEndian>()?)
        } else {
            None
        };
        let location = if flags & Self::LOCATION_FLAG != 0 {
            let mut loc = [0f32; 6];
            for v in &mut loc {
                *v = cur.read_f32::<LittleEndian>()?;
            }
            Some(loc)
        } else {
            None
        };
        let bounding_radius = if flags & Self::BOUNDING_RADIUS_FLAG != 0 {
            Some(cur.read_f32::<LittleEndian>()?)
        } else {
            None
        };
        let scale_factor = if flags & Self::SCALE_FACTOR_FLAG != 0 {
            Some(cur.read_f32::<LittleEndian>()?)
        } else {
            None
        };
        let rgb_track_ref = cur.read_i32::<LittleEndian>()?;
        let user_data = read_user_data(cur)?;
        Ok(Self {
            name_ref,
            actor_def_name_ref,
            flags,
            sphere_ref,
            rgb_track_ref,
            current_action,
            location,
            bounding_radius,
            scale_factor,
            user_data,
        })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut flags = self.flags
            & !(Self::CURRENT_ACTION_FLAG
                | Self::LOCATION_FLAG
                | Self::BOUNDING_RADIUS_FLAG
                | Self::SCALE_FACTOR_FLAG);
        if self.current_action.is_some() {
            flags |= Self::CURRENT_ACTION_FLAG;
        }
        if self.location.is_some() {
            flags |= Self::LOCATION_FLAG;
        }
        if self.bounding_radius.is_some() {
            flags |= Self::BOUNDING_RADIUS_FLAG;
        }
        if self.scale_factor.is_some() {
            flags |= Self::SCALE_FACTOR_FLAG;
        }
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_i32::<LittleEndian>(self.actor_def_name_ref)?;
        out.write_u32::<LittleEndian>(flags)?;
        out.write_i32::<LittleEndian>(self.sphere_ref)?;
        if let Some(a) = self.current_action {
            out.write_u32::<LittleEndian>(a)?;
        }
        if let Some(loc) = self.location {
            for v in loc {
                out.write_f32::<LittleEndian>(v)?;
            }
        }
        if let Some(r) = self.bounding_radius {
            out.write_f32::<LittleEndian>(r)?;
        }
        if let Some(s) = self.scale_factor {
            out.write_f32::<LittleEndian>(s)?;
        }
        out.write_i32::<LittleEndian>(self.rgb_track_ref)?;
        write_user_data(&mut out, &self.user_data)?;
        Ok(out)
    }
}

/// 0x16 — bounding sphere. Folded into the record referencing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sphere {
    pub name_ref: i32,
    pub radius: f32,
}

impl Sphere {
    pub const CODE: i32 = 0x16;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        Ok(Self {
            name_ref: cur.read_i32::<LittleEndian>()?,
            radius: cur.read_f32::<LittleEndian>()?,
        })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_f32::<LittleEndian>(self.radius)?;
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
    fn test_actor_def_codec() {
        let def = ActorDef {
            name_ref: -100,
            flags: 0,
            callback_name_ref: -110,
            bounds_ref: 3,
            current_action: Some(0),
            location: None,
            actions: vec![ActorAction { min_distances: vec![100.0, 500.0] }],
            sprite_refs: vec![4, 5],
            user_data: "NPC".to_string(),
        };
        let bytes = def.encode(&ctx()).unwrap();
        let back = ActorDef::decode(&bytes, &ctx()).unwrap();
        assert_eq!(back.actions, def.actions);
        assert_eq!(back.sprite_refs, def.sprite_refs);
        assert_eq!(back.user_data, "NPC");
        assert_eq!(back.current_action, Some(0));
    }

    #[test]
    fn test_actor_instance_codec() {
        let inst = Actor {
            name_ref: 0,
            actor_def_name_ref: -5,
            flags: 0,
            sphere_ref: 0,
            rgb_track_ref: 2,
            current_action: None,
            location: Some([10.0, 20.0, 30.0, 0.0, 90.0, 0.0]),
            bounding_radius: Some(1.5),
            scale_factor: None,
            user_data: String::new(),
        };
        let bytes = inst.encode(&ctx()).unwrap();
        let back = Actor::decode(&bytes, &ctx()).unwrap();
        assert_eq!(back.location, inst.location);
        assert_eq!(back.bounding_radius, Some(1.5));
        assert_eq!(back.scale_factor, None);
        assert_eq!(back.rgb_track_ref, 2);
    }
}
