//! Light fragments: `LightDef` (0x1B), its instance wrapper `Light`
//! (0x1C), placed `PointLight`s (0x28), region `AmbientLight`s (0x2A) and
//! the world-wide `GlobalAmbientLightDef` (0x35).

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;

use super::{read_vec3, write_vec3};
use crate::error::Result;
use crate::raw::fragment::FragContext;

/// 0x1B — light source definition with optional animation frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightDef {
    pub name_ref: i32,
    pub flags: u32,
    pub frame_count: u32,
    /// Present when `flags & 0x01`.
    pub current_frame: Option<u32>,
    /// Present when `flags & 0x02`.
    pub sleep: Option<u32>,
    /// One level per frame; written iff non-empty (`flags & 0x04`).
    pub light_levels: Vec<f32>,
    /// One color per frame; written iff non-empty (`flags & 0x10`).
    pub colors: Vec<Vec3>,
}

impl LightDef {
    pub const CODE: i32 = 0x1B;
    pub const CURRENT_FRAME_FLAG: u32 = 0x01;
    pub const SLEEP_FLAG: u32 = 0x02;
    pub const LEVELS_FLAG: u32 = 0x04;
    pub const SKIP_FRAMES_FLAG: u32 = 0x08;
    pub const COLORS_FLAG: u32 = 0x10;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let frame_count = cur.read_u32::<LittleEndian>()?;
        let current_frame = if flags & Self::CURRENT_FRAME_FLAG != 0 {
            Some(cur.read_u32::<LittleEndian>()?)
        } else {
            None
        };
        let sleep = if flags & Self::SLEEP_FLAG != 0 {
            Some(cur.read_u32::<LittleEndian>()?)
        } else {
            None
        };
        let mut light_levels = Vec::new();
        if flags & Self::LEVELS_FLAG != 0 {
            for _ in 0..frame_count {
                light_levels.push(cur.read_f32::<LittleEndian>()?);
            }
        }
        let mut colors = Vec::new();
        if flags & Self::COLORS_FLAG != 0 {
            for _ in 0..frame_count {
                colors.push(read_vec3(cur)?);
            }
        }
        Ok(Self { name_ref, flags, frame_count, current_frame, sleep, light_levels, colors })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut flags = self.flags
            & !(Self::CURRENT_FRAME_FLAG | Self::SLEEP_FLAG | Self::LEVELS_FLAG | Self::COLORS_FLAG);
        if self.current_frame.is_some() {
            flags |= Self::CURRENT_FRAME_FLAG;
        }
        if self.sleep.is_some() {
            flags |= Self::SLEEP_FLAG;
        }
        if !self.light_levels.is_empty() {
            flags |= Self::LEVELS_FLAG;
        }
        if !self.colors.is_empty() {
            flags |= Self::COLORS_FLAG;
        }
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_u32::<LittleEndian>(flags)?;
        out.write_u32::<LittleEndian>(self.frame_count)?;
        if let Some(f) = self.current_frame {
            out.write_u32::<LittleEndian>(f)?;
        }
        if let Some(s) = self.sleep {
            out.write_u32::<LittleEndian>(s)?;
        }
        for &l in &self.light_levels {
            out.write_f32::<LittleEndian>(l)?;
        }
        for &c in &self.colors {
            write_vec3(&mut out, c)?;
        }
        Ok(out)
    }
}

/// 0x1C — instance wrapper around a `LightDef`. Folded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Light {
    pub name_ref: i32,
    pub def_ref: i32,
    pub flags: u32,
}

impl Light {
    pub const CODE: i32 = 0x1C;

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

/// 0x28 — light placed at a world position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointLight {
    pub name_ref: i32,
    /// Index of a `Light` (0x1C) fragment.
    pub light_ref: i32,
    pub flags: u32,
    pub location: Vec3,
    pub radius: f32,
}

impl PointLight {
    pub const CODE: i32 = 0x28;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        Ok(Self {
            name_ref: cur.read_i32::<LittleEndian>()?,
            light_ref: cur.read_i32::<LittleEndian>()?,
            flags: cur.read_u32::<LittleEndian>()?,
            location: read_vec3(cur)?,
            radius: cur.read_f32::<LittleEndian>()?,
        })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_i32::<LittleEndian>(self.light_ref)?;
        out.write_u32::<LittleEndian>(self.flags)?;
        write_vec3(&mut out, self.location)?;
        out.write_f32::<LittleEndian>(self.radius)?;
        Ok(out)
    }
}

/// 0x2A — ambient light applied to a set of regions. Regions are
/// addressed by ordinal (position among `Region` fragments), not by
/// fragment index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmbientLight {
    pub name_ref: i32,
    /// Index of a `Light` (0x1C) fragment.
    pub light_ref: i32,
    pub flags: u32,
    pub regions: Vec<u32>,
}

impl AmbientLight {
    pub const CODE: i32 = 0x2A;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        let name_ref = cur.read_i32::<LittleEndian>()?;
        let light_ref = cur.read_i32::<LittleEndian>()?;
        let flags = cur.read_u32::<LittleEndian>()?;
        let count = cur.read_u32::<LittleEndian>()? as usize;
        let mut regions = Vec::with_capacity(count);
        for _ in 0..count {
            regions.push(cur.read_u32::<LittleEndian>()?);
        }
        Ok(Self { name_ref, light_ref, flags, regions })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.name_ref)?;
        out.write_i32::<LittleEndian>(self.light_ref)?;
        out.write_u32::<LittleEndian>(self.flags)?;
        out.write_u32::<LittleEndian>(self.regions.len() as u32)?;
        for &r in &self.regions {
            out.write_u32::<LittleEndian>(r)?;
        }
        Ok(out)
    }
}

/// 0x35 — single packed RGBA word for the world ambient color.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalAmbientLightDef {
    pub color: u32,
}

impl GlobalAmbientLightDef {
    pub const CODE: i32 = 0x35;

    pub fn decode(data: &[u8], _ctx: &FragContext) -> Result<Self> {
        let cur = &mut Cursor::new(data);
        Ok(Self { color: cur.read_u32::<LittleEndian>()? })
    }

    pub fn encode(&self, _ctx: &FragContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(self.color)?;
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
    fn test_light_def_frames() {
        let def = LightDef {
            name_ref: -7,
            flags: 0,
            frame_count: 2,
            current_frame: None,
            sleep: Some(50),
            light_levels: vec![1.0, 0.5],
            colors: vec![Vec3::ONE, Vec3::new(1.0, 0.0, 0.0)],
        };
        let bytes = def.encode(&ctx()).unwrap();
        let back = LightDef::decode(&bytes, &ctx()).unwrap();
        assert_eq!(back.light_levels, def.light_levels);
        assert_eq!(back.colors, def.colors);
        assert_eq!(back.sleep, Some(50));
    }

    #[test]
    fn test_point_light_codec() {
        let pl = PointLight {
            name_ref: -9,
            light_ref: 4,
            flags: 0,
            location: Vec3::new(100.0, -50.0, 12.5),
            radius: 40.0,
        };
        let bytes = pl.encode(&ctx()).unwrap();
        assert_eq!(PointLight::decode(&bytes, &ctx()).unwrap(), pl);
    }

    #[test]
    fn test_ambient_light_region_ordinals() {
        let al = AmbientLight { name_ref: -11, light_ref: 2, flags: 0, regions: vec![0, 1, 5] };
        let bytes = al.encode(&ctx()).unwrap();
        assert_eq!(AmbientLight::decode(&bytes, &ctx()).unwrap(), al);
    }
}
