//! Per-kind fragment payload codecs.
//!
//! Every decoder consumes fixed-width little-endian fields in a fixed
//! order from its own pre-sliced payload; repeated groups use a count read
//! earlier in the same fragment. Encoders are the structural inverse.

mod actor;
mod light;
mod material;
mod mesh;
mod polyhedron;
mod region;
mod skeleton;
mod sprite;

pub use actor::{Actor, ActorAction, ActorDef, Sphere};
pub use light::{AmbientLight, GlobalAmbientLightDef, Light, LightDef, PointLight};
pub use material::{MaterialDef, MaterialPalette};
pub use mesh::{DmRgbTrack, DmRgbTrackDef, DmSprite, DmSpriteDef2, Face, MeshOp};
pub use polyhedron::{Polyhedron, PolyhedronDef};
pub use region::{Region, WorldTree, WorldTreeNode, Zone};
pub use skeleton::{Bone, HierarchicalSprite, HierarchicalSpriteDef, Track, TrackDef, TrackFrame};
pub use sprite::{BmInfo, RenderInfo, SimpleSprite, SimpleSpriteDef, Sprite3D, Sprite3DDef, Sprite3DNode};

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;

use crate::error::Result;
use crate::raw::names::apply_key;

pub(crate) fn read_vec3(cur: &mut Cursor<&[u8]>) -> Result<Vec3> {
    let x = cur.read_f32::<LittleEndian>()?;
    let y = cur.read_f32::<LittleEndian>()?;
    let z = cur.read_f32::<LittleEndian>()?;
    Ok(Vec3::new(x, y, z))
}

pub(crate) fn write_vec3(out: &mut Vec<u8>, v: Vec3) -> Result<()> {
    out.write_f32::<LittleEndian>(v.x)?;
    out.write_f32::<LittleEndian>(v.y)?;
    out.write_f32::<LittleEndian>(v.z)?;
    Ok(())
}

/// Read a length-prefixed, XOR-obfuscated, NUL-terminated string embedded
/// in a fragment payload (texture file names use the same key as the name
/// table).
pub(crate) fn read_hash_string(cur: &mut Cursor<&[u8]>) -> Result<String> {
    let len = cur.read_u16::<LittleEndian>()? as usize;
    let mut bytes = vec![0u8; len];
    cur.read_exact(&mut bytes)?;
    apply_key(&mut bytes);
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub(crate) fn write_hash_string(out: &mut Vec<u8>, s: &str) -> Result<()> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    apply_key(&mut bytes);
    out.write_u16::<LittleEndian>(bytes.len() as u16)?;
    out.extend_from_slice(&bytes);
    Ok(())
}

/// Read a length-prefixed, plain user-data string.
pub(crate) fn read_user_data(cur: &mut Cursor<&[u8]>) -> Result<String> {
    let len = cur.read_u32::<LittleEndian>()? as usize;
    let mut bytes = vec![0u8; len];
    cur.read_exact(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub(crate) fn write_user_data(out: &mut Vec<u8>, s: &str) -> Result<()> {
    out.write_u32::<LittleEndian>(s.len() as u32)?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}
