//! Logical→raw emission.
//!
//! [`WldEncoder`] walks the logical graph and appends raw fragments on
//! demand. Emission is memoized per `(kind, tag)`, so a record shared by
//! many referrers is written exactly once and every referrer resolves to
//! the same 1-based index. Dependencies are emitted before the dependent
//! fragment; a record re-entered while still in progress is a reference
//! cycle and fails instead of recursing forever. All emission state lives
//! in the encoder, so encoding the same world twice with two encoders is
//! fully independent.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::quant::{quantize, quantize_normal, quantize_wide};
use crate::raw::fragment::FragPayload;
use crate::raw::fragments::{
    ActorAction as RawActorAction, ActorDef as RawActorDef, Actor as RawActor,
    AmbientLight as RawAmbientLight, BmInfo, Bone as RawBone, DmRgbTrack, DmRgbTrackDef,
    DmSprite, DmSpriteDef2, GlobalAmbientLightDef, HierarchicalSprite, HierarchicalSpriteDef,
    Light as RawLight, LightDef as RawLightDef, MaterialDef, MaterialPalette as RawPalette,
    PointLight as RawPointLight, Polyhedron as RawPolyhedron, PolyhedronDef,
    Region as RawRegion, RenderInfo as RawRenderInfo, SimpleSprite as RawSimpleSprite,
    SimpleSpriteDef, Sphere, Sprite3D as RawSprite3D, Sprite3DDef, Sprite3DNode,
    Track as RawTrack, TrackDef as RawTrackDef, TrackFrame, WorldTree as RawWorldTree,
    WorldTreeNode, Zone as RawZone,
};
use crate::raw::names::NameBuilder;
use crate::raw::WldRaw;

use super::{RecordKind, SpriteRef, World};

/// Canonical fixed-point denominators used when writing track frames.
const ROT_DENOM: f32 = 16384.0;
const SHIFT_DENOM: f32 = 256.0;

#[derive(Debug, Clone, Copy)]
enum EmitState {
    InProgress,
    Done(u32),
}

/// One encode pass over a logical world. Owns the output fragment list,
/// the name accumulation table and the per-record emission state.
pub struct WldEncoder<'a> {
    world: &'a World,
    fragments: Vec<Option<FragPayload>>,
    names: NameBuilder,
    states: HashMap<(RecordKind, String), EmitState>,
}

impl World {
    /// Encode the logical graph back to a raw fragment stream.
    pub fn to_raw(&self) -> Result<WldRaw> {
        let mut enc = WldEncoder::new(self);
        enc.emit_all()?;
        Ok(enc.finish())
    }

    /// Encode all the way to the binary wire format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_raw()?.to_bytes()
    }
}

impl<'a> WldEncoder<'a> {
    pub fn new(world: &'a World) -> Self {
        Self { world, fragments: Vec::new(), names: NameBuilder::new(), states: HashMap::new() }
    }

    /// Emit every record in the world. Regions are emitted in map order
    /// before anything that addresses them by ordinal, so the i-th
    /// `Region` fragment in the stream is the i-th region record.
    pub fn emit_all(&mut self) -> Result<()> {
        if let Some(color) = self.world.global_ambient {
            self.push(FragPayload::GlobalAmbientLightDef(GlobalAmbientLightDef { color }));
        }
        macro_rules! emit_each {
            ($map:expr, $emit:ident) => {
                for tag in $map.keys().cloned().collect::<Vec<_>>() {
                    self.$emit(&tag, "")?;
                }
            };
        }
        emit_each!(self.world.simple_sprites, emit_simple_sprite);
        emit_each!(self.world.materials, emit_material);
        emit_each!(self.world.material_palettes, emit_material_palette);
        emit_each!(self.world.rgb_tracks, emit_rgb_track);
        emit_each!(self.world.polyhedra, emit_polyhedron);
        emit_each!(self.world.meshes, emit_mesh);
        emit_each!(self.world.track_defs, emit_track_def);
        emit_each!(self.world.tracks, emit_track);
        emit_each!(self.world.skeletons, emit_skeleton);
        emit_each!(self.world.sprite3ds, emit_sprite3d);
        emit_each!(self.world.light_defs, emit_light_def);
        emit_each!(self.world.regions, emit_region);
        emit_each!(self.world.ambient_lights, emit_ambient_light);
        emit_each!(self.world.point_lights, emit_point_light);
        emit_each!(self.world.world_trees, emit_world_tree);
        emit_each!(self.world.zones, emit_zone);
        emit_each!(self.world.actor_defs, emit_actor_def);
        emit_each!(self.world.actor_insts, emit_actor_inst);
        Ok(())
    }

    /// Consume the encoder into the raw stream form.
    pub fn finish(self) -> WldRaw {
        WldRaw {
            version: self.world.version,
            region_count: self.world.regions.len() as u32,
            max_object_bytes: 0,
            string_count: self.names.len() as u32,
            names: self.names.into_table(),
            fragments: self.fragments,
        }
    }

    /// Memo lookup. `Ok(Some(i))` on a hit, `Ok(None)` after marking the
    /// record in progress, `CycleDetected` on re-entry.
    fn begin(&mut self, kind: RecordKind, tag: &str) -> Result<Option<i32>> {
        match self.states.get(&(kind, tag.to_string())) {
            Some(EmitState::Done(i)) => Ok(Some(*i as i32)),
            Some(EmitState::InProgress) => {
                Err(Error::CycleDetected { kind: kind.label(), tag: tag.to_string() })
            }
            None => {
                self.states.insert((kind, tag.to_string()), EmitState::InProgress);
                Ok(None)
            }
        }
    }

    /// Append the record's own fragment and store its index.
    fn done(&mut self, kind: RecordKind, tag: &str, frag: FragPayload) -> i32 {
        let index = self.push(frag);
        self.states.insert((kind, tag.to_string()), EmitState::Done(index as u32));
        index
    }

    fn push(&mut self, frag: FragPayload) -> i32 {
        self.fragments.push(Some(frag));
        self.fragments.len() as i32
    }

    fn missing(kind: RecordKind, tag: &str, referenced_by: &str) -> Error {
        Error::TagNotFound {
            tag: tag.to_string(),
            kind: kind.label(),
            referenced_by: referenced_by.to_string(),
        }
    }

    fn emit_simple_sprite(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::SimpleSprite, tag)? {
            return Ok(i);
        }
        let sprite = self
            .world
            .simple_sprites
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::SimpleSprite, tag, referenced_by))?;
        let mut frame_refs = Vec::with_capacity(sprite.frames.len());
        for frame in &sprite.frames {
            let name_ref = self.names.add(&frame.tag);
            frame_refs.push(self.push(FragPayload::BmInfo(BmInfo {
                name_ref,
                file_names: frame.files.clone(),
            })));
        }
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::SimpleSprite,
            tag,
            FragPayload::SimpleSpriteDef(SimpleSpriteDef {
                name_ref,
                flags: 0,
                current_frame: sprite.current_frame,
                sleep: sprite.sleep,
                frame_refs,
            }),
        ))
    }

    /// `SimpleSprite` wrapper, re-emitted per reference.
    fn wrap_simple_sprite(&mut self, def_tag: &str, referenced_by: &str) -> Result<i32> {
        let def_ref = self.emit_simple_sprite(def_tag, referenced_by)?;
        Ok(self.push(FragPayload::SimpleSprite(RawSimpleSprite { name_ref: 0, def_ref, flags: 0 })))
    }

    fn emit_material(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::Material, tag)? {
            return Ok(i);
        }
        let mat = self
            .world
            .materials
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::Material, tag, referenced_by))?;
        let sprite_ref = match &mat.simple_sprite_tag {
            Some(t) => self.wrap_simple_sprite(t, tag)?,
            None => 0,
        };
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::Material,
            tag,
            FragPayload::MaterialDef(MaterialDef {
                name_ref,
                flags: 0,
                render_method: mat.render_method,
                rgb_pen: mat.rgb_pen,
                brightness: mat.brightness,
                scaled_ambient: mat.scaled_ambient,
                sprite_ref,
                uv_shift: mat.uv_shift,
            }),
        ))
    }

    fn emit_material_palette(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::MaterialPalette, tag)? {
            return Ok(i);
        }
        let pal = self
            .world
            .material_palettes
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::MaterialPalette, tag, referenced_by))?;
        let mut material_refs = Vec::with_capacity(pal.material_tags.len());
        for mat_tag in pal.material_tags.clone() {
            material_refs.push(self.emit_material(&mat_tag, tag)?);
        }
        let name_ref = self.names.add(tag);
        let flags = pal.flags;
        Ok(self.done(
            RecordKind::MaterialPalette,
            tag,
            FragPayload::MaterialPalette(RawPalette { name_ref, flags, material_refs }),
        ))
    }

    fn emit_rgb_track(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::RgbTrack, tag)? {
            return Ok(i);
        }
        let track = self
            .world
            .rgb_tracks
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::RgbTrack, tag, referenced_by))?;
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::RgbTrack,
            tag,
            FragPayload::DmRgbTrackDef(DmRgbTrackDef {
                name_ref,
                flags: track.flags,
                sleep: track.sleep,
                frames: track.frames.clone(),
            }),
        ))
    }

    fn wrap_rgb_track(&mut self, def_tag: &str, referenced_by: &str) -> Result<i32> {
        let def_ref = self.emit_rgb_track(def_tag, referenced_by)?;
        Ok(self.push(FragPayload::DmRgbTrack(DmRgbTrack { name_ref: 0, def_ref, flags: 0 })))
    }

    fn emit_polyhedron(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::Polyhedron, tag)? {
            return Ok(i);
        }
        let poly = self
            .world
            .polyhedra
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::Polyhedron, tag, referenced_by))?;
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::Polyhedron,
            tag,
            FragPayload::PolyhedronDef(PolyhedronDef {
                name_ref,
                flags: poly.flags,
                bounding_radius: poly.bounding_radius,
                scale_factor: poly.scale_factor,
                vertices: poly.vertices.clone(),
                faces: poly.faces.clone(),
            }),
        ))
    }

    fn wrap_polyhedron(&mut self, def_tag: &str, referenced_by: &str) -> Result<i32> {
        let def_ref = self.emit_polyhedron(def_tag, referenced_by)?;
        Ok(self.push(FragPayload::Polyhedron(RawPolyhedron {
            name_ref: 0,
            def_ref,
            flags: 0,
            scale_factor: 1.0,
        })))
    }

    fn emit_mesh(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::Mesh, tag)? {
            return Ok(i);
        }
        let mesh = self
            .world
            .meshes
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::Mesh, tag, referenced_by))?
            .clone();
        let material_palette_ref = if mesh.material_palette_tag.is_empty() {
            0
        } else {
            self.emit_material_palette(&mesh.material_palette_tag, tag)?
        };
        let dm_track_ref = match &mesh.rgb_track_tag {
            Some(t) => self.wrap_rgb_track(t, tag)?,
            None => 0,
        };
        let fp = mesh.fp_scale;
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::Mesh,
            tag,
            FragPayload::DmSpriteDef2(DmSpriteDef2 {
                name_ref,
                flags: mesh.flags,
                material_palette_ref,
                dm_track_ref,
                center_offset: mesh.center_offset,
                params2: mesh.params2,
                max_distance: mesh.max_distance,
                min: mesh.min,
                max: mesh.max,
                fp_scale: fp,
                vertices: mesh
                    .vertices
                    .iter()
                    .map(|v| [quantize(v.x, fp), quantize(v.y, fp), quantize(v.z, fp)])
                    .collect(),
                uvs: mesh
                    .uvs
                    .iter()
                    .map(|uv| [quantize_wide(uv[0], fp), quantize_wide(uv[1], fp)])
                    .collect(),
                normals: mesh
                    .normals
                    .iter()
                    .map(|n| [quantize_normal(n.x), quantize_normal(n.y), quantize_normal(n.z)])
                    .collect(),
                colors: mesh.colors.clone(),
                faces: mesh.faces.clone(),
                skin_groups: mesh.skin_groups.clone(),
                face_material_groups: mesh.face_material_groups.clone(),
                vertex_material_groups: mesh.vertex_material_groups.clone(),
                meshops: mesh.meshops.clone(),
            }),
        ))
    }

    fn wrap_dm_sprite(&mut self, mesh_tag: &str, referenced_by: &str) -> Result<i32> {
        let def_ref = self.emit_mesh(mesh_tag, referenced_by)?;
        Ok(self.push(FragPayload::DmSprite(DmSprite { name_ref: 0, def_ref, params: 0 })))
    }

    fn emit_track_def(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::TrackDef, tag)? {
            return Ok(i);
        }
        let def = self
            .world
            .track_defs
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::TrackDef, tag, referenced_by))?;
        let frames = def
            .frames
            .iter()
            .map(|f| TrackFrame {
                rot_denom: (f.rotation[0] * ROT_DENOM).round() as i16,
                rot_x: (f.rotation[1] * ROT_DENOM).round() as i16,
                rot_y: (f.rotation[2] * ROT_DENOM).round() as i16,
                rot_z: (f.rotation[3] * ROT_DENOM).round() as i16,
                shift_x: (f.translation.x * SHIFT_DENOM).round() as i16,
                shift_y: (f.translation.y * SHIFT_DENOM).round() as i16,
                shift_z: (f.translation.z * SHIFT_DENOM).round() as i16,
                shift_denom: SHIFT_DENOM as i16,
            })
            .collect();
        let flags = def.flags;
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::TrackDef,
            tag,
            FragPayload::TrackDef(RawTrackDef { name_ref, flags, frames }),
        ))
    }

    fn emit_track(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::Track, tag)? {
            return Ok(i);
        }
        let track = self
            .world
            .tracks
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::Track, tag, referenced_by))?
            .clone();
        let def_ref = self.emit_track_def(&track.definition_tag, tag)?;
        let mut flags = 0;
        if track.reverse {
            flags |= RawTrack::REVERSE_FLAG;
        }
        if track.interpolate {
            flags |= RawTrack::INTERPOLATE_FLAG;
        }
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::Track,
            tag,
            FragPayload::Track(RawTrack { name_ref, def_ref, flags, sleep: track.sleep }),
        ))
    }

    fn emit_skeleton(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::Skeleton, tag)? {
            return Ok(i);
        }
        let skel = self
            .world
            .skeletons
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::Skeleton, tag, referenced_by))?
            .clone();
        let collision_volume_ref = match &skel.collision_volume_tag {
            Some(t) => self.wrap_polyhedron(t, tag)?,
            None => 0,
        };
        let mut bones = Vec::with_capacity(skel.bones.len());
        for bone in &skel.bones {
            let track_ref = self.emit_track(&bone.track_tag, tag)?;
            let sprite_ref = match &bone.sprite_tag {
                Some(t) => self.attachment_ref(t, tag)?,
                None => 0,
            };
            bones.push(RawBone {
                name_ref: self.names.add(&bone.name),
                flags: 0,
                track_ref,
                sprite_ref,
                sub_bones: bone.children.clone(),
            });
        }
        let mut skins = Vec::with_capacity(skel.skins.len());
        for (mesh_tag, link) in &skel.skins {
            skins.push((self.wrap_dm_sprite(mesh_tag, tag)?, *link));
        }
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::Skeleton,
            tag,
            FragPayload::HierarchicalSpriteDef(HierarchicalSpriteDef {
                name_ref,
                flags: 0,
                collision_volume_ref,
                center_offset: skel.center_offset,
                bounding_radius: skel.bounding_radius,
                bones,
                skins,
            }),
        ))
    }

    fn wrap_hierarchical(&mut self, def_tag: &str, referenced_by: &str) -> Result<i32> {
        let def_ref = self.emit_skeleton(def_tag, referenced_by)?;
        Ok(self.push(FragPayload::HierarchicalSprite(HierarchicalSprite {
            name_ref: 0,
            def_ref,
            flags: 0,
            bounding_radius: None,
        })))
    }

    /// A bone attachment tag may name a mesh or a 3-D sprite.
    fn attachment_ref(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if self.world.meshes.contains_key(tag) {
            self.wrap_dm_sprite(tag, referenced_by)
        } else if self.world.sprite3ds.contains_key(tag) {
            self.wrap_sprite3d(tag, referenced_by)
        } else {
            Err(Self::missing(RecordKind::Mesh, tag, referenced_by))
        }
    }

    fn emit_sprite3d(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::Sprite3D, tag)? {
            return Ok(i);
        }
        let sprite = self
            .world
            .sprite3ds
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::Sprite3D, tag, referenced_by))?
            .clone();
        let mut nodes = Vec::with_capacity(sprite.nodes.len());
        for node in &sprite.nodes {
            let sprite_ref = match &node.render.sprite_tag {
                Some(t) => Some(self.wrap_simple_sprite(t, tag)?),
                None => None,
            };
            nodes.push(Sprite3DNode {
                vertex_indices: node.vertex_indices.clone(),
                front_tree: node.front_tree,
                back_tree: node.back_tree,
                render: RawRenderInfo {
                    render_method: node.render.render_method,
                    flags: 0,
                    pen: node.render.pen,
                    brightness: node.render.brightness,
                    scaled_ambient: node.render.scaled_ambient,
                    sprite_ref,
                    uv_origin: node.render.uv_origin,
                    uv_map: node.render.uv_map.clone(),
                    two_sided: node.render.two_sided,
                },
            });
        }
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::Sprite3D,
            tag,
            FragPayload::Sprite3DDef(Sprite3DDef {
                name_ref,
                flags: 0,
                sphere_list_ref: 0,
                center_offset: sprite.center_offset,
                bounding_radius: sprite.bounding_radius,
                vertices: sprite.vertices.clone(),
                nodes,
            }),
        ))
    }

    fn wrap_sprite3d(&mut self, def_tag: &str, referenced_by: &str) -> Result<i32> {
        let def_ref = self.emit_sprite3d(def_tag, referenced_by)?;
        Ok(self.push(FragPayload::Sprite3D(RawSprite3D { name_ref: 0, def_ref, flags: 0 })))
    }

    fn emit_light_def(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::LightDef, tag)? {
            return Ok(i);
        }
        let def = self
            .world
            .light_defs
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::LightDef, tag, referenced_by))?;
        let flags = if def.skip_frames { RawLightDef::SKIP_FRAMES_FLAG } else { 0 };
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::LightDef,
            tag,
            FragPayload::LightDef(RawLightDef {
                name_ref,
                flags,
                frame_count: def.frame_count,
                current_frame: def.current_frame,
                sleep: def.sleep,
                light_levels: def.light_levels.clone(),
                colors: def.colors.clone(),
            }),
        ))
    }

    fn wrap_light(&mut self, def_tag: &str, referenced_by: &str) -> Result<i32> {
        let def_ref = self.emit_light_def(def_tag, referenced_by)?;
        Ok(self.push(FragPayload::Light(RawLight { name_ref: 0, def_ref, flags: 0 })))
    }

    fn emit_point_light(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::PointLight, tag)? {
            return Ok(i);
        }
        let pl = self
            .world
            .point_lights
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::PointLight, tag, referenced_by))?
            .clone();
        let light_ref = self.wrap_light(&pl.light_tag, tag)?;
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::PointLight,
            tag,
            FragPayload::PointLight(RawPointLight {
                name_ref,
                light_ref,
                flags: pl.flags,
                location: pl.location,
                radius: pl.radius,
            }),
        ))
    }

    fn emit_ambient_light(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::AmbientLight, tag)? {
            return Ok(i);
        }
        let al = self
            .world
            .ambient_lights
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::AmbientLight, tag, referenced_by))?
            .clone();
        let light_ref = self.wrap_light(&al.light_tag, tag)?;
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::AmbientLight,
            tag,
            FragPayload::AmbientLight(RawAmbientLight {
                name_ref,
                light_ref,
                flags: 0,
                regions: al.regions.clone(),
            }),
        ))
    }

    fn emit_region(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::Region, tag)? {
            return Ok(i);
        }
        let region = self
            .world
            .regions
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::Region, tag, referenced_by))?
            .clone();
        let ambient_light_ref = match &region.ambient_light_tag {
            Some(t) => self.emit_ambient_light(t, tag)?,
            None => 0,
        };
        let mesh_ref = match &region.mesh_tag {
            Some(t) => self.wrap_dm_sprite(t, tag)?,
            None => 0,
        };
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::Region,
            tag,
            FragPayload::Region(RawRegion {
                name_ref,
                flags: 0,
                ambient_light_ref,
                mesh_ref,
                sphere: region.sphere,
                reverb_volume: region.reverb_volume,
                vertices: region.vertices.clone(),
                vis_lists: region.vis_lists.clone(),
                user_data: region.user_data.clone(),
            }),
        ))
    }

    fn emit_world_tree(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::WorldTree, tag)? {
            return Ok(i);
        }
        let tree = self
            .world
            .world_trees
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::WorldTree, tag, referenced_by))?
            .clone();
        let mut nodes = Vec::with_capacity(tree.nodes.len());
        for node in &tree.nodes {
            let region_ref = match &node.region_tag {
                Some(t) => self.emit_region(t, tag)?,
                None => 0,
            };
            nodes.push(WorldTreeNode {
                normal: node.normal,
                dist: node.dist,
                region_ref,
                front: node.front_tree,
                back: node.back_tree,
            });
        }
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::WorldTree,
            tag,
            FragPayload::WorldTree(RawWorldTree { name_ref, nodes }),
        ))
    }

    fn emit_zone(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::Zone, tag)? {
            return Ok(i);
        }
        let zone = self
            .world
            .zones
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::Zone, tag, referenced_by))?;
        let name_ref = self.names.add(tag);
        Ok(self.done(
            RecordKind::Zone,
            tag,
            FragPayload::Zone(RawZone {
                name_ref,
                flags: 0,
                regions: zone.regions.clone(),
                user_data: zone.user_data.clone(),
            }),
        ))
    }

    fn emit_sphere(&mut self, radius: f32) -> i32 {
        self.push(FragPayload::Sphere(Sphere { name_ref: 0, radius }))
    }

    fn emit_actor_def(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::ActorDef, tag)? {
            return Ok(i);
        }
        let def = self
            .world
            .actor_defs
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::ActorDef, tag, referenced_by))?
            .clone();
        let bounds_ref = match def.bounds_radius {
            Some(r) => self.emit_sphere(r),
            None => 0,
        };
        let mut sprite_refs = Vec::with_capacity(def.sprites.len());
        for sprite in &def.sprites {
            let r = match sprite {
                SpriteRef::Mesh(t) => self.wrap_dm_sprite(t, tag)?,
                SpriteRef::Skeleton(t) => self.wrap_hierarchical(t, tag)?,
                SpriteRef::Sprite3D(t) => self.wrap_sprite3d(t, tag)?,
            };
            sprite_refs.push(r);
        }
        let name_ref = self.names.add(tag);
        let callback_name_ref = self.names.add(&def.callback);
        Ok(self.done(
            RecordKind::ActorDef,
            tag,
            FragPayload::ActorDef(RawActorDef {
                name_ref,
                flags: 0,
                callback_name_ref,
                bounds_ref,
                current_action: def.current_action,
                location: def.location,
                actions: def
                    .actions
                    .iter()
                    .map(|a| RawActorAction { min_distances: a.min_distances.clone() })
                    .collect(),
                sprite_refs,
                user_data: def.user_data.clone(),
            }),
        ))
    }

    fn emit_actor_inst(&mut self, tag: &str, referenced_by: &str) -> Result<i32> {
        if let Some(i) = self.begin(RecordKind::ActorInst, tag)? {
            return Ok(i);
        }
        let inst = self
            .world
            .actor_insts
            .get(tag)
            .ok_or_else(|| Self::missing(RecordKind::ActorInst, tag, referenced_by))?
            .clone();
        let sphere_ref = match inst.sphere_radius {
            Some(r) => self.emit_sphere(r),
            None => 0,
        };
        let rgb_track_ref = match &inst.rgb_track_tag {
            Some(t) => self.wrap_rgb_track(t, tag)?,
            None => 0,
        };
        let name_ref = self.names.add(tag);
        let actor_def_name_ref = self.names.add(&inst.actor_def_tag);
        Ok(self.done(
            RecordKind::ActorInst,
            tag,
            FragPayload::Actor(RawActor {
                name_ref,
                actor_def_name_ref,
                flags: 0,
                sphere_ref,
                rgb_track_ref,
                current_action: inst.current_action,
                location: inst.location,
                bounding_radius: inst.bounding_radius,
                scale_factor: inst.scale_factor,
                user_data: inst.user_data.clone(),
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::fragment::WldVersion;
    use crate::world::{Material, MaterialPalette, Mesh};
    use glam::Vec3;

    fn shared_palette_world() -> World {
        let mut world = World::new(WldVersion::New);
        world.materials.insert(
            "STONE_MDF".to_string(),
            Material { tag: "STONE_MDF".to_string(), render_method: 7, ..Material::default() },
        );
        world.material_palettes.insert(
            "SHARED_MP".to_string(),
            MaterialPalette {
                tag: "SHARED_MP".to_string(),
                flags: 0,
                material_tags: vec!["STONE_MDF".to_string()],
            },
        );
        for tag in ["MESHA_DMSPRITEDEF", "MESHB_DMSPRITEDEF"] {
            world.meshes.insert(
                tag.to_string(),
                Mesh {
                    tag: tag.to_string(),
                    material_palette_tag: "SHARED_MP".to_string(),
                    fp_scale: 6,
                    vertices: vec![Vec3::new(1.0, -2.0, 0.5)],
                    ..Mesh::default()
                },
            );
        }
        world
    }

    #[test]
    fn test_shared_dependency_emitted_once() {
        let raw = shared_palette_world().to_raw().unwrap();
        let palettes = raw
            .fragments
            .iter()
            .flatten()
            .filter(|f| matches!(f, FragPayload::MaterialPalette(_)))
            .count();
        assert_eq!(palettes, 1);
        let meshes: Vec<_> = raw
            .fragments
            .iter()
            .flatten()
            .filter_map(|f| match f {
                FragPayload::DmSpriteDef2(m) => Some(m.material_palette_ref),
                _ => None,
            })
            .collect();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0], meshes[1]);
    }

    #[test]
    fn test_two_encoders_are_independent() {
        let world = shared_palette_world();
        let a = world.to_raw().unwrap();
        let b = world.to_raw().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fragments.len(), 4);
    }

    #[test]
    fn test_missing_tag_is_fatal() {
        let mut world = shared_palette_world();
        world.material_palettes.get_mut("SHARED_MP").unwrap().material_tags =
            vec!["NOSUCH_MDF".to_string()];
        let err = world.to_raw().unwrap_err();
        assert!(matches!(err, Error::TagNotFound { .. }));
    }

    #[test]
    fn test_name_table_round_trip_after_encode() {
        let raw = shared_palette_world().to_raw().unwrap();
        for frag in raw.fragments.iter().flatten() {
            if frag.name_ref() != 0 {
                assert!(raw.names.name(frag.name_ref()).is_some());
            }
        }
    }
}
