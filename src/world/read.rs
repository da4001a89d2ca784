//! Raw→logical resolution.
//!
//! Two passes over the fully-parsed fragment list: pass 1 assigns every
//! fragment its tag (from the name table, or a synthesized placeholder
//! for unnamed fragments), pass 2 builds the logical records, turning
//! every positional reference into the target's tag and folding instance
//! wrappers into the referencing record. Reference targets are validated
//! by kind; a mismatch is fatal.

use glam::Vec3;

use crate::error::{Error, Result};
use crate::quant::{dequantize, dequantize_normal, dequantize_wide};
use crate::raw::fragment::FragPayload;
use crate::raw::WldRaw;

use super::{
    ActorAction, ActorDef, ActorInst, AmbientLight, LightDef, Material, MaterialPalette, Mesh,
    PointLight, Polyhedron, Region, RenderInfo, RgbTrack, SimpleSprite, Skeleton, SkeletonBone,
    SpriteFrame, SpriteRef, Sprite3D, Sprite3DBspNode, Track, TrackDef, TrackTransform, World,
    WorldNode, WorldTree, Zone,
};

impl World {
    /// Decode a WLD byte stream all the way to the logical graph.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_raw(&WldRaw::from_bytes(data)?)
    }

    /// Resolve an already-parsed raw stream into the logical graph.
    pub fn from_raw(raw: &WldRaw) -> Result<Self> {
        Resolver::new(raw)?.run()
    }
}

struct Resolver<'a> {
    raw: &'a WldRaw,
    /// Pass-1 tag per fragment slot, parallel to `raw.fragments`.
    tags: Vec<Option<String>>,
}

impl<'a> Resolver<'a> {
    fn new(raw: &'a WldRaw) -> Result<Self> {
        let mut tags = Vec::with_capacity(raw.fragments.len());
        for (i, slot) in raw.fragments.iter().enumerate() {
            let Some(frag) = slot else {
                tags.push(None);
                continue;
            };
            let name_ref = frag.name_ref();
            let tag = match raw.names.name(name_ref) {
                Some(name) if !name.is_empty() => name.to_string(),
                // A negative reference must land on a string boundary (or
                // be the default-tag sentinel); anything else is stream
                // corruption, not merely an unnamed fragment.
                None if name_ref < 0 => {
                    return Err(Error::BadNameRef { index: i as u32 + 1, name_ref });
                }
                _ => format!("{}_{}", i + 1, frag.kind_name()),
            };
            tags.push(Some(tag));
        }
        Ok(Self { raw, tags })
    }

    fn run(self) -> Result<World> {
        let mut world = World::new(self.raw.version);
        for (slot, frag) in self.raw.fragments.iter().enumerate() {
            let index = slot as u32 + 1;
            let Some(frag) = frag else { continue };
            let tag = self.tags[slot].clone().unwrap_or_default();
            match frag {
                FragPayload::SimpleSpriteDef(def) => {
                    let mut frames = Vec::with_capacity(def.frame_refs.len());
                    for &r in &def.frame_refs {
                        let (frame_tag, info) = self.bm_info(r)?;
                        frames.push(SpriteFrame { tag: frame_tag, files: info.file_names.clone() });
                    }
                    world.simple_sprites.insert(
                        tag.clone(),
                        SimpleSprite {
                            tag,
                            current_frame: def.current_frame,
                            sleep: def.sleep,
                            frames,
                        },
                    );
                }
                FragPayload::MaterialDef(def) => {
                    let simple_sprite_tag = if def.sprite_ref != 0 {
                        Some(self.simple_sprite_def_tag(def.sprite_ref)?)
                    } else {
                        None
                    };
                    world.materials.insert(
                        tag.clone(),
                        Material {
                            tag,
                            render_method: def.render_method,
                            rgb_pen: def.rgb_pen,
                            brightness: def.brightness,
                            scaled_ambient: def.scaled_ambient,
                            simple_sprite_tag,
                            uv_shift: def.uv_shift,
                        },
                    );
                }
                FragPayload::MaterialPalette(pal) => {
                    let mut material_tags = Vec::with_capacity(pal.material_refs.len());
                    for &r in &pal.material_refs {
                        let (mat_tag, _) = self.expect(r, "MATERIALDEF", |f| match f {
                            FragPayload::MaterialDef(m) => Some(m),
                            _ => None,
                        })?;
                        material_tags.push(mat_tag);
                    }
                    world.material_palettes.insert(
                        tag.clone(),
                        MaterialPalette { tag, flags: pal.flags, material_tags },
                    );
                }
                FragPayload::DmSpriteDef2(def) => {
                    let material_palette_tag = if def.material_palette_ref != 0 {
                        self.expect(def.material_palette_ref, "MATERIALPALETTE", |f| match f {
                            FragPayload::MaterialPalette(p) => Some(p),
                            _ => None,
                        })?
                        .0
                    } else {
                        String::new()
                    };
                    let rgb_track_tag = if def.dm_track_ref != 0 {
                        Some(self.rgb_track_def_tag(def.dm_track_ref)?)
                    } else {
                        None
                    };
                    let fp = def.fp_scale;
                    world.meshes.insert(
                        tag.clone(),
                        Mesh {
                            tag,
                            flags: def.flags,
                            material_palette_tag,
                            rgb_track_tag,
                            center_offset: def.center_offset,
                            params2: def.params2,
                            max_distance: def.max_distance,
                            min: def.min,
                            max: def.max,
                            fp_scale: fp,
                            vertices: def
                                .vertices
                                .iter()
                                .map(|v| {
                                    Vec3::new(
                                        dequantize(v[0], fp),
                                        dequantize(v[1], fp),
                                        dequantize(v[2], fp),
                                    )
                                })
                                .collect(),
                            uvs: def
                                .uvs
                                .iter()
                                .map(|uv| [dequantize_wide(uv[0], fp), dequantize_wide(uv[1], fp)])
                                .collect(),
                            normals: def
                                .normals
                                .iter()
                                .map(|n| {
                                    Vec3::new(
                                        dequantize_normal(n[0]),
                                        dequantize_normal(n[1]),
                                        dequantize_normal(n[2]),
                                    )
                                })
                                .collect(),
                            colors: def.colors.clone(),
                            faces: def.faces.clone(),
                            skin_groups: def.skin_groups.clone(),
                            face_material_groups: def.face_material_groups.clone(),
                            vertex_material_groups: def.vertex_material_groups.clone(),
                            meshops: def.meshops.clone(),
                        },
                    );
                }
                FragPayload::DmRgbTrackDef(def) => {
                    world.rgb_tracks.insert(
                        tag.clone(),
                        RgbTrack {
                            tag,
                            flags: def.flags,
                            sleep: def.sleep,
                            frames: def.frames.clone(),
                        },
                    );
                }
                FragPayload::PolyhedronDef(def) => {
                    world.polyhedra.insert(
                        tag.clone(),
                        Polyhedron {
                            tag,
                            flags: def.flags,
                            bounding_radius: def.bounding_radius,
                            scale_factor: def.scale_factor,
                            vertices: def.vertices.clone(),
                            faces: def.faces.clone(),
                        },
                    );
                }
                FragPayload::TrackDef(def) => {
                    let frames = def
                        .frames
                        .iter()
                        .map(|f| TrackTransform {
                            translation: if f.shift_denom == 0 {
                                Vec3::ZERO
                            } else {
                                let d = f32::from(f.shift_denom);
                                Vec3::new(
                                    f32::from(f.shift_x) / d,
                                    f32::from(f.shift_y) / d,
                                    f32::from(f.shift_z) / d,
                                )
                            },
                            rotation: [
                                f32::from(f.rot_denom) / 16384.0,
                                f32::from(f.rot_x) / 16384.0,
                                f32::from(f.rot_y) / 16384.0,
                                f32::from(f.rot_z) / 16384.0,
                            ],
                        })
                        .collect();
                    world
                        .track_defs
                        .insert(tag.clone(), TrackDef { tag, flags: def.flags, frames });
                }
                FragPayload::Track(inst) => {
                    let (definition_tag, _) = self.expect(inst.def_ref, "TRACKDEF", |f| match f {
                        FragPayload::TrackDef(d) => Some(d),
                        _ => None,
                    })?;
                    world.tracks.insert(
                        tag.clone(),
                        Track {
                            tag,
                            definition_tag,
                            interpolate: inst.flags
                                & crate::raw::fragments::Track::INTERPOLATE_FLAG
                                != 0,
                            reverse: inst.flags & crate::raw::fragments::Track::REVERSE_FLAG != 0,
                            sleep: inst.sleep,
                        },
                    );
                }
                FragPayload::HierarchicalSpriteDef(def) => {
                    let mut bones = Vec::with_capacity(def.bones.len());
                    for bone in &def.bones {
                        let (track_tag, _) = self.expect(bone.track_ref, "TRACK", |f| match f {
                            FragPayload::Track(t) => Some(t),
                            _ => None,
                        })?;
                        let sprite_tag = if bone.sprite_ref != 0 {
                            Some(self.attachment_tag(bone.sprite_ref)?)
                        } else {
                            None
                        };
                        bones.push(SkeletonBone {
                            name: self
                                .raw
                                .names
                                .name(bone.name_ref)
                                .unwrap_or_default()
                                .to_string(),
                            track_tag,
                            sprite_tag,
                            children: bone.sub_bones.clone(),
                        });
                    }
                    let collision_volume_tag = if def.collision_volume_ref != 0 {
                        Some(self.polyhedron_def_tag(def.collision_volume_ref)?)
                    } else {
                        None
                    };
                    let mut skins = Vec::with_capacity(def.skins.len());
                    for &(mesh_ref, link) in &def.skins {
                        skins.push((self.mesh_def_tag(mesh_ref)?, link));
                    }
                    world.skeletons.insert(
                        tag.clone(),
                        Skeleton {
                            tag,
                            center_offset: def.center_offset,
                            bounding_radius: def.bounding_radius,
                            collision_volume_tag,
                            bones,
                            skins,
                        },
                    );
                }
                FragPayload::Sprite3DDef(def) => {
                    let mut nodes = Vec::with_capacity(def.nodes.len());
                    for node in &def.nodes {
                        let sprite_tag = match node.render.sprite_ref {
                            Some(r) if r != 0 => Some(self.simple_sprite_def_tag(r)?),
                            _ => None,
                        };
                        nodes.push(Sprite3DBspNode {
                            vertex_indices: node.vertex_indices.clone(),
                            front_tree: node.front_tree,
                            back_tree: node.back_tree,
                            render: RenderInfo {
                                render_method: node.render.render_method,
                                pen: node.render.pen,
                                brightness: node.render.brightness,
                                scaled_ambient: node.render.scaled_ambient,
                                sprite_tag,
                                uv_origin: node.render.uv_origin,
                                uv_map: node.render.uv_map.clone(),
                                two_sided: node.render.two_sided,
                            },
                        });
                    }
                    world.sprite3ds.insert(
                        tag.clone(),
                        Sprite3D {
                            tag,
                            center_offset: def.center_offset,
                            bounding_radius: def.bounding_radius,
                            vertices: def.vertices.clone(),
                            nodes,
                        },
                    );
                }
                FragPayload::LightDef(def) => {
                    world.light_defs.insert(
                        tag.clone(),
                        LightDef {
                            tag,
                            current_frame: def.current_frame,
                            sleep: def.sleep,
                            skip_frames: def.flags
                                & crate::raw::fragments::LightDef::SKIP_FRAMES_FLAG
                                != 0,
                            frame_count: def.frame_count,
                            light_levels: def.light_levels.clone(),
                            colors: def.colors.clone(),
                        },
                    );
                }
                FragPayload::PointLight(pl) => {
                    world.point_lights.insert(
                        tag.clone(),
                        PointLight {
                            tag,
                            light_tag: self.light_def_tag(pl.light_ref)?,
                            flags: pl.flags,
                            location: pl.location,
                            radius: pl.radius,
                        },
                    );
                }
                FragPayload::AmbientLight(al) => {
                    world.ambient_lights.insert(
                        tag.clone(),
                        AmbientLight {
                            tag,
                            light_tag: self.light_def_tag(al.light_ref)?,
                            regions: al.regions.clone(),
                        },
                    );
                }
                FragPayload::ActorDef(def) => {
                    let mut sprites = Vec::with_capacity(def.sprite_refs.len());
                    for &r in &def.sprite_refs {
                        sprites.push(self.sprite_ref(r)?);
                    }
                    world.actor_defs.insert(
                        tag.clone(),
                        ActorDef {
                            tag,
                            callback: self
                                .raw
                                .names
                                .name(def.callback_name_ref)
                                .unwrap_or_default()
                                .to_string(),
                            bounds_radius: self.sphere_radius(def.bounds_ref)?,
                            current_action: def.current_action,
                            location: def.location,
                            actions: def
                                .actions
                                .iter()
                                .map(|a| ActorAction { min_distances: a.min_distances.clone() })
                                .collect(),
                            sprites,
                            user_data: def.user_data.clone(),
                        },
                    );
                }
                FragPayload::Actor(inst) => {
                    let actor_def_tag = self
                        .raw
                        .names
                        .name(inst.actor_def_name_ref)
                        .unwrap_or_default()
                        .to_string();
                    let rgb_track_tag = if inst.rgb_track_ref != 0 {
                        Some(self.rgb_track_def_tag(inst.rgb_track_ref)?)
                    } else {
                        None
                    };
                    world.actor_insts.insert(
                        tag.clone(),
                        ActorInst {
                            tag,
                            actor_def_tag,
                            current_action: inst.current_action,
                            location: inst.location,
                            bounding_radius: inst.bounding_radius,
                            scale_factor: inst.scale_factor,
                            sphere_radius: self.sphere_radius(inst.sphere_ref)?,
                            rgb_track_tag,
                            user_data: inst.user_data.clone(),
                        },
                    );
                }
                FragPayload::WorldTree(tree) => {
                    let mut nodes = Vec::with_capacity(tree.nodes.len());
                    for node in &tree.nodes {
                        let region_tag = if node.region_ref != 0 {
                            Some(
                                self.expect(node.region_ref, "REGION", |f| match f {
                                    FragPayload::Region(r) => Some(r),
                                    _ => None,
                                })?
                                .0,
                            )
                        } else {
                            None
                        };
                        nodes.push(WorldNode {
                            normal: node.normal,
                            dist: node.dist,
                            region_tag,
                            front_tree: node.front,
                            back_tree: node.back,
                        });
                    }
                    world.world_trees.insert(tag.clone(), WorldTree { tag, nodes });
                }
                FragPayload::Region(region) => {
                    let ambient_light_tag = if region.ambient_light_ref != 0 {
                        Some(
                            self.expect(region.ambient_light_ref, "AMBIENTLIGHT", |f| match f {
                                FragPayload::AmbientLight(a) => Some(a),
                                _ => None,
                            })?
                            .0,
                        )
                    } else {
                        None
                    };
                    // Legacy zone geometry uses mesh kinds outside the
                    // modeled set; an unresolvable region mesh is dropped
                    // with a warning rather than failing the whole file.
                    let mesh_tag = if region.mesh_ref != 0 {
                        match self.mesh_def_tag(region.mesh_ref) {
                            Ok(t) => Some(t),
                            Err(err) => {
                                tracing::warn!(index, %err, "dropping unresolvable region mesh reference");
                                None
                            }
                        }
                    } else {
                        None
                    };
                    world.regions.insert(
                        tag.clone(),
                        Region {
                            tag,
                            ambient_light_tag,
                            mesh_tag,
                            sphere: region.sphere,
                            reverb_volume: region.reverb_volume,
                            vertices: region.vertices.clone(),
                            vis_lists: region.vis_lists.clone(),
                            user_data: region.user_data.clone(),
                        },
                    );
                }
                FragPayload::Zone(zone) => {
                    world.zones.insert(
                        tag.clone(),
                        Zone {
                            tag,
                            regions: zone.regions.clone(),
                            user_data: zone.user_data.clone(),
                        },
                    );
                }
                FragPayload::GlobalAmbientLightDef(g) => {
                    world.global_ambient = Some(g.color);
                }
                // Instance wrappers and bounding volumes are folded into
                // their referencing records above.
                FragPayload::BmInfo(_)
                | FragPayload::SimpleSprite(_)
                | FragPayload::Sprite3D(_)
                | FragPayload::HierarchicalSprite(_)
                | FragPayload::Sphere(_)
                | FragPayload::Polyhedron(_)
                | FragPayload::Light(_)
                | FragPayload::DmSprite(_)
                | FragPayload::DmRgbTrack(_) => {}
            }
        }
        Ok(world)
    }

    /// Look up the fragment at a 1-based index and project it to the
    /// expected kind, returning its pass-1 tag alongside.
    fn expect<T>(
        &self,
        index: i32,
        expected: &'static str,
        project: impl Fn(&'a FragPayload) -> Option<&'a T>,
    ) -> Result<(String, &'a T)> {
        let found = |what: &str| Error::BadFragmentRef {
            index: index.unsigned_abs(),
            found: what.to_string(),
            expected,
        };
        if index <= 0 {
            return Err(found("null reference"));
        }
        let slot = index as usize - 1;
        let frag = self
            .raw
            .fragments
            .get(slot)
            .ok_or_else(|| found("out of range"))?
            .as_ref()
            .ok_or_else(|| found("skipped fragment"))?;
        let inner = project(frag).ok_or_else(|| found(frag.kind_name()))?;
        Ok((self.tags[slot].clone().unwrap_or_default(), inner))
    }

    fn bm_info(&self, r: i32) -> Result<(String, &'a crate::raw::fragments::BmInfo)> {
        self.expect(r, "BMINFO", |f| match f {
            FragPayload::BmInfo(b) => Some(b),
            _ => None,
        })
    }

    /// `SimpleSprite` wrapper → `SimpleSpriteDef` tag.
    fn simple_sprite_def_tag(&self, r: i32) -> Result<String> {
        let (_, wrapper) = self.expect(r, "SIMPLESPRITE", |f| match f {
            FragPayload::SimpleSprite(s) => Some(s),
            _ => None,
        })?;
        Ok(self
            .expect(wrapper.def_ref, "SIMPLESPRITEDEF", |f| match f {
                FragPayload::SimpleSpriteDef(d) => Some(d),
                _ => None,
            })?
            .0)
    }

    /// `DmSprite` wrapper → `DmSpriteDef2` tag.
    fn mesh_def_tag(&self, r: i32) -> Result<String> {
        let (_, wrapper) = self.expect(r, "DMSPRITE", |f| match f {
            FragPayload::DmSprite(s) => Some(s),
            _ => None,
        })?;
        Ok(self
            .expect(wrapper.def_ref, "DMSPRITEDEF2", |f| match f {
                FragPayload::DmSpriteDef2(d) => Some(d),
                _ => None,
            })?
            .0)
    }

    /// `DmRgbTrack` wrapper → `DmRgbTrackDef` tag.
    fn rgb_track_def_tag(&self, r: i32) -> Result<String> {
        let (_, wrapper) = self.expect(r, "DMRGBTRACK", |f| match f {
            FragPayload::DmRgbTrack(t) => Some(t),
            _ => None,
        })?;
        Ok(self
            .expect(wrapper.def_ref, "DMRGBTRACKDEF", |f| match f {
                FragPayload::DmRgbTrackDef(d) => Some(d),
                _ => None,
            })?
            .0)
    }

    /// `Light` wrapper → `LightDef` tag.
    fn light_def_tag(&self, r: i32) -> Result<String> {
        let (_, wrapper) = self.expect(r, "LIGHT", |f| match f {
            FragPayload::Light(l) => Some(l),
            _ => None,
        })?;
        Ok(self
            .expect(wrapper.def_ref, "LIGHTDEF", |f| match f {
                FragPayload::LightDef(d) => Some(d),
                _ => None,
            })?
            .0)
    }

    /// `Polyhedron` wrapper (or a bare `PolyhedronDef`) → definition tag.
    fn polyhedron_def_tag(&self, r: i32) -> Result<String> {
        let (tag, frag) = self.expect(r, "POLYHEDRON", |f| match f {
            FragPayload::Polyhedron(_) | FragPayload::PolyhedronDef(_) => Some(f),
            _ => None,
        })?;
        match frag {
            FragPayload::Polyhedron(wrapper) => Ok(self
                .expect(wrapper.def_ref, "POLYHEDRONDEF", |f| match f {
                    FragPayload::PolyhedronDef(d) => Some(d),
                    _ => None,
                })?
                .0),
            _ => Ok(tag),
        }
    }

    /// Bone/skin attachment: `DmSprite` or `Sprite3D` wrapper.
    fn attachment_tag(&self, r: i32) -> Result<String> {
        let (_, frag) = self.expect(r, "DMSPRITE or SPRITE3D", |f| match f {
            FragPayload::DmSprite(_) | FragPayload::Sprite3D(_) => Some(f),
            _ => None,
        })?;
        match frag {
            FragPayload::DmSprite(_) => self.mesh_def_tag(r),
            _ => self.sprite3d_def_tag(r),
        }
    }

    /// `Sprite3D` wrapper → `Sprite3DDef` tag.
    fn sprite3d_def_tag(&self, r: i32) -> Result<String> {
        let (_, wrapper) = self.expect(r, "SPRITE3D", |f| match f {
            FragPayload::Sprite3D(s) => Some(s),
            _ => None,
        })?;
        Ok(self
            .expect(wrapper.def_ref, "SPRITE3DDEF", |f| match f {
                FragPayload::Sprite3DDef(d) => Some(d),
                _ => None,
            })?
            .0)
    }

    /// Folded `Sphere` fragment → radius. A zero reference is "absent".
    fn sphere_radius(&self, r: i32) -> Result<Option<f32>> {
        if r == 0 {
            return Ok(None);
        }
        let (_, sphere) = self.expect(r, "SPHERE", |f| match f {
            FragPayload::Sphere(s) => Some(s),
            _ => None,
        })?;
        Ok(Some(sphere.radius))
    }

    /// Actor sprite reference, dispatched on the wrapper kind.
    fn sprite_ref(&self, r: i32) -> Result<SpriteRef> {
        let (_, frag) = self.expect(r, "DMSPRITE, HIERARCHICALSPRITE or SPRITE3D", |f| match f {
            FragPayload::DmSprite(_)
            | FragPayload::HierarchicalSprite(_)
            | FragPayload::Sprite3D(_) => Some(f),
            _ => None,
        })?;
        match frag {
            FragPayload::DmSprite(_) => Ok(SpriteRef::Mesh(self.mesh_def_tag(r)?)),
            FragPayload::HierarchicalSprite(wrapper) => Ok(SpriteRef::Skeleton(
                self.expect(wrapper.def_ref, "HIERARCHICALSPRITEDEF", |f| match f {
                    FragPayload::HierarchicalSpriteDef(d) => Some(d),
                    _ => None,
                })?
                .0,
            )),
            _ => Ok(SpriteRef::Sprite3D(self.sprite3d_def_tag(r)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::fragment::WldVersion;
    use crate::raw::fragments::{
        DmSprite, DmSpriteDef2, MaterialDef, MaterialPalette as RawPalette, SimpleSprite as RawSimpleSprite,
        SimpleSpriteDef,
    };
    use crate::raw::names::NameBuilder;

    fn raw_with(fragments: Vec<Option<FragPayload>>, names: NameBuilder) -> WldRaw {
        WldRaw {
            version: WldVersion::New,
            region_count: 0,
            max_object_bytes: 0,
            string_count: 0,
            names: names.into_table(),
            fragments,
        }
    }

    #[test]
    fn test_resolves_mesh_palette_material_chain() {
        let mut names = NameBuilder::new();
        let mat_ref = names.add("MYMAT_MDF");
        let pal_ref = names.add("MYPAL_MP");
        let mesh_ref = names.add("MYMESH_DMSPRITEDEF");
        let raw = raw_with(
            vec![
                Some(FragPayload::MaterialDef(MaterialDef {
                    name_ref: mat_ref,
                    render_method: 7,
                    ..MaterialDef::default()
                })),
                Some(FragPayload::MaterialPalette(RawPalette {
                    name_ref: pal_ref,
                    flags: 0,
                    material_refs: vec![1],
                })),
                Some(FragPayload::DmSpriteDef2(DmSpriteDef2 {
                    name_ref: mesh_ref,
                    material_palette_ref: 2,
                    fp_scale: 6,
                    vertices: vec![[64, -128, 32]],
                    ..DmSpriteDef2::default()
                })),
            ],
            names,
        );
        let world = World::from_raw(&raw).unwrap();
        let mesh = &world.meshes["MYMESH_DMSPRITEDEF"];
        assert_eq!(mesh.material_palette_tag, "MYPAL_MP");
        assert_eq!(world.material_palettes["MYPAL_MP"].material_tags, vec!["MYMAT_MDF"]);
        assert!((mesh.vertices[0].x - 1.0).abs() < 1.0 / 128.0);
        assert!((mesh.vertices[0].y + 2.0).abs() < 1.0 / 128.0);
        assert!((mesh.vertices[0].z - 0.5).abs() < 1.0 / 128.0);
    }

    #[test]
    fn test_unnamed_fragment_gets_placeholder_tag() {
        let raw = raw_with(
            vec![Some(FragPayload::MaterialDef(MaterialDef::default()))],
            NameBuilder::new(),
        );
        let world = World::from_raw(&raw).unwrap();
        assert!(world.materials.contains_key("1_MATERIALDEF"));
    }

    #[test]
    fn test_unresolvable_name_ref_is_fatal() {
        // -999 is neither a string boundary in the (empty) name table nor
        // the default-tag sentinel.
        let raw = raw_with(
            vec![Some(FragPayload::MaterialDef(MaterialDef {
                name_ref: -999,
                ..MaterialDef::default()
            }))],
            NameBuilder::new(),
        );
        let err = World::from_raw(&raw).unwrap_err();
        assert!(matches!(err, Error::BadNameRef { index: 1, name_ref: -999 }));
    }

    #[test]
    fn test_wrapper_fold_through_simple_sprite() {
        let mut names = NameBuilder::new();
        let sprite_ref = names.add("GRASS_SPRITE");
        let mat_ref = names.add("GRASS_MDF");
        let raw = raw_with(
            vec![
                Some(FragPayload::SimpleSpriteDef(SimpleSpriteDef {
                    name_ref: sprite_ref,
                    ..SimpleSpriteDef::default()
                })),
                Some(FragPayload::SimpleSprite(RawSimpleSprite {
                    name_ref: 0,
                    def_ref: 1,
                    flags: 0,
                })),
                Some(FragPayload::MaterialDef(MaterialDef {
                    name_ref: mat_ref,
                    sprite_ref: 2,
                    ..MaterialDef::default()
                })),
            ],
            names,
        );
        let world = World::from_raw(&raw).unwrap();
        assert_eq!(
            world.materials["GRASS_MDF"].simple_sprite_tag.as_deref(),
            Some("GRASS_SPRITE")
        );
        // the wrapper itself is not a logical record
        assert_eq!(world.record_count(), 2);
    }

    #[test]
    fn test_ill_typed_reference_is_fatal() {
        let mut names = NameBuilder::new();
        let mesh_ref = names.add("BROKEN_DMSPRITEDEF");
        let raw = raw_with(
            vec![
                Some(FragPayload::MaterialDef(MaterialDef::default())),
                Some(FragPayload::DmSpriteDef2(DmSpriteDef2 {
                    name_ref: mesh_ref,
                    material_palette_ref: 1,
                    ..DmSpriteDef2::default()
                })),
            ],
            names,
        );
        let err = World::from_raw(&raw).unwrap_err();
        assert!(matches!(
            err,
            Error::BadFragmentRef { index: 1, expected: "MATERIALPALETTE", .. }
        ));
    }

    #[test]
    fn test_dangling_wrapper_target_is_fatal() {
        let raw = raw_with(
            vec![Some(FragPayload::DmSprite(DmSprite { name_ref: 0, def_ref: 9, params: 0 }))],
            NameBuilder::new(),
        );
        // wrapper alone is fine; it only fails when something folds it
        assert!(World::from_raw(&raw).is_ok());
    }
}
