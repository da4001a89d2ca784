//! WCE script emission.
//!
//! The writer produces one root script plus one satellite file per mesh
//! and per skeleton. Skeleton satellites carry the skeleton's bone
//! tracks (instances and their definitions) so that a model's animation
//! set stays in one editable file; everything else lives in the root.
//! Each output starts with the two-line generator header and is built in
//! memory, then flushed through the archive in one write.

use std::fmt::Write as _;

use crate::archive::Archive;
use crate::error::Result;
use crate::quant::unpack_rgba;
use crate::world::{
    ActorDef, ActorInst, AmbientLight, LightDef, Material, MaterialPalette, Mesh, PointLight,
    Polyhedron, Region, RgbTrack, SimpleSprite, Skeleton, SpriteRef, Sprite3D, Track, TrackDef,
    World, WorldTree, Zone,
};

pub const GENERATOR_HEADER: &str =
    "// wldkit ASCII world script\n// This file is regenerated on export; edits survive a round trip.\n";

/// Indented line buffer for one output file.
struct Out {
    buf: String,
    indent: usize,
}

impl Out {
    fn new() -> Self {
        Self { buf: GENERATOR_HEADER.to_string(), indent: 0 }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.buf.push('\t');
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.indent += 1;
    }

    /// Unwind one `open` that has no closing keyword of its own, such as
    /// a `NUM*` count header.
    fn dedent(&mut self) {
        self.indent -= 1;
    }

    fn close(&mut self, text: &str) {
        self.dedent();
        self.line(text);
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf.into_bytes()
    }
}

fn quoted(s: &str) -> String {
    format!("\"{s}\"")
}

fn opt_quoted(v: Option<&str>) -> String {
    v.map_or_else(|| "NULL".to_string(), quoted)
}

fn opt_num<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map_or_else(|| "NULL".to_string(), |x| x.to_string())
}

fn floats(values: &[f32]) -> String {
    let mut s = String::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        let _ = write!(s, "{v}");
    }
    s
}

fn opt_floats(v: Option<&[f32]>) -> String {
    v.map_or_else(|| "NULL".to_string(), floats)
}

fn rgba(color: u32) -> String {
    let [r, g, b, a] = unpack_rgba(color);
    format!("{r} {g} {b} {a}")
}

/// Satellite file name for a definition tag.
pub fn satellite_name(tag: &str) -> String {
    format!("{tag}.WCE")
}

pub struct WceWriter;

impl WceWriter {
    /// Write the world as a WCE script set rooted at `root_name`.
    pub fn write(world: &World, archive: &mut dyn Archive, root_name: &str) -> Result<()> {
        // Tracks owned by a skeleton go into that skeleton's satellite.
        let mut claimed_tracks: Vec<&str> = Vec::new();
        let mut claimed_defs: Vec<&str> = Vec::new();
        for skel in world.skeletons.values() {
            for bone in &skel.bones {
                if let Some(track) = world.tracks.get(&bone.track_tag) {
                    claimed_tracks.push(&track.tag);
                    claimed_defs.push(&track.definition_tag);
                }
            }
        }

        let mut root = Out::new();
        root.line(&format!(
            "WORLDVERSION {}",
            match world.version {
                crate::raw::fragment::WldVersion::Old => "OLD",
                crate::raw::fragment::WldVersion::New => "NEW",
            }
        ));
        for mesh in world.meshes.values() {
            root.line(&format!("INCLUDE {}", quoted(&satellite_name(&mesh.tag))));
        }
        for skel in world.skeletons.values() {
            root.line(&format!("INCLUDE {}", quoted(&satellite_name(&skel.tag))));
        }

        if let Some(color) = world.global_ambient {
            root.open("GLOBALAMBIENTLIGHTDEF");
            root.line(&format!("COLOR {}", rgba(color)));
            root.close("ENDGLOBALAMBIENTLIGHTDEF");
        }
        for s in world.simple_sprites.values() {
            write_simple_sprite(&mut root, s);
        }
        for m in world.materials.values() {
            write_material(&mut root, m);
        }
        for p in world.material_palettes.values() {
            write_palette(&mut root, p);
        }
        for t in world.rgb_tracks.values() {
            write_rgb_track(&mut root, t);
        }
        for p in world.polyhedra.values() {
            write_polyhedron(&mut root, p);
        }
        for d in world.track_defs.values() {
            if !claimed_defs.contains(&d.tag.as_str()) {
                write_track_def(&mut root, d);
            }
        }
        for t in world.tracks.values() {
            if !claimed_tracks.contains(&t.tag.as_str()) {
                write_track(&mut root, t);
            }
        }
        for s in world.sprite3ds.values() {
            write_sprite3d(&mut root, s);
        }
        for l in world.light_defs.values() {
            write_light_def(&mut root, l);
        }
        for r in world.regions.values() {
            write_region(&mut root, r);
        }
        for a in world.ambient_lights.values() {
            write_ambient_light(&mut root, a);
        }
        for p in world.point_lights.values() {
            write_point_light(&mut root, p);
        }
        for t in world.world_trees.values() {
            write_world_tree(&mut root, t);
        }
        for z in world.zones.values() {
            write_zone(&mut root, z);
        }
        for d in world.actor_defs.values() {
            write_actor_def(&mut root, d);
        }
        for i in world.actor_insts.values() {
            write_actor_inst(&mut root, i);
        }

        for mesh in world.meshes.values() {
            let mut out = Out::new();
            write_mesh(&mut out, mesh);
            archive.write_file(&satellite_name(&mesh.tag), &out.into_bytes())?;
        }
        for skel in world.skeletons.values() {
            let mut out = Out::new();
            for bone in &skel.bones {
                if let Some(track) = world.tracks.get(&bone.track_tag) {
                    if let Some(def) = world.track_defs.get(&track.definition_tag) {
                        write_track_def(&mut out, def);
                    }
                    write_track(&mut out, track);
                }
            }
            write_skeleton(&mut out, skel);
            archive.write_file(&satellite_name(&skel.tag), &out.into_bytes())?;
        }
        archive.write_file(root_name, &root.into_bytes())
    }
}

fn write_simple_sprite(out: &mut Out, s: &SimpleSprite) {
    out.open(&format!("SIMPLESPRITEDEF {}", quoted(&s.tag)));
    out.line(&format!("CURRENTFRAME? {}", opt_num(s.current_frame)));
    out.line(&format!("SLEEP? {}", opt_num(s.sleep)));
    out.open(&format!("NUMFRAMES {}", s.frames.len()));
    for frame in &s.frames {
        out.open(&format!("FRAME {}", quoted(&frame.tag)));
        out.open(&format!("NUMFILES {}", frame.files.len()));
        for file in &frame.files {
            out.line(&format!("FILE {}", quoted(file)));
        }
        out.dedent();
        out.close("ENDFRAME");
    }
    out.dedent();
    out.close("ENDSIMPLESPRITEDEF");
}

fn write_material(out: &mut Out, m: &Material) {
    out.open(&format!("MATERIALDEFINITION {}", quoted(&m.tag)));
    out.line(&format!("RENDERMETHOD {}", m.render_method));
    out.line(&format!("RGBPEN {}", rgba(m.rgb_pen)));
    out.line(&format!("BRIGHTNESS {}", m.brightness));
    out.line(&format!("SCALEDAMBIENT {}", m.scaled_ambient));
    out.line(&format!("SIMPLESPRITEINST? {}", opt_quoted(m.simple_sprite_tag.as_deref())));
    out.line(&format!("UVSHIFT? {}", opt_floats(m.uv_shift.as_ref().map(|v| &v[..]))));
    out.close("ENDMATERIALDEFINITION");
}

fn write_palette(out: &mut Out, p: &MaterialPalette) {
    out.open(&format!("MATERIALPALETTE {}", quoted(&p.tag)));
    out.line(&format!("HEXFLAGS {}", p.flags));
    out.open(&format!("NUMMATERIALS {}", p.material_tags.len()));
    for tag in &p.material_tags {
        out.line(&format!("MATERIAL {}", quoted(tag)));
    }
    out.dedent();
    out.close("ENDMATERIALPALETTE");
}

fn write_mesh(out: &mut Out, m: &Mesh) {
    out.open(&format!("DMSPRITEDEF2 {}", quoted(&m.tag)));
    out.line(&format!("CENTEROFFSET {}", floats(&m.center_offset.to_array())));
    out.open(&format!("NUMVERTICES {}", m.vertices.len()));
    for v in &m.vertices {
        out.line(&format!("XYZ {}", floats(&v.to_array())));
    }
    out.dedent();
    out.open(&format!("NUMUVS {}", m.uvs.len()));
    for uv in &m.uvs {
        out.line(&format!("UV {}", floats(uv)));
    }
    out.dedent();
    out.open(&format!("NUMVERTEXNORMALS {}", m.normals.len()));
    for n in &m.normals {
        out.line(&format!("NORMAL {}", floats(&n.to_array())));
    }
    out.dedent();
    out.open(&format!("NUMVERTEXCOLORS {}", m.colors.len()));
    for &c in &m.colors {
        out.line(&format!("RGBA {}", rgba(c)));
    }
    out.dedent();
    out.line(&format!("MATERIALPALETTE {}", quoted(&m.material_palette_tag)));
    out.line(&format!("DMRGBTRACK? {}", opt_quoted(m.rgb_track_tag.as_deref())));
    out.open(&format!("NUMFACES {}", m.faces.len()));
    for f in &m.faces {
        out.open("FACE");
        out.line(&format!("HEXFLAGS {}", f.flags));
        out.line(&format!(
            "TRIANGLE {} {} {}",
            f.indices[0], f.indices[1], f.indices[2]
        ));
        out.close("ENDFACE");
    }
    out.dedent();
    out.open(&format!("NUMMESHOPS {}", m.meshops.len()));
    for op in &m.meshops {
        out.line(&format!(
            "MESHOP {} {} {} {} {}",
            op.vertex_a, op.vertex_b, op.offset, op.param, op.op_code
        ));
    }
    out.dedent();
    out.open(&format!("NUMSKINGROUPS {}", m.skin_groups.len()));
    for (a, b) in &m.skin_groups {
        out.line(&format!("SKINGROUP {a} {b}"));
    }
    out.dedent();
    out.open(&format!("NUMFACEMATERIALGROUPS {}", m.face_material_groups.len()));
    for (a, b) in &m.face_material_groups {
        out.line(&format!("FACEMATERIALGROUP {a} {b}"));
    }
    out.dedent();
    out.open(&format!("NUMVERTEXMATERIALGROUPS {}", m.vertex_material_groups.len()));
    for (a, b) in &m.vertex_material_groups {
        out.line(&format!("VERTEXMATERIALGROUP {a} {b}"));
    }
    out.dedent();
    out.line(&format!("BOUNDINGBOXMIN {}", floats(&m.min.to_array())));
    out.line(&format!("BOUNDINGBOXMAX {}", floats(&m.max.to_array())));
    out.line(&format!("MAXDISTANCE {}", m.max_distance));
    out.line(&format!("FPSCALE {}", m.fp_scale));
    out.line(&format!("PARAMS2 {} {} {}", m.params2[0], m.params2[1], m.params2[2]));
    out.line(&format!("HEXFLAGS {}", m.flags));
    out.close("ENDDMSPRITEDEF2");
}

fn write_rgb_track(out: &mut Out, t: &RgbTrack) {
    out.open(&format!("DMRGBTRACKDEF {}", quoted(&t.tag)));
    out.line(&format!("SLEEP {}", t.sleep));
    out.line(&format!("HEXFLAGS {}", t.flags));
    out.open(&format!("NUMFRAMES {}", t.frames.len()));
    for frame in &t.frames {
        let mut list = format!("RGBALIST {}", frame.len());
        for c in frame {
            let _ = write!(list, " {c}");
        }
        out.line(&list);
    }
    out.dedent();
    out.close("ENDDMRGBTRACKDEF");
}

fn write_polyhedron(out: &mut Out, p: &Polyhedron) {
    out.open(&format!("POLYHEDRONDEFINITION {}", quoted(&p.tag)));
    out.line(&format!("BOUNDINGRADIUS {}", p.bounding_radius));
    out.line(&format!("SCALEFACTOR {}", p.scale_factor));
    out.line(&format!("HEXFLAGS {}", p.flags));
    out.open(&format!("NUMVERTICES {}", p.vertices.len()));
    for v in &p.vertices {
        out.line(&format!("XYZ {}", floats(&v.to_array())));
    }
    out.dedent();
    out.open(&format!("NUMFACES {}", p.faces.len()));
    for face in &p.faces {
        let mut list = format!("VERTEXLIST {}", face.len());
        for i in face {
            let _ = write!(list, " {i}");
        }
        out.line(&list);
    }
    out.dedent();
    out.close("ENDPOLYHEDRONDEFINITION");
}

fn write_track_def(out: &mut Out, d: &TrackDef) {
    out.open(&format!("TRACKDEFINITION {}", quoted(&d.tag)));
    out.line(&format!("HEXFLAGS {}", d.flags));
    out.open(&format!("NUMFRAMES {}", d.frames.len()));
    for f in &d.frames {
        out.line(&format!(
            "FRAMETRANSFORM {} {} {} {}",
            floats(&f.translation.to_array()),
            f.rotation[0],
            f.rotation[1],
            floats(&f.rotation[2..])
        ));
    }
    out.dedent();
    out.close("ENDTRACKDEFINITION");
}

fn write_track(out: &mut Out, t: &Track) {
    out.open(&format!("TRACKINSTANCE {}", quoted(&t.tag)));
    out.line(&format!("DEFINITION {}", quoted(&t.definition_tag)));
    out.line(&format!("INTERPOLATE {}", u8::from(t.interpolate)));
    out.line(&format!("REVERSE {}", u8::from(t.reverse)));
    out.line(&format!("SLEEP? {}", opt_num(t.sleep)));
    out.close("ENDTRACKINSTANCE");
}

fn write_skeleton(out: &mut Out, s: &Skeleton) {
    out.open(&format!("HIERARCHICALSPRITEDEF {}", quoted(&s.tag)));
    out.line(&format!(
        "CENTEROFFSET? {}",
        opt_floats(s.center_offset.map(|v| v.to_array()).as_ref().map(|v| &v[..]))
    ));
    out.line(&format!("BOUNDINGRADIUS? {}", opt_num(s.bounding_radius)));
    out.line(&format!("POLYHEDRON? {}", opt_quoted(s.collision_volume_tag.as_deref())));
    out.open(&format!("NUMBONES {}", s.bones.len()));
    for bone in &s.bones {
        out.open(&format!("BONE {}", quoted(&bone.name)));
        out.line(&format!("TRACK {}", quoted(&bone.track_tag)));
        out.line(&format!("SPRITE? {}", opt_quoted(bone.sprite_tag.as_deref())));
        let mut children = format!("CHILDREN {}", bone.children.len());
        for c in &bone.children {
            let _ = write!(children, " {c}");
        }
        out.line(&children);
        out.close("ENDBONE");
    }
    out.dedent();
    out.open(&format!("NUMSKINS {}", s.skins.len()));
    for (mesh_tag, link) in &s.skins {
        out.line(&format!("SKIN {} {link}", quoted(mesh_tag)));
    }
    out.dedent();
    out.close("ENDHIERARCHICALSPRITEDEF");
}

fn write_sprite3d(out: &mut Out, s: &Sprite3D) {
    out.open(&format!("SPRITE3DDEF {}", quoted(&s.tag)));
    out.line(&format!(
        "CENTEROFFSET? {}",
        opt_floats(s.center_offset.map(|v| v.to_array()).as_ref().map(|v| &v[..]))
    ));
    out.line(&format!("BOUNDINGRADIUS? {}", opt_num(s.bounding_radius)));
    out.open(&format!("NUMVERTICES {}", s.vertices.len()));
    for v in &s.vertices {
        out.line(&format!("XYZ {}", floats(&v.to_array())));
    }
    out.dedent();
    out.open(&format!("NUMBSPNODES {}", s.nodes.len()));
    for node in &s.nodes {
        out.open("BSPNODE");
        let mut list = format!("VERTEXLIST {}", node.vertex_indices.len());
        for i in &node.vertex_indices {
            let _ = write!(list, " {i}");
        }
        out.line(&list);
        out.line(&format!("FRONTTREE {}", node.front_tree));
        out.line(&format!("BACKTREE {}", node.back_tree));
        let r = &node.render;
        out.line(&format!("RENDERMETHOD {}", r.render_method));
        out.line(&format!("RENDERPEN? {}", opt_num(r.pen)));
        out.line(&format!("RENDERBRIGHTNESS? {}", opt_num(r.brightness)));
        out.line(&format!("RENDERSCALEDAMBIENT? {}", opt_num(r.scaled_ambient)));
        out.line(&format!("RENDERSIMPLESPRITEINST? {}", opt_quoted(r.sprite_tag.as_deref())));
        let uv_origin = r.uv_origin.map(|[o, u, v]| {
            let mut all = Vec::with_capacity(9);
            all.extend_from_slice(&o.to_array());
            all.extend_from_slice(&u.to_array());
            all.extend_from_slice(&v.to_array());
            all
        });
        out.line(&format!(
            "RENDERUVORIGIN? {}",
            opt_floats(uv_origin.as_ref().map(|v| &v[..]))
        ));
        out.open(&format!("NUMRENDERUVMAPENTRIES {}", r.uv_map.len()));
        for uv in &r.uv_map {
            out.line(&format!("UV {}", floats(uv)));
        }
        out.dedent();
        out.line(&format!("TWOSIDED {}", u8::from(r.two_sided)));
        out.close("ENDBSPNODE");
    }
    out.dedent();
    out.close("ENDSPRITE3DDEF");
}

fn write_light_def(out: &mut Out, l: &LightDef) {
    out.open(&format!("LIGHTDEFINITION {}", quoted(&l.tag)));
    out.line(&format!("CURRENTFRAME? {}", opt_num(l.current_frame)));
    out.line(&format!("SLEEP? {}", opt_num(l.sleep)));
    out.line(&format!("SKIPFRAMES {}", u8::from(l.skip_frames)));
    out.line(&format!("NUMFRAMES {}", l.frame_count));
    out.open(&format!("NUMLIGHTLEVELS {}", l.light_levels.len()));
    for level in &l.light_levels {
        out.line(&format!("LIGHTLEVEL {level}"));
    }
    out.dedent();
    out.open(&format!("NUMCOLORS {}", l.colors.len()));
    for c in &l.colors {
        out.line(&format!("COLOR {}", floats(&c.to_array())));
    }
    out.dedent();
    out.close("ENDLIGHTDEFINITION");
}

fn write_point_light(out: &mut Out, p: &PointLight) {
    out.open(&format!("POINTLIGHT {}", quoted(&p.tag)));
    out.line(&format!("LIGHT {}", quoted(&p.light_tag)));
    out.line(&format!("HEXFLAGS {}", p.flags));
    out.line(&format!("XYZ {}", floats(&p.location.to_array())));
    out.line(&format!("RADIUSOFINFLUENCE {}", p.radius));
    out.close("ENDPOINTLIGHT");
}

fn write_ambient_light(out: &mut Out, a: &AmbientLight) {
    out.open(&format!("AMBIENTLIGHT {}", quoted(&a.tag)));
    out.line(&format!("LIGHT {}", quoted(&a.light_tag)));
    let mut list = format!("REGIONLIST {}", a.regions.len());
    for r in &a.regions {
        let _ = write!(list, " {r}");
    }
    out.line(&list);
    out.close("ENDAMBIENTLIGHT");
}

fn write_region(out: &mut Out, r: &Region) {
    out.open(&format!("REGION {}", quoted(&r.tag)));
    out.line(&format!("AMBIENTLIGHT? {}", opt_quoted(r.ambient_light_tag.as_deref())));
    out.line(&format!("SPHERE? {}", opt_floats(r.sphere.as_ref().map(|v| &v[..]))));
    out.line(&format!("REVERBVOLUME? {}", opt_num(r.reverb_volume)));
    out.open(&format!("NUMVERTICES {}", r.vertices.len()));
    for v in &r.vertices {
        out.line(&format!("XYZ {}", floats(&v.to_array())));
    }
    out.dedent();
    out.open(&format!("NUMVISLISTS {}", r.vis_lists.len()));
    for list in &r.vis_lists {
        let mut line = format!("VISLIST {}", list.len());
        for v in list {
            let _ = write!(line, " {v}");
        }
        out.line(&line);
    }
    out.dedent();
    out.line(&format!("DMSPRITE? {}", opt_quoted(r.mesh_tag.as_deref())));
    out.line(&format!("USERDATA {}", quoted(&r.user_data)));
    out.close("ENDREGION");
}

fn write_world_tree(out: &mut Out, t: &WorldTree) {
    out.open(&format!("WORLDTREE {}", quoted(&t.tag)));
    out.open(&format!("NUMWORLDNODES {}", t.nodes.len()));
    for node in &t.nodes {
        out.open("WORLDNODE");
        out.line(&format!(
            "NORMALABCD {} {}",
            floats(&node.normal.to_array()),
            node.dist
        ));
        out.line(&format!("REGIONTAG? {}", opt_quoted(node.region_tag.as_deref())));
        out.line(&format!("FRONTTREE {}", node.front_tree));
        out.line(&format!("BACKTREE {}", node.back_tree));
        out.close("ENDWORLDNODE");
    }
    out.dedent();
    out.close("ENDWORLDTREE");
}

fn write_zone(out: &mut Out, z: &Zone) {
    out.open(&format!("ZONE {}", quoted(&z.tag)));
    let mut list = format!("REGIONLIST {}", z.regions.len());
    for r in &z.regions {
        let _ = write!(list, " {r}");
    }
    out.line(&list);
    out.line(&format!("USERDATA {}", quoted(&z.user_data)));
    out.close("ENDZONE");
}

fn write_actor_def(out: &mut Out, d: &ActorDef) {
    out.open(&format!("ACTORDEF {}", quoted(&d.tag)));
    out.line(&format!("CALLBACK {}", quoted(&d.callback)));
    out.line(&format!("BOUNDSRADIUS? {}", opt_num(d.bounds_radius)));
    out.line(&format!("CURRENTACTION? {}", opt_num(d.current_action)));
    out.line(&format!("LOCATION? {}", opt_floats(d.location.as_ref().map(|v| &v[..]))));
    out.open(&format!("NUMACTIONS {}", d.actions.len()));
    for action in &d.actions {
        out.open("ACTION");
        let mut list = format!("MINDISTANCES {}", action.min_distances.len());
        for m in &action.min_distances {
            let _ = write!(list, " {m}");
        }
        out.line(&list);
        out.close("ENDACTION");
    }
    out.dedent();
    out.open(&format!("NUMSPRITES {}", d.sprites.len()));
    for sprite in &d.sprites {
        let (kind, tag) = match sprite {
            SpriteRef::Mesh(t) => ("DMSPRITEDEF2", t),
            SpriteRef::Skeleton(t) => ("HIERARCHICALSPRITEDEF", t),
            SpriteRef::Sprite3D(t) => ("SPRITE3DDEF", t),
        };
        out.line(&format!("SPRITE {kind} {}", quoted(tag)));
    }
    out.dedent();
    out.line(&format!("USERDATA {}", quoted(&d.user_data)));
    out.close("ENDACTORDEF");
}

fn write_actor_inst(out: &mut Out, i: &ActorInst) {
    out.open(&format!("ACTORINST {}", quoted(&i.tag)));
    out.line(&format!("SPRITE {}", quoted(&i.actor_def_tag)));
    out.line(&format!("CURRENTACTION? {}", opt_num(i.current_action)));
    out.line(&format!("LOCATION? {}", opt_floats(i.location.as_ref().map(|v| &v[..]))));
    out.line(&format!("BOUNDINGRADIUS? {}", opt_num(i.bounding_radius)));
    out.line(&format!("SCALEFACTOR? {}", opt_num(i.scale_factor)));
    out.line(&format!("SPHERERADIUS? {}", opt_num(i.sphere_radius)));
    out.line(&format!("DMRGBTRACK? {}", opt_quoted(i.rgb_track_tag.as_deref())));
    out.line(&format!("USERDATA {}", quoted(&i.user_data)));
    out.close("ENDACTORINST");
}
