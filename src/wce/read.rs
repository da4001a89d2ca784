//! WCE script parsing.
//!
//! The reader dispatches on top-level keywords and parses each
//! definition block with the fixed keyword sequence its kind owns.
//! `INCLUDE` directives recurse through the archive. WCE files are
//! treated as authoritative hand-edited input: any grammar violation,
//! arity mismatch or numeric parse failure is fatal for the file.

use glam::Vec3;

use crate::archive::Archive;
use crate::error::{Error, Result};
use crate::quant::pack_rgba;
use crate::raw::fragment::WldVersion;
use crate::world::{
    ActorAction, ActorDef, ActorInst, AmbientLight, LightDef, Material, MaterialPalette, Mesh,
    PointLight, Polyhedron, Region, RenderInfo, RgbTrack, SimpleSprite, Skeleton, SkeletonBone,
    SpriteFrame, SpriteRef, Sprite3D, Sprite3DBspNode, Track, TrackDef, TrackTransform, World,
    WorldNode, WorldTree, Zone,
};

use super::scanner::{
    parse_bool, parse_f32, parse_i32, parse_u16, parse_u32, parse_u8, parse_usize, Scanner, Token,
};

pub struct WceReader;

impl WceReader {
    /// Parse the script set rooted at `root_name` into a logical world.
    pub fn read(archive: &dyn Archive, root_name: &str) -> Result<World> {
        let mut world = World::new(WldVersion::New);
        parse_file(&mut world, archive, root_name)?;
        Ok(world)
    }
}

fn parse_file(world: &mut World, archive: &dyn Archive, name: &str) -> Result<()> {
    let text = String::from_utf8(archive.file(name)?)?;
    let mut scanner = Scanner::new(&text);
    parse_blocks(world, archive, &mut scanner)
}

fn parse_blocks(world: &mut World, archive: &dyn Archive, s: &mut Scanner<'_>) -> Result<()> {
    while let Some(tok) = s.peek()? {
        let keyword = tok.text.clone();
        let line = tok.line;
        match keyword.as_str() {
            "WORLDVERSION" => {
                let args = s.property("WORLDVERSION", 1)?;
                world.version = match args[0].text.as_str() {
                    "OLD" => WldVersion::Old,
                    "NEW" => WldVersion::New,
                    other => {
                        return Err(Error::WceParse {
                            line: args[0].line,
                            message: format!("unknown world version `{other}`"),
                        });
                    }
                };
            }
            "INCLUDE" => {
                let args = s.property("INCLUDE", 1)?;
                parse_file(world, archive, &args[0].text)?;
            }
            "GLOBALAMBIENTLIGHTDEF" => {
                s.keyword("GLOBALAMBIENTLIGHTDEF")?;
                let color = s.property("COLOR", 4)?;
                world.global_ambient = Some(pack_rgba([
                    parse_u8(&color[0])?,
                    parse_u8(&color[1])?,
                    parse_u8(&color[2])?,
                    parse_u8(&color[3])?,
                ]));
                s.keyword("ENDGLOBALAMBIENTLIGHTDEF")?;
            }
            "SIMPLESPRITEDEF" => {
                let r = parse_simple_sprite(s)?;
                insert(&mut world.simple_sprites, r.tag.clone(), r, line)?;
            }
            "MATERIALDEFINITION" => {
                let r = parse_material(s)?;
                insert(&mut world.materials, r.tag.clone(), r, line)?;
            }
            "MATERIALPALETTE" => {
                let r = parse_palette(s)?;
                insert(&mut world.material_palettes, r.tag.clone(), r, line)?;
            }
            "DMSPRITEDEF2" => {
                let r = parse_mesh(s)?;
                insert(&mut world.meshes, r.tag.clone(), r, line)?;
            }
            "DMRGBTRACKDEF" => {
                let r = parse_rgb_track(s)?;
                insert(&mut world.rgb_tracks, r.tag.clone(), r, line)?;
            }
            "POLYHEDRONDEFINITION" => {
                let r = parse_polyhedron(s)?;
                insert(&mut world.polyhedra, r.tag.clone(), r, line)?;
            }
            "TRACKDEFINITION" => {
                let r = parse_track_def(s)?;
                insert(&mut world.track_defs, r.tag.clone(), r, line)?;
            }
            "TRACKINSTANCE" => {
                let r = parse_track(s)?;
                insert(&mut world.tracks, r.tag.clone(), r, line)?;
            }
            "HIERARCHICALSPRITEDEF" => {
                let r = parse_skeleton(s)?;
                insert(&mut world.skeletons, r.tag.clone(), r, line)?;
            }
            "SPRITE3DDEF" => {
                let r = parse_sprite3d(s)?;
                insert(&mut world.sprite3ds, r.tag.clone(), r, line)?;
            }
            "LIGHTDEFINITION" => {
                let r = parse_light_def(s)?;
                insert(&mut world.light_defs, r.tag.clone(), r, line)?;
            }
            "POINTLIGHT" => {
                let r = parse_point_light(s)?;
                insert(&mut world.point_lights, r.tag.clone(), r, line)?;
            }
            "AMBIENTLIGHT" => {
                let r = parse_ambient_light(s)?;
                insert(&mut world.ambient_lights, r.tag.clone(), r, line)?;
            }
            "REGION" => {
                let r = parse_region(s)?;
                insert(&mut world.regions, r.tag.clone(), r, line)?;
            }
            "WORLDTREE" => {
                let r = parse_world_tree(s)?;
                insert(&mut world.world_trees, r.tag.clone(), r, line)?;
            }
            "ZONE" => {
                let r = parse_zone(s)?;
                insert(&mut world.zones, r.tag.clone(), r, line)?;
            }
            "ACTORDEF" => {
                let r = parse_actor_def(s)?;
                insert(&mut world.actor_defs, r.tag.clone(), r, line)?;
            }
            "ACTORINST" => {
                let r = parse_actor_inst(s)?;
                insert(&mut world.actor_insts, r.tag.clone(), r, line)?;
            }
            other => {
                return Err(Error::WceGrammar {
                    line,
                    expected: "a definition keyword".to_string(),
                    found: other.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn insert<T>(
    map: &mut indexmap::IndexMap<String, T>,
    tag: String,
    value: T,
    line: usize,
) -> Result<()> {
    if map.contains_key(&tag) {
        return Err(Error::WceParse { line, message: format!("duplicate tag `{tag}`") });
    }
    map.insert(tag, value);
    Ok(())
}

/// Consume a block-opening keyword and its quoted tag.
fn block_tag(s: &mut Scanner<'_>, keyword: &str) -> Result<String> {
    let args = s.property(keyword, 1)?;
    Ok(args[0].text.clone())
}

fn opt_string(args: Option<Vec<Token>>) -> Option<String> {
    args.map(|a| a[0].text.clone())
}

fn opt_u32(args: Option<Vec<Token>>) -> Result<Option<u32>> {
    args.map(|a| parse_u32(&a[0])).transpose()
}

fn opt_i32(args: Option<Vec<Token>>) -> Result<Option<i32>> {
    args.map(|a| parse_i32(&a[0])).transpose()
}

fn opt_f32(args: Option<Vec<Token>>) -> Result<Option<f32>> {
    args.map(|a| parse_f32(&a[0])).transpose()
}

fn vec3(args: &[Token]) -> Result<Vec3> {
    Ok(Vec3::new(parse_f32(&args[0])?, parse_f32(&args[1])?, parse_f32(&args[2])?))
}

fn opt_vec3(args: Option<Vec<Token>>) -> Result<Option<Vec3>> {
    args.map(|a| vec3(&a)).transpose()
}

fn rgba(args: &[Token]) -> Result<u32> {
    Ok(pack_rgba([
        parse_u8(&args[0])?,
        parse_u8(&args[1])?,
        parse_u8(&args[2])?,
        parse_u8(&args[3])?,
    ]))
}

fn floats6(args: Option<Vec<Token>>) -> Result<Option<[f32; 6]>> {
    match args {
        None => Ok(None),
        Some(a) => {
            let mut out = [0f32; 6];
            for (slot, tok) in out.iter_mut().zip(&a) {
                *slot = parse_f32(tok)?;
            }
            Ok(Some(out))
        }
    }
}

fn parse_simple_sprite(s: &mut Scanner<'_>) -> Result<SimpleSprite> {
    let tag = block_tag(s, "SIMPLESPRITEDEF")?;
    let current_frame = opt_i32(s.property_nullable("CURRENTFRAME", 1)?)?;
    let sleep = opt_u32(s.property_nullable("SLEEP", 1)?)?;
    let count = parse_usize(&s.property("NUMFRAMES", 1)?[0])?;
    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        let frame_tag = block_tag(s, "FRAME")?;
        let file_count = parse_usize(&s.property("NUMFILES", 1)?[0])?;
        let mut files = Vec::with_capacity(file_count);
        for _ in 0..file_count {
            files.push(s.property("FILE", 1)?[0].text.clone());
        }
        s.keyword("ENDFRAME")?;
        frames.push(SpriteFrame { tag: frame_tag, files });
    }
    s.keyword("ENDSIMPLESPRITEDEF")?;
    Ok(SimpleSprite { tag, current_frame, sleep, frames })
}

fn parse_material(s: &mut Scanner<'_>) -> Result<Material> {
    let tag = block_tag(s, "MATERIALDEFINITION")?;
    let render_method = parse_u32(&s.property("RENDERMETHOD", 1)?[0])?;
    let rgb_pen = rgba(&s.property("RGBPEN", 4)?)?;
    let brightness = parse_f32(&s.property("BRIGHTNESS", 1)?[0])?;
    let scaled_ambient = parse_f32(&s.property("SCALEDAMBIENT", 1)?[0])?;
    let simple_sprite_tag = opt_string(s.property_nullable("SIMPLESPRITEINST", 1)?);
    let uv_shift = match s.property_nullable("UVSHIFT", 2)? {
        Some(a) => Some([parse_f32(&a[0])?, parse_f32(&a[1])?]),
        None => None,
    };
    s.keyword("ENDMATERIALDEFINITION")?;
    Ok(Material {
        tag,
        render_method,
        rgb_pen,
        brightness,
        scaled_ambient,
        simple_sprite_tag,
        uv_shift,
    })
}

fn parse_palette(s: &mut Scanner<'_>) -> Result<MaterialPalette> {
    let tag = block_tag(s, "MATERIALPALETTE")?;
    let flags = parse_u32(&s.property("HEXFLAGS", 1)?[0])?;
    let count = parse_usize(&s.property("NUMMATERIALS", 1)?[0])?;
    let mut material_tags = Vec::with_capacity(count);
    for _ in 0..count {
        material_tags.push(s.property("MATERIAL", 1)?[0].text.clone());
    }
    s.keyword("ENDMATERIALPALETTE")?;
    Ok(MaterialPalette { tag, flags, material_tags })
}

fn parse_mesh(s: &mut Scanner<'_>) -> Result<Mesh> {
    let tag = block_tag(s, "DMSPRITEDEF2")?;
    let center_offset = vec3(&s.property("CENTEROFFSET", 3)?)?;
    let count = parse_usize(&s.property("NUMVERTICES", 1)?[0])?;
    let mut vertices = Vec::with_capacity(count);
    for _ in 0..count {
        vertices.push(vec3(&s.property("XYZ", 3)?)?);
    }
    let count = parse_usize(&s.property("NUMUVS", 1)?[0])?;
    let mut uvs = Vec::with_capacity(count);
    for _ in 0..count {
        let a = s.property("UV", 2)?;
        uvs.push([parse_f32(&a[0])?, parse_f32(&a[1])?]);
    }
    let count = parse_usize(&s.property("NUMVERTEXNORMALS", 1)?[0])?;
    let mut normals = Vec::with_capacity(count);
    for _ in 0..count {
        normals.push(vec3(&s.property("NORMAL", 3)?)?);
    }
    let count = parse_usize(&s.property("NUMVERTEXCOLORS", 1)?[0])?;
    let mut colors = Vec::with_capacity(count);
    for _ in 0..count {
        colors.push(rgba(&s.property("RGBA", 4)?)?);
    }
    let material_palette_tag = s.property("MATERIALPALETTE", 1)?[0].text.clone();
    let rgb_track_tag = opt_string(s.property_nullable("DMRGBTRACK", 1)?);
    let count = parse_usize(&s.property("NUMFACES", 1)?[0])?;
    let mut faces = Vec::with_capacity(count);
    for _ in 0..count {
        s.keyword("FACE")?;
        let flags = parse_u16(&s.property("HEXFLAGS", 1)?[0])?;
        let tri = s.property("TRIANGLE", 3)?;
        s.keyword("ENDFACE")?;
        faces.push(crate::raw::fragments::Face {
            flags,
            indices: [parse_u16(&tri[0])?, parse_u16(&tri[1])?, parse_u16(&tri[2])?],
        });
    }
    let count = parse_usize(&s.property("NUMMESHOPS", 1)?[0])?;
    let mut meshops = Vec::with_capacity(count);
    for _ in 0..count {
        let a = s.property("MESHOP", 5)?;
        meshops.push(crate::raw::fragments::MeshOp {
            vertex_a: parse_u16(&a[0])?,
            vertex_b: parse_u16(&a[1])?,
            offset: parse_f32(&a[2])?,
            param: parse_u8(&a[3])?,
            op_code: parse_u8(&a[4])?,
        });
    }
    let count = parse_usize(&s.property("NUMSKINGROUPS", 1)?[0])?;
    let mut skin_groups = Vec::with_capacity(count);
    for _ in 0..count {
        let a = s.property("SKINGROUP", 2)?;
        skin_groups.push((parse_u16(&a[0])?, parse_u16(&a[1])?));
    }
    let count = parse_usize(&s.property("NUMFACEMATERIALGROUPS", 1)?[0])?;
    let mut face_material_groups = Vec::with_capacity(count);
    for _ in 0..count {
        let a = s.property("FACEMATERIALGROUP", 2)?;
        face_material_groups.push((parse_u16(&a[0])?, parse_u16(&a[1])?));
    }
    let count = parse_usize(&s.property("NUMVERTEXMATERIALGROUPS", 1)?[0])?;
    let mut vertex_material_groups = Vec::with_capacity(count);
    for _ in 0..count {
        let a = s.property("VERTEXMATERIALGROUP", 2)?;
        vertex_material_groups.push((parse_u16(&a[0])?, parse_u16(&a[1])?));
    }
    let min = vec3(&s.property("BOUNDINGBOXMIN", 3)?)?;
    let max = vec3(&s.property("BOUNDINGBOXMAX", 3)?)?;
    let max_distance = parse_f32(&s.property("MAXDISTANCE", 1)?[0])?;
    let fp_scale = parse_u16(&s.property("FPSCALE", 1)?[0])?;
    let p2 = s.property("PARAMS2", 3)?;
    let params2 = [parse_u32(&p2[0])?, parse_u32(&p2[1])?, parse_u32(&p2[2])?];
    let flags = parse_u32(&s.property("HEXFLAGS", 1)?[0])?;
    s.keyword("ENDDMSPRITEDEF2")?;
    Ok(Mesh {
        tag,
        flags,
        material_palette_tag,
        rgb_track_tag,
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

fn parse_rgb_track(s: &mut Scanner<'_>) -> Result<RgbTrack> {
    let tag = block_tag(s, "DMRGBTRACKDEF")?;
    let sleep = parse_u32(&s.property("SLEEP", 1)?[0])?;
    let flags = parse_u32(&s.property("HEXFLAGS", 1)?[0])?;
    let count = parse_usize(&s.property("NUMFRAMES", 1)?[0])?;
    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        let colors = s.property_counted("RGBALIST")?;
        frames.push(colors.iter().map(parse_u32).collect::<Result<Vec<_>>>()?);
    }
    s.keyword("ENDDMRGBTRACKDEF")?;
    Ok(RgbTrack { tag, flags, sleep, frames })
}

fn parse_polyhedron(s: &mut Scanner<'_>) -> Result<Polyhedron> {
    let tag = block_tag(s, "POLYHEDRONDEFINITION")?;
    let bounding_radius = parse_f32(&s.property("BOUNDINGRADIUS", 1)?[0])?;
    let scale_factor = parse_f32(&s.property("SCALEFACTOR", 1)?[0])?;
    let flags = parse_u32(&s.property("HEXFLAGS", 1)?[0])?;
    let count = parse_usize(&s.property("NUMVERTICES", 1)?[0])?;
    let mut vertices = Vec::with_capacity(count);
    for _ in 0..count {
        vertices.push(vec3(&s.property("XYZ", 3)?)?);
    }
    let count = parse_usize(&s.property("NUMFACES", 1)?[0])?;
    let mut faces = Vec::with_capacity(count);
    for _ in 0..count {
        let indices = s.property_counted("VERTEXLIST")?;
        faces.push(indices.iter().map(parse_u32).collect::<Result<Vec<_>>>()?);
    }
    s.keyword("ENDPOLYHEDRONDEFINITION")?;
    Ok(Polyhedron { tag, flags, bounding_radius, scale_factor, vertices, faces })
}

fn parse_track_def(s: &mut Scanner<'_>) -> Result<TrackDef> {
    let tag = block_tag(s, "TRACKDEFINITION")?;
    let flags = parse_u32(&s.property("HEXFLAGS", 1)?[0])?;
    let count = parse_usize(&s.property("NUMFRAMES", 1)?[0])?;
    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        let a = s.property("FRAMETRANSFORM", 7)?;
        frames.push(TrackTransform {
            translation: vec3(&a[0..3])?,
            rotation: [
                parse_f32(&a[3])?,
                parse_f32(&a[4])?,
                parse_f32(&a[5])?,
                parse_f32(&a[6])?,
            ],
        });
    }
    s.keyword("ENDTRACKDEFINITION")?;
    Ok(TrackDef { tag, flags, frames })
}

fn parse_track(s: &mut Scanner<'_>) -> Result<Track> {
    let tag = block_tag(s, "TRACKINSTANCE")?;
    let definition_tag = s.property("DEFINITION", 1)?[0].text.clone();
    let interpolate = parse_bool(&s.property("INTERPOLATE", 1)?[0])?;
    let reverse = parse_bool(&s.property("REVERSE", 1)?[0])?;
    let sleep = opt_u32(s.property_nullable("SLEEP", 1)?)?;
    s.keyword("ENDTRACKINSTANCE")?;
    Ok(Track { tag, definition_tag, interpolate, reverse, sleep })
}

fn parse_skeleton(s: &mut Scanner<'_>) -> Result<Skeleton> {
    let tag = block_tag(s, "HIERARCHICALSPRITEDEF")?;
    let center_offset = opt_vec3(s.property_nullable("CENTEROFFSET", 3)?)?;
    let bounding_radius = opt_f32(s.property_nullable("BOUNDINGRADIUS", 1)?)?;
    let collision_volume_tag = opt_string(s.property_nullable("POLYHEDRON", 1)?);
    let count = parse_usize(&s.property("NUMBONES", 1)?[0])?;
    let mut bones = Vec::with_capacity(count);
    for _ in 0..count {
        let name = block_tag(s, "BONE")?;
        let track_tag = s.property("TRACK", 1)?[0].text.clone();
        let sprite_tag = opt_string(s.property_nullable("SPRITE", 1)?);
        let children = s
            .property_counted("CHILDREN")?
            .iter()
            .map(parse_u32)
            .collect::<Result<Vec<_>>>()?;
        s.keyword("ENDBONE")?;
        bones.push(SkeletonBone { name, track_tag, sprite_tag, children });
    }
    let count = parse_usize(&s.property("NUMSKINS", 1)?[0])?;
    let mut skins = Vec::with_capacity(count);
    for _ in 0..count {
        let a = s.property("SKIN", 2)?;
        skins.push((a[0].text.clone(), parse_u32(&a[1])?));
    }
    s.keyword("ENDHIERARCHICALSPRITEDEF")?;
    Ok(Skeleton { tag, center_offset, bounding_radius, collision_volume_tag, bones, skins })
}

fn parse_sprite3d(s: &mut Scanner<'_>) -> Result<Sprite3D> {
    let tag = block_tag(s, "SPRITE3DDEF")?;
    let center_offset = opt_vec3(s.property_nullable("CENTEROFFSET", 3)?)?;
    let bounding_radius = opt_f32(s.property_nullable("BOUNDINGRADIUS", 1)?)?;
    let count = parse_usize(&s.property("NUMVERTICES", 1)?[0])?;
    let mut vertices = Vec::with_capacity(count);
    for _ in 0..count {
        vertices.push(vec3(&s.property("XYZ", 3)?)?);
    }
    let count = parse_usize(&s.property("NUMBSPNODES", 1)?[0])?;
    let mut nodes = Vec::with_capacity(count);
    for _ in 0..count {
        s.keyword("BSPNODE")?;
        let vertex_indices = s
            .property_counted("VERTEXLIST")?
            .iter()
            .map(parse_u32)
            .collect::<Result<Vec<_>>>()?;
        let front_tree = parse_u32(&s.property("FRONTTREE", 1)?[0])?;
        let back_tree = parse_u32(&s.property("BACKTREE", 1)?[0])?;
        let render_method = parse_u32(&s.property("RENDERMETHOD", 1)?[0])?;
        let pen = opt_u32(s.property_nullable("RENDERPEN", 1)?)?;
        let brightness = opt_f32(s.property_nullable("RENDERBRIGHTNESS", 1)?)?;
        let scaled_ambient = opt_f32(s.property_nullable("RENDERSCALEDAMBIENT", 1)?)?;
        let sprite_tag = opt_string(s.property_nullable("RENDERSIMPLESPRITEINST", 1)?);
        let uv_origin = match s.property_nullable("RENDERUVORIGIN", 9)? {
            Some(a) => Some([vec3(&a[0..3])?, vec3(&a[3..6])?, vec3(&a[6..9])?]),
            None => None,
        };
        let uv_count = parse_usize(&s.property("NUMRENDERUVMAPENTRIES", 1)?[0])?;
        let mut uv_map = Vec::with_capacity(uv_count);
        for _ in 0..uv_count {
            let a = s.property("UV", 2)?;
            uv_map.push([parse_f32(&a[0])?, parse_f32(&a[1])?]);
        }
        let two_sided = parse_bool(&s.property("TWOSIDED", 1)?[0])?;
        s.keyword("ENDBSPNODE")?;
        nodes.push(Sprite3DBspNode {
            vertex_indices,
            front_tree,
            back_tree,
            render: RenderInfo {
                render_method,
                pen,
                brightness,
                scaled_ambient,
                sprite_tag,
                uv_origin,
                uv_map,
                two_sided,
            },
        });
    }
    s.keyword("ENDSPRITE3DDEF")?;
    Ok(Sprite3D { tag, center_offset, bounding_radius, vertices, nodes })
}

fn parse_light_def(s: &mut Scanner<'_>) -> Result<LightDef> {
    let tag = block_tag(s, "LIGHTDEFINITION")?;
    let current_frame = opt_u32(s.property_nullable("CURRENTFRAME", 1)?)?;
    let sleep = opt_u32(s.property_nullable("SLEEP", 1)?)?;
    let skip_frames = parse_bool(&s.property("SKIPFRAMES", 1)?[0])?;
    let frame_count = parse_u32(&s.property("NUMFRAMES", 1)?[0])?;
    let count = parse_usize(&s.property("NUMLIGHTLEVELS", 1)?[0])?;
    let mut light_levels = Vec::with_capacity(count);
    for _ in 0..count {
        light_levels.push(parse_f32(&s.property("LIGHTLEVEL", 1)?[0])?);
    }
    let count = parse_usize(&s.property("NUMCOLORS", 1)?[0])?;
    let mut colors = Vec::with_capacity(count);
    for _ in 0..count {
        colors.push(vec3(&s.property("COLOR", 3)?)?);
    }
    s.keyword("ENDLIGHTDEFINITION")?;
    Ok(LightDef { tag, current_frame, sleep, skip_frames, frame_count, light_levels, colors })
}

fn parse_point_light(s: &mut Scanner<'_>) -> Result<PointLight> {
    let tag = block_tag(s, "POINTLIGHT")?;
    let light_tag = s.property("LIGHT", 1)?[0].text.clone();
    let flags = parse_u32(&s.property("HEXFLAGS", 1)?[0])?;
    let location = vec3(&s.property("XYZ", 3)?)?;
    let radius = parse_f32(&s.property("RADIUSOFINFLUENCE", 1)?[0])?;
    s.keyword("ENDPOINTLIGHT")?;
    Ok(PointLight { tag, light_tag, flags, location, radius })
}

fn parse_ambient_light(s: &mut Scanner<'_>) -> Result<AmbientLight> {
    let tag = block_tag(s, "AMBIENTLIGHT")?;
    let light_tag = s.property("LIGHT", 1)?[0].text.clone();
    let regions = s
        .property_counted("REGIONLIST")?
        .iter()
        .map(parse_u32)
        .collect::<Result<Vec<_>>>()?;
    s.keyword("ENDAMBIENTLIGHT")?;
    Ok(AmbientLight { tag, light_tag, regions })
}

fn parse_region(s: &mut Scanner<'_>) -> Result<Region> {
    let tag = block_tag(s, "REGION")?;
    let ambient_light_tag = opt_string(s.property_nullable("AMBIENTLIGHT", 1)?);
    let sphere = match s.property_nullable("SPHERE", 4)? {
        Some(a) => Some([
            parse_f32(&a[0])?,
            parse_f32(&a[1])?,
            parse_f32(&a[2])?,
            parse_f32(&a[3])?,
        ]),
        None => None,
    };
    let reverb_volume = opt_f32(s.property_nullable("REVERBVOLUME", 1)?)?;
    let count = parse_usize(&s.property("NUMVERTICES", 1)?[0])?;
    let mut vertices = Vec::with_capacity(count);
    for _ in 0..count {
        vertices.push(vec3(&s.property("XYZ", 3)?)?);
    }
    let count = parse_usize(&s.property("NUMVISLISTS", 1)?[0])?;
    let mut vis_lists = Vec::with_capacity(count);
    for _ in 0..count {
        let ranges = s.property_counted("VISLIST")?;
        vis_lists.push(ranges.iter().map(parse_u16).collect::<Result<Vec<_>>>()?);
    }
    let mesh_tag = opt_string(s.property_nullable("DMSPRITE", 1)?);
    let user_data = s.property("USERDATA", 1)?[0].text.clone();
    s.keyword("ENDREGION")?;
    Ok(Region {
        tag,
        ambient_light_tag,
        mesh_tag,
        sphere,
        reverb_volume,
        vertices,
        vis_lists,
        user_data,
    })
}

fn parse_world_tree(s: &mut Scanner<'_>) -> Result<WorldTree> {
    let tag = block_tag(s, "WORLDTREE")?;
    let count = parse_usize(&s.property("NUMWORLDNODES", 1)?[0])?;
    let mut nodes = Vec::with_capacity(count);
    for _ in 0..count {
        s.keyword("WORLDNODE")?;
        let a = s.property("NORMALABCD", 4)?;
        let region_tag = opt_string(s.property_nullable("REGIONTAG", 1)?);
        let front_tree = parse_u32(&s.property("FRONTTREE", 1)?[0])?;
        let back_tree = parse_u32(&s.property("BACKTREE", 1)?[0])?;
        s.keyword("ENDWORLDNODE")?;
        nodes.push(WorldNode {
            normal: vec3(&a[0..3])?,
            dist: parse_f32(&a[3])?,
            region_tag,
            front_tree,
            back_tree,
        });
    }
    s.keyword("ENDWORLDTREE")?;
    Ok(WorldTree { tag, nodes })
}

fn parse_zone(s: &mut Scanner<'_>) -> Result<Zone> {
    let tag = block_tag(s, "ZONE")?;
    let regions = s
        .property_counted("REGIONLIST")?
        .iter()
        .map(parse_u32)
        .collect::<Result<Vec<_>>>()?;
    let user_data = s.property("USERDATA", 1)?[0].text.clone();
    s.keyword("ENDZONE")?;
    Ok(Zone { tag, regions, user_data })
}

fn parse_actor_def(s: &mut Scanner<'_>) -> Result<ActorDef> {
    let tag = block_tag(s, "ACTORDEF")?;
    let callback = s.property("CALLBACK", 1)?[0].text.clone();
    let bounds_radius = opt_f32(s.property_nullable("BOUNDSRADIUS", 1)?)?;
    let current_action = opt_u32(s.property_nullable("CURRENTACTION", 1)?)?;
    let location = floats6(s.property_nullable("LOCATION", 6)?)?;
    let count = parse_usize(&s.property("NUMACTIONS", 1)?[0])?;
    let mut actions = Vec::with_capacity(count);
    for _ in 0..count {
        s.keyword("ACTION")?;
        let min_distances = s
            .property_counted("MINDISTANCES")?
            .iter()
            .map(parse_f32)
            .collect::<Result<Vec<_>>>()?;
        s.keyword("ENDACTION")?;
        actions.push(ActorAction { min_distances });
    }
    let count = parse_usize(&s.property("NUMSPRITES", 1)?[0])?;
    let mut sprites = Vec::with_capacity(count);
    for _ in 0..count {
        let a = s.property("SPRITE", 2)?;
        let sprite = match a[0].text.as_str() {
            "DMSPRITEDEF2" => SpriteRef::Mesh(a[1].text.clone()),
            "HIERARCHICALSPRITEDEF" => SpriteRef::Skeleton(a[1].text.clone()),
            "SPRITE3DDEF" => SpriteRef::Sprite3D(a[1].text.clone()),
            other => {
                return Err(Error::WceParse {
                    line: a[0].line,
                    message: format!("unknown sprite kind `{other}`"),
                });
            }
        };
        sprites.push(sprite);
    }
    let user_data = s.property("USERDATA", 1)?[0].text.clone();
    s.keyword("ENDACTORDEF")?;
    Ok(ActorDef {
        tag,
        callback,
        bounds_radius,
        current_action,
        location,
        actions,
        sprites,
        user_data,
    })
}

fn parse_actor_inst(s: &mut Scanner<'_>) -> Result<ActorInst> {
    let tag = block_tag(s, "ACTORINST")?;
    let actor_def_tag = s.property("SPRITE", 1)?[0].text.clone();
    let current_action = opt_u32(s.property_nullable("CURRENTACTION", 1)?)?;
    let location = floats6(s.property_nullable("LOCATION", 6)?)?;
    let bounding_radius = opt_f32(s.property_nullable("BOUNDINGRADIUS", 1)?)?;
    let scale_factor = opt_f32(s.property_nullable("SCALEFACTOR", 1)?)?;
    let sphere_radius = opt_f32(s.property_nullable("SPHERERADIUS", 1)?)?;
    let rgb_track_tag = opt_string(s.property_nullable("DMRGBTRACK", 1)?);
    let user_data = s.property("USERDATA", 1)?[0].text.clone();
    s.keyword("ENDACTORINST")?;
    Ok(ActorInst {
        tag,
        actor_def_tag,
        current_action,
        location,
        bounding_radius,
        scale_factor,
        sphere_radius,
        rgb_track_tag,
        user_data,
    })
}
