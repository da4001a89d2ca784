use glam::Vec3;
use pretty_assertions::assert_eq;

use wldkit::archive::MemArchive;
use wldkit::raw::fragment::{FragPayload, WldVersion};
use wldkit::raw::WldRaw;
use wldkit::wce::{WceReader, WceWriter};
use wldkit::world::{
    ActorDef, ActorInst, AmbientLight, LightDef, Material, MaterialPalette, Mesh, PointLight,
    Region, SimpleSprite, Skeleton, SkeletonBone, SpriteFrame, SpriteRef, Track, TrackDef,
    TrackTransform, World, WorldNode, WorldTree, Zone,
};

/// A world exercising every record kind, with geometry chosen to be
/// exactly representable at the meshes' fixed-point scale so encode and
/// decode are bit-stable.
fn fixture_world() -> World {
    let mut world = World::new(WldVersion::New);
    world.global_ambient = Some(0x10203040);

    world.simple_sprites.insert(
        "GRASS_SPRITE".to_string(),
        SimpleSprite {
            tag: "GRASS_SPRITE".to_string(),
            current_frame: None,
            sleep: Some(150),
            frames: vec![SpriteFrame {
                tag: "GRASS_FRAME".to_string(),
                files: vec!["GRASS.BMP".to_string()],
            }],
        },
    );
    world.materials.insert(
        "GRASS_MDF".to_string(),
        Material {
            tag: "GRASS_MDF".to_string(),
            render_method: 2,
            rgb_pen: 0x00808080,
            brightness: 0.0,
            scaled_ambient: 0.75,
            simple_sprite_tag: Some("GRASS_SPRITE".to_string()),
            uv_shift: None,
        },
    );
    world.material_palettes.insert(
        "FIELD_MP".to_string(),
        MaterialPalette {
            tag: "FIELD_MP".to_string(),
            flags: 0,
            material_tags: vec!["GRASS_MDF".to_string()],
        },
    );
    world.meshes.insert(
        "FIELD_DMSPRITEDEF".to_string(),
        Mesh {
            tag: "FIELD_DMSPRITEDEF".to_string(),
            material_palette_tag: "FIELD_MP".to_string(),
            center_offset: Vec3::new(0.0, 0.0, 0.0),
            max_distance: 300.0,
            min: Vec3::new(-2.0, -2.0, 0.0),
            max: Vec3::new(2.0, 2.0, 1.0),
            fp_scale: 8,
            vertices: vec![
                Vec3::new(1.0, -2.0, 0.5),
                Vec3::new(-1.5, 0.25, 0.0),
                Vec3::new(0.0, 1.0, 1.0),
            ],
            uvs: vec![[0.0, 0.0], [0.25, 0.5], [1.0, 1.0]],
            normals: vec![Vec3::new(0.0, 0.0, 1.0); 3],
            colors: vec![0xFF0000FF, 0x00FF00FF, 0x0000FFFF],
            faces: vec![wldkit::raw::fragments::Face { flags: 0, indices: [0, 1, 2] }],
            face_material_groups: vec![(1, 0)],
            vertex_material_groups: vec![(3, 0)],
            ..Mesh::default()
        },
    );
    world.track_defs.insert(
        "ROOT_TRACKDEF".to_string(),
        TrackDef {
            tag: "ROOT_TRACKDEF".to_string(),
            flags: 0,
            frames: vec![TrackTransform {
                translation: Vec3::new(0.5, -0.25, 2.0),
                rotation: [1.0, 0.0, 0.0, 0.0],
            }],
        },
    );
    world.tracks.insert(
        "ROOT_TRACK".to_string(),
        Track {
            tag: "ROOT_TRACK".to_string(),
            definition_tag: "ROOT_TRACKDEF".to_string(),
            interpolate: true,
            reverse: false,
            sleep: None,
        },
    );
    world.skeletons.insert(
        "TREE_HS".to_string(),
        Skeleton {
            tag: "TREE_HS".to_string(),
            center_offset: None,
            bounding_radius: Some(12.0),
            collision_volume_tag: None,
            bones: vec![SkeletonBone {
                name: "ROOT_DAG".to_string(),
                track_tag: "ROOT_TRACK".to_string(),
                sprite_tag: Some("FIELD_DMSPRITEDEF".to_string()),
                children: vec![],
            }],
            skins: vec![],
        },
    );
    world.light_defs.insert(
        "SUN_LIGHTDEF".to_string(),
        LightDef {
            tag: "SUN_LIGHTDEF".to_string(),
            current_frame: None,
            sleep: None,
            skip_frames: false,
            frame_count: 1,
            light_levels: vec![1.0],
            colors: vec![Vec3::new(1.0, 0.5, 0.25)],
        },
    );
    world.point_lights.insert(
        "LAMP_PL".to_string(),
        PointLight {
            tag: "LAMP_PL".to_string(),
            light_tag: "SUN_LIGHTDEF".to_string(),
            flags: 0,
            location: Vec3::new(10.0, 20.0, 5.0),
            radius: 50.0,
        },
    );
    world.regions.insert(
        "R1_REGION".to_string(),
        Region {
            tag: "R1_REGION".to_string(),
            ambient_light_tag: Some("FIELD_AMBIENT".to_string()),
            mesh_tag: Some("FIELD_DMSPRITEDEF".to_string()),
            sphere: Some([0.0, 0.0, 0.0, 100.0]),
            reverb_volume: None,
            vertices: vec![],
            vis_lists: vec![vec![1, 2]],
            user_data: String::new(),
        },
    );
    world.ambient_lights.insert(
        "FIELD_AMBIENT".to_string(),
        AmbientLight {
            tag: "FIELD_AMBIENT".to_string(),
            light_tag: "SUN_LIGHTDEF".to_string(),
            regions: vec![0],
        },
    );
    world.world_trees.insert(
        "WT_WORLDTREE".to_string(),
        WorldTree {
            tag: "WT_WORLDTREE".to_string(),
            nodes: vec![WorldNode {
                normal: Vec3::new(0.0, 0.0, 1.0),
                dist: 0.0,
                region_tag: Some("R1_REGION".to_string()),
                front_tree: 0,
                back_tree: 0,
            }],
        },
    );
    world.zones.insert(
        "Z1_ZONE".to_string(),
        Zone { tag: "Z1_ZONE".to_string(), regions: vec![0], user_data: String::new() },
    );
    world.actor_defs.insert(
        "TREE_ACTORDEF".to_string(),
        ActorDef {
            tag: "TREE_ACTORDEF".to_string(),
            callback: "SPRITECALLBACK".to_string(),
            bounds_radius: Some(8.0),
            current_action: None,
            location: None,
            actions: vec![],
            sprites: vec![SpriteRef::Skeleton("TREE_HS".to_string())],
            user_data: String::new(),
        },
    );
    world.actor_insts.insert(
        "TREE1_ACTORINST".to_string(),
        ActorInst {
            tag: "TREE1_ACTORINST".to_string(),
            actor_def_tag: "TREE_ACTORDEF".to_string(),
            current_action: None,
            location: Some([100.0, 200.0, 0.0, 0.0, 0.0, 0.0]),
            bounding_radius: Some(8.0),
            scale_factor: Some(1.0),
            sphere_radius: Some(4.0),
            rgb_track_tag: None,
            user_data: String::new(),
        },
    );
    world
}

#[test]
fn test_binary_round_trip() {
    let world = fixture_world();
    let bytes = world.to_bytes().unwrap();
    let reread = World::from_bytes(&bytes).unwrap();
    assert_eq!(reread, world);
}

#[test]
fn test_binary_round_trip_is_stable() {
    let world = fixture_world();
    let first = world.to_bytes().unwrap();
    let second = World::from_bytes(&first).unwrap().to_bytes().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_ascii_round_trip() {
    let world = fixture_world();
    let mut archive = MemArchive::new();
    WceWriter::write(&world, &mut archive, "zone.wce").unwrap();
    let reread = WceReader::read(&archive, "zone.wce").unwrap();
    assert_eq!(reread, world);
}

#[test]
fn test_full_pipeline_binary_to_ascii_and_back() {
    let world = fixture_world();
    let bytes = world.to_bytes().unwrap();

    let decoded = World::from_bytes(&bytes).unwrap();
    let mut archive = MemArchive::new();
    WceWriter::write(&decoded, &mut archive, "zone.wce").unwrap();
    let edited = WceReader::read(&archive, "zone.wce").unwrap();
    let repacked = edited.to_bytes().unwrap();

    assert_eq!(World::from_bytes(&repacked).unwrap(), world);
}

#[test]
fn test_unknown_fragment_kind_keeps_stream_positions() {
    let world = fixture_world();
    let raw = world.to_raw().unwrap();
    let mesh_index = raw
        .fragments
        .iter()
        .position(|f| matches!(f, Some(FragPayload::DmSpriteDef2(_))))
        .unwrap();

    let mut bytes = raw.to_bytes().unwrap();
    // Append a fragment with an unregistered type code to the stream and
    // patch the header count.
    bytes.extend_from_slice(&8u32.to_le_bytes());
    bytes.extend_from_slice(&0x7Fi32.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 8]);
    let count = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) + 1;
    bytes[8..12].copy_from_slice(&count.to_le_bytes());

    let reread = WldRaw::from_bytes(&bytes).unwrap();
    assert_eq!(reread.fragments.len(), raw.fragments.len() + 1);
    assert!(reread.fragments.last().unwrap().is_none());
    assert!(matches!(
        reread.fragments[mesh_index],
        Some(FragPayload::DmSpriteDef2(_))
    ));

    // The unknown slot survives re-encode as a filler and the world still
    // resolves.
    let world2 = World::from_raw(&reread).unwrap();
    assert_eq!(world2, world);
    let rebytes = reread.to_bytes().unwrap();
    let rereread = WldRaw::from_bytes(&rebytes).unwrap();
    assert!(rereread.fragments.last().unwrap().is_none());
}

#[test]
fn test_mesh_quantization_tolerance() {
    let mut world = World::new(WldVersion::New);
    world.meshes.insert(
        "M_DMSPRITEDEF".to_string(),
        Mesh {
            tag: "M_DMSPRITEDEF".to_string(),
            fp_scale: 6,
            // not exactly representable at 1/64
            vertices: vec![Vec3::new(0.123, -4.567, 8.9)],
            ..Mesh::default()
        },
    );
    let reread = World::from_bytes(&world.to_bytes().unwrap()).unwrap();
    let v = reread.meshes["M_DMSPRITEDEF"].vertices[0];
    let tol = 1.0 / 64.0;
    assert!((v.x - 0.123).abs() <= tol);
    assert!((v.y + 4.567).abs() <= tol);
    assert!((v.z - 8.9).abs() <= tol);
}

#[test]
fn test_single_mesh_scene_end_to_end() {
    let mut world = World::new(WldVersion::New);
    world.materials.insert(
        "MYMAT_MDF".to_string(),
        Material { tag: "MYMAT_MDF".to_string(), render_method: 7, ..Material::default() },
    );
    world.material_palettes.insert(
        "MYPAL_MP".to_string(),
        MaterialPalette {
            tag: "MYPAL_MP".to_string(),
            flags: 0,
            material_tags: vec!["MYMAT_MDF".to_string()],
        },
    );
    world.meshes.insert(
        "MYMESH_DMSPRITEDEF".to_string(),
        Mesh {
            tag: "MYMESH_DMSPRITEDEF".to_string(),
            material_palette_tag: "MYPAL_MP".to_string(),
            fp_scale: 6,
            vertices: vec![Vec3::new(1.0, -2.0, 0.5)],
            ..Mesh::default()
        },
    );

    let raw = world.to_raw().unwrap();
    let count = |pred: fn(&FragPayload) -> bool| raw.fragments.iter().flatten().filter(|f| pred(f)).count();
    assert_eq!(count(|f| matches!(f, FragPayload::MaterialDef(_))), 1);
    assert_eq!(count(|f| matches!(f, FragPayload::MaterialPalette(_))), 1);
    assert_eq!(count(|f| matches!(f, FragPayload::DmSpriteDef2(_))), 1);

    let reread = World::from_bytes(&raw.to_bytes().unwrap()).unwrap();
    let mesh = &reread.meshes["MYMESH_DMSPRITEDEF"];
    assert_eq!(mesh.material_palette_tag, "MYPAL_MP");
    assert_eq!(reread.material_palettes["MYPAL_MP"].material_tags, vec!["MYMAT_MDF"]);
    let v = mesh.vertices[0];
    assert!((v.x - 1.0).abs() <= 1.0 / 128.0);
    assert!((v.y + 2.0).abs() <= 1.0 / 128.0);
    assert!((v.z - 0.5).abs() <= 1.0 / 128.0);
}

#[test]
fn test_old_version_survives_both_codecs() {
    let mut world = fixture_world();
    world.version = WldVersion::Old;
    // Old streams narrow UV pairs, so keep them representable in i16.
    let bytes = world.to_bytes().unwrap();
    assert_eq!(World::from_bytes(&bytes).unwrap().version, WldVersion::Old);

    let mut archive = MemArchive::new();
    WceWriter::write(&world, &mut archive, "old.wce").unwrap();
    assert_eq!(WceReader::read(&archive, "old.wce").unwrap().version, WldVersion::Old);
}

#[test]
fn test_envelope_counts() {
    let world = fixture_world();
    let raw = world.to_raw().unwrap();
    assert_eq!(raw.region_count, 1);
    let bytes = raw.to_bytes().unwrap();
    let fragment_count = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    assert_eq!(fragment_count as usize, raw.fragments.len());
}
