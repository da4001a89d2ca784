//! Human-editable ASCII world scripts.
//!
//! A world is exported as a root script plus one satellite file per mesh
//! and per skeleton, pulled back in through `INCLUDE` directives. The
//! scripts are the editing surface of the toolkit: the binary codec
//! round-trips a file, the WCE codec is where hand edits happen.

pub mod read;
pub mod scanner;
pub mod write;

pub use read::WceReader;
pub use write::{satellite_name, WceWriter};

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::archive::{Archive, MemArchive};
    use crate::error::Error;
    use crate::raw::fragment::WldVersion;
    use crate::world::{
        Material, Mesh, Skeleton, SkeletonBone, Track, TrackDef, TrackTransform, World,
    };

    use super::*;

    fn sample_world() -> World {
        let mut world = World::new(WldVersion::Old);
        world.global_ambient = Some(0x20406080);
        world.materials.insert(
            "WALL_MDF".to_string(),
            Material {
                tag: "WALL_MDF".to_string(),
                render_method: 2,
                rgb_pen: 0x00FF00FF,
                brightness: 0.75,
                scaled_ambient: 1.0,
                simple_sprite_tag: None,
                uv_shift: Some([0.5, 0.25]),
            },
        );
        world.meshes.insert(
            "WALL_DMSPRITEDEF".to_string(),
            Mesh {
                tag: "WALL_DMSPRITEDEF".to_string(),
                material_palette_tag: "WALL_MP".to_string(),
                fp_scale: 7,
                vertices: vec![Vec3::new(1.0, -2.0, 0.5)],
                uvs: vec![[0.0, 1.0]],
                ..Mesh::default()
            },
        );
        world.track_defs.insert(
            "ARM_TRACKDEF".to_string(),
            TrackDef {
                tag: "ARM_TRACKDEF".to_string(),
                flags: 0,
                frames: vec![TrackTransform {
                    translation: Vec3::new(0.5, 0.0, -1.5),
                    rotation: [1.0, 0.0, 0.0, 0.0],
                }],
            },
        );
        world.tracks.insert(
            "ARM_TRACK".to_string(),
            Track {
                tag: "ARM_TRACK".to_string(),
                definition_tag: "ARM_TRACKDEF".to_string(),
                interpolate: true,
                reverse: false,
                sleep: Some(100),
            },
        );
        world.skeletons.insert(
            "RIG_HS".to_string(),
            Skeleton {
                tag: "RIG_HS".to_string(),
                center_offset: None,
                bounding_radius: Some(5.0),
                collision_volume_tag: None,
                bones: vec![SkeletonBone {
                    name: "ARM_DAG".to_string(),
                    track_tag: "ARM_TRACK".to_string(),
                    sprite_tag: Some("WALL_DMSPRITEDEF".to_string()),
                    children: vec![],
                }],
                skins: vec![("WALL_DMSPRITEDEF".to_string(), 0)],
            },
        );
        world
    }

    #[test]
    fn test_script_round_trip() {
        let world = sample_world();
        let mut arc = MemArchive::new();
        WceWriter::write(&world, &mut arc, "sample.wce").unwrap();
        let reread = WceReader::read(&arc, "sample.wce").unwrap();
        assert_eq!(reread, world);
    }

    #[test]
    fn test_satellite_files_and_includes() {
        let world = sample_world();
        let mut arc = MemArchive::new();
        WceWriter::write(&world, &mut arc, "sample.wce").unwrap();
        assert!(arc.contains("WALL_DMSPRITEDEF.WCE"));
        assert!(arc.contains("RIG_HS.WCE"));

        let root = String::from_utf8(arc.file("sample.wce").unwrap()).unwrap();
        assert!(root.contains("WORLDVERSION OLD"));
        assert!(root.contains("INCLUDE \"WALL_DMSPRITEDEF.WCE\""));
        assert!(!root.contains("DMSPRITEDEF2 \"WALL_DMSPRITEDEF\""));

        // The skeleton's bone track lives in the skeleton satellite, not
        // the root.
        let rig = String::from_utf8(arc.file("RIG_HS.WCE").unwrap()).unwrap();
        assert!(rig.contains("TRACKDEFINITION \"ARM_TRACKDEF\""));
        assert!(rig.contains("TRACKINSTANCE \"ARM_TRACK\""));
        assert!(!root.contains("TRACKINSTANCE \"ARM_TRACK\""));
    }

    #[test]
    fn test_block_indentation_is_balanced() {
        let world = sample_world();
        let mut arc = MemArchive::new();
        WceWriter::write(&world, &mut arc, "sample.wce").unwrap();

        // Count headers indent their items one level; nested blocks one
        // more. Closing keywords return to the opening column, so the
        // outermost END lands back at column zero.
        let rig = String::from_utf8(arc.file("RIG_HS.WCE").unwrap()).unwrap();
        assert!(rig.contains("\n\tNUMBONES 1\n"));
        assert!(rig.contains("\n\t\tBONE \"ARM_DAG\"\n"));
        assert!(rig.contains("\n\t\t\tTRACK \"ARM_TRACK\"\n"));
        assert!(rig.contains("\n\t\tENDBONE\n"));
        assert!(rig.contains("\n\tNUMSKINS 1\n"));
        assert!(rig.contains("\nENDHIERARCHICALSPRITEDEF\n"));

        let root = String::from_utf8(arc.file("sample.wce").unwrap()).unwrap();
        assert!(root.contains("\nMATERIALDEFINITION \"WALL_MDF\"\n"));
        assert!(root.contains("\nENDMATERIALDEFINITION\n"));
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let script = b"MATERIALDEFINITION \"A_MDF\"\n\
            RENDERMETHOD 0\nRGBPEN 0 0 0 0\nBRIGHTNESS 0\nSCALEDAMBIENT 0\n\
            SIMPLESPRITEINST? NULL\nUVSHIFT? NULL\nENDMATERIALDEFINITION\n\
            MATERIALDEFINITION \"A_MDF\"\n\
            RENDERMETHOD 0\nRGBPEN 0 0 0 0\nBRIGHTNESS 0\nSCALEDAMBIENT 0\n\
            SIMPLESPRITEINST? NULL\nUVSHIFT? NULL\nENDMATERIALDEFINITION\n";
        let mut arc = MemArchive::new();
        arc.write_file("dup.wce", script).unwrap();
        let err = WceReader::read(&arc, "dup.wce").unwrap_err();
        match err {
            Error::WceParse { message, .. } => assert!(message.contains("duplicate tag")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_keyword_rejected() {
        let mut arc = MemArchive::new();
        arc.write_file("bad.wce", b"NOTAKEYWORD \"X\"\n").unwrap();
        let err = WceReader::read(&arc, "bad.wce").unwrap_err();
        assert!(matches!(err, Error::WceGrammar { line: 1, .. }));
    }

    #[test]
    fn test_missing_include_reported() {
        let mut arc = MemArchive::new();
        arc.write_file("root.wce", b"INCLUDE \"GONE.WCE\"\n").unwrap();
        let err = WceReader::read(&arc, "root.wce").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(name) if name == "GONE.WCE"));
    }
}
