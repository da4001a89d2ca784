//! The tag-addressed logical world graph.
//!
//! This is the long-lived, caller-visible form of a WLD file. Every
//! record carries a `tag` unique within its kind, and every
//! cross-reference is a tag string rather than a stream position.
//! Instance-wrapper fragments from the raw layer are folded away here: a
//! material stores its simple-sprite tag directly, a point light stores
//! its light-definition tag directly, and so on. The raw wrappers are
//! re-synthesized on encode.
//!
//! Geometry is stored de-quantized: mesh vertices, UVs and normals are
//! `f32` here, re-quantized against the per-mesh `fp_scale` when the
//! world is written back to binary.

pub mod read;
pub mod write;

use std::fmt;

use glam::Vec3;
use indexmap::IndexMap;

use crate::raw::fragment::WldVersion;
use crate::raw::fragments::{Face, MeshOp};

/// Logical record kinds, used for emission memoization and error
/// reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Material,
    MaterialPalette,
    SimpleSprite,
    Mesh,
    RgbTrack,
    Polyhedron,
    TrackDef,
    Track,
    Skeleton,
    Sprite3D,
    LightDef,
    PointLight,
    AmbientLight,
    ActorDef,
    ActorInst,
    WorldTree,
    Region,
    Zone,
}

impl RecordKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Material => "MATERIALDEFINITION",
            Self::MaterialPalette => "MATERIALPALETTE",
            Self::SimpleSprite => "SIMPLESPRITEDEF",
            Self::Mesh => "DMSPRITEDEF2",
            Self::RgbTrack => "DMRGBTRACKDEF",
            Self::Polyhedron => "POLYHEDRONDEFINITION",
            Self::TrackDef => "TRACKDEFINITION",
            Self::Track => "TRACKINSTANCE",
            Self::Skeleton => "HIERARCHICALSPRITEDEF",
            Self::Sprite3D => "SPRITE3DDEF",
            Self::LightDef => "LIGHTDEFINITION",
            Self::PointLight => "POINTLIGHT",
            Self::AmbientLight => "AMBIENTLIGHT",
            Self::ActorDef => "ACTORDEF",
            Self::ActorInst => "ACTORINST",
            Self::WorldTree => "WORLDTREE",
            Self::Region => "REGION",
            Self::Zone => "ZONE",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One texture frame of a simple sprite: the frame's own tag plus its
/// texture file list (folded `BmInfo`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpriteFrame {
    pub tag: String,
    pub files: Vec<String>,
}

/// Animated 2-D sprite definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleSprite {
    pub tag: String,
    pub current_frame: Option<i32>,
    /// Frame delay in milliseconds.
    pub sleep: Option<u32>,
    pub frames: Vec<SpriteFrame>,
}

/// Material definition. The raw `SimpleSprite` wrapper between a material
/// and its sprite definition is folded into `simple_sprite_tag`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    pub tag: String,
    pub render_method: u32,
    pub rgb_pen: u32,
    pub brightness: f32,
    pub scaled_ambient: f32,
    pub simple_sprite_tag: Option<String>,
    pub uv_shift: Option<[f32; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialPalette {
    pub tag: String,
    pub flags: u32,
    pub material_tags: Vec<String>,
}

/// Triangle mesh with de-quantized geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub tag: String,
    pub flags: u32,
    pub material_palette_tag: String,
    /// Per-vertex color animation, folded through the `DmRgbTrack`
    /// wrapper.
    pub rgb_track_tag: Option<String>,
    pub center_offset: Vec3,
    pub params2: [u32; 3],
    pub max_distance: f32,
    pub min: Vec3,
    pub max: Vec3,
    /// Fixed-point exponent used when re-quantizing.
    pub fp_scale: u16,
    pub vertices: Vec<Vec3>,
    pub uvs: Vec<[f32; 2]>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<u32>,
    pub faces: Vec<Face>,
    pub skin_groups: Vec<(u16, u16)>,
    pub face_material_groups: Vec<(u16, u16)>,
    pub vertex_material_groups: Vec<(u16, u16)>,
    pub meshops: Vec<MeshOp>,
}

/// Per-vertex RGBA animation track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RgbTrack {
    pub tag: String,
    pub flags: u32,
    pub sleep: u32,
    pub frames: Vec<Vec<u32>>,
}

/// Convex collision volume.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyhedron {
    pub tag: String,
    pub flags: u32,
    pub bounding_radius: f32,
    pub scale_factor: f32,
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Vec<u32>>,
}

/// One animation keyframe in float form. Rotation is a quaternion
/// `(w, x, y, z)`; raw integer frames are divided by their denominators
/// on decode and re-quantized against the canonical denominators
/// (rotation 16384, translation 256) on encode.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackTransform {
    pub translation: Vec3,
    pub rotation: [f32; 4],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackDef {
    pub tag: String,
    pub flags: u32,
    pub frames: Vec<TrackTransform>,
}

/// Animation track instance. Exposed as its own record because many
/// instances can share one definition and bones reference the instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub tag: String,
    pub definition_tag: String,
    pub interpolate: bool,
    pub reverse: bool,
    pub sleep: Option<u32>,
}

/// One skeleton bone. `children` are 0-based indices into the skeleton's
/// bone list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonBone {
    pub name: String,
    pub track_tag: String,
    /// Attached mesh, folded through the `DmSprite` wrapper.
    pub sprite_tag: Option<String>,
    pub children: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    pub tag: String,
    pub center_offset: Option<Vec3>,
    pub bounding_radius: Option<f32>,
    /// Collision volume, folded through the `Polyhedron` wrapper.
    pub collision_volume_tag: Option<String>,
    pub bones: Vec<SkeletonBone>,
    /// `(mesh tag, link update)` skin attachments.
    pub skins: Vec<(String, u32)>,
}

/// Render properties on a 3-D sprite BSP node, with the raw
/// `SimpleSprite` reference folded to a tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderInfo {
    pub render_method: u32,
    pub pen: Option<u32>,
    pub brightness: Option<f32>,
    pub scaled_ambient: Option<f32>,
    pub sprite_tag: Option<String>,
    pub uv_origin: Option<[Vec3; 3]>,
    pub uv_map: Vec<[f32; 2]>,
    pub two_sided: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sprite3DBspNode {
    pub vertex_indices: Vec<u32>,
    pub front_tree: u32,
    pub back_tree: u32,
    pub render: RenderInfo,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sprite3D {
    pub tag: String,
    pub center_offset: Option<Vec3>,
    pub bounding_radius: Option<f32>,
    pub vertices: Vec<Vec3>,
    pub nodes: Vec<Sprite3DBspNode>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightDef {
    pub tag: String,
    pub current_frame: Option<u32>,
    pub sleep: Option<u32>,
    pub skip_frames: bool,
    pub frame_count: u32,
    pub light_levels: Vec<f32>,
    pub colors: Vec<Vec3>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointLight {
    pub tag: String,
    pub light_tag: String,
    pub flags: u32,
    pub location: Vec3,
    pub radius: f32,
}

/// Ambient light over a set of regions. Regions are addressed by ordinal
/// (position among `Region` records), which stays stable across encode
/// passes because regions are always emitted in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmbientLight {
    pub tag: String,
    pub light_tag: String,
    pub regions: Vec<u32>,
}

/// Sprite reference carried by an actor definition, already resolved to
/// the underlying definition's tag.
#[derive(Debug, Clone, PartialEq)]
pub enum SpriteRef {
    Mesh(String),
    Skeleton(String),
    Sprite3D(String),
}

impl SpriteRef {
    pub fn tag(&self) -> &str {
        match self {
            Self::Mesh(t) | Self::Skeleton(t) | Self::Sprite3D(t) => t,
        }
    }
}

/// One level-of-detail action of an actor definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorAction {
    pub min_distances: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorDef {
    pub tag: String,
    pub callback: String,
    /// Bounding sphere radius, folded from the `Sphere` fragment.
    pub bounds_radius: Option<f32>,
    pub current_action: Option<u32>,
    pub location: Option<[f32; 6]>,
    pub actions: Vec<ActorAction>,
    pub sprites: Vec<SpriteRef>,
    pub user_data: String,
}

/// A placed actor. `actor_def_tag` is resolved by *name*, not position:
/// placement files routinely reference definitions in another WLD file,
/// so the tag is not validated against this world's actor definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorInst {
    pub tag: String,
    pub actor_def_tag: String,
    pub current_action: Option<u32>,
    pub location: Option<[f32; 6]>,
    pub bounding_radius: Option<f32>,
    pub scale_factor: Option<f32>,
    /// Collision sphere radius, folded from the `Sphere` fragment.
    pub sphere_radius: Option<f32>,
    pub rgb_track_tag: Option<String>,
    pub user_data: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldNode {
    pub normal: Vec3,
    pub dist: f32,
    pub region_tag: Option<String>,
    /// 1-based node numbers within the same tree, 0 for none.
    pub front_tree: u32,
    pub back_tree: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldTree {
    pub tag: String,
    pub nodes: Vec<WorldNode>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    pub tag: String,
    pub ambient_light_tag: Option<String>,
    /// Region geometry, folded through the `DmSprite` wrapper.
    pub mesh_tag: Option<String>,
    pub sphere: Option<[f32; 4]>,
    pub reverb_volume: Option<f32>,
    pub vertices: Vec<Vec3>,
    pub vis_lists: Vec<Vec<u16>>,
    pub user_data: String,
}

/// Named region group, addressed by ordinal like [`AmbientLight`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Zone {
    pub tag: String,
    pub regions: Vec<u32>,
    pub user_data: String,
}

/// The complete logical graph of one WLD file: one insertion-ordered map
/// per record kind, keyed by tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct World {
    pub version: WldVersion,
    /// Packed RGBA world ambient color, when present.
    pub global_ambient: Option<u32>,
    pub simple_sprites: IndexMap<String, SimpleSprite>,
    pub materials: IndexMap<String, Material>,
    pub material_palettes: IndexMap<String, MaterialPalette>,
    pub meshes: IndexMap<String, Mesh>,
    pub rgb_tracks: IndexMap<String, RgbTrack>,
    pub polyhedra: IndexMap<String, Polyhedron>,
    pub track_defs: IndexMap<String, TrackDef>,
    pub tracks: IndexMap<String, Track>,
    pub skeletons: IndexMap<String, Skeleton>,
    pub sprite3ds: IndexMap<String, Sprite3D>,
    pub light_defs: IndexMap<String, LightDef>,
    pub point_lights: IndexMap<String, PointLight>,
    pub ambient_lights: IndexMap<String, AmbientLight>,
    pub actor_defs: IndexMap<String, ActorDef>,
    pub actor_insts: IndexMap<String, ActorInst>,
    pub world_trees: IndexMap<String, WorldTree>,
    pub regions: IndexMap<String, Region>,
    pub zones: IndexMap<String, Zone>,
}

impl World {
    pub fn new(version: WldVersion) -> Self {
        Self { version, ..Self::default() }
    }

    /// Total number of logical records across all kinds.
    pub fn record_count(&self) -> usize {
        self.simple_sprites.len()
            + self.materials.len()
            + self.material_palettes.len()
            + self.meshes.len()
            + self.rgb_tracks.len()
            + self.polyhedra.len()
            + self.track_defs.len()
            + self.tracks.len()
            + self.skeletons.len()
            + self.sprite3ds.len()
            + self.light_defs.len()
            + self.point_lights.len()
            + self.ambient_lights.len()
            + self.actor_defs.len()
            + self.actor_insts.len()
            + self.world_trees.len()
            + self.regions.len()
            + self.zones.len()
    }
}
