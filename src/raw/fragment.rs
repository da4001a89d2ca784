//! The raw fragment sum type and the decode registry.
//!
//! Every fragment kind the logical model consumes (plus the instance
//! wrappers those kinds reference) is a variant of [`FragPayload`].
//! Legacy files carry many further kinds; those stay unregistered and the
//! stream codec skips them.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::raw::fragments::{
    Actor, ActorDef, AmbientLight, BmInfo, DmRgbTrack, DmRgbTrackDef, DmSprite, DmSpriteDef2,
    GlobalAmbientLightDef, HierarchicalSprite, HierarchicalSpriteDef, Light, LightDef, MaterialDef,
    MaterialPalette, PointLight, Polyhedron, PolyhedronDef, Region, SimpleSprite, SimpleSpriteDef,
    Sphere, Sprite3D, Sprite3DDef, Track, TrackDef, WorldTree, Zone,
};

/// WLD sub-format selector. The version word in the envelope picks one of
/// two known values; anything else is a hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WldVersion {
    /// 0x00015500 — original client worlds (narrow UVs).
    Old,
    /// 0x1000C800 — later client worlds.
    #[default]
    New,
}

impl WldVersion {
    pub fn from_word(word: u32) -> Result<Self> {
        match word {
            0x00015500 => Ok(Self::Old),
            0x1000C800 => Ok(Self::New),
            other => Err(Error::UnsupportedWldVersion(other)),
        }
    }

    pub fn as_word(self) -> u32 {
        match self {
            Self::Old => 0x00015500,
            Self::New => 0x1000C800,
        }
    }
}

/// Per-pass state handed to every fragment codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct FragContext {
    pub version: WldVersion,
}

/// Decoded payload of one raw fragment. Identity is positional: the i-th
/// fragment in the stream is index `i` (1-based), and 0 means "no
/// reference".
#[derive(Debug, Clone, PartialEq)]
pub enum FragPayload {
    BmInfo(BmInfo),
    SimpleSpriteDef(SimpleSpriteDef),
    SimpleSprite(SimpleSprite),
    Sprite3DDef(Sprite3DDef),
    Sprite3D(Sprite3D),
    HierarchicalSpriteDef(HierarchicalSpriteDef),
    HierarchicalSprite(HierarchicalSprite),
    TrackDef(TrackDef),
    Track(Track),
    ActorDef(ActorDef),
    Actor(Actor),
    Sphere(Sphere),
    PolyhedronDef(PolyhedronDef),
    Polyhedron(Polyhedron),
    LightDef(LightDef),
    Light(Light),
    WorldTree(WorldTree),
    Region(Region),
    PointLight(PointLight),
    Zone(Zone),
    AmbientLight(AmbientLight),
    DmSpriteDef2(DmSpriteDef2),
    DmSprite(DmSprite),
    MaterialDef(MaterialDef),
    MaterialPalette(MaterialPalette),
    DmRgbTrackDef(DmRgbTrackDef),
    DmRgbTrack(DmRgbTrack),
    GlobalAmbientLightDef(GlobalAmbientLightDef),
}

macro_rules! payload_dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            FragPayload::BmInfo($inner) => $body,
            FragPayload::SimpleSpriteDef($inner) => $body,
            FragPayload::SimpleSprite($inner) => $body,
            FragPayload::Sprite3DDef($inner) => $body,
            FragPayload::Sprite3D($inner) => $body,
            FragPayload::HierarchicalSpriteDef($inner) => $body,
            FragPayload::HierarchicalSprite($inner) => $body,
            FragPayload::TrackDef($inner) => $body,
            FragPayload::Track($inner) => $body,
            FragPayload::ActorDef($inner) => $body,
            FragPayload::Actor($inner) => $body,
            FragPayload::Sphere($inner) => $body,
            FragPayload::PolyhedronDef($inner) => $body,
            FragPayload::Polyhedron($inner) => $body,
            FragPayload::LightDef($inner) => $body,
            FragPayload::Light($inner) => $body,
            FragPayload::WorldTree($inner) => $body,
            FragPayload::Region($inner) => $body,
            FragPayload::PointLight($inner) => $body,
            FragPayload::Zone($inner) => $body,
            FragPayload::AmbientLight($inner) => $body,
            FragPayload::DmSpriteDef2($inner) => $body,
            FragPayload::DmSprite($inner) => $body,
            FragPayload::MaterialDef($inner) => $body,
            FragPayload::MaterialPalette($inner) => $body,
            FragPayload::DmRgbTrackDef($inner) => $body,
            FragPayload::DmRgbTrack($inner) => $body,
            FragPayload::GlobalAmbientLightDef($inner) => $body,
        }
    };
}

impl FragPayload {
    /// Numeric type code written in the stream.
    pub fn code(&self) -> i32 {
        match self {
            Self::BmInfo(_) => BmInfo::CODE,
            Self::SimpleSpriteDef(_) => SimpleSpriteDef::CODE,
            Self::SimpleSprite(_) => SimpleSprite::CODE,
            Self::Sprite3DDef(_) => Sprite3DDef::CODE,
            Self::Sprite3D(_) => Sprite3D::CODE,
            Self::HierarchicalSpriteDef(_) => HierarchicalSpriteDef::CODE,
            Self::HierarchicalSprite(_) => HierarchicalSprite::CODE,
            Self::TrackDef(_) => TrackDef::CODE,
            Self::Track(_) => Track::CODE,
            Self::ActorDef(_) => ActorDef::CODE,
            Self::Actor(_) => Actor::CODE,
            Self::Sphere(_) => Sphere::CODE,
            Self::PolyhedronDef(_) => PolyhedronDef::CODE,
            Self::Polyhedron(_) => Polyhedron::CODE,
            Self::LightDef(_) => LightDef::CODE,
            Self::Light(_) => Light::CODE,
            Self::WorldTree(_) => WorldTree::CODE,
            Self::Region(_) => Region::CODE,
            Self::PointLight(_) => PointLight::CODE,
            Self::Zone(_) => Zone::CODE,
            Self::AmbientLight(_) => AmbientLight::CODE,
            Self::DmSpriteDef2(_) => DmSpriteDef2::CODE,
            Self::DmSprite(_) => DmSprite::CODE,
            Self::MaterialDef(_) => MaterialDef::CODE,
            Self::MaterialPalette(_) => MaterialPalette::CODE,
            Self::DmRgbTrackDef(_) => DmRgbTrackDef::CODE,
            Self::DmRgbTrack(_) => DmRgbTrack::CODE,
            Self::GlobalAmbientLightDef(_) => GlobalAmbientLightDef::CODE,
        }
    }

    /// Short kind label used in placeholder tags and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::BmInfo(_) => "BMINFO",
            Self::SimpleSpriteDef(_) => "SIMPLESPRITEDEF",
            Self::SimpleSprite(_) => "SIMPLESPRITE",
            Self::Sprite3DDef(_) => "SPRITE3DDEF",
            Self::Sprite3D(_) => "SPRITE3D",
            Self::HierarchicalSpriteDef(_) => "HIERARCHICALSPRITEDEF",
            Self::HierarchicalSprite(_) => "HIERARCHICALSPRITE",
            Self::TrackDef(_) => "TRACKDEF",
            Self::Track(_) => "TRACK",
            Self::ActorDef(_) => "ACTORDEF",
            Self::Actor(_) => "ACTOR",
            Self::Sphere(_) => "SPHERE",
            Self::PolyhedronDef(_) => "POLYHEDRONDEF",
            Self::Polyhedron(_) => "POLYHEDRON",
            Self::LightDef(_) => "LIGHTDEF",
            Self::Light(_) => "LIGHT",
            Self::WorldTree(_) => "WORLDTREE",
            Self::Region(_) => "REGION",
            Self::PointLight(_) => "POINTLIGHT",
            Self::Zone(_) => "ZONE",
            Self::AmbientLight(_) => "AMBIENTLIGHT",
            Self::DmSpriteDef2(_) => "DMSPRITEDEF2",
            Self::DmSprite(_) => "DMSPRITE",
            Self::MaterialDef(_) => "MATERIALDEF",
            Self::MaterialPalette(_) => "MATERIALPALETTE",
            Self::DmRgbTrackDef(_) => "DMRGBTRACKDEF",
            Self::DmRgbTrack(_) => "DMRGBTRACK",
            Self::GlobalAmbientLightDef(_) => "GLOBALAMBIENTLIGHTDEF",
        }
    }

    /// The fragment's own name reference (0 when the kind is unnamed by
    /// construction).
    pub fn name_ref(&self) -> i32 {
        match self {
            Self::BmInfo(f) => f.name_ref,
            Self::SimpleSpriteDef(f) => f.name_ref,
            Self::SimpleSprite(f) => f.name_ref,
            Self::Sprite3DDef(f) => f.name_ref,
            Self::Sprite3D(f) => f.name_ref,
            Self::HierarchicalSpriteDef(f) => f.name_ref,
            Self::HierarchicalSprite(f) => f.name_ref,
            Self::TrackDef(f) => f.name_ref,
            Self::Track(f) => f.name_ref,
            Self::ActorDef(f) => f.name_ref,
            Self::Actor(f) => f.name_ref,
            Self::Sphere(f) => f.name_ref,
            Self::PolyhedronDef(f) => f.name_ref,
            Self::Polyhedron(f) => f.name_ref,
            Self::LightDef(f) => f.name_ref,
            Self::Light(f) => f.name_ref,
            Self::WorldTree(f) => f.name_ref,
            Self::Region(f) => f.name_ref,
            Self::PointLight(f) => f.name_ref,
            Self::Zone(f) => f.name_ref,
            Self::AmbientLight(f) => f.name_ref,
            Self::DmSpriteDef2(f) => f.name_ref,
            Self::DmSprite(f) => f.name_ref,
            Self::MaterialDef(f) => f.name_ref,
            Self::MaterialPalette(f) => f.name_ref,
            Self::DmRgbTrackDef(f) => f.name_ref,
            Self::DmRgbTrack(f) => f.name_ref,
            Self::GlobalAmbientLightDef(_) => 0,
        }
    }

    /// Encode this payload back to its wire bytes.
    pub fn encode(&self, ctx: &FragContext) -> Result<Vec<u8>> {
        payload_dispatch!(self, f => f.encode(ctx))
    }
}

/// Decode function signature for one fragment kind.
pub type DecodeFn = fn(&[u8], &FragContext) -> Result<FragPayload>;

/// Maps numeric type codes to decoders. [`FragmentRegistry::standard`]
/// registers every modeled kind; callers can add their own for
/// experimentation.
pub struct FragmentRegistry {
    decoders: HashMap<i32, DecodeFn>,
}

macro_rules! register_standard {
    ($reg:expr, $( $ty:ident ),+ $(,)?) => {
        $(
            $reg.register($ty::CODE, |data, ctx| {
                Ok(FragPayload::$ty($ty::decode(data, ctx)?))
            });
        )+
    };
}

impl FragmentRegistry {
    /// Empty registry; every code is unknown.
    pub fn new() -> Self {
        Self { decoders: HashMap::new() }
    }

    /// Registry covering all modeled fragment kinds.
    pub fn standard() -> Self {
        let mut reg = Self::new();
        register_standard!(
            reg,
            BmInfo,
            SimpleSpriteDef,
            SimpleSprite,
            Sprite3DDef,
            Sprite3D,
            HierarchicalSpriteDef,
            HierarchicalSprite,
            TrackDef,
            Track,
            ActorDef,
            Actor,
            Sphere,
            PolyhedronDef,
            Polyhedron,
            LightDef,
            Light,
            WorldTree,
            Region,
            PointLight,
            Zone,
            AmbientLight,
            DmSpriteDef2,
            DmSprite,
            MaterialDef,
            MaterialPalette,
            DmRgbTrackDef,
            DmRgbTrack,
            GlobalAmbientLightDef,
        );
        reg
    }

    /// Register (or replace) the decoder for a type code.
    pub fn register(&mut self, code: i32, decode: DecodeFn) {
        self.decoders.insert(code, decode);
    }

    /// Decode one fragment payload. `Ok(None)` means the code is
    /// unregistered and the caller should skip the fragment.
    pub fn decode(&self, code: i32, data: &[u8], ctx: &FragContext) -> Result<Option<FragPayload>> {
        match self.decoders.get(&code) {
            Some(decode) => decode(data, ctx).map(Some),
            None => Ok(None),
        }
    }

    /// Whether a decoder is registered for a code.
    pub fn knows(&self, code: i32) -> bool {
        self.decoders.contains_key(&code)
    }
}

impl Default for FragmentRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_words() {
        assert_eq!(WldVersion::from_word(0x00015500).unwrap(), WldVersion::Old);
        assert_eq!(WldVersion::from_word(0x1000C800).unwrap(), WldVersion::New);
        assert!(matches!(
            WldVersion::from_word(0xDEADBEEF),
            Err(Error::UnsupportedWldVersion(0xDEADBEEF))
        ));
        assert_eq!(WldVersion::Old.as_word(), 0x00015500);
    }

    #[test]
    fn test_unknown_code_is_recoverable() {
        let reg = FragmentRegistry::standard();
        let ctx = FragContext::default();
        assert!(reg.decode(0x7F, &[1, 2, 3], &ctx).unwrap().is_none());
        assert!(!reg.knows(0x7F));
        assert!(reg.knows(MaterialDef::CODE));
    }

    #[test]
    fn test_mesh_kind_is_registered() {
        let reg = FragmentRegistry::standard();
        assert!(reg.knows(DmSpriteDef2::CODE));

        let ctx = FragContext::default();
        let mesh = DmSpriteDef2 {
            name_ref: -1,
            fp_scale: 6,
            vertices: vec![[64, -128, 32]],
            ..DmSpriteDef2::default()
        };
        let bytes = mesh.encode(&ctx).unwrap();
        let payload = reg.decode(DmSpriteDef2::CODE, &bytes, &ctx).unwrap().unwrap();
        assert_eq!(payload.kind_name(), "DMSPRITEDEF2");
        assert_eq!(payload.name_ref(), -1);
        assert_eq!(payload, FragPayload::DmSpriteDef2(mesh));
    }

    #[test]
    fn test_standard_registry_dispatches() {
        let reg = FragmentRegistry::standard();
        let ctx = FragContext::default();
        let sphere = Sphere { name_ref: -3, radius: 9.5 };
        let bytes = sphere.encode(&ctx).unwrap();
        let payload = reg.decode(Sphere::CODE, &bytes, &ctx).unwrap().unwrap();
        assert_eq!(payload, FragPayload::Sphere(sphere));
        assert_eq!(payload.code(), 0x16);
        assert_eq!(payload.kind_name(), "SPHERE");
    }
}
