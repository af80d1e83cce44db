//! Live edits of the scene options.
//!
//! A [`Control`] changes exactly one field of [`SceneConfig`]. [`crate::sketch::Sketch::apply`]
//! validates it, stores it and performs the matching engine update.

use crate::{
    config::{Rgb, SceneConfig, check_range},
    error::Result,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Control {
    EnableSwoopingCamera(bool),
    EnableRotation(bool),
    Color(Rgb),
    Roughness(f32),
    Metalness(f32),
    Transmission(f32),
    Ior(f32),
    Reflectivity(f32),
    Thickness(f32),
    EnvMapIntensity(f32),
    Clearcoat(f32),
    ClearcoatRoughness(f32),
    NormalScale(f32),
    ClearcoatNormalScale(f32),
    NormalRepeat(u32),
    Transparent(bool),
    Opacity(f32),
    EmissiveColor(Rgb),
    DepthTest(bool),
    DepthWrite(bool),
    Wireframe(bool),
    BloomThreshold(f32),
    BloomStrength(f32),
    BloomRadius(f32),
}

/// Which part of the engine an edit touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    GlassMaterial,
    Bloom,
    CameraMode,
    SceneMotion,
}

impl Control {
    pub fn field(&self) -> &'static str {
        match self {
            Control::EnableSwoopingCamera(_) => "enable_swooping_camera",
            Control::EnableRotation(_) => "enable_rotation",
            Control::Color(_) => "color",
            Control::Roughness(_) => "roughness",
            Control::Metalness(_) => "metalness",
            Control::Transmission(_) => "transmission",
            Control::Ior(_) => "ior",
            Control::Reflectivity(_) => "reflectivity",
            Control::Thickness(_) => "thickness",
            Control::EnvMapIntensity(_) => "env_map_intensity",
            Control::Clearcoat(_) => "clearcoat",
            Control::ClearcoatRoughness(_) => "clearcoat_roughness",
            Control::NormalScale(_) => "normal_scale",
            Control::ClearcoatNormalScale(_) => "clearcoat_normal_scale",
            Control::NormalRepeat(_) => "normal_repeat",
            Control::Transparent(_) => "transparent",
            Control::Opacity(_) => "opacity",
            Control::EmissiveColor(_) => "emissive_color",
            Control::DepthTest(_) => "depth_test",
            Control::DepthWrite(_) => "depth_write",
            Control::Wireframe(_) => "wireframe",
            Control::BloomThreshold(_) => "bloom_threshold",
            Control::BloomStrength(_) => "bloom_strength",
            Control::BloomRadius(_) => "bloom_radius",
        }
    }

    pub fn target(&self) -> Target {
        match self {
            Control::EnableSwoopingCamera(_) => Target::CameraMode,
            Control::EnableRotation(_) => Target::SceneMotion,
            Control::BloomThreshold(_) | Control::BloomStrength(_) | Control::BloomRadius(_) => {
                Target::Bloom
            }
            _ => Target::GlassMaterial,
        }
    }

    /// Range check for numeric edits. Flags and colours always pass.
    pub fn validate(&self) -> Result<()> {
        let field = self.field();
        match *self {
            Control::Roughness(v)
            | Control::Metalness(v)
            | Control::Transmission(v)
            | Control::Ior(v)
            | Control::Reflectivity(v)
            | Control::Thickness(v)
            | Control::EnvMapIntensity(v)
            | Control::Clearcoat(v)
            | Control::ClearcoatRoughness(v)
            | Control::NormalScale(v)
            | Control::ClearcoatNormalScale(v)
            | Control::Opacity(v)
            | Control::BloomThreshold(v)
            | Control::BloomStrength(v)
            | Control::BloomRadius(v) => check_range(field, v).map(drop),
            Control::NormalRepeat(n) => check_range(field, n as f32).map(drop),
            _ => Ok(()),
        }
    }

    /// Writes the edited field into `options`.
    pub fn write(&self, options: &mut SceneConfig) {
        match *self {
            Control::EnableSwoopingCamera(v) => options.enable_swooping_camera = v,
            Control::EnableRotation(v) => options.enable_rotation = v,
            Control::Color(c) => options.color = c,
            Control::Roughness(v) => options.roughness = v,
            Control::Metalness(v) => options.metalness = v,
            Control::Transmission(v) => options.transmission = v,
            Control::Ior(v) => options.ior = v,
            Control::Reflectivity(v) => options.reflectivity = v,
            Control::Thickness(v) => options.thickness = v,
            Control::EnvMapIntensity(v) => options.env_map_intensity = v,
            Control::Clearcoat(v) => options.clearcoat = v,
            Control::ClearcoatRoughness(v) => options.clearcoat_roughness = v,
            Control::NormalScale(v) => options.normal_scale = v,
            Control::ClearcoatNormalScale(v) => options.clearcoat_normal_scale = v,
            Control::NormalRepeat(n) => options.normal_repeat = n,
            Control::Transparent(v) => options.transparent = v,
            Control::Opacity(v) => options.opacity = v,
            Control::EmissiveColor(c) => options.emissive_color = c,
            Control::DepthTest(v) => options.depth_test = v,
            Control::DepthWrite(v) => options.depth_write = v,
            Control::Wireframe(v) => options.wireframe = v,
            Control::BloomThreshold(v) => options.bloom_threshold = v,
            Control::BloomStrength(v) => options.bloom_strength = v,
            Control::BloomRadius(v) => options.bloom_radius = v,
        }
    }
}
