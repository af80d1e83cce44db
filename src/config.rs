//! Scene configuration records.
//!
//! [`SceneConfig`] holds the tuning values one variant is built from. It is created once at
//! startup from literal defaults (optionally overridden by a TOML file) and afterwards only
//! changes through [`crate::control::Control`] edits.

use serde::Deserialize;

use crate::error::{Result, SketchError};

/// An 8-bit-per-channel colour, written as `0xff96d9` or `"#ff96d9"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RgbRepr")]
pub struct Rgb(pub u32);

#[derive(Deserialize)]
#[serde(untagged)]
enum RgbRepr {
    Int(u32),
    Hex(String),
}

impl TryFrom<RgbRepr> for Rgb {
    type Error = String;

    fn try_from(repr: RgbRepr) -> std::result::Result<Self, Self::Error> {
        let value = match repr {
            RgbRepr::Int(v) => v,
            RgbRepr::Hex(s) => {
                let digits = s.trim_start_matches('#').trim_start_matches("0x");
                u32::from_str_radix(digits, 16).map_err(|e| format!("bad colour {s:?}: {e}"))?
            }
        };
        if value > 0xff_ffff {
            return Err(format!("colour {value:#x} has more than 24 bits"));
        }
        Ok(Self(value))
    }
}

impl Rgb {
    pub const BLACK: Rgb = Rgb(0x000000);
    pub const WHITE: Rgb = Rgb(0xffffff);

    /// sRGB channels in `[0, 1]`.
    pub fn to_srgb(self) -> [f32; 3] {
        [
            ((self.0 >> 16) & 0xff) as f32 / 255.0,
            ((self.0 >> 8) & 0xff) as f32 / 255.0,
            (self.0 & 0xff) as f32 / 255.0,
        ]
    }

    /// Linear-light channels, the space the shaders work in.
    pub fn to_linear(self) -> [f32; 3] {
        self.to_srgb().map(srgb_to_linear)
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub enable_swooping_camera: bool,
    pub enable_rotation: bool,
    pub color: Rgb,
    pub roughness: f32,
    pub metalness: f32,
    pub transmission: f32,
    pub ior: f32,
    pub reflectivity: f32,
    pub thickness: f32,
    pub env_map_intensity: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub normal_scale: f32,
    pub clearcoat_normal_scale: f32,
    pub normal_repeat: u32,
    pub bloom_threshold: f32,
    pub bloom_strength: f32,
    pub bloom_radius: f32,
    pub transparent: bool,
    pub opacity: f32,
    pub emissive_color: Rgb,
    pub depth_test: bool,
    pub depth_write: bool,
    pub wireframe: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            enable_swooping_camera: false,
            enable_rotation: false,
            color: Rgb(0xff96d9),
            roughness: 0.18,
            metalness: 0.3,
            transmission: 1.0,
            ior: 1.5,
            reflectivity: 0.0,
            thickness: 0.1,
            env_map_intensity: 0.5,
            clearcoat: 0.0,
            clearcoat_roughness: 0.15,
            normal_scale: 0.0,
            clearcoat_normal_scale: 5.0,
            normal_repeat: 5,
            bloom_threshold: 0.85,
            bloom_strength: 0.35,
            bloom_radius: 0.33,
            transparent: true,
            opacity: 0.0,
            emissive_color: Rgb::BLACK,
            depth_test: true,
            depth_write: false,
            wireframe: false,
        }
    }
}

/// Documented range of every numeric field, checked by [`SceneConfig::validate`] and by
/// control edits.
pub const RANGES: &[(&str, f32, f32)] = &[
    ("roughness", 0.0, 1.0),
    ("metalness", 0.0, 1.0),
    ("transmission", 0.0, 1.0),
    ("ior", 1.0, 2.33),
    ("reflectivity", 0.0, 1.0),
    ("thickness", 0.0, 5.0),
    ("env_map_intensity", 0.0, 3.0),
    ("clearcoat", 0.0, 1.0),
    ("clearcoat_roughness", 0.0, 1.0),
    ("normal_scale", 0.0, 5.0),
    ("clearcoat_normal_scale", 0.0, 5.0),
    ("normal_repeat", 1.0, 16.0),
    ("bloom_threshold", 0.0, 1.0),
    ("bloom_strength", 0.0, 5.0),
    ("bloom_radius", 0.0, 1.0),
    ("opacity", 0.0, 1.0),
];

/// Fails with [`SketchError::InvalidConfig`] unless `value` lies inside the range registered
/// for `field`. NaN is always rejected.
pub fn check_range(field: &'static str, value: f32) -> Result<f32> {
    let (_, min, max) = RANGES
        .iter()
        .find(|(name, _, _)| *name == field)
        .copied()
        .unwrap_or((field, f32::NEG_INFINITY, f32::INFINITY));
    if value >= min && value <= max {
        Ok(value)
    } else {
        Err(SketchError::InvalidConfig {
            field,
            value,
            min,
            max,
        })
    }
}

impl SceneConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn validate(&self) -> Result<()> {
        check_range("roughness", self.roughness)?;
        check_range("metalness", self.metalness)?;
        check_range("transmission", self.transmission)?;
        check_range("ior", self.ior)?;
        check_range("reflectivity", self.reflectivity)?;
        check_range("thickness", self.thickness)?;
        check_range("env_map_intensity", self.env_map_intensity)?;
        check_range("clearcoat", self.clearcoat)?;
        check_range("clearcoat_roughness", self.clearcoat_roughness)?;
        check_range("normal_scale", self.normal_scale)?;
        check_range("clearcoat_normal_scale", self.clearcoat_normal_scale)?;
        check_range("normal_repeat", self.normal_repeat as f32)?;
        check_range("bloom_threshold", self.bloom_threshold)?;
        check_range("bloom_strength", self.bloom_strength)?;
        check_range("bloom_radius", self.bloom_radius)?;
        check_range("opacity", self.opacity)?;
        Ok(())
    }
}

/// Fixed perspective camera constants.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Start position on the +Z axis.
    pub distance: f32,
    pub clear_color: Rgb,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 40.0,
            near: 0.1,
            far: 1000.0,
            distance: 23.0,
            clear_color: Rgb::BLACK,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 1.25,
            enable_zoom: true,
            enable_pan: false,
            min_distance: 10.0,
            max_distance: 50.0,
            auto_rotate: true,
            auto_rotate_speed: 0.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

/// Override file layout: each table is optional and only names the fields it changes.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Overrides {
    pub options: Option<toml::Table>,
    pub camera: Option<CameraConfig>,
    pub controls: Option<ControlsConfig>,
}

impl Overrides {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Layers the `[options]` table over `base`, keeping every field it does not name.
    pub fn apply_options(&self, base: &SceneConfig) -> Result<SceneConfig> {
        let Some(table) = &self.options else {
            return Ok(base.clone());
        };
        let mut merged = base_table(base);
        for (k, v) in table {
            merged.insert(k.clone(), v.clone());
        }
        Ok(toml::Value::Table(merged).try_into()?)
    }
}

fn base_table(c: &SceneConfig) -> toml::Table {
    let mut t = toml::Table::new();
    let mut put = |k: &str, v: toml::Value| {
        t.insert(k.to_string(), v);
    };
    put("enable_swooping_camera", c.enable_swooping_camera.into());
    put("enable_rotation", c.enable_rotation.into());
    put("color", i64::from(c.color.0).into());
    put("roughness", f64::from(c.roughness).into());
    put("metalness", f64::from(c.metalness).into());
    put("transmission", f64::from(c.transmission).into());
    put("ior", f64::from(c.ior).into());
    put("reflectivity", f64::from(c.reflectivity).into());
    put("thickness", f64::from(c.thickness).into());
    put("env_map_intensity", f64::from(c.env_map_intensity).into());
    put("clearcoat", f64::from(c.clearcoat).into());
    put("clearcoat_roughness", f64::from(c.clearcoat_roughness).into());
    put("normal_scale", f64::from(c.normal_scale).into());
    put("clearcoat_normal_scale", f64::from(c.clearcoat_normal_scale).into());
    put("normal_repeat", i64::from(c.normal_repeat).into());
    put("bloom_threshold", f64::from(c.bloom_threshold).into());
    put("bloom_strength", f64::from(c.bloom_strength).into());
    put("bloom_radius", f64::from(c.bloom_radius).into());
    put("transparent", c.transparent.into());
    put("opacity", f64::from(c.opacity).into());
    put("emissive_color", i64::from(c.emissive_color.0).into());
    put("depth_test", c.depth_test.into());
    put("depth_write", c.depth_write.into());
    put("wireframe", c.wireframe.into());
    t
}
