//! Built-in scene variants.
//!
//! The sketches only differ by constants and asset files, so each one is a [`Variant`] record
//! in a single table instead of a copy of the driver.

use std::path::PathBuf;

use crate::{
    assets::AssetKey,
    config::{CameraConfig, ControlsConfig, Rgb, SceneConfig},
    error::{Result, SketchError},
};

#[derive(Clone, Debug, PartialEq)]
pub enum MeshPick {
    /// Clone the geometry of the first mesh node with this name. Nested nodes are searched
    /// too, not only the file's top-level nodes.
    Named(String),
    /// Attach every mesh node of the file under one container.
    Scene,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresetKind {
    Glass,
    Metal,
    Diffuse,
}

/// The small facets orbiting the metal dragon.
#[derive(Clone, Debug, PartialEq)]
pub struct SatelliteSpec {
    /// Box extents; the facets are small cubes.
    pub size: [f32; 3],
    pub spacing: f32,
    pub refraction_ratios: Vec<f32>,
    pub roughness: f32,
    pub metalness: f32,
    pub env_map_intensity: f32,
}

impl Default for SatelliteSpec {
    fn default() -> Self {
        Self {
            size: [0.1, 0.1, 0.1],
            spacing: 0.1,
            refraction_ratios: vec![0.96, 0.97, 0.98, 0.99, 1.0, 1.01, 1.02],
            roughness: 0.0,
            metalness: 1.0,
            env_map_intensity: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeshSpec {
    pub key: AssetKey,
    pub path: PathBuf,
    pub pick: MeshPick,
    pub preset: PresetKind,
    pub scale: f32,
    /// Explicit placement. With `None` a named node keeps its transform from the file and a
    /// whole-scene container sits at the origin.
    pub position: Option<[f32; 3]>,
    pub satellites: Option<SatelliteSpec>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetalPreset {
    pub color: Rgb,
    pub metalness: f32,
    pub roughness: f32,
    pub transmission: f32,
    pub opacity: f32,
    pub ior: f32,
    pub reflectivity: f32,
    pub thickness: f32,
    pub env_map_intensity: f32,
    pub refraction_ratio: f32,
    pub normal_scale: f32,
    /// Index into [`AssetManifest::normal_maps`].
    pub normal_map: Option<u8>,
}

impl Default for MetalPreset {
    fn default() -> Self {
        Self {
            color: Rgb::WHITE,
            metalness: 1.0,
            roughness: 0.0,
            transmission: 0.0,
            opacity: 0.6,
            ior: 1.7,
            reflectivity: 0.5,
            thickness: 0.3,
            env_map_intensity: 4.5,
            refraction_ratio: 0.98,
            normal_scale: 0.2,
            normal_map: Some(1),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DiffusePreset {
    pub color: Rgb,
    pub metalness: f32,
    pub roughness: f32,
    pub env_map_intensity: f32,
}

impl Default for DiffusePreset {
    fn default() -> Self {
        Self {
            color: Rgb(0x616161),
            metalness: 0.1,
            roughness: 0.5,
            env_map_intensity: 3.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssetManifest {
    /// Reflections and refraction of the glass and diffuse presets.
    pub background_env: PathBuf,
    /// Lights the metal preset and the satellites.
    pub lighting_env: PathBuf,
    pub normal_maps: Vec<PathBuf>,
    pub meshes: Vec<MeshSpec>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Variant {
    pub name: &'static str,
    pub options: SceneConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub metal: MetalPreset,
    pub diffuse: DiffusePreset,
    /// Base colour of the glass preset. Colour edits replace it at runtime.
    pub glass_tint: Rgb,
    pub assets: AssetManifest,
}

const NAMES: [&str; 4] = ["twin-dragons", "glass-dragon", "chrome-dragon", "frosted"];

fn dragon(index: u8, file: &str, preset: PresetKind) -> MeshSpec {
    MeshSpec {
        key: AssetKey::Mesh(index),
        path: file.into(),
        pick: MeshPick::Named("dragon".into()),
        preset,
        scale: 0.3,
        position: Some([0.0, 0.0, 0.0]),
        satellites: None,
    }
}

fn pedestal(index: u8) -> MeshSpec {
    MeshSpec {
        key: AssetKey::Mesh(index),
        path: "gs.glb".into(),
        pick: MeshPick::Scene,
        preset: PresetKind::Diffuse,
        scale: 0.305,
        position: None,
        satellites: None,
    }
}

fn manifest(meshes: Vec<MeshSpec>) -> AssetManifest {
    AssetManifest {
        background_env: "hdr2.hdr".into(),
        lighting_env: "hdr.hdr".into(),
        normal_maps: vec!["normal2.jpg".into(), "normal.jpg".into()],
        meshes,
    }
}

impl Variant {
    pub fn names() -> &'static [&'static str] {
        &NAMES
    }

    pub fn builtin(name: &str) -> Result<Self> {
        let base = |name: &'static str, options: SceneConfig, meshes| Variant {
            name,
            options,
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            metal: MetalPreset::default(),
            diffuse: DiffusePreset::default(),
            glass_tint: Rgb::WHITE,
            assets: manifest(meshes),
        };
        let metal_dragon = || MeshSpec {
            satellites: Some(SatelliteSpec::default()),
            ..dragon(1, "model2.glb", PresetKind::Metal)
        };

        let variant = match name {
            "twin-dragons" => base(
                "twin-dragons",
                SceneConfig::default(),
                vec![
                    dragon(0, "model1.glb", PresetKind::Glass),
                    metal_dragon(),
                    pedestal(2),
                ],
            ),
            "glass-dragon" => base(
                "glass-dragon",
                SceneConfig {
                    enable_swooping_camera: true,
                    roughness: 0.1,
                    thickness: 0.5,
                    env_map_intensity: 1.5,
                    normal_scale: 0.3,
                    normal_repeat: 3,
                    ..SceneConfig::default()
                },
                vec![dragon(0, "model1.glb", PresetKind::Glass)],
            ),
            "chrome-dragon" => base(
                "chrome-dragon",
                SceneConfig {
                    bloom_threshold: 0.7,
                    bloom_strength: 0.6,
                    ..SceneConfig::default()
                },
                vec![metal_dragon(), pedestal(2)],
            ),
            "frosted" => Variant {
                glass_tint: Rgb(0xd9f0ff),
                ..base(
                    "frosted",
                    SceneConfig {
                        roughness: 0.45,
                        clearcoat: 1.0,
                        clearcoat_roughness: 0.1,
                        normal_scale: 1.0,
                        normal_repeat: 3,
                        ..SceneConfig::default()
                    },
                    vec![dragon(0, "model1.glb", PresetKind::Glass), pedestal(2)],
                )
            },
            other => return Err(SketchError::UnknownVariant(other.to_string())),
        };
        Ok(variant)
    }

    /// Every asset this variant loads, textures first.
    pub fn requests(&self) -> Vec<(AssetKey, PathBuf)> {
        let mut out = vec![
            (AssetKey::BackgroundEnv, self.assets.background_env.clone()),
            (AssetKey::LightingEnv, self.assets.lighting_env.clone()),
        ];
        out.extend(
            self.assets
                .normal_maps
                .iter()
                .enumerate()
                .map(|(i, p)| (AssetKey::NormalMap(i as u8), p.clone())),
        );
        out.extend(self.assets.meshes.iter().map(|m| (m.key, m.path.clone())));
        out
    }

    pub fn mesh_spec(&self, key: AssetKey) -> Option<&MeshSpec> {
        self.assets.meshes.iter().find(|m| m.key == key)
    }
}
