//! Physically-based materials.
//!
//! One material model covers the three presets the scenes use: transmissive glass, reflective
//! metal and a rough diffuse surface. Materials refer to textures by [`AssetKey`], which the
//! driver resolves at draw time, so a material may be created before its maps have loaded.

use crate::{
    assets::AssetKey,
    backend::RenderState,
    config::{Rgb, SceneConfig},
    variant::{DiffusePreset, MetalPreset, SatelliteSpec},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(usize);

#[derive(Clone, Debug, PartialEq)]
pub struct PhysicalMaterial {
    pub name: &'static str,
    pub color: Rgb,
    pub metalness: f32,
    pub roughness: f32,
    pub transmission: f32,
    pub ior: f32,
    pub reflectivity: f32,
    pub thickness: f32,
    pub env_map: Option<AssetKey>,
    pub env_map_intensity: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub normal_map: Option<AssetKey>,
    pub normal_scale: f32,
    pub normal_repeat: u32,
    pub clearcoat_normal_map: Option<AssetKey>,
    pub clearcoat_normal_scale: f32,
    pub emissive: Rgb,
    pub refraction_ratio: f32,
    pub transparent: bool,
    pub opacity: f32,
    pub depth_test: bool,
    pub depth_write: bool,
    pub wireframe: bool,
    /// Set whenever a field changes; the driver re-uploads the uniform and clears it.
    pub needs_update: bool,
}

impl Default for PhysicalMaterial {
    fn default() -> Self {
        Self {
            name: "standard",
            color: Rgb::WHITE,
            metalness: 0.0,
            roughness: 1.0,
            transmission: 0.0,
            ior: 1.5,
            reflectivity: 0.5,
            thickness: 0.0,
            env_map: None,
            env_map_intensity: 1.0,
            clearcoat: 0.0,
            clearcoat_roughness: 0.0,
            normal_map: None,
            normal_scale: 1.0,
            normal_repeat: 1,
            clearcoat_normal_map: None,
            clearcoat_normal_scale: 1.0,
            emissive: Rgb::BLACK,
            refraction_ratio: 0.98,
            transparent: false,
            opacity: 1.0,
            depth_test: true,
            depth_write: true,
            wireframe: false,
            needs_update: true,
        }
    }
}

impl PhysicalMaterial {
    /// Transmissive preset driven by the scene options. The base colour starts at the
    /// variant's `tint`; the options' colour only reaches it through a colour edit.
    /// Render-state options (opacity, transparency, depth flags, wireframe) likewise apply
    /// through edits only.
    pub fn glass(options: &SceneConfig, tint: Rgb) -> Self {
        Self {
            name: "glass",
            color: tint,
            metalness: options.metalness,
            roughness: options.roughness,
            transmission: options.transmission,
            ior: options.ior,
            reflectivity: options.reflectivity,
            thickness: options.thickness,
            env_map: Some(AssetKey::BackgroundEnv),
            env_map_intensity: options.env_map_intensity,
            clearcoat: options.clearcoat,
            clearcoat_roughness: options.clearcoat_roughness,
            normal_map: Some(AssetKey::NormalMap(0)),
            normal_scale: options.normal_scale,
            normal_repeat: options.normal_repeat,
            clearcoat_normal_map: Some(AssetKey::NormalMap(0)),
            clearcoat_normal_scale: options.clearcoat_normal_scale,
            emissive: options.emissive_color,
            ..Self::default()
        }
    }

    pub fn metal(preset: &MetalPreset) -> Self {
        Self {
            name: "metal",
            color: preset.color,
            metalness: preset.metalness,
            roughness: preset.roughness,
            transmission: preset.transmission,
            ior: preset.ior,
            reflectivity: preset.reflectivity,
            thickness: preset.thickness,
            env_map: Some(AssetKey::LightingEnv),
            env_map_intensity: preset.env_map_intensity,
            normal_map: preset.normal_map.map(AssetKey::NormalMap),
            normal_scale: preset.normal_scale,
            refraction_ratio: preset.refraction_ratio,
            transparent: true,
            opacity: preset.opacity,
            ..Self::default()
        }
    }

    pub fn diffuse(preset: &DiffusePreset) -> Self {
        Self {
            name: "diffuse",
            color: preset.color,
            metalness: preset.metalness,
            roughness: preset.roughness,
            env_map: Some(AssetKey::BackgroundEnv),
            env_map_intensity: preset.env_map_intensity,
            ..Self::default()
        }
    }

    pub fn satellite(spec: &SatelliteSpec, refraction_ratio: f32) -> Self {
        Self {
            name: "satellite",
            metalness: spec.metalness,
            roughness: spec.roughness,
            env_map: Some(AssetKey::LightingEnv),
            env_map_intensity: spec.env_map_intensity,
            refraction_ratio,
            ..Self::default()
        }
    }

    pub fn render_state(&self) -> RenderState {
        RenderState {
            transparent: self.transparent,
            depth_test: self.depth_test,
            depth_write: self.depth_write,
            wireframe: self.wireframe,
        }
    }

    /// Texture keys this material samples, deduplicated.
    pub fn texture_keys(&self) -> Vec<AssetKey> {
        let mut keys: Vec<AssetKey> = [self.env_map, self.normal_map, self.clearcoat_normal_map]
            .into_iter()
            .flatten()
            .collect();
        keys.dedup();
        keys
    }

    pub fn uniform(&self, bound: BoundMaps) -> MaterialUniform {
        let [r, g, b] = self.color.to_linear();
        let [er, eg, eb] = self.emissive.to_linear();
        let opacity = if self.transparent { self.opacity } else { 1.0 };
        MaterialUniform {
            color: [r, g, b, opacity],
            emissive: [er, eg, eb, self.env_map_intensity],
            surface: [self.metalness, self.roughness, self.transmission, self.ior],
            layers: [
                self.reflectivity,
                self.thickness,
                self.clearcoat,
                self.clearcoat_roughness,
            ],
            normals: [
                self.normal_scale,
                self.clearcoat_normal_scale,
                self.normal_repeat as f32,
                self.refraction_ratio,
            ],
            maps: [
                bound.env as u32,
                bound.normal as u32,
                bound.clearcoat_normal as u32,
                self.transparent as u32,
            ],
        }
    }
}

/// Which of a material's maps resolved to a loaded texture this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundMaps {
    pub env: bool,
    pub normal: bool,
    pub clearcoat_normal: bool,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// Linear rgb, opacity.
    pub color: [f32; 4],
    /// Linear rgb, environment intensity.
    pub emissive: [f32; 4],
    /// metalness, roughness, transmission, ior
    pub surface: [f32; 4],
    /// reflectivity, thickness, clearcoat, clearcoat roughness
    pub layers: [f32; 4],
    /// normal scale, clearcoat normal scale, normal repeat, refraction ratio
    pub normals: [f32; 4],
    /// has env, has normal, has clearcoat normal, transparent
    pub maps: [u32; 4],
}

/// Arena of the materials the driver owns.
#[derive(Clone, Debug, Default)]
pub struct Materials {
    slots: Vec<Option<PhysicalMaterial>>,
}

impl Materials {
    pub fn insert(&mut self, material: PhysicalMaterial) -> MaterialId {
        self.slots.push(Some(material));
        MaterialId(self.slots.len() - 1)
    }

    pub fn get(&self, id: MaterialId) -> Option<&PhysicalMaterial> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut PhysicalMaterial> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, id: MaterialId) -> Option<PhysicalMaterial> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PhysicalMaterial> {
        self.slots.iter_mut().flatten()
    }

    /// Whether any live material samples `key`.
    pub fn references(&self, key: AssetKey) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|m| m.texture_keys().contains(&key))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
