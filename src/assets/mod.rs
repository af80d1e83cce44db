//! Asset slots and decoded asset data.
//!
//! Every asset a variant loads owns a slot keyed by [`AssetKey`]. A slot starts
//! [`Slot::Pending`] when its request is issued and settles exactly once, either as
//! [`Slot::Loaded`] with the handles the driver created for it or as [`Slot::Failed`]. Render
//! and teardown only touch handles in `Loaded` slots.

pub mod decode;
pub mod loader;

use std::fmt;

pub use loader::{AssetKind, AssetLoader, AssetRequest, Completion, Completions, DEFAULT_TIMEOUT};

use crate::{
    backend::{GeometryId, TextureId},
    geometry::Geometry,
    material::MaterialId,
    scene::{NodeId, Transform},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKey {
    /// Panorama used for background reflections and refraction.
    BackgroundEnv,
    /// Panorama lighting the metal preset.
    LightingEnv,
    NormalMap(u8),
    Mesh(u8),
}

impl AssetKey {
    pub fn is_texture(self) -> bool {
        !matches!(self, AssetKey::Mesh(_))
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKey::BackgroundEnv => f.write_str("background environment"),
            AssetKey::LightingEnv => f.write_str("lighting environment"),
            AssetKey::NormalMap(i) => write!(f, "normal map #{i}"),
            AssetKey::Mesh(i) => write!(f, "mesh #{i}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Four half floats per texel.
    HdrF16,
    /// Linear RGBA8, for data such as normal maps.
    Rgba8Linear,
    Rgba8Srgb,
}

impl PixelFormat {
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            PixelFormat::HdrF16 => 8,
            PixelFormat::Rgba8Linear | PixelFormat::Rgba8Srgb => 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// A decoded image with its full mip chain, level 0 first.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub label: String,
    pub format: PixelFormat,
    pub levels: Vec<MipLevel>,
}

impl TextureData {
    pub fn width(&self) -> u32 {
        self.levels.first().map_or(0, |l| l.width)
    }

    pub fn height(&self) -> u32 {
        self.levels.first().map_or(0, |l| l.height)
    }
}

/// One node of a decoded mesh file.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshNode {
    pub name: String,
    pub transform: Transform,
    /// Index of the parent within [`MeshData::nodes`].
    pub parent: Option<usize>,
    pub primitives: Vec<Geometry>,
}

/// A decoded mesh file, nodes in depth-first order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub label: String,
    pub nodes: Vec<MeshNode>,
}

impl MeshData {
    /// First mesh node called `name`, at any depth.
    pub fn find(&self, name: &str) -> Option<&MeshNode> {
        self.nodes
            .iter()
            .find(|n| n.name == name && !n.primitives.is_empty())
    }

    pub fn primitive_count(&self) -> usize {
        self.nodes.iter().map(|n| n.primitives.len()).sum()
    }
}

impl MeshNode {
    /// All primitives of the node folded into one geometry.
    pub fn merged_geometry(&self) -> Geometry {
        let mut merged = Geometry {
            label: self.name.clone(),
            ..Geometry::default()
        };
        for p in &self.primitives {
            let base = merged.vertices.len() as u32;
            merged.vertices.extend_from_slice(&p.vertices);
            merged.indices.extend(p.indices.iter().map(|i| i + base));
        }
        merged
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadedAsset {
    Texture(TextureData),
    Mesh(MeshData),
}

/// What the driver created for a settled asset.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadedHandle {
    Texture(TextureId),
    Mesh {
        node: NodeId,
        geometries: Vec<GeometryId>,
        materials: Vec<MaterialId>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    Pending,
    Loaded(LoadedHandle),
    Failed(String),
}

/// Per-driver table from asset key to its slot, in request order.
#[derive(Clone, Debug, Default)]
pub struct AssetSlots {
    entries: Vec<(AssetKey, Slot)>,
}

impl AssetSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` as pending. Returns `false` if it was already tracked.
    pub fn request(&mut self, key: AssetKey) -> bool {
        if self.get(key).is_some() {
            return false;
        }
        self.entries.push((key, Slot::Pending));
        true
    }

    pub fn get(&self, key: AssetKey) -> Option<&Slot> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, s)| s)
    }

    fn get_mut(&mut self, key: AssetKey) -> Option<&mut Slot> {
        self.entries
            .iter_mut()
            .find(|(k, _)| *k == key)
            .map(|(_, s)| s)
    }

    /// Settles a pending slot. Settled or unknown slots are left alone and `false` returned.
    pub fn settle(&mut self, key: AssetKey, slot: Slot) -> bool {
        match self.get_mut(key) {
            Some(current @ Slot::Pending) => {
                *current = slot;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self, key: AssetKey) -> bool {
        matches!(self.get(key), Some(Slot::Pending))
    }

    pub fn is_loaded(&self, key: AssetKey) -> bool {
        matches!(self.get(key), Some(Slot::Loaded(_)))
    }

    pub fn handle(&self, key: AssetKey) -> Option<&LoadedHandle> {
        match self.get(key) {
            Some(Slot::Loaded(h)) => Some(h),
            _ => None,
        }
    }

    pub fn texture(&self, key: AssetKey) -> Option<TextureId> {
        match self.handle(key) {
            Some(LoadedHandle::Texture(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn pending(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, s)| matches!(s, Slot::Pending))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetKey, &Slot)> {
        self.entries.iter().map(|(k, s)| (*k, s))
    }

    /// Empties the table, handing back the loaded handles: meshes first, then textures.
    pub fn drain_loaded(&mut self) -> Vec<(AssetKey, LoadedHandle)> {
        let mut loaded: Vec<(AssetKey, LoadedHandle)> = self
            .entries
            .drain(..)
            .filter_map(|(k, s)| match s {
                Slot::Loaded(h) => Some((k, h)),
                Slot::Pending | Slot::Failed(_) => None,
            })
            .collect();
        loaded.sort_by_key(|(k, _)| k.is_texture());
        loaded
    }
}
