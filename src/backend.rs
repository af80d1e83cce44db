//! The rendering engine seen from the driver.
//!
//! The driver never touches GPU objects. It uploads decoded geometry and textures through a
//! [`Backend`], gets opaque ids back, and describes each frame as a flat list of
//! [`DrawItem`]s. [`crate::gpu::WgpuBackend`] is the real implementation.

use crate::{
    assets::TextureData, camera::CameraUniform, geometry::Geometry, material::MaterialUniform,
    post::BloomSettings,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Size of the drawing buffer in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

/// Fixed-function state a material selects. Each distinct value gets its own pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderState {
    pub transparent: bool,
    pub depth_test: bool,
    pub depth_write: bool,
    pub wireframe: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            transparent: false,
            depth_test: true,
            depth_write: true,
            wireframe: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawTextures {
    pub env: Option<TextureId>,
    pub normal: Option<TextureId>,
    pub clearcoat_normal: Option<TextureId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawItem {
    pub geometry: GeometryId,
    pub world: [[f32; 4]; 4],
    pub normal: [[f32; 3]; 3],
    pub material: MaterialUniform,
    pub textures: DrawTextures,
    pub state: RenderState,
    /// Whether the material changed since the last frame that drew it.
    pub material_dirty: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub camera: CameraUniform,
    /// Linear rgba.
    pub clear_color: [f64; 4],
    pub bloom: BloomSettings,
    /// Opaque items first, then transparent ones back to front.
    pub items: Vec<DrawItem>,
}

pub trait Backend {
    fn upload_geometry(&mut self, geometry: &Geometry) -> GeometryId;

    fn upload_texture(&mut self, texture: &TextureData) -> TextureId;

    fn release_geometry(&mut self, id: GeometryId);

    fn release_texture(&mut self, id: TextureId);

    /// Reallocates size-dependent resources. Called only when the size actually changes.
    fn resize(&mut self, size: SurfaceSize);

    /// Draws the scene pass followed by bloom and presents the result.
    fn draw(&mut self, frame: &Frame) -> crate::error::Result<()>;

    /// Frees everything the backend still owns. No call is made afterwards.
    fn dispose(&mut self);
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn upload_geometry(&mut self, geometry: &Geometry) -> GeometryId {
        (**self).upload_geometry(geometry)
    }

    fn upload_texture(&mut self, texture: &TextureData) -> TextureId {
        (**self).upload_texture(texture)
    }

    fn release_geometry(&mut self, id: GeometryId) {
        (**self).release_geometry(id)
    }

    fn release_texture(&mut self, id: TextureId) {
        (**self).release_texture(id)
    }

    fn resize(&mut self, size: SurfaceSize) {
        (**self).resize(size)
    }

    fn draw(&mut self, frame: &Frame) -> crate::error::Result<()> {
        (**self).draw(frame)
    }

    fn dispose(&mut self) {
        (**self).dispose()
    }
}
