//! prism-ngin
//!
//! A render-loop driver for small physically-based scenes: glass, metal and diffuse meshes lit
//! by equirectangular HDR environments, finished with a bloom pass and viewed through an
//! orbiting camera. Assets load in the background and attach to the scene as they arrive.
//!
//! High-level modules
//! - `sketch`: the driver with its configure/resize/render/unload hooks
//! - `variant`: the built-in scenes and their asset manifests
//! - `config`: scene options, camera and controller settings, TOML overrides
//! - `control`: live edits of the scene options
//! - `camera` / `controls`: perspective camera, swooping path and orbit controller
//! - `scene` / `material` / `geometry`: scene graph, PBR materials and mesh data
//! - `post`: post-processing parameters (bloom)
//! - `assets`: asset slots, the background loader and the decoders
//! - `backend`: the rendering contract the driver draws through
//! - `gpu`: the wgpu backend
//! - `host`: the windowed application
//!

pub mod assets;
pub mod backend;
pub mod camera;
pub mod config;
pub mod control;
pub mod controls;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod host;
pub mod material;
pub mod post;
pub mod scene;
pub mod sketch;
pub mod variant;

// Re-exports commonly used types for convenience in downstream code.
pub use backend::Backend;
pub use error::{Result, SketchError};
pub use sketch::{Phase, Sketch};
pub use variant::Variant;
