//! Error taxonomy for the driver and its collaborators.
//!
//! Everything the host can observe goes through [`SketchError`]. Only
//! [`SketchError::Context`] is fatal; load failures leave their slot empty and the frame loop
//! keeps running.

use std::{path::PathBuf, time::Duration};

use crate::assets::AssetKey;

#[derive(Debug, thiserror::Error)]
pub enum SketchError {
    #[error("failed to load {key} from {path:?}: {reason}")]
    AssetLoad {
        key: AssetKey,
        path: PathBuf,
        reason: String,
    },

    #[error("loading {key} from {path:?} did not finish within {after:?}")]
    AssetTimeout {
        key: AssetKey,
        path: PathBuf,
        after: Duration,
    },

    #[error("{0} has not finished loading")]
    NotReady(AssetKey),

    #[error("the sketch has been unloaded")]
    Disposed,

    #[error("{field} = {value} is outside [{min}, {max}]")]
    InvalidConfig {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("unknown variant {0:?}")]
    UnknownVariant(String),

    #[error("cannot create the rendering context: {0}")]
    Context(String),

    #[error("frame could not be drawn: {0}")]
    Render(String),

    #[error("invalid configuration file: {0}")]
    Config(#[from] toml::de::Error),
}

impl SketchError {
    /// Whether the host must abort instead of continuing the frame loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Context(_))
    }
}

pub type Result<T, E = SketchError> = std::result::Result<T, E>;
