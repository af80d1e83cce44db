//! Out-of-band asset loading.
//!
//! [`AssetLoader::spawn`] starts one task per request on the loader's tokio runtime. A task
//! reads its file, decodes it on the blocking pool and sends exactly one [`Completion`] back
//! over an unbounded channel, bounded overall by the loader's timeout. The driver drains the
//! channel on its own thread, so completions interleave with frames but never run
//! concurrently with them.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use futures::{FutureExt, StreamExt, channel::mpsc};

use super::{AssetKey, LoadedAsset, decode};
use crate::error::{Result, SketchError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Hdr,
    Raster { srgb: bool },
    Mesh,
}

impl AssetKind {
    pub fn for_key(key: AssetKey) -> Self {
        match key {
            AssetKey::BackgroundEnv | AssetKey::LightingEnv => AssetKind::Hdr,
            AssetKey::NormalMap(_) => AssetKind::Raster { srgb: false },
            AssetKey::Mesh(_) => AssetKind::Mesh,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRequest {
    pub key: AssetKey,
    pub path: PathBuf,
    pub kind: AssetKind,
}

impl AssetRequest {
    pub fn new(key: AssetKey, path: impl Into<PathBuf>) -> Self {
        Self {
            key,
            path: path.into(),
            kind: AssetKind::for_key(key),
        }
    }
}

#[derive(Debug)]
pub struct Completion {
    pub key: AssetKey,
    pub result: Result<LoadedAsset>,
}

/// Receiving end of a batch of requests.
#[derive(Debug)]
pub struct Completions {
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl Completions {
    /// Next completion that has already arrived, without waiting.
    pub fn try_next(&mut self) -> Option<Completion> {
        self.rx.next().now_or_never().flatten()
    }

    /// Blocks until the next completion arrives. `None` once every task has reported.
    pub fn wait_next(&mut self) -> Option<Completion> {
        futures::executor::block_on(self.rx.next())
    }

    pub fn drain_ready(&mut self) -> Vec<Completion> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

#[derive(Debug)]
pub struct AssetLoader {
    runtime: tokio::runtime::Runtime,
    root: PathBuf,
    timeout: Duration,
}

impl AssetLoader {
    /// Loader resolving relative asset paths against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("asset-loader")
            .enable_all()
            .build()
            .map_err(|e| SketchError::Context(format!("asset runtime: {e}")))?;
        Ok(Self {
            runtime,
            root: root.into(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Issues every request. There is no retry and no cancellation: each task runs to
    /// completion, failure or timeout, and a result whose receiver was dropped is discarded.
    pub fn spawn(&self, requests: impl IntoIterator<Item = AssetRequest>) -> Completions {
        let (tx, rx) = mpsc::unbounded();
        for request in requests {
            let tx = tx.clone();
            let path = self.root.join(&request.path);
            let timeout = self.timeout;
            log::debug!("requesting {} from {}", request.key, path.display());
            self.runtime.spawn(async move {
                let key = request.key;
                let result = match tokio::time::timeout(timeout, load(key, path.clone(), request.kind)).await {
                    Ok(result) => result,
                    Err(_) => Err(SketchError::AssetTimeout {
                        key,
                        path,
                        after: timeout,
                    }),
                };
                if tx.unbounded_send(Completion { key, result }).is_err() {
                    log::debug!("{key} finished after its receiver was dropped");
                }
            });
        }
        Completions { rx }
    }
}

async fn load(key: AssetKey, path: PathBuf, kind: AssetKind) -> Result<LoadedAsset> {
    let fail = |reason: String| SketchError::AssetLoad {
        key,
        path: path.clone(),
        reason,
    };
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| fail(e.to_string()))?;
    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| key.to_string());
    let base_dir = path.parent().map(Path::to_path_buf);
    let decoded = tokio::task::spawn_blocking(move || match kind {
        AssetKind::Hdr => decode::decode_hdr(&bytes, &label),
        AssetKind::Raster { srgb } => decode::decode_raster(&bytes, &label, srgb),
        AssetKind::Mesh => decode::decode_gltf(&bytes, &label, base_dir.as_deref()),
    })
    .await
    .map_err(|e| fail(format!("decoder panicked: {e}")))?;
    decoded.map_err(fail)
}
