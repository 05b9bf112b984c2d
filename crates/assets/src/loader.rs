use keyscape_scene::SceneGraph;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use crate::AssetError;
use crate::gltf::parse_gltf;
use crate::resolve::{AssetResolver, ModelSource};

/// Read and parse a model file into a scene graph.
pub fn load_model(path: impl AsRef<Path>) -> Result<SceneGraph, AssetError> {
    let path = path.as_ref();
    let _span = tracing::info_span!("load_model", path = %path.display()).entered();
    let bytes = std::fs::read(path)?;
    let graph = parse_gltf(&bytes, path.parent())?;
    tracing::info!(nodes = graph.len(), "model parsed");
    Ok(graph)
}

/// Resolve then parse, synchronously.
pub fn fetch_model(
    resolver: &AssetResolver,
    source: &ModelSource,
) -> Result<SceneGraph, AssetError> {
    let path = resolver.resolve(source)?;
    load_model(path)
}

/// Outcome of polling a [`ModelLoader`].
#[derive(Debug)]
pub enum LoadStatus {
    /// Still resolving or parsing. A normal waiting state, not an error.
    Pending,
    Ready(SceneGraph),
    Failed(AssetError),
    /// The result was already handed out by an earlier poll.
    Taken,
}

/// A one-shot background model load.
///
/// The work runs once on its own thread. There is no retry and no
/// cancellation; dropping the loader discards the result.
#[derive(Debug)]
pub struct ModelLoader {
    source: ModelSource,
    rx: Option<Receiver<Result<SceneGraph, AssetError>>>,
    early_failure: Option<AssetError>,
}

impl ModelLoader {
    pub fn spawn(resolver: AssetResolver, source: ModelSource) -> Self {
        let (tx, rx) = mpsc::channel();
        let job_source = source.clone();
        let spawned = std::thread::Builder::new()
            .name("model-loader".into())
            .spawn(move || {
                // The receiver may be gone; nothing to do then.
                let _ = tx.send(fetch_model(&resolver, &job_source));
            });
        match spawned {
            Ok(_) => Self {
                source,
                rx: Some(rx),
                early_failure: None,
            },
            Err(e) => {
                tracing::debug!(%source, "loader thread did not start");
                Self {
                    source,
                    rx: None,
                    early_failure: Some(AssetError::Io(e)),
                }
            }
        }
    }

    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    /// Non-blocking. Yields `Ready` or `Failed` exactly once.
    pub fn poll(&mut self) -> LoadStatus {
        if let Some(e) = self.early_failure.take() {
            return LoadStatus::Failed(e);
        }
        let Some(rx) = &self.rx else {
            return LoadStatus::Taken;
        };
        match rx.try_recv() {
            Ok(result) => {
                self.rx = None;
                match result {
                    Ok(graph) => LoadStatus::Ready(graph),
                    Err(e) => LoadStatus::Failed(e),
                }
            }
            Err(TryRecvError::Empty) => LoadStatus::Pending,
            Err(TryRecvError::Disconnected) => {
                self.rx = None;
                LoadStatus::Failed(AssetError::LoaderGone)
            }
        }
    }

    /// Block until the load finishes.
    pub fn wait(mut self) -> Result<SceneGraph, AssetError> {
        if let Some(e) = self.early_failure.take() {
            return Err(e);
        }
        let rx = self.rx.take().ok_or(AssetError::LoaderGone)?;
        rx.recv().map_err(|_| AssetError::LoaderGone)?
    }
}
