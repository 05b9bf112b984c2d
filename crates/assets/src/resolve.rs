use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::AssetError;

/// Where a model comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// An id inside the application bundle, e.g. `"keyboard.glb"`.
    Bundled(String),
    /// A file that is already addressable on the local filesystem.
    Path(PathBuf),
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bundled(id) => write!(f, "bundle:{id}"),
            Self::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Resolves bundled model ids to local files.
///
/// Bundled assets are copied into `cache_dir` the first time they are
/// requested. A cached copy is reused as long as its content digest matches
/// the bundled file; a changed bundle is copied again.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    bundle_dir: PathBuf,
    cache_dir: PathBuf,
}

impl AssetResolver {
    pub fn new(bundle_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn bundle_dir(&self) -> &Path {
        &self.bundle_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Make `source` locally addressable and return its path.
    pub fn resolve(&self, source: &ModelSource) -> Result<PathBuf, AssetError> {
        match source {
            ModelSource::Path(path) => {
                if path.is_file() {
                    Ok(path.clone())
                } else {
                    Err(AssetError::NotFound(path.display().to_string()))
                }
            }
            ModelSource::Bundled(id) => self.resolve_bundled(id),
        }
    }

    fn resolve_bundled(&self, id: &str) -> Result<PathBuf, AssetError> {
        let file_name = Path::new(id)
            .file_name()
            .filter(|name| Path::new(name) == Path::new(id))
            .ok_or_else(|| AssetError::InvalidId(id.to_string()))?;
        let bundled = self.bundle_dir.join(file_name);
        let cached = self.cache_dir.join(file_name);

        if !bundled.is_file() {
            // Already local from an earlier run.
            if cached.is_file() {
                tracing::debug!(id, path = %cached.display(), "bundle missing, using cached copy");
                return Ok(cached);
            }
            return Err(AssetError::NotFound(id.to_string()));
        }

        let bundle_digest = sha256_hex(&std::fs::read(&bundled)?);
        if cached.is_file() && sha256_hex(&std::fs::read(&cached)?) == bundle_digest {
            tracing::debug!(id, digest = %&bundle_digest[..12], "cache hit");
            return Ok(cached);
        }

        std::fs::create_dir_all(&self.cache_dir)?;
        std::fs::copy(&bundled, &cached)?;
        tracing::info!(
            id,
            path = %cached.display(),
            digest = %&bundle_digest[..12],
            "asset copied to cache"
        );
        Ok(cached)
    }
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
