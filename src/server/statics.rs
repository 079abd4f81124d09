//! Static file resolution under a configured root directory.

use std::path::{Component, Path, PathBuf};

use crate::error::{Result, ServerError};
use crate::http::mime::content_type_for;

const INDEX_FILE: &str = "index.html";

#[derive(Debug, PartialEq, Eq)]
pub enum StaticLookup {
    File {
        bytes: Vec<u8>,
        content_type: &'static str,
    },
    /// The path names a directory; answered with a 404.
    Directory,
    NotFound,
}

/// A static root, canonicalized when it is configured.
#[derive(Debug, Clone)]
pub struct StaticRoot {
    root: PathBuf,
}

impl StaticRoot {
    /// Fails with [`ServerError::DirectoryNotFound`] unless `root` is an
    /// existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let missing = || ServerError::DirectoryNotFound(root.to_path_buf());

        let canonical = root.canonicalize().map_err(|_| missing())?;
        if !canonical.is_dir() {
            return Err(missing());
        }

        Ok(Self { root: canonical })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolves a normalized request path. `/` maps to `index.html`.
    ///
    /// Paths with `..` components, and paths whose canonical form lands
    /// outside the root (symlinks included), resolve to `NotFound`.
    pub async fn resolve(&self, request_path: &str) -> StaticLookup {
        let relative = match request_path.trim_start_matches('/') {
            "" => INDEX_FILE,
            rel => rel,
        };

        let relative = Path::new(relative);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            tracing::warn!(path = %request_path, "Rejected static path outside the root");
            return StaticLookup::NotFound;
        }

        let Ok(canonical) = tokio::fs::canonicalize(self.root.join(relative)).await else {
            return StaticLookup::NotFound;
        };
        if !canonical.starts_with(&self.root) {
            tracing::warn!(path = %request_path, "Rejected static path outside the root");
            return StaticLookup::NotFound;
        }

        let Ok(metadata) = tokio::fs::metadata(&canonical).await else {
            return StaticLookup::NotFound;
        };
        if metadata.is_dir() {
            return StaticLookup::Directory;
        }

        match tokio::fs::read(&canonical).await {
            Ok(bytes) => StaticLookup::File {
                bytes,
                content_type: content_type_for(relative),
            },
            Err(e) => {
                tracing::warn!(path = %canonical.display(), error = %e, "Failed to read static file");
                StaticLookup::NotFound
            }
        }
    }
}
