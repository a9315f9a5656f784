//! Access to auxiliary resources referenced by changes.
//!
//! Some kinds (`sql-file`) read a file during setup. The reader is passed in
//! so the core itself never decides where files live.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads resources referenced by change declarations.
pub trait ResourceResolver: Send + Sync {
    /// Reads a resource as text.
    ///
    /// When `relative_to_origin` is set, `path` is resolved against the
    /// directory of the declaring document rather than the base directory.
    fn read_to_string(&self, path: &str, relative_to_origin: bool) -> io::Result<String>;
}

/// Resolves resources on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FsResourceResolver {
    base: PathBuf,
    origin_dir: Option<PathBuf>,
}

impl FsResourceResolver {
    /// Creates a resolver rooted at `base`.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            origin_dir: None,
        }
    }

    /// Sets the declaring document so relative paths can be resolved.
    #[must_use]
    pub fn with_origin(mut self, origin: impl AsRef<Path>) -> Self {
        self.origin_dir = origin.as_ref().parent().map(Path::to_path_buf);
        self
    }

    fn resolve(&self, path: &str, relative_to_origin: bool) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.origin_dir {
            Some(ref dir) if relative_to_origin => dir.join(path),
            _ => self.base.join(path),
        }
    }
}

impl ResourceResolver for FsResourceResolver {
    fn read_to_string(&self, path: &str, relative_to_origin: bool) -> io::Result<String> {
        fs::read_to_string(self.resolve(path, relative_to_origin))
    }
}

/// A resolver that has no resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResources;

impl ResourceResolver for NoResources {
    fn read_to_string(&self, path: &str, _relative_to_origin: bool) -> io::Result<String> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no resources are available (requested '{path}')"),
        ))
    }
}
