use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("File not found ({0})")]
    FileNotFound(PathBuf),

    #[error("Undersized asset ({path}): expected at least {expected} bytes, found {actual}")]
    Undersized {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown error ({0}): {1}")]
    Unknown(PathBuf, String),
}

impl AssetError {
    pub fn from_io_error(error: std::io::Error, path: &Path) -> Self {
        match error {
            err if err.kind() == std::io::ErrorKind::NotFound => {
                Self::FileNotFound(path.to_path_buf())
            }
            err => Self::Unknown(path.to_path_buf(), err.kind().to_string()),
        }
    }
}

/// Source of raw asset bytes.
pub trait AssetFileSystem {
    fn load(&self, path: &Path) -> Result<Vec<u8>, AssetError>;
}

/// Cheap to clone handle to the asset file system.
#[derive(Clone)]
pub struct Assets {
    file_system: Arc<dyn AssetFileSystem>,
}

impl Assets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_file_system(Arc::new(PlatformFileSystem::new(root.into())))
    }

    pub fn with_file_system(file_system: Arc<dyn AssetFileSystem>) -> Self {
        Self { file_system }
    }

    #[inline]
    pub fn load_raw(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, AssetError> {
        self.file_system.load(path.as_ref())
    }

    /// Load a headerless raw asset that must hold at least `expected` bytes. Any trailing bytes
    /// are dropped.
    pub fn load_raw_sized(
        &self,
        path: impl AsRef<Path>,
        expected: usize,
    ) -> Result<Vec<u8>, AssetError> {
        let path = path.as_ref();
        let mut data = self.load_raw(path)?;

        if data.len() < expected {
            return Err(AssetError::Undersized {
                path: path.to_path_buf(),
                expected,
                actual: data.len(),
            });
        }

        data.truncate(expected);
        Ok(data)
    }

    pub fn load_string(&self, path: impl AsRef<Path>) -> Result<String, AssetError> {
        let path = path.as_ref();
        let data = self.load_raw(path)?;
        String::from_utf8(data)
            .map_err(|err| AssetError::Unknown(path.to_path_buf(), err.to_string()))
    }
}

pub struct PlatformFileSystem {
    root: PathBuf,
}

impl PlatformFileSystem {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl AssetFileSystem for PlatformFileSystem {
    fn load(&self, path: &Path) -> Result<Vec<u8>, AssetError> {
        std::fs::read(self.root.join(path)).map_err(|err| AssetError::from_io_error(err, path))
    }
}
