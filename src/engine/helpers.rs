//! Helper file loading
//!
//! Helper files are discovered alongside spec files but never enter the tree. They are handed to a
//! [`HelperLoader`] once per scan, for side effects such as registering shared fixtures.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to load helper {}: {message}", .path.display())]
pub struct HelperError {
    pub path: PathBuf,
    pub message: String,
}

impl HelperError {
    pub fn new(path: &Path, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

pub trait HelperLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<(), HelperError>;
}

impl<F> HelperLoader for F
where
    F: Fn(&Path) -> Result<(), HelperError> + Send + Sync,
{
    fn load(&self, path: &Path) -> Result<(), HelperError> {
        self(path)
    }
}
