//! File token source

use std::path::PathBuf;

use crate::error::SecretError;
use crate::sources::{TokenOrigin, TokenSource};

/// Reads the Vault token from a file (typically a mounted secret)
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenSource for FileSource {
    fn origin(&self) -> TokenOrigin {
        TokenOrigin::File
    }

    // Missing and unreadable files are reported the same way.
    fn load(&self) -> Result<String, SecretError> {
        std::fs::read_to_string(&self.path)
            .map(|s| s.trim().to_string())
            .map_err(|e| SecretError::FileError {
                path: self.path.clone(),
                message: e.to_string(),
            })
    }
}
