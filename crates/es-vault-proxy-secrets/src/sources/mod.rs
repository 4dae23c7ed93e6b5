//! Bootstrap token sources

mod env;
mod file;

pub use env::EnvSource;
pub use file::FileSource;

use crate::error::SecretError;

/// Where the active bootstrap token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOrigin {
    File,
    Environment,
    /// Every source failed and an empty token was installed
    Empty,
}

impl TokenOrigin {
    /// Only a file-backed token is watched for reload
    pub fn is_reloadable(self) -> bool {
        matches!(self, TokenOrigin::File)
    }
}

/// A Vault token together with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapToken {
    pub value: String,
    pub origin: TokenOrigin,
}

/// A place a bootstrap token can be read from
pub trait TokenSource: Send + Sync {
    fn origin(&self) -> TokenOrigin;

    fn load(&self) -> Result<String, SecretError>;
}

/// Ordered list of token sources, tried first to last
pub struct TokenLoader {
    sources: Vec<Box<dyn TokenSource>>,
}

impl TokenLoader {
    pub fn new(sources: Vec<Box<dyn TokenSource>>) -> Self {
        Self { sources }
    }

    /// File first, then the environment variable
    pub fn bootstrap(token_file: impl Into<std::path::PathBuf>, token_env: &str) -> Self {
        Self::new(vec![
            Box::new(FileSource::new(token_file)),
            Box::new(EnvSource::new(token_env)),
        ])
    }

    /// Load from the first source that succeeds.
    ///
    /// Never fails: when nothing yields a token an empty one is returned,
    /// so the secret store rejects requests instead of the process exiting.
    pub fn load(&self) -> BootstrapToken {
        for source in &self.sources {
            match source.load() {
                Ok(value) => {
                    return BootstrapToken {
                        value,
                        origin: source.origin(),
                    }
                }
                Err(e) => {
                    tracing::debug!(origin = ?source.origin(), "Token source unavailable: {}", e);
                }
            }
        }

        tracing::warn!("No Vault token source available, using an empty token");
        BootstrapToken {
            value: String::new(),
            origin: TokenOrigin::Empty,
        }
    }
}
