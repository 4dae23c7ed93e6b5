//! Environment variable token source

use crate::error::SecretError;
use crate::sources::{TokenOrigin, TokenSource};

/// Reads the Vault token from an environment variable
#[derive(Debug, Clone)]
pub struct EnvSource {
    var_name: String,
}

impl EnvSource {
    pub fn new(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
        }
    }
}

impl TokenSource for EnvSource {
    fn origin(&self) -> TokenOrigin {
        TokenOrigin::Environment
    }

    fn load(&self) -> Result<String, SecretError> {
        std::env::var(&self.var_name).map_err(|_| SecretError::EnvNotSet {
            var: self.var_name.clone(),
        })
    }
}
