//! Vault client settings read from the standard `VAULT_*` environment
//!
//! | Variable               | Effect                                        |
//! |------------------------|-----------------------------------------------|
//! | `VAULT_CLIENT_TIMEOUT` | Per-read timeout, seconds (`30` or `30s`)     |
//! | `VAULT_CACERT`         | PEM file trusted in addition to webpki roots  |
//! | `VAULT_SKIP_VERIFY`    | Disable TLS certificate verification          |
//! | `VAULT_NAMESPACE`      | Sent as `X-Vault-Namespace` on every read     |

use std::path::PathBuf;
use std::time::Duration;

use crate::error::SecretError;

/// Read timeout used when `VAULT_CLIENT_TIMEOUT` is unset
pub const DEFAULT_VAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSettings {
    pub timeout: Duration,
    pub ca_cert: Option<PathBuf>,
    pub skip_verify: bool,
    pub namespace: Option<String>,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_VAULT_TIMEOUT,
            ca_cert: None,
            skip_verify: false,
            namespace: None,
        }
    }
}

impl VaultSettings {
    /// Settings from the process environment
    pub fn from_env() -> Result<Self, SecretError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Settings from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SecretError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();

        if let Some(raw) = get("VAULT_CLIENT_TIMEOUT") {
            settings.timeout = parse_seconds(&raw)
                .ok_or_else(|| SecretError::invalid_setting("VAULT_CLIENT_TIMEOUT", raw))?;
        }

        if let Some(raw) = get("VAULT_SKIP_VERIFY") {
            settings.skip_verify = parse_bool(&raw)
                .ok_or_else(|| SecretError::invalid_setting("VAULT_SKIP_VERIFY", raw))?;
        }

        settings.ca_cert = get("VAULT_CACERT").map(PathBuf::from);
        settings.namespace = get("VAULT_NAMESPACE");

        Ok(settings)
    }

    /// Build the HTTP client these settings describe
    pub fn build_client(&self) -> Result<reqwest::Client, SecretError> {
        let mut builder = reqwest::Client::builder().timeout(self.timeout);

        if let Some(path) = &self.ca_cert {
            let pem = std::fs::read(path).map_err(|e| SecretError::Tls {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| SecretError::Tls {
                path: path.clone(),
                message: e.to_string(),
            })?;
            builder = builder.add_root_certificate(cert);
        }

        if self.skip_verify {
            tracing::warn!("VAULT_SKIP_VERIFY set, Vault TLS certificates are not verified");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(builder.build()?)
    }
}

fn parse_seconds(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let secs = raw.strip_suffix('s').unwrap_or(raw);
    secs.parse().ok().map(Duration::from_secs)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = VaultSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, VaultSettings::default());
        assert_eq!(settings.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_reads_all_variables() {
        let settings = VaultSettings::from_lookup(lookup(&[
            ("VAULT_CLIENT_TIMEOUT", "15s"),
            ("VAULT_CACERT", "/etc/vault/ca.pem"),
            ("VAULT_SKIP_VERIFY", "true"),
            ("VAULT_NAMESPACE", "team-search"),
        ]))
        .unwrap();

        assert_eq!(settings.timeout, Duration::from_secs(15));
        assert_eq!(settings.ca_cert, Some(PathBuf::from("/etc/vault/ca.pem")));
        assert!(settings.skip_verify);
        assert_eq!(settings.namespace.as_deref(), Some("team-search"));
    }

    #[test]
    fn test_plain_seconds_and_empty_values() {
        let settings = VaultSettings::from_lookup(lookup(&[
            ("VAULT_CLIENT_TIMEOUT", "5"),
            ("VAULT_SKIP_VERIFY", "0"),
            ("VAULT_NAMESPACE", ""),
        ]))
        .unwrap();

        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert!(!settings.skip_verify);
        assert!(settings.namespace.is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            VaultSettings::from_lookup(lookup(&[("VAULT_CLIENT_TIMEOUT", "soon")])),
            Err(SecretError::InvalidSetting { .. })
        ));
        assert!(matches!(
            VaultSettings::from_lookup(lookup(&[("VAULT_SKIP_VERIFY", "maybe")])),
            Err(SecretError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_missing_ca_cert_fails_client_build() {
        let settings = VaultSettings {
            ca_cert: Some(PathBuf::from("/definitely/not/here/ca.pem")),
            ..Default::default()
        };
        assert!(matches!(
            settings.build_client(),
            Err(SecretError::Tls { .. })
        ));
    }

    #[test]
    fn test_skip_verify_client_builds() {
        let settings = VaultSettings {
            skip_verify: true,
            ..Default::default()
        };
        assert!(settings.build_client().is_ok());
    }
}
