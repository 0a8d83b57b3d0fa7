//! Configuration Management
//!
//! Reads client settings from `<config_dir>/scm/config.json` (or an explicit
//! path), then lets `SCM_*` environment variables override individual fields.
//! Nothing here writes to disk.

use crate::scm::auth::Credential;
use crate::scm::client::ScmClient;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User configuration
#[derive(Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Tenant service group id
    #[serde(default)]
    pub tsg_id: Option<String>,
    /// Pre-issued bearer token; takes precedence over client credentials
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub token_url: Option<String>,
    /// Per-request timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("tsg_id", &self.tsg_id)
            .field("access_token", &redact(&self.access_token))
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("scm").join("config.json"))
    }

    /// Load configuration from `path` (or the default location), then apply
    /// environment overrides. A missing default file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => match Self::config_path() {
                Some(path) if path.exists() => Self::read(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Override fields from `SCM_*` variables, looked up through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fields: [(&str, &mut Option<String>); 6] = [
            ("SCM_CLIENT_ID", &mut self.client_id),
            ("SCM_CLIENT_SECRET", &mut self.client_secret),
            ("SCM_TSG_ID", &mut self.tsg_id),
            ("SCM_ACCESS_TOKEN", &mut self.access_token),
            ("SCM_BASE_URL", &mut self.base_url),
            ("SCM_TOKEN_URL", &mut self.token_url),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                tracing::debug!("Config field overridden by {}", key);
                *field = Some(value);
            }
        }
    }

    /// Check that configured URLs parse
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("base_url", &self.base_url), ("token_url", &self.token_url)] {
            if let Some(value) = value {
                let parsed = url::Url::parse(value)
                    .with_context(|| format!("Invalid {} '{}'", name, value))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    bail!("{} must be an http(s) URL, got '{}'", name, value);
                }
            }
        }
        Ok(())
    }

    /// Credentials described by this config
    pub fn credential(&self) -> Result<Credential> {
        if let Some(token) = &self.access_token {
            return Ok(Credential::static_token(token.clone()));
        }

        match (&self.client_id, &self.client_secret, &self.tsg_id) {
            (Some(id), Some(secret), Some(tsg)) => {
                Ok(Credential::client_credentials(id.clone(), secret.clone(), tsg.clone()))
            }
            _ => bail!(
                "No credentials configured. Set client_id, client_secret and tsg_id \
                 (or SCM_CLIENT_ID, SCM_CLIENT_SECRET, SCM_TSG_ID), or an access token."
            ),
        }
    }

    /// Build a client from this config
    pub fn build_client(&self) -> Result<ScmClient> {
        let mut builder = ScmClient::builder().credential(self.credential()?);
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url.trim_end_matches('/'));
        }
        if let Some(url) = &self.token_url {
            builder = builder.token_url(url.clone());
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build().context("Failed to create SCM client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_partial_config() {
        let config: Config =
            serde_json::from_str(r#"{"client_id": "svc@123.iam", "tsg_id": "123"}"#).unwrap();
        assert_eq!(config.client_id.as_deref(), Some("svc@123.iam"));
        assert!(config.client_secret.is_none());
        assert!(config.credential().is_err());
    }

    #[test]
    fn test_env_overrides_win() {
        let mut config = Config {
            client_id: Some("file-id".into()),
            ..Default::default()
        };
        let env: HashMap<&str, &str> = HashMap::from([
            ("SCM_CLIENT_ID", "env-id"),
            ("SCM_CLIENT_SECRET", "secret"),
            ("SCM_TSG_ID", "1234"),
            ("SCM_BASE_URL", ""),
        ]);
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.client_id.as_deref(), Some("env-id"));
        assert!(config.base_url.is_none());
        let credential = config.credential().unwrap();
        assert_eq!(credential.scope(), "tsg_id:1234");
    }

    #[test]
    fn test_access_token_takes_precedence() {
        let config = Config {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            tsg_id: Some("1".into()),
            access_token: Some("pre-issued".into()),
            ..Default::default()
        };
        assert_eq!(
            config.credential().unwrap().access_token.as_deref(),
            Some("pre-issued")
        );
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = Config {
            base_url: Some("ftp://example.com".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            token_url: Some("not a url".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config {
            client_secret: Some("hunter2".into()),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
