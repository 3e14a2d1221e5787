use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::auth::credentials::AuthConfig;
use crate::error::{Error, Result};

const DEFAULT_API_VERSION: &str = "59.0";
const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";

/// Contents of `config.json`.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub cache: CacheConfig,
    #[serde(default)]
    pub environments: HashMap<String, Environment>,
}

/// Where cached responses live and how long they stay valid.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub dir: String,
    /// Expiry in whole days.
    pub expire: i64,
}

/// Connection settings for one named org.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    #[serde(default = "default_login_url")]
    pub login_url: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub security_token: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;
        Self::parse(&contents)
            .map_err(|e| Error::Config(format!("Invalid {}: {e}", path.display())))
    }

    pub fn parse(contents: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    pub fn environment(&self, name: &str) -> Result<&Environment> {
        self.environments
            .get(name)
            .ok_or_else(|| Error::Config(format!("Unknown environment '{}'", name)))
    }
}

impl CacheConfig {
    /// Cache directory with a leading `~/` expanded to the home directory.
    pub fn resolved_dir(&self) -> PathBuf {
        match (self.dir.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(&self.dir),
        }
    }
}

impl Environment {
    /// Password grant when a username is configured, client credentials otherwise.
    pub fn auth_config(&self) -> AuthConfig {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => AuthConfig::Password {
                login_url: self.login_url.clone(),
                client_id: self.client_id.clone(),
                client_secret: self.client_secret.clone(),
                username: username.clone(),
                password: format!(
                    "{}{}",
                    password,
                    self.security_token.as_deref().unwrap_or_default()
                ),
            },
            _ => AuthConfig::ClientCredentials {
                login_url: self.login_url.clone(),
                client_id: self.client_id.clone(),
                client_secret: self.client_secret.clone(),
            },
        }
    }
}
