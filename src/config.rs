//! Configuration management

use std::{env, path::Path, path::PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    #[serde(default)]
    pub env_files: Vec<String>,
    /// Server configuration
    pub server: ServerConfig,
    /// Authentication configuration
    pub auth: AuthConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Admin shared secret for certificate management endpoints.
    /// Supports: literal value, `env:VAR_NAME`, or `auto` (generates a random
    /// secret, logged once at startup). Falls back to the `ADMIN_SECRET`
    /// environment variable when unset. When no secret resolves, the admin
    /// endpoints are disabled.
    #[serde(default)]
    pub admin_token: Option<String>,

    /// Directory holding the signing key pair (`signer.key` / `signer.pub`)
    #[serde(default = "default_keys_dir")]
    pub keys_dir: PathBuf,

    /// Path of the certificate record store (JSON)
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Path prefixes that bypass the certificate gate.
    /// `/api/admin` carries its own shared-secret check and `/api/auth/login`
    /// is the authentication step itself.
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_keys_dir() -> PathBuf {
    data_dir().join("keys")
}

fn default_store_path() -> PathBuf {
    data_dir().join("certificates.json")
}

fn default_public_paths() -> Vec<String> {
    vec![
        "/api/health".to_string(),
        "/api/auth/login".to_string(),
        "/api/admin".to_string(),
    ]
}

/// Default data directory (`~/.joinery-manager`, falling back to `./data`)
fn data_dir() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from("data"), |h| h.join(".joinery-manager"))
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_token: None,
            keys_dir: default_keys_dir(),
            store_path: default_store_path(),
            public_paths: default_public_paths(),
        }
    }
}

impl AuthConfig {
    /// Resolve the admin secret (expand env vars, generate if `auto`).
    #[must_use]
    pub fn resolve_admin_token(&self) -> Option<String> {
        match self.admin_token.as_deref() {
            Some("auto") => {
                use rand::RngExt;
                let random_bytes: [u8; 32] = rand::rng().random();
                let secret = format!(
                    "jpm_{}",
                    base64::Engine::encode(
                        &base64::engine::general_purpose::URL_SAFE_NO_PAD,
                        random_bytes
                    )
                );
                tracing::info!("Auto-generated admin secret: {}", secret);
                Some(secret)
            }
            Some(token) => {
                if let Some(var_name) = token.strip_prefix("env:") {
                    Some(env::var(var_name).unwrap_or_else(|_| token.to_string()))
                } else {
                    Some(token.to_string())
                }
            }
            None => env::var("ADMIN_SECRET").ok(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (JOINERY_ prefix)
        figment = figment.merge(Env::prefixed("JOINERY_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Load env files into the process environment so `env:VAR` and
        // `ADMIN_SECRET` resolution can see them
        config.load_env_files();

        Ok(config)
    }

    /// Load configured env files (and `.env` in the working directory)
    fn load_env_files(&self) {
        let _ = dotenvy::dotenv();
        for file in &self.env_files {
            let path = expand_tilde(file);
            if let Err(e) = dotenvy::from_path_override(&path) {
                tracing::debug!(file = %path.display(), error = %e, "Skipped env file");
            }
        }
    }
}

/// Expand a leading `~` to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
