//! Process configuration: bind address, TLS material, database location,
//! and the JWT signing secret. Loaded from an optional `camrelay.toml` file
//! with environment-variable overrides, the way a single-process relay is
//! configured at deploy time rather than through a full config-management
//! layer.

use std::{net::SocketAddr, path::PathBuf};

use camrelay_oauth::OAuthConfig;
use secrecy::Secret;
use serde::Deserialize;

mod env;
mod file;

pub use env::apply_env_overrides;
pub use file::load_config_file;

/// TLS is mandatory for every WebSocket endpoint per the spec; there is no
/// plaintext mode.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// On-disk / env-sourced representation, before the secret is wrapped.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    pub tls: TlsConfig,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub viewer_jwt_secret: String,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// OAuth providers available for sign-in, one `[[oauth_providers]]` table
    /// per provider. Empty by default — a deployment with no providers
    /// configured simply can't sign anyone in yet.
    #[serde(default)]
    pub oauth_providers: Vec<OAuthConfig>,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8443))
}

fn default_database_url() -> String {
    "sqlite://camrelay.db".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            tls: TlsConfig {
                cert_path: PathBuf::from("tls/cert.pem"),
                key_path: PathBuf::from("tls/key.pem"),
            },
            database_url: default_database_url(),
            viewer_jwt_secret: String::new(),
            cors_origins: default_cors_origins(),
            oauth_providers: Vec::new(),
        }
    }
}

/// Fully resolved runtime configuration.
pub struct Config {
    pub bind_addr: SocketAddr,
    pub tls: TlsConfig,
    pub database_url: String,
    /// HMAC signing secret for viewer bearer JWTs (`kid=many`). Room login
    /// JWTs are signed per-room with that room's own secret address instead.
    pub viewer_jwt_secret: Secret<String>,
    pub cors_origins: Vec<String>,
    pub oauth_providers: Vec<OAuthConfig>,
}

impl Config {
    /// Build from defaults, then a config file at `path` if present, then
    /// environment variables — later sources win.
    pub fn load(path: Option<&std::path::Path>) -> anyhow::Result<Self> {
        let mut file = match path {
            Some(p) if p.exists() => load_config_file(p)?,
            _ => ConfigFile::default(),
        };
        apply_env_overrides(&mut file);
        if file.viewer_jwt_secret.is_empty() {
            anyhow::bail!(
                "viewer_jwt_secret must be set via config file or CAMRELAY_VIEWER_JWT_SECRET"
            );
        }
        Ok(Self {
            bind_addr: file.bind_addr,
            tls: file.tls,
            database_url: file.database_url,
            viewer_jwt_secret: Secret::new(file.viewer_jwt_secret),
            cors_origins: file.cors_origins,
            oauth_providers: file.oauth_providers,
        })
    }
}
