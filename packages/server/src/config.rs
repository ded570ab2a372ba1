use std::path::PathBuf;

use common::storage::Bucket;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, used to build signed and public object URLs.
    pub public_url: String,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// `postgres://...` or `sqlite://...`.
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of a sign-in session.
    pub session_ttl_hours: i64,
    /// Lifetime of an unused magic-link token.
    pub magic_link_ttl_minutes: i64,
    /// Page the magic link points at; the token is appended as `?token=`.
    pub magic_link_redirect_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory of the filesystem object store.
    pub root: PathBuf,
    /// Lifetime of signed object URLs.
    pub signed_url_ttl_secs: u64,
    /// Buckets whose objects are served without a signature.
    pub public_buckets: Vec<Bucket>,
    pub image_max_bytes: u64,
    pub document_max_bytes: u64,
    /// Lets admins read and remove objects under other users' paths.
    /// Off by default: object policies only ever match the path owner.
    pub admin_object_override: bool,
}

impl StorageConfig {
    pub fn max_bytes(&self, bucket: Bucket) -> u64 {
        match bucket {
            Bucket::Images => self.image_max_bytes,
            Bucket::Documents => self.document_max_bytes,
        }
    }

    pub fn is_public(&self, bucket: Bucket) -> bool {
        self.public_buckets.contains(&bucket)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("VAULT_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.public_url", "http://127.0.0.1:3000")?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://vault.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.session_ttl_hours", 168)?
            .set_default("auth.magic_link_ttl_minutes", 15)?
            .set_default(
                "auth.magic_link_redirect_url",
                "http://127.0.0.1:3000/auth/callback",
            )?
            .set_default("storage.root", "./data/objects")?
            .set_default("storage.signed_url_ttl_secs", 3600)?
            .set_default("storage.public_buckets", Vec::<String>::new())?
            .set_default("storage.image_max_bytes", 5 * 1024 * 1024)?
            .set_default("storage.document_max_bytes", 10 * 1024 * 1024)?
            .set_default("storage.admin_object_override", false)?
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., VAULT__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("VAULT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
