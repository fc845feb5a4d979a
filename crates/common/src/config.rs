//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Site behaviour (pagination, login redirect, index caching).
    #[serde(default)]
    pub site: SiteConfig,
    /// Uploaded media configuration.
    #[serde(default)]
    pub media: MediaConfig,
    /// Page cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this site.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Site-wide behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Number of posts on one feed page.
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: u64,
    /// Where unauthenticated visitors of protected pages are sent.
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// Lifetime of the cached home feed, in seconds.
    #[serde(default = "default_index_cache_secs")]
    pub index_cache_secs: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            posts_per_page: default_posts_per_page(),
            login_url: default_login_url(),
            index_cache_secs: default_index_cache_secs(),
        }
    }
}

/// Uploaded media configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Directory uploaded files are written to.
    #[serde(default = "default_media_root")]
    pub root: PathBuf,
    /// URL prefix the media root is served under.
    #[serde(default = "default_media_url")]
    pub url: String,
    /// Largest request body accepted by the post form, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            url: default_media_url(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Page cache backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// In-process cache.
    #[default]
    Memory,
    /// Shared Redis cache.
    Redis,
}

/// Page cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Which backend stores cached pages.
    #[serde(default)]
    pub backend: CacheBackend,
    /// Redis connection URL (required for the redis backend).
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Key prefix for all cache keys.
    #[serde(default = "default_cache_prefix")]
    pub prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            redis_url: None,
            prefix: default_cache_prefix(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    1
}

const fn default_posts_per_page() -> u64 {
    10
}

fn default_login_url() -> String {
    "/auth/login/".to_string()
}

const fn default_index_cache_secs() -> u64 {
    20
}

fn default_media_root() -> PathBuf {
    PathBuf::from("./media")
}

fn default_media_url() -> String {
    "/media".to_string()
}

const fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_cache_prefix() -> String {
    "yatube".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, exported into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `YATUBE_ENV`)
    /// 4. Environment variables with `YATUBE__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("YATUBE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("YATUBE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("YATUBE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                url = "http://localhost:8000"

                [database]
                url = "postgres://localhost/yatube"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.site.posts_per_page, 10);
        assert_eq!(config.site.login_url, "/auth/login/");
        assert_eq!(config.site.index_cache_secs, 20);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.media.url, "/media");
        assert_eq!(config.media.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_redis_backend_parses() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                url = "http://localhost:8000"

                [database]
                url = "postgres://localhost/yatube"

                [cache]
                backend = "redis"
                redis_url = "redis://localhost:6379"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.cache.backend, CacheBackend::Redis);
        assert_eq!(config.cache.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(config.cache.prefix, "yatube");
    }
}
