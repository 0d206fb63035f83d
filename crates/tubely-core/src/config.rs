//! Configuration module
//!
//! All process settings live in one `Config` value built from the environment
//! at startup and handed to setup code explicitly. Nothing reads the
//! environment after `Config::from_env` returns.

use std::env;
use std::path::PathBuf;

use crate::storage_types::StorageBackend;

const DEFAULT_PORT: u16 = 8091;
const DB_MAX_CONNECTIONS: u32 = 10;
const DB_TIMEOUT_SECS: u64 = 30;
const MAX_THUMBNAIL_SIZE_MB: u64 = 10;
const MAX_VIDEO_SIZE_BYTES: u64 = 1 << 30;
const MEDIA_TOOL_TIMEOUT_SECS: u64 = 300;
const SIGNED_URL_TTL_SECS: u64 = 15 * 60;
const DEFAULT_S3_REGION: &str = "us-east-1";

/// Raw service settings.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub server_port: u16,
    pub environment: String,
    pub log_format: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    // Local image assets
    pub assets_root: PathBuf,
    pub public_base_url: String,
    pub scratch_dir: PathBuf,
    // Video object store
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub s3_endpoint: Option<String>, // MinIO, DigitalOcean Spaces, etc.
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Upload limits and media tools
    pub max_thumbnail_size_bytes: u64,
    pub max_video_size_bytes: u64,
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    pub media_tool_timeout_secs: u64,
    pub signed_url_ttl_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServiceConfig>);

impl Config {
    pub fn new(config: ServiceConfig) -> Self {
        Config(Box::new(config))
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.0.validate()
    }

    pub fn is_production(&self) -> bool {
        let env = self.0.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.0.server_port
    }

    pub fn environment(&self) -> &str {
        &self.0.environment
    }

    pub fn log_format(&self) -> &str {
        &self.0.log_format
    }

    pub fn database_url(&self) -> &str {
        &self.0.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.0.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.0.db_timeout_seconds
    }

    pub fn jwt_secret(&self) -> &str {
        &self.0.jwt_secret
    }

    pub fn assets_root(&self) -> &PathBuf {
        &self.0.assets_root
    }

    pub fn public_base_url(&self) -> &str {
        &self.0.public_base_url
    }

    pub fn scratch_dir(&self) -> &PathBuf {
        &self.0.scratch_dir
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.0.storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.0.s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> &str {
        &self.0.s3_region
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.0.s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.0.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.0.local_storage_base_url.as_deref()
    }

    pub fn max_thumbnail_size_bytes(&self) -> u64 {
        self.0.max_thumbnail_size_bytes
    }

    pub fn max_video_size_bytes(&self) -> u64 {
        self.0.max_video_size_bytes
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.0.ffprobe_path
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.0.ffmpeg_path
    }

    pub fn media_tool_timeout_secs(&self) -> u64 {
        self.0.media_tool_timeout_secs
    }

    pub fn signed_url_ttl_secs(&self) -> u64 {
        self.0.signed_url_ttl_secs
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let server_port = env::var("PORT")
            .unwrap_or_else(|_| DEFAULT_PORT.to_string())
            .parse::<u16>()
            .unwrap_or(DEFAULT_PORT);

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or(StorageBackend::S3);

        let max_thumbnail_size_mb = env::var("MAX_THUMBNAIL_SIZE_MB")
            .unwrap_or_else(|_| MAX_THUMBNAIL_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(MAX_THUMBNAIL_SIZE_MB);

        Ok(ServiceConfig {
            server_port,
            environment,
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DB_MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DB_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            assets_root: env::var("ASSETS_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./assets")),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", server_port)),
            scratch_dir: env::var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .unwrap_or_else(|_| DEFAULT_S3_REGION.to_string()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            max_thumbnail_size_bytes: max_thumbnail_size_mb * 1024 * 1024,
            max_video_size_bytes: env::var("MAX_VIDEO_SIZE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_VIDEO_SIZE_BYTES),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            media_tool_timeout_secs: env::var("MEDIA_TOOL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(MEDIA_TOOL_TIMEOUT_SECS),
            signed_url_ttl_secs: env::var("SIGNED_URL_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(SIGNED_URL_TTL_SECS),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.max_thumbnail_size_bytes == 0 || self.max_video_size_bytes == 0 {
            return Err(anyhow::anyhow!("Upload size limits must be greater than zero"));
        }

        if self.media_tool_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "MEDIA_TOOL_TIMEOUT_SECS must be greater than zero"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
