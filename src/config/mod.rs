//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides};

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "narnia";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 3000;
const DEFAULT_ADMIN_PORT: u16 = 3001;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 16;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REDIS_POOL_SIZE: u32 = 16;
const DEFAULT_MEMORY_CAPACITY: u32 = 10_000;
const DEFAULT_IDENTITY_TTL_SECS: u64 = 86_400;
const DEFAULT_CAPE_TTL_SECS: u64 = 3_600;
const DEFAULT_FILE_TTL_SECS: u64 = 3_600;
const DEFAULT_STORAGE_REGION: &str = "us-east-1";
const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:3000";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub storage: StorageSettings,
    pub upstream: UpstreamSettings,
    pub public: PublicSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Redis backend; the in-process store is used when unset.
    pub redis_url: Option<String>,
    pub redis_pool_size: NonZeroU32,
    pub memory_capacity: NonZeroU32,
    pub identity_ttl: Duration,
    pub cape_ttl: Duration,
    pub file_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PublicSettings {
    pub base_url: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("NARNIA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    storage: RawStorageSettings,
    upstream: RawUpstreamSettings,
    public: RawPublicSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(host) = overrides.server_admin_host.as_ref() {
            self.server.admin_host = Some(host.clone());
        }
        if let Some(port) = overrides.public_port {
            self.server.public_port = Some(port);
        }
        if let Some(port) = overrides.admin_port {
            self.server.admin_port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(url) = overrides.cache_redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
        if let Some(bucket) = overrides.storage_bucket.as_ref() {
            self.storage.bucket = Some(bucket.clone());
        }
        if let Some(endpoint) = overrides.storage_endpoint.as_ref() {
            self.storage.endpoint = Some(endpoint.clone());
        }
        if let Some(timeout) = overrides.upstream_timeout_ms {
            self.upstream.timeout_ms = Some(timeout);
        }
        if let Some(base_url) = overrides.public_base_url.as_ref() {
            self.public.base_url = Some(base_url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            storage,
            upstream,
            public,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            storage: build_storage_settings(storage)?,
            upstream: build_upstream_settings(upstream)?,
            public: build_public_settings(public)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let admin_host = server
        .admin_host
        .unwrap_or_else(|| DEFAULT_ADMIN_HOST.to_string());

    let public_port = server.public_port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if public_port == 0 {
        return Err(LoadError::invalid(
            "server.public_port",
            "port must be greater than zero",
        ));
    }

    let admin_port = server.admin_port.unwrap_or(DEFAULT_ADMIN_PORT);
    if admin_port == 0 {
        return Err(LoadError::invalid(
            "server.admin_port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;
    let admin_addr = parse_socket_addr(&admin_host, admin_port)
        .map_err(|reason| LoadError::invalid("server.admin_addr", reason))?;
    if public_addr == admin_addr {
        return Err(LoadError::invalid(
            "server.admin_port",
            "admin listener must not share the public address",
        ));
    }

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    let graceful_shutdown = positive_secs(graceful_secs, "server.graceful_shutdown_seconds")?;

    Ok(ServerSettings {
        public_addr,
        admin_addr,
        graceful_shutdown,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;
    let acquire_timeout = positive_secs(
        database
            .acquire_timeout_secs
            .unwrap_or(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS),
        "database.acquire_timeout_secs",
    )?;

    Ok(DatabaseSettings {
        url: non_blank(database.url),
        max_connections,
        acquire_timeout,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let redis_pool_size = non_zero_u32(
        cache
            .redis_pool_size
            .unwrap_or(DEFAULT_REDIS_POOL_SIZE)
            .into(),
        "cache.redis_pool_size",
    )?;
    let memory_capacity = non_zero_u32(
        cache
            .memory_capacity
            .unwrap_or(DEFAULT_MEMORY_CAPACITY)
            .into(),
        "cache.memory_capacity",
    )?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        redis_url: non_blank(cache.redis_url),
        redis_pool_size,
        memory_capacity,
        identity_ttl: positive_secs(
            cache.identity_ttl_secs.unwrap_or(DEFAULT_IDENTITY_TTL_SECS),
            "cache.identity_ttl_secs",
        )?,
        cape_ttl: positive_secs(
            cache.cape_ttl_secs.unwrap_or(DEFAULT_CAPE_TTL_SECS),
            "cache.cape_ttl_secs",
        )?,
        file_ttl: positive_secs(
            cache.file_ttl_secs.unwrap_or(DEFAULT_FILE_TTL_SECS),
            "cache.file_ttl_secs",
        )?,
    })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let bucket = non_blank(storage.bucket)
        .ok_or_else(|| LoadError::invalid("storage.bucket", "a bucket name is required"))?;

    let endpoint = non_blank(storage.endpoint);
    if let Some(endpoint) = endpoint.as_deref()
        && endpoint.contains("://")
    {
        Url::parse(endpoint).map_err(|err| {
            LoadError::invalid("storage.endpoint", format!("invalid URL: {err}"))
        })?;
    }

    let access_key_id = non_blank(storage.access_key_id);
    let secret_access_key = non_blank(storage.secret_access_key);
    if access_key_id.is_some() != secret_access_key.is_some() {
        return Err(LoadError::invalid(
            "storage.access_key_id",
            "access_key_id and secret_access_key must be set together",
        ));
    }

    Ok(StorageSettings {
        bucket,
        endpoint,
        region: non_blank(storage.region).unwrap_or_else(|| DEFAULT_STORAGE_REGION.to_string()),
        access_key_id,
        secret_access_key,
        force_path_style: storage.force_path_style.unwrap_or(false),
    })
}

fn build_upstream_settings(upstream: RawUpstreamSettings) -> Result<UpstreamSettings, LoadError> {
    let millis = upstream.timeout_ms.unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_MS);
    if millis == 0 {
        return Err(LoadError::invalid(
            "upstream.timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(UpstreamSettings {
        timeout: Duration::from_millis(millis),
    })
}

fn build_public_settings(public: RawPublicSettings) -> Result<PublicSettings, LoadError> {
    let base_url =
        non_blank(public.base_url).unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string());
    let parsed = Url::parse(&base_url)
        .map_err(|err| LoadError::invalid("public.base_url", format!("invalid URL: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "public.base_url",
            "scheme must be http or https",
        ));
    }

    Ok(PublicSettings {
        base_url: base_url.trim_end_matches('/').to_string(),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    admin_host: Option<String>,
    public_port: Option<u16>,
    admin_port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    acquire_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    redis_url: Option<String>,
    redis_pool_size: Option<u32>,
    memory_capacity: Option<u32>,
    identity_ttl_secs: Option<u64>,
    cape_ttl_secs: Option<u64>,
    file_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    bucket: Option<String>,
    endpoint: Option<String>,
    region: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    force_path_style: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUpstreamSettings {
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPublicSettings {
    base_url: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn positive_secs(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
