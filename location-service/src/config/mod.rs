use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LocationConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub request_timeout_seconds: u64,
    pub mongodb: MongoConfig,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
    /// Ceiling for full-collection scans.
    pub scan_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub key: String,
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub global_limit: u32,
    pub global_window_seconds: u64,
    pub ip_limit: u32,
    pub ip_window_seconds: u64,
    /// Peers whose `X-Forwarded-For` is believed. Empty keys every client
    /// on its TCP peer address.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            common: core_config::Config::default(),
            service_name: "location-service".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            request_timeout_seconds: 30,
            mongodb: MongoConfig {
                uri: "mongodb://localhost:27017".to_string(),
                database: "location".to_string(),
                collection: "locations".to_string(),
                scan_timeout_seconds: 300,
            },
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".to_string(),
            },
            cache: CacheConfig {
                key: "cached_db_locations".to_string(),
                ttl_seconds: 30,
            },
            rate_limit: RateLimitConfig {
                global_limit: 1000,
                global_window_seconds: 1,
                ip_limit: 2,
                ip_window_seconds: 1,
                trusted_proxies: Vec::new(),
            },
        }
    }
}

impl LocationConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";
        let defaults = Self::default();

        let config = LocationConfig {
            common,
            service_name: get_env("SERVICE_NAME", Some(&defaults.service_name), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some(&defaults.log_level), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            request_timeout_seconds: get_parsed(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
                is_prod,
            )?,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some(&defaults.mongodb.uri), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some(&defaults.mongodb.database), is_prod)?,
                collection: get_env(
                    "MONGODB_COLLECTION",
                    Some(&defaults.mongodb.collection),
                    is_prod,
                )?,
                scan_timeout_seconds: get_parsed(
                    "STORE_SCAN_TIMEOUT_SECONDS",
                    defaults.mongodb.scan_timeout_seconds,
                    is_prod,
                )?,
            },
            redis: RedisConfig {
                url: get_env("REDIS_URL", Some(&defaults.redis.url), is_prod)?,
            },
            cache: CacheConfig {
                key: get_env("CACHE_KEY", Some(&defaults.cache.key), is_prod)?,
                ttl_seconds: get_parsed("CACHE_TTL_SECONDS", defaults.cache.ttl_seconds, is_prod)?,
            },
            rate_limit: RateLimitConfig {
                global_limit: get_parsed(
                    "RATE_LIMIT_GLOBAL_LIMIT",
                    defaults.rate_limit.global_limit,
                    is_prod,
                )?,
                global_window_seconds: get_parsed(
                    "RATE_LIMIT_GLOBAL_WINDOW_SECONDS",
                    defaults.rate_limit.global_window_seconds,
                    is_prod,
                )?,
                ip_limit: get_parsed("RATE_LIMIT_IP_LIMIT", defaults.rate_limit.ip_limit, is_prod)?,
                ip_window_seconds: get_parsed(
                    "RATE_LIMIT_IP_WINDOW_SECONDS",
                    defaults.rate_limit.ip_window_seconds,
                    is_prod,
                )?,
                trusted_proxies: parse_ip_list(
                    "RATE_LIMIT_TRUSTED_PROXIES",
                    &env::var("RATE_LIMIT_TRUSTED_PROXIES").unwrap_or_default(),
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let checks = [
            (self.cache.ttl_seconds == 0, "CACHE_TTL_SECONDS must be greater than 0"),
            (
                self.mongodb.scan_timeout_seconds == 0,
                "STORE_SCAN_TIMEOUT_SECONDS must be greater than 0",
            ),
            (
                self.request_timeout_seconds == 0,
                "REQUEST_TIMEOUT_SECONDS must be greater than 0",
            ),
            (
                self.rate_limit.global_limit == 0 || self.rate_limit.global_window_seconds == 0,
                "Global rate limit and window must be greater than 0",
            ),
            (
                self.rate_limit.ip_limit == 0 || self.rate_limit.ip_window_seconds == 0,
                "Per-IP rate limit and window must be greater than 0",
            ),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(AppError::ConfigError(anyhow::anyhow!(*message))),
            None => Ok(()),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.mongodb.scan_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn get_parsed<T>(key: &str, default: T, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr + ToString,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(&default.to_string()), is_prod)?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{} is invalid: {}", key, e)))
}

/// Comma-separated addresses; blank entries are skipped.
fn parse_ip_list(key: &str, raw: &str) -> Result<Vec<IpAddr>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpAddr>().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("{} has invalid address {:?}: {}", key, s, e))
            })
        })
        .collect()
}
