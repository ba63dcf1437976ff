use crate::error::{AppError, AppResult};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Upstream price source configuration
#[derive(Debug, Clone)]
pub struct PriceSourceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// How long a fetched current price is reused
    pub cache_ttl_secs: u64,
    /// Wait before the single retry after a rate-limit response
    pub retry_backoff_ms: u64,
    /// Calendar days searched backwards for a historical close
    pub lookback_days: u32,
}

/// Price refresh configuration
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Minimum interval between automatic refreshes of one competition
    pub ttl_secs: u64,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub price_source: PriceSourceConfig,
    pub refresh: RefreshConfig,
    pub log_level: String,
    pub environment: String,
}

/// Parse `key` if it is set, else use `default`. A set value that does not
/// parse is an error.
fn env_or<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("Invalid {}: {:?}", key, raw))),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => {
            Err(AppError::Config(format!("{} is not valid unicode", key)))
        }
    }
}

fn config_error(message: &str) -> AppError {
    AppError::Config(message.to_string())
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> AppResult<Self> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| config_error("DATABASE_URL environment variable is required"))?;

        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", 10u32)?;
        let acquire_timeout_secs = env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 30u64)?;
        let idle_timeout_secs = env_or("DATABASE_IDLE_TIMEOUT_SECS", 600u64)?; // 10 minutes
        let max_lifetime_secs = env_or("DATABASE_MAX_LIFETIME_SECS", 1800u64)?; // 30 minutes
        let test_before_acquire = env_or("DATABASE_TEST_BEFORE_ACQUIRE", true)?;

        if max_connections == 0 {
            return Err(config_error("DATABASE_MAX_CONNECTIONS must be greater than 0"));
        }

        if acquire_timeout_secs == 0 {
            return Err(config_error("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0"));
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/stockpick".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl PriceSourceConfig {
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();

        let config = Self {
            base_url: env::var("PRICE_SOURCE_BASE_URL").unwrap_or(defaults.base_url),
            timeout_secs: env_or("PRICE_SOURCE_TIMEOUT_SECS", defaults.timeout_secs)?,
            cache_ttl_secs: env_or("PRICE_CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            retry_backoff_ms: env_or("PRICE_RETRY_BACKOFF_MS", defaults.retry_backoff_ms)?,
            lookback_days: env_or("PRICE_LOOKBACK_DAYS", defaults.lookback_days)?,
        };

        if config.timeout_secs == 0 {
            return Err(config_error("PRICE_SOURCE_TIMEOUT_SECS must be greater than 0"));
        }

        if config.base_url.trim().is_empty() {
            return Err(config_error("PRICE_SOURCE_BASE_URL must not be empty"));
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for PriceSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
            cache_ttl_secs: 60,
            retry_backoff_ms: 1000,
            lookback_days: 7,
        }
    }
}

impl RefreshConfig {
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            ttl_secs: env_or("REFRESH_TTL_SECS", Self::default().ttl_secs)?,
        })
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 } // 5 minutes
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> AppResult<Self> {
        let database = DatabaseConfig::from_env()?;
        let price_source = PriceSourceConfig::from_env()?;
        let refresh = RefreshConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Self::validate_log_level(&log_level)?;
        Self::validate_environment(&environment)?;

        Ok(Self {
            database,
            price_source,
            refresh,
            log_level: log_level.to_lowercase(),
            environment: environment.to_lowercase(),
        })
    }

    fn validate_log_level(log_level: &str) -> AppResult<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            )));
        }
        Ok(())
    }

    fn validate_environment(environment: &str) -> AppResult<()> {
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            )));
        }
        Ok(())
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Get database URL (convenience method)
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            price_source: PriceSourceConfig::default(),
            refresh: RefreshConfig::default(),
            log_level: "info".to_string(),
            environment: "development".to_string(),
        }
    }
}
