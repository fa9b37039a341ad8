use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::database::manager::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub request_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; wins over the individual DB_* settings
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub zone: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime_secs: u64,
    pub idle_timeout_secs: u64,
    pub connect_attempts: u32,
    pub retry_backoff_secs: u64,
    pub ping_timeout_secs: u64,
    pub enable_query_logging: bool,
    pub slow_query_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub app_secret: String,
    pub signature_prefix: String,
    pub signature_suffix: String,
    pub signature_window_secs: i64,
    pub signature_skip_paths: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub bcrypt_cost: u32,
    pub cors_max_age_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            request_timeout_secs: 3,
            shutdown_timeout_secs: 30,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            name: "postgres".to_string(),
            zone: "UTC".to_string(),
            max_connections: 25,
            min_connections: 5,
            max_lifetime_secs: 5 * 60,
            idle_timeout_secs: 2 * 60,
            connect_attempts: 5,
            retry_backoff_secs: 2,
            ping_timeout_secs: 5,
            enable_query_logging: false,
            slow_query_threshold_ms: 1000,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            app_secret: String::new(),
            signature_prefix: "Starter".to_string(),
            signature_suffix: "Kit".to_string(),
            signature_window_secs: 60,
            signature_skip_paths: vec![
                "/".to_string(),
                "/health".to_string(),
                "/swagger".to_string(),
                "/asset/swagger.yaml".to_string(),
            ],
            jwt_secret: String::new(),
            jwt_expiry_hours: 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            cors_max_age_secs: 300,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, DatabaseError> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url).map_err(DatabaseError::Sqlx);
        }
        if self.host.is_empty() {
            return Err(DatabaseError::ConfigMissing("DB_HOST"));
        }

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
            .options([("TimeZone", self.zone.as_str())]))
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        Self::for_environment(environment).with_env_overrides()
    }

    /// Preset defaults; secrets are always empty here and come from the environment
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.app_secret.is_empty() {
            return Err(ConfigError::Missing("APP_SECRET"));
        }
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        Ok(())
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("APP_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = port.parse().unwrap_or(self.server.port);
        }
        override_parsed("APP_REQUEST_TIMEOUT_SECS", &mut self.server.request_timeout_secs);
        override_parsed("APP_SHUTDOWN_TIMEOUT_SECS", &mut self.server.shutdown_timeout_secs);

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        override_string("DB_HOST", &mut self.database.host);
        override_parsed("DB_PORT", &mut self.database.port);
        override_string("DB_USER", &mut self.database.user);
        override_string("DB_PASS", &mut self.database.password);
        override_string("DB_NAME", &mut self.database.name);
        override_string("DB_ZONE", &mut self.database.zone);
        override_parsed("DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections);
        override_parsed("DATABASE_MIN_CONNECTIONS", &mut self.database.min_connections);
        override_parsed("DATABASE_MAX_LIFETIME_SECS", &mut self.database.max_lifetime_secs);
        override_parsed("DATABASE_IDLE_TIMEOUT_SECS", &mut self.database.idle_timeout_secs);
        override_parsed("DATABASE_CONNECT_ATTEMPTS", &mut self.database.connect_attempts);
        override_parsed("DATABASE_RETRY_BACKOFF_SECS", &mut self.database.retry_backoff_secs);
        override_parsed("DATABASE_PING_TIMEOUT_SECS", &mut self.database.ping_timeout_secs);
        override_parsed("DATABASE_ENABLE_QUERY_LOGGING", &mut self.database.enable_query_logging);
        override_parsed("DATABASE_SLOW_QUERY_THRESHOLD_MS", &mut self.database.slow_query_threshold_ms);

        // Security overrides
        override_string("APP_SECRET", &mut self.security.app_secret);
        override_string("SIGNATURE_PREFIX", &mut self.security.signature_prefix);
        override_string("SIGNATURE_SUFFIX", &mut self.security.signature_suffix);
        override_parsed("SIGNATURE_WINDOW_SECS", &mut self.security.signature_window_secs);
        if let Ok(v) = env::var("SIGNATURE_SKIP_PATHS") {
            self.security.signature_skip_paths = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        override_string("JWT_SECRET", &mut self.security.jwt_secret);
        override_parsed("JWT_EXPIRY_HOURS", &mut self.security.jwt_expiry_hours);
        override_parsed("BCRYPT_COST", &mut self.security.bcrypt_cost);
        override_parsed("CORS_MAX_AGE_SECS", &mut self.security.cors_max_age_secs);

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig::default(),
            database: DatabaseConfig {
                enable_query_logging: true,
                slow_query_threshold_ms: 100,
                ..DatabaseConfig::default()
            },
            security: SecurityConfig {
                jwt_expiry_hours: 24 * 7, // 1 week
                ..SecurityConfig::default()
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig::default(),
            database: DatabaseConfig {
                enable_query_logging: true,
                slow_query_threshold_ms: 500,
                ..DatabaseConfig::default()
            },
            security: SecurityConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                shutdown_timeout_secs: 60,
                ..ServerConfig::default()
            },
            database: DatabaseConfig {
                max_connections: 50,
                ..DatabaseConfig::default()
            },
            security: SecurityConfig {
                jwt_expiry_hours: 4,
                ..SecurityConfig::default()
            },
        }
    }
}

fn override_string(key: &str, slot: &mut String) {
    if let Ok(v) = env::var(key) {
        *slot = v;
    }
}

fn override_parsed<T: FromStr>(key: &str, slot: &mut T) {
    if let Ok(v) = env::var(key) {
        if let Ok(parsed) = v.trim().parse() {
            *slot = parsed;
        }
    }
}
