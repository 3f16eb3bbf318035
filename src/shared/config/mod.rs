//! Application configuration module
//!
//! Settings are assembled in three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file (`config/settings.toml`)
//! 3. Environment variables (after `.env` has been loaded by the binary)
//!
//! The values the server cannot run without (`SECRET`, `COOKIE_KEY`,
//! `APP_ENV`, `SERVER_URL`, `DEFAULT_ROLE`) have no default; `build` fails
//! when any of them is missing.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default location of the settings file, relative to the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "config/settings.toml";

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    /// Development mode accepts `Authorization: Bearer` tokens besides the cookie
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(ConfigError::InvalidValue {
                key: "APP_ENV",
                value: other.to_string(),
            }),
        }
    }
}

/// Request rate limiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub enabled: bool,
    /// Requests allowed per window
    pub requests: u32,
    /// Window length in seconds
    pub period_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: 100,
            period_secs: 60,
        }
    }
}

/// SMTP relay used by the mailer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Display name used in the `From` header
    pub email_name: String,
    /// Address used in the `From` header
    pub email_from: String,
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: u16,
    /// Allowed CORS origin for HTTP and socket clients
    pub origin: String,
    pub database_url: String,
    /// JWT signing secret
    pub secret: String,
    pub cookie_key: String,
    pub environment: Environment,
    pub server_url: String,
    /// Role assigned to users created through signup
    pub default_role: String,
    /// Root for `search/`, `cache/`, `images/` and `uploads/`
    pub data_dir: PathBuf,
    /// Static client directory served as fallback
    pub client_dir: PathBuf,
    /// Maximum request body size in bytes
    pub body_limit: usize,
    pub rate_limit: RateLimitSettings,
    pub smtp: Option<SmtpSettings>,
}

impl Settings {
    /// Create a new SettingsBuilder
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Defaults, then `config/settings.toml` when present, then the environment
    pub fn load() -> Result<Settings, ConfigError> {
        let mut builder = Settings::builder();
        if Path::new(DEFAULT_SETTINGS_FILE).exists() {
            builder = builder.file(DEFAULT_SETTINGS_FILE)?;
        }
        builder.env()?.build()
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.enabled && (self.rate_limit.requests == 0 || self.rate_limit.period_secs == 0) {
            return Err(ConfigError::InvalidValue {
                key: "RATE_LIMIT",
                value: format!("{}/{}s", self.rate_limit.requests, self.rate_limit.period_secs),
            });
        }
        if self.body_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "BODY_LIMIT",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn search_dir(&self) -> PathBuf {
        self.data_dir.join("search")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

/// Shape of the TOML settings file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    port: Option<u16>,
    origin: Option<String>,
    database_url: Option<String>,
    secret: Option<String>,
    cookie_key: Option<String>,
    environment: Option<Environment>,
    server_url: Option<String>,
    default_role: Option<String>,
    data_dir: Option<PathBuf>,
    client_dir: Option<PathBuf>,
    body_limit: Option<usize>,
    rate_limit: Option<RateLimitSettings>,
    smtp: Option<SmtpSettings>,
}

/// Builder for Settings
#[derive(Debug, Default, Clone)]
pub struct SettingsBuilder {
    port: Option<u16>,
    origin: Option<String>,
    database_url: Option<String>,
    secret: Option<String>,
    cookie_key: Option<String>,
    environment: Option<Environment>,
    server_url: Option<String>,
    default_role: Option<String>,
    data_dir: Option<PathBuf>,
    client_dir: Option<PathBuf>,
    body_limit: Option<usize>,
    rate_limit: Option<RateLimitSettings>,
    smtp: Option<SmtpSettings>,
}

impl SettingsBuilder {
    /// Merge values from a TOML file
    pub fn file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.toml(&raw).map_err(|e| match e {
            ConfigError::File { message, .. } => ConfigError::File {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Merge values from TOML source text
    pub fn toml(mut self, raw: &str) -> Result<Self, ConfigError> {
        let file: SettingsFile = toml::from_str(raw).map_err(|e| ConfigError::File {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;

        self.port = file.port.or(self.port);
        self.origin = file.origin.or(self.origin);
        self.database_url = file.database_url.or(self.database_url);
        self.secret = file.secret.or(self.secret);
        self.cookie_key = file.cookie_key.or(self.cookie_key);
        self.environment = file.environment.or(self.environment);
        self.server_url = file.server_url.or(self.server_url);
        self.default_role = file.default_role.or(self.default_role);
        self.data_dir = file.data_dir.or(self.data_dir);
        self.client_dir = file.client_dir.or(self.client_dir);
        self.body_limit = file.body_limit.or(self.body_limit);
        self.rate_limit = file.rate_limit.or(self.rate_limit);
        self.smtp = file.smtp.or(self.smtp);
        Ok(self)
    }

    /// Merge values from the process environment
    pub fn env(self) -> Result<Self, ConfigError> {
        self.env_from(|key| std::env::var(key).ok())
    }

    /// Merge values from an arbitrary key lookup
    pub fn env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = Some(parse_value("PORT", &port)?);
        }
        if let Some(origin) = lookup("ORIGIN") {
            self.origin = Some(origin);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(secret) = lookup("SECRET") {
            self.secret = Some(secret);
        }
        if let Some(key) = lookup("COOKIE_KEY") {
            self.cookie_key = Some(key);
        }
        if let Some(env) = lookup("APP_ENV") {
            self.environment = Some(env.parse()?);
        }
        if let Some(url) = lookup("SERVER_URL") {
            self.server_url = Some(url);
        }
        if let Some(role) = lookup("DEFAULT_ROLE") {
            self.default_role = Some(role);
        }
        if let Some(dir) = lookup("DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup("CLIENT_DIR") {
            self.client_dir = Some(PathBuf::from(dir));
        }
        if let Some(limit) = lookup("BODY_LIMIT") {
            self.body_limit = Some(parse_value("BODY_LIMIT", &limit)?);
        }

        let mut rate_limit = self.rate_limit.clone().unwrap_or_default();
        let mut rate_limit_touched = false;
        if let Some(enabled) = lookup("RATE_LIMIT_ENABLED") {
            rate_limit.enabled = parse_value("RATE_LIMIT_ENABLED", &enabled)?;
            rate_limit_touched = true;
        }
        if let Some(requests) = lookup("RATE_LIMIT_REQUESTS") {
            rate_limit.requests = parse_value("RATE_LIMIT_REQUESTS", &requests)?;
            rate_limit_touched = true;
        }
        if let Some(period) = lookup("RATE_LIMIT_PERIOD_SECS") {
            rate_limit.period_secs = parse_value("RATE_LIMIT_PERIOD_SECS", &period)?;
            rate_limit_touched = true;
        }
        if rate_limit_touched {
            self.rate_limit = Some(rate_limit);
        }

        if let Some(host) = lookup("SMTP_HOST") {
            let port = match lookup("SMTP_PORT") {
                Some(port) => parse_value("SMTP_PORT", &port)?,
                None => 587,
            };
            self.smtp = Some(SmtpSettings {
                host,
                port,
                user: lookup("SMTP_USER").unwrap_or_default(),
                password: lookup("SMTP_PASSWORD").unwrap_or_default(),
                email_name: lookup("EMAIL_NAME").unwrap_or_else(|| "CoreDevs".to_string()),
                email_from: lookup("EMAIL_FROM").ok_or(ConfigError::MissingValue("EMAIL_FROM"))?,
            });
        }
        Ok(self)
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn cookie_key(mut self, key: impl Into<String>) -> Self {
        self.cookie_key = Some(key.into());
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = Some(role.into());
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn client_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.client_dir = Some(dir.into());
        self
    }

    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = Some(limit);
        self
    }

    pub fn rate_limit(mut self, rate_limit: RateLimitSettings) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    pub fn smtp(mut self, smtp: SmtpSettings) -> Self {
        self.smtp = Some(smtp);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<Settings, ConfigError> {
        let settings = Settings {
            port: self.port.unwrap_or(3000),
            origin: self.origin.unwrap_or_else(|| "http://localhost:3000".to_string()),
            database_url: self
                .database_url
                .unwrap_or_else(|| "sqlite://coredevs.db?mode=rwc".to_string()),
            secret: self.secret.ok_or(ConfigError::MissingValue("SECRET"))?,
            cookie_key: self.cookie_key.ok_or(ConfigError::MissingValue("COOKIE_KEY"))?,
            environment: self.environment.ok_or(ConfigError::MissingValue("APP_ENV"))?,
            server_url: self.server_url.ok_or(ConfigError::MissingValue("SERVER_URL"))?,
            default_role: self.default_role.ok_or(ConfigError::MissingValue("DEFAULT_ROLE"))?,
            data_dir: self.data_dir.unwrap_or_else(|| PathBuf::from(".")),
            client_dir: self
                .client_dir
                .unwrap_or_else(|| PathBuf::from("..").join("client")),
            body_limit: self.body_limit.unwrap_or(10 * 1024 * 1024),
            rate_limit: self.rate_limit.unwrap_or_default(),
            smtp: self.smtp,
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{0} not found in environment variables.")]
    MissingValue(&'static str),
    #[error("failed to read settings file {path}: {message}")]
    File { path: String, message: String },
}
