use serde::Deserialize;
use std::{path::Path, time::Duration};
use crate::error::BotError;
use traffic_core::BoundingBox;

pub const TOKEN_ENV_VAR: &str = "TELEGRAM_TOKEN";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub telegram: TelegramConfig,
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub region: BoundingBox,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: Option<String>,
    pub api_base_url: String,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// The token must never end up in logs.
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    45
}

impl TelegramConfig {
    pub fn get_token(&self) -> &str {
        self.token.as_deref().unwrap_or_default()
    }

    /// The request timeout has to outlive the server-side long-poll.
    pub fn get_request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(self.poll_timeout_secs + 5))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DirectoryConfig {
    pub url: String,
    #[serde(default = "default_directory_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_image_timeout_secs")]
    pub image_timeout_secs: u64,
}

fn default_directory_timeout_secs() -> u64 {
    20
}

fn default_image_timeout_secs() -> u64 {
    10
}

impl DirectoryConfig {
    pub fn get_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn get_image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_max_entries() -> usize {
    25
}

fn default_ttl_secs() -> u64 {
    120
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl ListingConfig {
    pub fn get_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_idle_delay_ms() -> u64 {
    1000
}

fn default_retry_delay_secs() -> u64 {
    10
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            idle_delay_ms: default_idle_delay_ms(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl PollingConfig {
    pub fn get_idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    pub fn get_retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

/// Picks `TELEGRAM_TOKEN`, falling back to the configured token. Blank
/// values count as absent.
fn resolve_token(configured: Option<String>, from_env: Option<String>) -> Option<String> {
    from_env
        .into_iter()
        .chain(configured)
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
}

pub fn get_configuration() -> Result<Config, BotError> {
    // A missing .env file is fine, the variables may come from the process.
    let _ = dotenvy::dotenv();

    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no working directory: {}", e)))?;
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    load_configuration(&base_path.join("configuration"), &environment)
}

pub fn load_configuration(
    configuration_directory: &Path,
    environment: &Environment,
) -> Result<Config, BotError> {
    build_configuration(
        configuration_directory,
        environment,
        std::env::var(TOKEN_ENV_VAR).ok(),
    )
}

fn build_configuration(
    configuration_directory: &Path,
    environment: &Environment,
    env_token: Option<String>,
) -> Result<Config, BotError> {
    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(false),
        )
        .add_source(
            config::Environment::with_prefix("BOT")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let mut config: Config = config.try_deserialize::<Config>()?;

    config.telegram.token = resolve_token(config.telegram.token.take(), env_token);
    if config.telegram.token.is_none() {
        return Err(config::ConfigError::Message(format!(
            "{} is not set. Add it to the environment or to a .env file.",
            TOKEN_ENV_VAR
        ))
        .into());
    }

    Ok(config)
}
