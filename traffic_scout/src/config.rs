use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use traffic_core::TrafficWeightPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub directory: DirectoryConfig,
    pub geocoder: GeocoderConfig,
    pub router: RouterConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub weight: TrafficWeightPolicy,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DirectoryConfig {
    pub url: String,
    #[serde(default = "default_directory_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_directory_timeout_secs() -> u64 {
    20
}

impl DirectoryConfig {
    pub fn get_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocoderConfig {
    pub url: String,
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RouterConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub model_dir: PathBuf,
    pub onnx_file: String,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
    #[serde(default = "default_min_probability")]
    pub min_probability: f32,
    #[serde(default = "default_vehicle_classes")]
    pub vehicle_classes: Vec<u32>,
}

fn default_model_instances() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
}

fn default_min_probability() -> f32 {
    0.25
}

/// COCO ids for car, bus and truck.
fn default_vehicle_classes() -> Vec<u32> {
    vec![2, 5, 7]
}

impl ModelConfig {
    pub fn get_path(&self) -> PathBuf {
        self.model_dir.join(&self.onnx_file)
    }
}

impl Validatable for ModelConfig {
    fn validate(&self) -> Result<(), String> {
        if !self.get_path().exists() {
            return Err(format!("Model file not found: {:?}", self.get_path()));
        }
        if self.num_instances == 0 {
            return Err("model.num_instances must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_probability) {
            return Err(format!(
                "model.min_probability must be within [0, 1], got {}",
                self.min_probability
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
    #[serde(default = "default_min_radius_km")]
    pub min_radius_km: f64,
    #[serde(default = "default_max_radius_km")]
    pub max_radius_km: f64,
    #[serde(default = "default_image_timeout_secs")]
    pub image_timeout_secs: u64,
    /// Stills below this size are the directory's "camera offline" placeholder.
    #[serde(default = "default_min_image_bytes")]
    pub min_image_bytes: usize,
}

fn default_radius_km() -> f64 {
    20.0
}

fn default_min_radius_km() -> f64 {
    5.0
}

fn default_max_radius_km() -> f64 {
    50.0
}

fn default_image_timeout_secs() -> u64 {
    5
}

fn default_min_image_bytes() -> usize {
    10_000
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_radius_km: default_radius_km(),
            min_radius_km: default_min_radius_km(),
            max_radius_km: default_max_radius_km(),
            image_timeout_secs: default_image_timeout_secs(),
            min_image_bytes: default_min_image_bytes(),
        }
    }
}

impl ScanConfig {
    pub fn get_image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }

    /// Keeps a requested radius inside the configured range; a missing or
    /// non-finite value falls back to the default.
    pub fn clamp_radius(&self, requested: Option<f64>) -> f64 {
        match requested {
            Some(radius) if radius.is_finite() => {
                radius.clamp(self.min_radius_km, self.max_radius_km)
            }
            _ => self.default_radius_km,
        }
    }
}

impl Validatable for ScanConfig {
    fn validate(&self) -> Result<(), String> {
        if self.min_radius_km < 0.0 || self.min_radius_km > self.max_radius_km {
            return Err(format!(
                "scan radius range [{}, {}] is invalid",
                self.min_radius_km, self.max_radius_km
            ));
        }
        if !(self.min_radius_km..=self.max_radius_km).contains(&self.default_radius_km) {
            return Err(format!(
                "scan.default_radius_km {} is outside [{}, {}]",
                self.default_radius_km, self.min_radius_km, self.max_radius_km
            ));
        }
        Ok(())
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

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no working directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

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
            config::Environment::with_prefix("SCOUT")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;

    let checks = [
        config.model.validate(),
        config.scan.validate(),
        config.weight.validate(),
    ];
    for check in checks {
        if let Err(e) = check {
            tracing::error!("Configuration validation failed: {}", e);
            return Err(config::ConfigError::Message(e));
        }
    }

    Ok(config)
}
