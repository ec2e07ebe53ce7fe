use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub source: SourceConfig,
    pub trend: TrendConfig,
    #[serde(default)]
    pub exploration: ExplorationConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Baseline for the volume-trend gate. The historical counts come from
/// whatever store the operator maintains; this crate only reads them.
#[derive(Debug, Deserialize, Clone)]
pub struct TrendConfig {
    #[serde(default)]
    pub historical_counts: Vec<u64>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExplorationConfig {
    #[serde(default = "default_categorical_fields")]
    pub categorical_fields: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    #[serde(default = "default_continue_message")]
    pub continue_message: String,
    #[serde(default = "default_halt_message")]
    pub halt_message: String,
    /// Also print each notice on stdout.
    #[serde(default)]
    pub echo: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            categorical_fields: default_categorical_fields(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            continue_message: default_continue_message(),
            halt_message: default_halt_message(),
            echo: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_tolerance() -> f64 {
    0.80
}

fn default_categorical_fields() -> Vec<String> {
    vec!["meal_type".to_string(), "city".to_string()]
}

fn default_output_directory() -> String {
    "output".to_string()
}

fn default_continue_message() -> String {
    "Record count is in line with the trend. Processing can continue.".to_string()
}

fn default_halt_message() -> String {
    "Warning: drop in data volume detected. The pipeline was halted.".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Header names only, header values may carry credentials.
fn header_names<'a, V: 'a>(headers: impl IntoIterator<Item = (&'a String, &'a V)>) -> Vec<&'a str> {
    let mut names: Vec<&str> = headers.into_iter().map(|(name, _)| name.as_str()).collect();
    names.sort_unstable();
    names
}

impl Settings {
    /// Loads settings from a TOML file, then lets `APP_`-prefixed
    /// environment variables override it (`APP_TREND__TOLERANCE=0.7`).
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        Self::from_config(builder.build()?)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?;

        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        if let Ok(headers) = config.get_table("source.headers") {
            debug!(names = ?header_names(&headers), "Loaded source headers from configuration");
        }

        let settings: Settings = config.try_deserialize()?;

        debug!(
            url = %settings.source.url,
            baseline = ?settings.trend.historical_counts,
            tolerance = settings.trend.tolerance,
            "Parsed pipeline settings"
        );

        Ok(settings)
    }
}
