//! Configuration parsing and validation for medrelay.
//!
//! Configuration comes either from a TOML file whose string values may carry
//! `${VAR}` references, or straight from `WATSON_*` environment variables.
//! Both paths produce the same immutable [`Config`], loaded once at startup.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Model used for chat completion when none is configured.
pub const DEFAULT_MODEL_ID: &str = "meta-llama/llama-3-3-70b-instruct";

/// IBM Cloud IAM token endpoint.
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com/identity/token";

pub const ENV_API_KEY: &str = "WATSON_API_KEY";
pub const ENV_URL: &str = "WATSON_URL";
pub const ENV_DEPLOYMENT_ID: &str = "WATSON_DEPLOYMENT_ID";
pub const ENV_PROJECT_ID: &str = "WATSON_PROJECT_ID";
pub const ENV_MODEL_ID: &str = "WATSON_MODEL_ID";
pub const ENV_LISTEN: &str = "MEDRELAY_LISTEN";

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub watson: WatsonConfig,
    pub prediction: PredictionConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:5000")
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "0.0.0.0:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value. Every call site is auditable via `grep expose_secret`.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> serde::Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiKey(SecretString::from(s)))
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// watsonx.ai connection settings.
#[derive(Debug, Clone)]
pub struct WatsonConfig {
    /// IBM Cloud API key exchanged for bearer tokens
    pub api_key: ApiKey,
    /// Base URL of the watsonx.ai instance (e.g., "https://us-south.ml.cloud.ibm.com")
    pub url: String,
    /// Deployment serving the structured prediction model
    pub deployment_id: Option<String>,
    /// Project the chat model runs under
    pub project_id: Option<String>,
    /// Chat foundation model identifier
    pub model_id: String,
    /// IAM token endpoint
    pub iam_url: String,
    /// Total timeout for each outbound call, in seconds
    pub timeout_secs: u64,
    /// Connect timeout for each outbound call, in seconds
    pub connect_timeout_secs: u64,
    /// Reuse bearer tokens until shortly before they expire
    pub cache_token: bool,
}

impl WatsonConfig {
    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_iam_url() -> String {
    DEFAULT_IAM_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Structured prediction payload settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionConfig {
    /// Field names sent alongside the feature vector
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
}

fn default_fields() -> Vec<String> {
    vec!["feature1".to_string(), "feature2".to_string()]
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            fields: default_fields(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable '{var}' not set for field '{field}': {message}")]
    EnvVar {
        var: String,
        field: String,
        message: String,
    },

    #[error("Required environment variable '{0}' is not set")]
    MissingEnv(&'static str),
}

/// Raw watson section deserialized directly from TOML.
/// String values may contain `${VAR}` references not yet expanded.
#[derive(Deserialize)]
pub struct RawWatsonConfig {
    api_key: String,
    url: String,
    deployment_id: Option<String>,
    project_id: Option<String>,
    #[serde(default = "default_model_id")]
    model_id: String,
    #[serde(default = "default_iam_url")]
    iam_url: String,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    connect_timeout_secs: u64,
    #[serde(default)]
    cache_token: bool,
}

/// Raw configuration deserialized directly from TOML.
#[derive(Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    server: ServerConfig,
    watson: RawWatsonConfig,
    #[serde(default)]
    prediction: PredictionConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// Supports multiple `${VAR}` in one string (e.g., `${SCHEME}://${HOST}`).
/// Fails on first missing variable, unclosed `${`, or empty variable name.
fn expand_env_vars_with<F>(input: &str, field: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            field: field.to_string(),
            message: format!("Unclosed '${{' in config value: {}", input),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                field: field.to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVar {
            var: var_name.to_string(),
            field: field.to_string(),
            message: format!(
                "Environment variable '{}' is not set (referenced in '{}')",
                var_name, field
            ),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from a TOML file, expanding `${VAR}` from the environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Parse configuration from a TOML string, expanding `${VAR}` from the environment.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse_str_with(content, |name| std::env::var(name).ok())
    }

    /// Parse configuration from a TOML string with a custom variable lookup.
    pub fn parse_str_with<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        let config = Self::from_raw(raw, &lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Convert raw (deserialized) config to final config with env var expansion.
    fn from_raw<F>(raw: RawConfig, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let w = raw.watson;
        let expand_opt = |value: Option<String>, field: &str| -> Result<Option<String>, ConfigError> {
            value
                .map(|v| expand_env_vars_with(&v, field, lookup))
                .transpose()
                .map(non_empty)
        };

        let watson = WatsonConfig {
            api_key: ApiKey::from(expand_env_vars_with(&w.api_key, "watson.api_key", lookup)?),
            url: expand_env_vars_with(&w.url, "watson.url", lookup)?,
            deployment_id: expand_opt(w.deployment_id, "watson.deployment_id")?,
            project_id: expand_opt(w.project_id, "watson.project_id")?,
            model_id: expand_env_vars_with(&w.model_id, "watson.model_id", lookup)?,
            iam_url: expand_env_vars_with(&w.iam_url, "watson.iam_url", lookup)?,
            timeout_secs: w.timeout_secs,
            connect_timeout_secs: w.connect_timeout_secs,
            cache_token: w.cache_token,
        };

        Ok(Config {
            server: ServerConfig {
                listen: expand_env_vars_with(&raw.server.listen, "server.listen", lookup)?,
            },
            watson,
            prediction: raw.prediction,
            logging: raw.logging,
        })
    }

    /// Load configuration from `WATSON_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Load configuration from environment-style variables using a custom lookup.
    ///
    /// `WATSON_API_KEY` and `WATSON_URL` are required; blank values count as unset.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| non_empty(lookup(name));

        let api_key = var(ENV_API_KEY).ok_or(ConfigError::MissingEnv(ENV_API_KEY))?;
        let url = var(ENV_URL).ok_or(ConfigError::MissingEnv(ENV_URL))?;

        let config = Config {
            server: ServerConfig {
                listen: var(ENV_LISTEN).unwrap_or_else(default_listen),
            },
            watson: WatsonConfig {
                api_key: ApiKey::from(api_key),
                url,
                deployment_id: var(ENV_DEPLOYMENT_ID),
                project_id: var(ENV_PROJECT_ID),
                model_id: var(ENV_MODEL_ID).unwrap_or_else(default_model_id),
                iam_url: default_iam_url(),
                timeout_secs: default_timeout_secs(),
                connect_timeout_secs: default_connect_timeout_secs(),
                cache_token: false,
            },
            prediction: PredictionConfig::default(),
            logging: LoggingConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.watson.api_key.is_empty() {
            return Err(ConfigError::Validation(
                "watson.api_key is empty".to_string(),
            ));
        }

        for (field, value) in [("watson.url", &self.watson.url), ("watson.iam_url", &self.watson.iam_url)] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "{} must be an http(s) URL, got '{}'",
                    field, value
                )));
            }
        }

        if self.prediction.fields.is_empty() {
            return Err(ConfigError::Validation(
                "prediction.fields must name at least one field".to_string(),
            ));
        }

        if self.watson.deployment_id.is_none() {
            tracing::warn!("No deployment id configured - /predict will reject all requests");
        }
        if self.watson.project_id.is_none() {
            tracing::warn!("No project id configured - chat requests are sent without one");
        }

        Ok(())
    }
}
