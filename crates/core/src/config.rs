use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::DEFAULT_TTL_SECS;
use crate::ranking::weights::{RankingWeights, WeightOverrides};
use crate::ranking::{DEFAULT_LIMIT, DEFAULT_MIN_CONFIDENCE, DEFAULT_MIN_SCORE};

/// How many active restaurants one discovery request pulls at most.
pub const DEFAULT_MAX_RESTAURANTS: u32 = 30;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub ranking: RankingConfig,
    pub assist: AssistConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Tunable scoring parameters. These are deployment configuration, never
/// request parameters.
#[derive(Clone, Debug)]
pub struct RankingConfig {
    pub weights: RankingWeights,
    pub min_confidence: f64,
    pub min_score: f64,
    pub default_limit: usize,
    pub max_restaurants: u32,
    pub cache_ttl_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AssistConfig {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub assist_enabled: Option<bool>,
    pub assist_base_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://plateful.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            ranking: RankingConfig {
                weights: RankingWeights::default(),
                min_confidence: DEFAULT_MIN_CONFIDENCE,
                min_score: DEFAULT_MIN_SCORE,
                default_limit: DEFAULT_LIMIT,
                max_restaurants: DEFAULT_MAX_RESTAURANTS,
                cache_ttl_secs: DEFAULT_TTL_SECS,
            },
            assist: AssistConfig {
                enabled: false,
                base_url: None,
                api_key: None,
                timeout_secs: 8,
                max_retries: 1,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

// ---------------------------------------------------------------------------
// File patch (TOML) shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    ranking: Option<RankingPatch>,
    assist: Option<AssistPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RankingPatch {
    weight_intent_relevance: Option<f64>,
    weight_distance: Option<f64>,
    weight_value: Option<f64>,
    weight_eta: Option<f64>,
    weight_rating: Option<f64>,
    weight_promo_strength: Option<f64>,
    min_confidence: Option<f64>,
    min_score: Option<f64>,
    default_limit: Option<usize>,
    max_restaurants: Option<u32>,
    cache_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AssistPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("plateful.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(ranking) = patch.ranking {
            // Weight overrides share the env-override rule: a candidate is
            // accepted per factor only when it is a finite number.
            self.ranking.weights = RankingWeights::resolve(&WeightOverrides {
                intent_relevance: ranking.weight_intent_relevance,
                distance: ranking.weight_distance,
                value: ranking.weight_value,
                eta: ranking.weight_eta,
                rating: ranking.weight_rating,
                promo_strength: ranking.weight_promo_strength,
            });
            if let Some(min_confidence) = ranking.min_confidence.filter(|v| v.is_finite()) {
                self.ranking.min_confidence = min_confidence;
            }
            if let Some(min_score) = ranking.min_score.filter(|v| v.is_finite()) {
                self.ranking.min_score = min_score;
            }
            if let Some(default_limit) = ranking.default_limit {
                self.ranking.default_limit = default_limit;
            }
            if let Some(max_restaurants) = ranking.max_restaurants {
                self.ranking.max_restaurants = max_restaurants;
            }
            if let Some(cache_ttl_secs) = ranking.cache_ttl_secs {
                self.ranking.cache_ttl_secs = cache_ttl_secs;
            }
        }

        if let Some(assist) = patch.assist {
            if let Some(enabled) = assist.enabled {
                self.assist.enabled = enabled;
            }
            if let Some(base_url) = assist.base_url {
                self.assist.base_url = Some(base_url);
            }
            if let Some(api_key) = assist.api_key {
                self.assist.api_key = Some(secret_value(api_key));
            }
            if let Some(timeout_secs) = assist.timeout_secs {
                self.assist.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = assist.max_retries {
                self.assist.max_retries = max_retries;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PLATEFUL_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("PLATEFUL_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("PLATEFUL_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("PLATEFUL_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("PLATEFUL_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PLATEFUL_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PLATEFUL_SERVER_PORT") {
            self.server.port = parse_u16("PLATEFUL_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("PLATEFUL_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("PLATEFUL_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        // Per-factor weight overrides: junk values fall back to the default
        // for that factor instead of failing startup.
        self.ranking.weights = RankingWeights::resolve(&WeightOverrides {
            intent_relevance: read_finite_env("PLATEFUL_RANKING_WEIGHT_INTENT_RELEVANCE")
                .or(Some(self.ranking.weights.intent_relevance)),
            distance: read_finite_env("PLATEFUL_RANKING_WEIGHT_DISTANCE")
                .or(Some(self.ranking.weights.distance)),
            value: read_finite_env("PLATEFUL_RANKING_WEIGHT_VALUE")
                .or(Some(self.ranking.weights.value)),
            eta: read_finite_env("PLATEFUL_RANKING_WEIGHT_ETA")
                .or(Some(self.ranking.weights.eta)),
            rating: read_finite_env("PLATEFUL_RANKING_WEIGHT_RATING")
                .or(Some(self.ranking.weights.rating)),
            promo_strength: read_finite_env("PLATEFUL_RANKING_WEIGHT_PROMO_STRENGTH")
                .or(Some(self.ranking.weights.promo_strength)),
        });
        if let Some(value) = read_finite_env("PLATEFUL_RANKING_MIN_CONFIDENCE") {
            self.ranking.min_confidence = value;
        }
        if let Some(value) = read_finite_env("PLATEFUL_RANKING_MIN_SCORE") {
            self.ranking.min_score = value;
        }
        if let Some(value) = read_env("PLATEFUL_RANKING_DEFAULT_LIMIT") {
            self.ranking.default_limit =
                parse_u32("PLATEFUL_RANKING_DEFAULT_LIMIT", &value)? as usize;
        }
        if let Some(value) = read_env("PLATEFUL_RANKING_MAX_RESTAURANTS") {
            self.ranking.max_restaurants = parse_u32("PLATEFUL_RANKING_MAX_RESTAURANTS", &value)?;
        }
        if let Some(value) = read_env("PLATEFUL_RANKING_CACHE_TTL_SECS") {
            self.ranking.cache_ttl_secs = parse_u64("PLATEFUL_RANKING_CACHE_TTL_SECS", &value)?;
        }

        if let Some(value) = read_env("PLATEFUL_ASSIST_ENABLED") {
            self.assist.enabled = parse_bool("PLATEFUL_ASSIST_ENABLED", &value)?;
        }
        if let Some(value) = read_env("PLATEFUL_ASSIST_BASE_URL") {
            self.assist.base_url = Some(value);
        }
        if let Some(value) = read_env("PLATEFUL_ASSIST_API_KEY") {
            self.assist.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("PLATEFUL_ASSIST_TIMEOUT_SECS") {
            self.assist.timeout_secs = parse_u64("PLATEFUL_ASSIST_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("PLATEFUL_ASSIST_MAX_RETRIES") {
            self.assist.max_retries = parse_u32("PLATEFUL_ASSIST_MAX_RETRIES", &value)?;
        }

        let log_level =
            read_env("PLATEFUL_LOGGING_LEVEL").or_else(|| read_env("PLATEFUL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PLATEFUL_LOGGING_FORMAT").or_else(|| read_env("PLATEFUL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.assist_enabled {
            self.assist.enabled = enabled;
        }
        if let Some(base_url) = overrides.assist_base_url {
            self.assist.base_url = Some(base_url);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_owned()));
        }
        if self.server.bind_address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.bind_address must not be empty".to_owned(),
            ));
        }
        if self.ranking.default_limit == 0 || self.ranking.default_limit > 100 {
            return Err(ConfigError::Validation(
                "ranking.default_limit must be between 1 and 100".to_owned(),
            ));
        }
        if self.ranking.max_restaurants == 0 || self.ranking.max_restaurants > 100 {
            return Err(ConfigError::Validation(
                "ranking.max_restaurants must be between 1 and 100".to_owned(),
            ));
        }
        if self.ranking.cache_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "ranking.cache_ttl_secs must be positive".to_owned(),
            ));
        }
        if !(0.0..=1.0).contains(&self.ranking.min_confidence) {
            return Err(ConfigError::Validation(
                "ranking.min_confidence must be within [0, 1]".to_owned(),
            ));
        }
        if self.ranking.min_score < 0.0 {
            return Err(ConfigError::Validation(
                "ranking.min_score must be non-negative".to_owned(),
            ));
        }
        if self.assist.enabled && self.assist.base_url.is_none() {
            return Err(ConfigError::Validation(
                "assist.base_url is required when assist.enabled is true".to_owned(),
            ));
        }
        Ok(())
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => {
            let default = PathBuf::from("plateful.toml");
            default.exists().then_some(default)
        }
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

/// Weight-style override: present and finite, or nothing.
fn read_finite_env(key: &str) -> Option<f64> {
    read_env(key).and_then(|v| v.parse::<f64>().ok()).filter(|v| v.is_finite())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_owned(),
            value: value.to_owned(),
        }),
    }
}
