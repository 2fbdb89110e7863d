use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::core::{CacheTtls, EngineOptions, RetryPolicy};
use crate::models::CompatibilityWeights;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub predictor: PredictorSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictorSettings {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

fn default_timeout_secs() -> u64 { 5 }
fn default_max_attempts() -> u32 { 3 }
fn default_backoff_base_ms() -> u64 { 200 }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    #[serde(default = "default_compatibility_ttl")]
    pub compatibility_ttl_secs: u64,
    #[serde(default = "default_meeting_ttl")]
    pub meeting_ttl_secs: u64,
    #[serde(default = "default_deal_ttl")]
    pub deal_ttl_secs: u64,
    #[serde(default = "default_market_ttl")]
    pub market_ttl_secs: u64,
    #[serde(default = "default_fallback_ttl")]
    pub fallback_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            compatibility_ttl_secs: default_compatibility_ttl(),
            meeting_ttl_secs: default_meeting_ttl(),
            deal_ttl_secs: default_deal_ttl(),
            market_ttl_secs: default_market_ttl(),
            fallback_ttl_secs: default_fallback_ttl(),
        }
    }
}

fn default_max_capacity() -> u64 { 10_000 }
fn default_compatibility_ttl() -> u64 { 600 }
fn default_meeting_ttl() -> u64 { 300 }
fn default_deal_ttl() -> u64 { 300 }
fn default_market_ttl() -> u64 { 120 }
fn default_fallback_ttl() -> u64 { 30 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

/// Weights of the local compatibility heuristic
#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_industry_weight")]
    pub industry: f64,
    #[serde(default = "default_title_weight")]
    pub title: f64,
    #[serde(default = "default_network_weight")]
    pub network: f64,
    #[serde(default = "default_personality_weight")]
    pub personality: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            industry: default_industry_weight(),
            title: default_title_weight(),
            network: default_network_weight(),
            personality: default_personality_weight(),
        }
    }
}

fn default_industry_weight() -> f64 { 0.30 }
fn default_title_weight() -> f64 { 0.25 }
fn default_network_weight() -> f64 { 0.20 }
fn default_personality_weight() -> f64 { 0.25 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingSettings {
    /// Apply `LOG_LEVEL` / `LOG_FORMAT` style overrides
    pub fn with_overrides(mut self, level: Option<String>, format: Option<String>) -> Self {
        if let Some(level) = level.filter(|l| !l.trim().is_empty()) {
            self.level = level;
        }
        if let Some(format) = format.filter(|f| !f.trim().is_empty()) {
            self.format = format;
        }
        self
    }

    pub fn is_pretty(&self) -> bool {
        self.format.eq_ignore_ascii_case("pretty")
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with DIGBIZ)
    /// 5. AI_ENGINE_URL, if set, for the predictor base URL
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., DIGBIZ__PREDICTOR__BASE_URL -> predictor.base_url
            .add_source(
                Environment::with_prefix("DIGBIZ")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(url) = std::env::var("AI_ENGINE_URL") {
            builder = builder.set_override("predictor.base_url", url)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Engine tunables derived from this configuration
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            retry: RetryPolicy {
                max_attempts: self.predictor.max_attempts.max(1),
                base_delay: Duration::from_millis(self.predictor.backoff_base_ms),
                attempt_timeout: Duration::from_secs(self.predictor.timeout_secs),
            },
            ttls: CacheTtls {
                compatibility: Duration::from_secs(self.cache.compatibility_ttl_secs),
                meeting: Duration::from_secs(self.cache.meeting_ttl_secs),
                deal: Duration::from_secs(self.cache.deal_ttl_secs),
                market: Duration::from_secs(self.cache.market_ttl_secs),
                fallback: Duration::from_secs(self.cache.fallback_ttl_secs),
            },
            cache_capacity: self.cache.max_capacity,
            weights: CompatibilityWeights {
                industry: self.scoring.weights.industry,
                title: self.scoring.weights.title,
                network: self.scoring.weights.network,
                personality: self.scoring.weights.personality,
            },
        }
    }
}
