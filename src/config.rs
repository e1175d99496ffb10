use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    pub gate: Option<GateConfig>,
    #[serde(default)]
    pub trader: TraderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GateConfig {
    // Support JSON keys: apiKey, apiSecret (config lowercases keys from files)
    #[serde(alias = "apiKey", alias = "apikey")]
    pub api_key: Option<String>,

    #[serde(alias = "apiSecret", alias = "apisecret")]
    pub secret_key: Option<String>,

    #[serde(default)]
    pub testnet: bool,

    #[serde(alias = "baseUrl", alias = "baseurl")]
    pub base_url: Option<String>,

    #[serde(default = "default_settle")]
    pub settle: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            secret_key: None,
            testnet: false,
            base_url: None,
            settle: default_settle(),
        }
    }
}

fn default_settle() -> String {
    "usdt".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct TraderConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_leverage_cooldown_secs")]
    pub leverage_cooldown_secs: u64,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            leverage_cooldown_secs: default_leverage_cooldown_secs(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    15
}

fn default_leverage_cooldown_secs() -> u64 {
    5
}

impl TraderConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn leverage_cooldown(&self) -> Duration {
        Duration::from_secs(self.leverage_cooldown_secs)
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let home = env::var("HOME").unwrap_or_else(|_| ".".into());

        let s = Config::builder()
            // 1. Global config from ~/.gate-trader/config.{toml,json}
            .add_source(File::with_name(&format!("{}/.gate-trader/config", home)).required(false))
            // 2. Project config
            .add_source(File::with_name("config/config").required(false))
            // 3. Local overrides (not checked in)
            .add_source(File::with_name("config/local").required(false))
            // 4. Environment, e.g. GATE_TRADER_GATE__API_KEY
            .add_source(Environment::with_prefix("GATE_TRADER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
