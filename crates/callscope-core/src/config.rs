use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Delivery constants — every upstream call carries a bounded timeout
pub const DEFAULT_PORT: u16 = 8737;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PUSH_TIMEOUT_MS: u64 = 5_000; // per-connection push budget
pub const DEFAULT_TRIGGER_TIMEOUT_MS: u64 = 10_000; // upstream side-effect budget
pub const EVENT_BUS_CAPACITY: usize = 256; // ingress -> dispatch queue depth
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64; // per-viewer buffered payloads

/// Top-level config (callscope.toml + CALLSCOPE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallscopeConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub triggers: TriggerConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl Default for CallscopeConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            upstream: UpstreamConfig::default(),
            triggers: TriggerConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Identifiers for the upstream event channel. Opaque to the core — they are
/// logged at startup and passed through to operators, never interpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub channel: Option<String>,
    pub region: Option<String>,
}

/// Endpoints for the upstream action triggers (pipeline creation and
/// tone-analysis start). When either is absent the triggers are disabled and
/// status events pass through without side effects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub pipeline_endpoint: Option<String>,
    pub tone_endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_push_timeout_ms")]
    pub push_timeout_ms: u64,
    #[serde(default = "default_trigger_timeout_ms")]
    pub trigger_timeout_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            push_timeout_ms: DEFAULT_PUSH_TIMEOUT_MS,
            trigger_timeout_ms: DEFAULT_TRIGGER_TIMEOUT_MS,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_push_timeout_ms() -> u64 {
    DEFAULT_PUSH_TIMEOUT_MS
}
fn default_trigger_timeout_ms() -> u64 {
    DEFAULT_TRIGGER_TIMEOUT_MS
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.callscope/callscope.db", home)
}

impl CallscopeConfig {
    /// Load config from a TOML file with CALLSCOPE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.callscope/callscope.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: CallscopeConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CALLSCOPE_").split("_"))
            .extract()
            .map_err(|e| crate::error::CallscopeError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.callscope/callscope.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let config = CallscopeConfig::default();
        assert_eq!(config.gateway.port, DEFAULT_PORT);
        assert_eq!(config.gateway.bind, DEFAULT_BIND);
        assert_eq!(config.delivery.push_timeout_ms, DEFAULT_PUSH_TIMEOUT_MS);
        assert!(config.triggers.pipeline_endpoint.is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        // Every section carries serde defaults, so a nonexistent TOML file
        // extracts to the same values as CallscopeConfig::default().
        let config = CallscopeConfig::load(Some("/nonexistent/callscope.toml"))
            .expect("load with missing file should fall back to defaults");
        assert_eq!(config.gateway.port, DEFAULT_PORT);
        assert_eq!(config.database.path, default_db_path());
    }
}
