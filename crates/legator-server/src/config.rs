use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration for the Legator server, loaded from a TOML file
/// (default path `legator.toml`), falling back to these defaults when the
/// file is absent or a section is omitted.
#[derive(Debug, Default, Deserialize)]
pub struct LegatorConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_tick_secs")]
    pub tick_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_secs(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

fn default_tick_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "default_webhook_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_webhook_timeout_secs(),
            history_capacity: default_history_capacity(),
        }
    }
}

impl NotifierConfig {
    #[must_use]
    pub fn into_notify_config(self) -> legator_notifier::NotifyConfig {
        legator_notifier::NotifyConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            history_capacity: self.history_capacity,
        }
    }
}

fn default_webhook_timeout_secs() -> u64 {
    5
}

fn default_history_capacity() -> usize {
    100
}

#[derive(Debug, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_tracker_ttl_secs(),
        }
    }
}

impl TrackerConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

fn default_tracker_ttl_secs() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_falls_back_to_defaults() {
        let cfg: LegatorConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.engine.tick_interval_secs, 30);
        assert_eq!(cfg.notifier.history_capacity, 100);
        assert_eq!(cfg.tracker.ttl_secs, 120);
    }

    #[test]
    fn partial_toml_overrides_only_given_fields() {
        let cfg: LegatorConfig = toml::from_str(
            r#"
            [server]
            port = 9090
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.engine.tick_interval_secs, 30);
    }
}
