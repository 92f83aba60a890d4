//! Runtime configuration from environment variables.
//!
//! Every knob has the same default the deployed service used, so an empty
//! environment yields a working production setup. Values are read once at
//! startup and never change for the process lifetime.

use thiserror::Error;

/// Default broker host.
const DEFAULT_MQTT_BROKER: &str = "dweb2025.nohost.me";
/// Default broker port.
const DEFAULT_MQTT_PORT: u16 = 1883;
/// Default Meshtastic root topic.
const DEFAULT_ROOT_TOPIC: &str = "msh/chootka";
/// Default bind host (localhost only; a reverse proxy fronts the service).
const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
/// Default bind port for the web gateway.
const DEFAULT_SERVER_PORT: u16 = 5001;
/// Default session secret.
const DEFAULT_SECRET_KEY: &str = "meshtastic-mqtt-secret-change-in-production";

/// Errors raised while reading the environment at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable was set but not parseable as a number
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Complete configuration for one bridge process
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// MQTT broker hostname or IP
    pub mqtt_broker: String,
    /// MQTT broker port
    pub mqtt_port: u16,
    /// Root topic; the connector subscribes to `{root_topic}/#`
    pub root_topic: String,
    /// Bind host for the web gateway
    pub server_host: String,
    /// Bind port for the web gateway
    pub server_port: u16,
    /// Session secret for the web layer
    pub secret_key: String,
}

impl BridgeConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through a lookup closure.
    ///
    /// Tests pass a closure over a map instead of mutating process-global
    /// environment state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            mqtt_broker: lookup("MQTT_BROKER").unwrap_or_else(|| DEFAULT_MQTT_BROKER.to_string()),
            mqtt_port: parse_port(&lookup, "MQTT_PORT", DEFAULT_MQTT_PORT)?,
            root_topic: lookup("MQTT_ROOT_TOPIC").unwrap_or_else(|| DEFAULT_ROOT_TOPIC.to_string()),
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            server_port: parse_port(&lookup, "SERVER_PORT", DEFAULT_SERVER_PORT)?,
            secret_key: lookup("SECRET_KEY").unwrap_or_else(|| DEFAULT_SECRET_KEY.to_string()),
        })
    }

    /// The wildcard subscription covering all device subtopics
    pub fn subscribe_topic(&self) -> String {
        format!("{}/#", self.root_topic)
    }
}

fn parse_port<F>(lookup: &F, name: &str, default: u16) -> Result<u16, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_with_empty_environment() {
        let config = BridgeConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.mqtt_broker, "dweb2025.nohost.me");
        assert_eq!(config.mqtt_port, 1883);
        assert_eq!(config.root_topic, "msh/chootka");
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.server_port, 5001);
        assert_eq!(
            config.secret_key,
            "meshtastic-mqtt-secret-change-in-production"
        );
    }

    #[test]
    fn environment_overrides_defaults() {
        let lookup = lookup_from(&[
            ("MQTT_BROKER", "broker.local"),
            ("MQTT_PORT", "8883"),
            ("MQTT_ROOT_TOPIC", "msh/test"),
            ("SERVER_PORT", "8080"),
        ]);
        let config = BridgeConfig::from_lookup(lookup).unwrap();
        assert_eq!(config.mqtt_broker, "broker.local");
        assert_eq!(config.mqtt_port, 8883);
        assert_eq!(config.root_topic, "msh/test");
        assert_eq!(config.server_port, 8080);
        // Untouched vars keep their defaults
        assert_eq!(config.server_host, "127.0.0.1");
    }

    #[test]
    fn invalid_port_is_an_error() {
        let lookup = lookup_from(&[("MQTT_PORT", "not-a-port")]);
        let err = BridgeConfig::from_lookup(lookup).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn subscribe_topic_appends_wildcard() {
        let config = BridgeConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.subscribe_topic(), "msh/chootka/#");
    }
}
