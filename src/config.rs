//! Configuration for the relay and the polling client.
//!
//! Both halves read their settings from environment variables, falling back
//! to the defaults of a single-machine deployment. The CLI layers its flags
//! on top of these values.

use crate::sensor::{SensorMapper, SensorOverrides, DEFAULT_BUILDING_COUNT, DEFAULT_SENSOR_MAX};
use serde::Serialize;
use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

pub const DEFAULT_WS_HOST: &str = "0.0.0.0";
pub const DEFAULT_WS_PORT: u16 = 6060;
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 4000;
pub const DEFAULT_CORS_ORIGIN: &str = "*";
pub const DEFAULT_WS_URL: &str = "ws://localhost:6060";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:4000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Path of the building feed on the query endpoint.
pub const BUILDING_FEED_PATH: &str = "/api/building";

/// Relay (server side) configuration.
#[derive(Debug, Clone, Serialize)]
pub struct RelayConfig {
    /// Host the ingest WebSocket listener binds to
    pub ws_host: String,
    /// Ingest port (0 for random)
    pub ws_port: u16,
    /// Host the query HTTP listener binds to
    pub http_host: String,
    /// Query port (0 for random)
    pub http_port: u16,
    /// Cap for building identifiers (at least 1)
    pub building_count: i64,
    /// Highest accepted raw sensor code
    pub sensor_max: i64,
    /// Optional per-code building overrides
    pub sensor_overrides: SensorOverrides,
    /// Value of `Access-Control-Allow-Origin`
    pub cors_origin: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ws_host: DEFAULT_WS_HOST.to_string(),
            ws_port: DEFAULT_WS_PORT,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            building_count: DEFAULT_BUILDING_COUNT,
            sensor_max: DEFAULT_SENSOR_MAX,
            sensor_overrides: SensorOverrides::new(),
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = get("WS_HOST") {
            config.ws_host = host;
        }
        if let Some(port) = get("WS_PORT") {
            config.ws_port = parse_value("WS_PORT", &port)?;
        }
        if let Some(host) = get("HTTP_HOST") {
            config.http_host = host;
        }
        if let Some(port) = get("HTTP_PORT") {
            config.http_port = parse_value("HTTP_PORT", &port)?;
        }
        if let Some(count) = get("BUILDING_COUNT") {
            config.building_count = parse_value::<i64>("BUILDING_COUNT", &count)?;
        }
        if let Some(max) = get("SENSOR_MAX") {
            config.sensor_max = parse_value("SENSOR_MAX", &max)?;
        }
        if let Some(overrides) = get("SENSOR_OVERRIDES") {
            config.sensor_overrides =
                overrides
                    .parse()
                    .map_err(|reason| ConfigError::Invalid {
                        key: "SENSOR_OVERRIDES",
                        value: overrides.clone(),
                        reason,
                    })?;
        }
        if let Some(origin) = get("CORS_ORIGIN") {
            config.cors_origin = origin;
        }

        config.validate()
    }

    /// Normalize and check values that may come from flags or the environment.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.building_count = self.building_count.max(1);
        if self.sensor_max < 0 {
            return Err(ConfigError::Invalid {
                key: "SENSOR_MAX",
                value: self.sensor_max.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        if self.cors_origin.trim().is_empty() {
            self.cors_origin = DEFAULT_CORS_ORIGIN.to_string();
        }
        check_host("WS_HOST", &self.ws_host)?;
        check_host("HTTP_HOST", &self.http_host)?;
        Ok(self)
    }

    /// Build the sensor mapper described by this configuration.
    pub fn mapper(&self) -> SensorMapper {
        SensorMapper::new(self.sensor_max, self.building_count)
            .with_overrides(self.sensor_overrides.clone())
    }

    /// `host:port` of the ingest listener.
    pub fn ingest_bind(&self) -> String {
        bind_address(&self.ws_host, self.ws_port)
    }

    /// `host:port` of the query listener.
    pub fn query_bind(&self) -> String {
        bind_address(&self.http_host, self.http_port)
    }
}

/// Polling client configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ClientConfig {
    /// Ingest endpoint used by the sensor bridge
    pub ws_url: String,
    /// Base URL of the query endpoint, without trailing slash
    pub backend_url: String,
    /// Delay between poll cycles
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// The `VITE_` prefixed names used by the browser build take precedence.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("VITE_WS_URL").or_else(|| get("WS_URL")) {
            config.ws_url = url;
        }
        if let Some(url) = get("VITE_BACKEND_URL").or_else(|| get("BACKEND_URL")) {
            config.backend_url = url;
        }
        if let Some(ms) = get("POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(parse_value("POLL_INTERVAL_MS", &ms)?);
        }

        config.validate()
    }

    /// Normalize and check values that may come from flags or the environment.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.backend_url = self.backend_url.trim_end_matches('/').to_string();
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "POLL_INTERVAL_MS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(self)
    }

    /// Full URL of the building feed.
    pub fn feed_endpoint(&self) -> String {
        format!("{}{}", self.backend_url, BUILDING_FEED_PATH)
    }
}

/// Accept an IP literal (IPv6 optionally bracketed) or a DNS host name.
fn check_host(key: &'static str, host: &str) -> Result<(), ConfigError> {
    let literal = host.trim_start_matches('[').trim_end_matches(']');
    if literal.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    let is_label = |label: &str| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    if host.len() <= 253 && host.split('.').all(is_label) {
        return Ok(());
    }

    Err(ConfigError::Invalid {
        key,
        value: host.to_string(),
        reason: "not an IP address or host name".to_string(),
    })
}

fn bind_address(host: &str, port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { key, value, reason } => {
                write!(f, "Invalid {key} value '{value}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as milliseconds.
mod duration_millis {
    use serde::{Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_relay_config() {
        let config = RelayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.ingest_bind(), "0.0.0.0:6060");
        assert_eq!(config.query_bind(), "0.0.0.0:4000");
        assert_eq!(config.building_count, 11);
        assert_eq!(config.sensor_max, 11);
        assert_eq!(config.cors_origin, "*");
        assert!(config.sensor_overrides.is_empty());
    }

    #[test]
    fn test_relay_env_overrides() {
        let config = RelayConfig::from_lookup(lookup(&[
            ("WS_PORT", "7070"),
            ("HTTP_HOST", "127.0.0.1"),
            ("BUILDING_COUNT", "5"),
            ("SENSOR_OVERRIDES", "5=1"),
            ("CORS_ORIGIN", "http://kiosk.local"),
        ]))
        .unwrap();

        assert_eq!(config.ingest_bind(), "0.0.0.0:7070");
        assert_eq!(config.query_bind(), "127.0.0.1:4000");
        assert_eq!(config.building_count, 5);
        assert_eq!(config.cors_origin, "http://kiosk.local");
        assert_eq!(config.mapper().map_code(5).unwrap().building_id, 1);
        assert_eq!(config.mapper().map_code(9).unwrap().building_id, 5);
    }

    #[test]
    fn test_building_count_clamped() {
        let config = RelayConfig::from_lookup(lookup(&[("BUILDING_COUNT", "-4")])).unwrap();
        assert_eq!(config.building_count, 1);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = RelayConfig::from_lookup(lookup(&[("WS_PORT", "sixty")])).unwrap_err();
        assert!(err.to_string().contains("WS_PORT"));

        assert!(RelayConfig::from_lookup(lookup(&[("SENSOR_MAX", "-1")])).is_err());
        assert!(RelayConfig::from_lookup(lookup(&[("SENSOR_OVERRIDES", "1:2")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("POLL_INTERVAL_MS", "0")])).is_err());
    }

    #[test]
    fn test_bind_hosts_validated() {
        let config = RelayConfig::from_lookup(lookup(&[
            ("WS_HOST", "localhost"),
            ("HTTP_HOST", "::1"),
        ]))
        .unwrap();
        assert_eq!(config.ingest_bind(), "localhost:6060");
        assert_eq!(config.query_bind(), "[::1]:4000");
        config.query_bind().parse::<std::net::SocketAddr>().unwrap();

        let err = RelayConfig::from_lookup(lookup(&[("WS_HOST", "kiosk host")])).unwrap_err();
        assert!(err.to_string().contains("WS_HOST"));
        assert!(RelayConfig::from_lookup(lookup(&[("HTTP_HOST", "relay:4000")])).is_err());

        let flags = RelayConfig {
            http_host: "-bad-".to_string(),
            ..RelayConfig::default()
        };
        assert!(flags.validate().is_err());
    }

    #[test]
    fn test_client_config_precedence() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("WS_URL", "ws://fallback:1"),
            ("VITE_WS_URL", "ws://sensor-hub:6060"),
            ("BACKEND_URL", "http://relay.local:4000/"),
        ]))
        .unwrap();

        assert_eq!(config.ws_url, "ws://sensor-hub:6060");
        assert_eq!(config.backend_url, "http://relay.local:4000");
        assert_eq!(config.feed_endpoint(), "http://relay.local:4000/api/building");
        assert_eq!(config.poll_interval, Duration::from_millis(3000));
    }

    #[test]
    fn test_client_config_serializes_interval_as_millis() {
        let json = serde_json::to_value(ClientConfig::default()).unwrap();
        assert_eq!(json["poll_interval"], 3000);
        assert_eq!(json["backend_url"], "http://localhost:4000");
    }
}
