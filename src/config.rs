//! Service configuration from environment variables

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::brokers::{
    CompletionChunkBroker, EventBroker, MemoryBroker, TraceBroker, DEFAULT_EVENT_CAPACITY,
};
use crate::event_store::LogConfig;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got '{value}'")]
    InvalidNumber { name: String, value: String },
}

/// Everything needed to start the service
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub memory: LogConfig,
    pub chunks: LogConfig,
    pub events: LogConfig,
    pub traces: LogConfig,
    /// Interval between SSE heartbeat comments
    pub heartbeat: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            memory: LogConfig::new(MemoryBroker::NAME),
            chunks: LogConfig::new(CompletionChunkBroker::NAME),
            events: LogConfig::new(EventBroker::NAME).with_capacity(DEFAULT_EVENT_CAPACITY),
            traces: LogConfig::new(TraceBroker::NAME),
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }
}

impl BrokerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let number = |name: &str| -> Result<Option<u64>, ConfigError> {
            get(name)
                .map(|value| {
                    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                        name: name.to_string(),
                        value,
                    })
                })
                .transpose()
        };

        let mut config = Self::default();

        if let Some(host) = get("HOST") {
            config.host = host;
        }
        if let Some(port) = get("PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                name: "PORT".to_string(),
                value: port,
            })?;
        }

        config.memory.path = get("MEMORY_FILE_PATH").map(PathBuf::from);
        config.chunks.path = get("STREAM_FILE_PATH").map(PathBuf::from);
        config.events.path = get("EVENT_FILE_PATH").map(PathBuf::from);
        config.traces.path = get("TRACE_FILE_PATH").map(PathBuf::from);

        config.memory.max_items = number("MAX_MESSAGES")?.map(|n| n as usize);
        config.chunks.max_items = number("MAX_CHUNKS")?.map(|n| n as usize);
        config.events.max_items = number("MAX_EVENTS")?.map(|n| n as usize);
        config.traces.max_items = number("MAX_SPANS")?.map(|n| n as usize);

        if let Some(capacity) = number("EVENT_CAPACITY")? {
            config.events.capacity = Some(capacity as usize);
        }
        if let Some(secs) = number("HEARTBEAT_SECS")? {
            config.heartbeat = Duration::from_secs(secs.max(1));
        }

        Ok(config)
    }

    /// `host:port` for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
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
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BrokerConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.memory.path, None);
        assert_eq!(config.memory.max_items, None);
        assert_eq!(config.events.capacity, Some(10_000));
        assert_eq!(config.heartbeat, Duration::from_secs(30));
    }

    #[test]
    fn test_reads_paths_and_limits() {
        let config = BrokerConfig::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("MEMORY_FILE_PATH", "/data/memory.json"),
            ("STREAM_FILE_PATH", "/data/stream.json"),
            ("MAX_MESSAGES", "500"),
            ("MAX_CHUNKS", "0"),
            ("EVENT_CAPACITY", "50"),
            ("HEARTBEAT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.memory.path, Some(PathBuf::from("/data/memory.json")));
        assert_eq!(config.chunks.path, Some(PathBuf::from("/data/stream.json")));
        assert_eq!(config.events.path, None);
        assert_eq!(config.memory.max_items, Some(500));
        assert_eq!(config.chunks.max_items, Some(0));
        assert_eq!(config.events.capacity, Some(50));
        assert_eq!(config.heartbeat, Duration::from_secs(5));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = BrokerConfig::from_lookup(lookup(&[("MEMORY_FILE_PATH", ""), ("PORT", " ")])).unwrap();
        assert_eq!(config.memory.path, None);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_rejects_non_numeric() {
        let err = BrokerConfig::from_lookup(lookup(&[("MAX_EVENTS", "lots")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                name: "MAX_EVENTS".to_string(),
                value: "lots".to_string()
            }
        );

        assert!(BrokerConfig::from_lookup(lookup(&[("PORT", "99999")])).is_err());
    }
}
