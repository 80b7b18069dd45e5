//! Configuration types for mdns-alias.

use serde::{Deserialize, Serialize};
#[cfg(feature = "prometheus")]
use std::net::SocketAddr;
use std::path::Path;

use crate::error::AliasError;

/// Prefix for environment variable overrides (`MDNS_ALIAS__PUBLISH__TTL=120`).
pub const ENV_PREFIX: &str = "MDNS_ALIAS";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record publication settings.
    pub publish: PublishConfig,

    /// Responder connection settings.
    pub responder: ResponderConfig,

    /// Telemetry configuration.
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load configuration from an optional TOML file and the environment.
    ///
    /// Every field has a default, so with no file and no `MDNS_ALIAS__*`
    /// variables this yields [`Config::default`].
    pub fn load(path: Option<&Path>) -> Result<Self, AliasError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }
}

/// What to do with aliases that fail suffix validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasPolicy {
    /// Report the alias and publish it anyway.
    #[default]
    Flag,
    /// Report the alias and leave it out of the published set.
    Exclude,
}

/// Record publication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Domain suffix every alias must end with, also appended to the hostname.
    pub suffix: String,

    /// TTL for the CNAME records in seconds.
    pub ttl: u32,

    /// Handling of aliases without the configured suffix.
    pub alias_policy: AliasPolicy,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            ttl: default_ttl(),
            alias_policy: AliasPolicy::default(),
        }
    }
}

fn default_suffix() -> String {
    ".local".to_string()
}

/// Avahi's default TTL for non-host records (75 minutes).
fn default_ttl() -> u32 {
    75 * 60
}

/// Which message bus avahi-daemon is reachable on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    /// The system bus (where avahi-daemon normally lives).
    #[default]
    System,
    /// The per-user session bus.
    Session,
}

/// Responder connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// Bus to connect to.
    pub bus: BusKind,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "mdns_alias=debug,warn").
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[cfg(feature = "prometheus")]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            #[cfg(feature = "prometheus")]
            prometheus_addr: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.publish.suffix, ".local");
        assert_eq!(config.publish.ttl, 4500);
        assert_eq!(config.publish.alias_policy, AliasPolicy::Flag);
        assert_eq!(config.responder.bus, BusKind::System);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                "[publish]\nalias_policy = \"exclude\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.publish.alias_policy, AliasPolicy::Exclude);
        assert_eq!(config.publish.suffix, ".local");
        assert_eq!(config.publish.ttl, 4500);
        assert_eq!(config.responder.bus, BusKind::System);
    }

    #[test]
    fn test_bus_kind_from_toml() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                "[responder]\nbus = \"session\"\n[publish]\nsuffix = \".lan\"\nttl = 120\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.responder.bus, BusKind::Session);
        assert_eq!(config.publish.suffix, ".lan");
        assert_eq!(config.publish.ttl, 120);
    }
}
