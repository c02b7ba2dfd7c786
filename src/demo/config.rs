/*!
 * Demo Configuration
 *
 * Producer/consumer run parameters, overridable from the environment
 */

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {name}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Producer/consumer demo configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoConfig {
    pub producers: usize,
    pub consumers: usize,
    pub capacity: usize,
    /// Total items across all producers
    pub items: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            producers: 4,
            consumers: 4,
            capacity: 10,
            items: 10_000,
        }
    }
}

impl DemoConfig {
    /// Defaults overridden by `QSYNC_PRODUCERS`, `QSYNC_CONSUMERS`,
    /// `QSYNC_CAPACITY` and `QSYNC_ITEMS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            producers: parse_var(&lookup, "QSYNC_PRODUCERS", defaults.producers)?,
            consumers: parse_var(&lookup, "QSYNC_CONSUMERS", defaults.consumers)?,
            capacity: parse_var(&lookup, "QSYNC_CAPACITY", defaults.capacity)?,
            items: parse_var(&lookup, "QSYNC_ITEMS", defaults.items)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.producers == 0 {
            return Err(ConfigError::Zero("producers"));
        }
        if self.consumers == 0 {
            return Err(ConfigError::Zero("consumers"));
        }
        if self.capacity == 0 {
            return Err(ConfigError::Zero("capacity"));
        }
        if self.items == 0 {
            return Err(ConfigError::Zero("items"));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name,
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = DemoConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config =
            DemoConfig::from_lookup(lookup(&[("QSYNC_CAPACITY", " 1 "), ("QSYNC_ITEMS", "50")]))
                .unwrap();
        assert_eq!(config.capacity, 1);
        assert_eq!(config.items, 50);
    }

    #[test]
    fn test_invalid_and_zero_values_rejected() {
        let err = DemoConfig::from_lookup(lookup(&[("QSYNC_PRODUCERS", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "QSYNC_PRODUCERS", .. }));

        let err = DemoConfig::from_lookup(lookup(&[("QSYNC_CONSUMERS", "0")])).unwrap_err();
        assert_eq!(err, ConfigError::Zero("consumers"));
    }

    #[test]
    fn test_zero_items_rejected() {
        let err = DemoConfig::from_lookup(lookup(&[("QSYNC_ITEMS", "0")])).unwrap_err();
        assert_eq!(err, ConfigError::Zero("items"));
    }
}
