//! Integration configuration.
//!
//! The configuration is a TOML document with one or more `[[iqtec]]`
//! controller tables, each listing its covers:
//!
//! ```toml
//! [[iqtec]]
//! host = "192.168.1.20"
//! friendly_name = "living_room"
//!
//! [[iqtec.covers]]
//! address = "SUNBLIND_1"
//! friendly_name = "south window"
//! ```
//!
//! Both `iqtec` and `covers` also accept a single table instead of a list.

use crate::error::ConfigError;

use log::debug;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use toml::Value;

fn default_controller_name() -> String {
    "iqtec_controller".to_string()
}

fn default_cover_name() -> String {
    "iqtec_sunblind".to_string()
}

fn default_poll_interval() -> u64 {
    1
}

/// Top-level configuration: every controller to set up.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationConfig {
    /// Controllers, from the `iqtec` key.
    #[serde(rename = "iqtec", deserialize_with = "controllers")]
    pub controllers: Vec<ControllerConfig>,
}

/// One IQtec controller and the covers attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    /// Host address of the controller.
    pub host: String,
    /// Display name. Defaults to `iqtec_controller`.
    #[serde(default = "default_controller_name")]
    pub friendly_name: String,
    /// Seconds between polls. Defaults to 1.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Covers on this controller. Defaults to none.
    #[serde(default, deserialize_with = "covers")]
    pub covers: Vec<CoverConfig>,
}

/// One sunblind on a controller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoverConfig {
    /// Device address on the controller.
    pub address: String,
    /// Display name. Defaults to `iqtec_sunblind`.
    #[serde(default = "default_cover_name")]
    pub friendly_name: String,
}

fn controllers<'de, D>(deserializer: D) -> Result<Vec<ControllerConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    one_or_many(deserializer, "iqtec")
}

fn covers<'de, D>(deserializer: D) -> Result<Vec<CoverConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    one_or_many(deserializer, "covers")
}

/// Accept a single table or a list of tables under `key`.
///
/// Entry errors are prefixed with `key[index]` and the entry's `host` or
/// `address` when it has one.
fn one_or_many<'de, D, T>(deserializer: D, key: &str) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let entry = |index: Option<usize>, value: Value| -> Result<T, D::Error> {
        let mut location = match index {
            Some(i) => format!("{}[{}]", key, i),
            None => key.to_string(),
        };
        if let Some(id) = ["host", "address"]
            .iter()
            .find_map(|field| value.get(field).and_then(Value::as_str))
        {
            location = format!("{} ({})", location, id);
        }
        T::deserialize(value)
            .map_err(|e| D::Error::custom(format!("{}: {}", location, e.message())))
    };

    match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, value)| entry(Some(i), value))
            .collect(),
        value => Ok(vec![entry(None, value)?]),
    }
}

impl IntegrationConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Example
    ///
    /// ```
    /// use iqtec_cover::IntegrationConfig;
    ///
    /// let config = IntegrationConfig::from_toml_str(r#"
    ///     [iqtec]
    ///     host = "10.0.0.5"
    ///     covers = { address = "SB1" }
    /// "#)?;
    /// assert_eq!(config.controllers[0].friendly_name, "iqtec_controller");
    /// assert_eq!(config.controllers[0].covers[0].friendly_name, "iqtec_sunblind");
    /// # Ok::<(), iqtec_cover::ConfigError>(())
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("loading configuration from {}", path.display());
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Check every field the schema cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controllers.is_empty() {
            return Err(ConfigError::NoControllers);
        }
        self.controllers.iter().try_for_each(ControllerConfig::validate)
    }
}

impl ControllerConfig {
    /// Interval between polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                field: "host",
                context: format!("controller {}", self.friendly_name),
            });
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidPollInterval {
                host: self.host.clone(),
            });
        }

        let mut seen = HashSet::new();
        for cover in &self.covers {
            if cover.address.trim().is_empty() {
                return Err(ConfigError::EmptyField {
                    field: "address",
                    context: format!("cover {} on {}", cover.friendly_name, self.host),
                });
            }
            if !seen.insert(cover.address.as_str()) {
                return Err(ConfigError::DuplicateAddress {
                    host: self.host.clone(),
                    address: cover.address.clone(),
                });
            }
        }
        Ok(())
    }
}
