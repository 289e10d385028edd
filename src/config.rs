//! Service configuration, read from an optional TOML file.

use {
    crate::connection::{Configuration, DeviceType},
    serde::Deserialize,
    std::{fs, io, path::Path, time::Duration},
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_device_name")]
    pub device_name: String,

    #[serde(default)]
    pub device_type: DeviceType,

    /// Matched against adapter paths and ports; empty picks the first
    #[serde(default)]
    pub adapter: String,

    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,
}

fn default_device_name() -> String {
    "cec-bridge".to_owned()
}

const fn default_open_timeout_ms() -> u64 {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            device_type: DeviceType::default(),
            adapter: String::new(),
            open_timeout_ms: default_open_timeout_ms(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn configuration(&self) -> Configuration {
        Configuration::new(&self.device_name, self.device_type)
            .with_open_timeout(Duration::from_millis(self.open_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn fields_override_defaults() {
        let config = Config::from_toml(
            r#"
            device_name = "Living room"
            device_type = "playback"
            adapter = "ttyACM"
            "#,
        )
        .unwrap();

        assert_eq!(config.device_type, DeviceType::Playback);
        assert_eq!(config.adapter, "ttyACM");
        assert_eq!(config.open_timeout_ms, 10_000);

        let configuration = config.configuration();
        assert_eq!(configuration.device_name.as_str(), "Living room");
        assert_eq!(configuration.open_timeout, Duration::from_secs(10));
    }

    #[test]
    fn unknown_device_type_falls_back() {
        let config = Config::from_toml(r#"device_type = "fridge""#).unwrap();
        assert_eq!(config.device_type, DeviceType::Recording);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            Config::from_toml("volume = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Config::load(Path::new("/nonexistent/cec-bridge.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
