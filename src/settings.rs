use std::path::PathBuf;

use config::{Config, Environment, Map};
use serde::Deserialize;
use thiserror::Error;

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8000;
/// Static root used when `STATIC_ROOT` is unset.
pub const DEFAULT_STATIC_ROOT: &str = "public";
/// Log filter used when `LOG_LEVEL` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Process configuration, read from the environment at startup.
///
/// | Variable      | Default  |
/// |---------------|----------|
/// | `PORT`        | `8000`   |
/// | `STATIC_ROOT` | `public` |
/// | `LOG_LEVEL`   | `info`   |
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Port to listen on, on all interfaces.
    pub port: u16,
    /// Directory the browser client is served from.
    pub static_root: PathBuf,
    /// `tracing` filter directive, e.g. `debug` or `finder=trace`.
    pub log_level: String,
}

/// Configuration that cannot be used to start the server.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// A variable is present but holds an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),
}

impl Settings {
    /// Reads the settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if a variable cannot be converted, e.g. a non-numeric `PORT`.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::load(Environment::default())
    }

    /// Reads the settings from the given variables instead of the process environment.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_env`].
    pub fn from_vars(vars: Map<String, String>) -> Result<Self, SettingsError> {
        Self::load(Environment::default().source(Some(vars)))
    }

    fn load(environment: Environment) -> Result<Self, SettingsError> {
        let settings = Config::builder()
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("static_root", DEFAULT_STATIC_ROOT)?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use config::Map;

    use crate::settings::{DEFAULT_PORT, Settings};

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_without_variables() {
        let settings = Settings::from_vars(Map::new()).unwrap();

        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.static_root, PathBuf::from("public"));
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn variables_override_defaults() {
        let settings = Settings::from_vars(vars(&[
            ("PORT", "9090"),
            ("STATIC_ROOT", "/srv/finder"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(settings.port, 9090);
        assert_eq!(settings.static_root, PathBuf::from("/srv/finder"));
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn unrelated_variables_are_ignored() {
        let settings = Settings::from_vars(vars(&[("HOME", "/root"), ("PATH", "/usr/bin")])).unwrap();

        assert_eq!(settings.port, DEFAULT_PORT);
    }

    #[test]
    fn non_numeric_port_fails() {
        assert!(Settings::from_vars(vars(&[("PORT", "eighty")])).is_err());
    }

    #[test]
    fn out_of_range_port_fails() {
        assert!(Settings::from_vars(vars(&[("PORT", "70000")])).is_err());
        assert!(Settings::from_vars(vars(&[("PORT", "-1")])).is_err());
    }

    #[test]
    fn empty_port_fails() {
        assert!(Settings::from_vars(vars(&[("PORT", "")])).is_err());
    }
}
