//! Configuration types.

use courier_core::{ConfigMap, PathParamStyle};
use courier_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Complete Courier configuration.
///
/// # Example
///
/// ```
/// use courier_config::CourierConfig;
/// use courier_core::PathParamStyle;
///
/// let config = CourierConfig::default();
/// assert_eq!(config.client.path_param_style, PathParamStyle::Colon);
/// assert!(config.client.strip_path_params);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// Client defaults.
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CourierConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `client.base_url` is set but is not an `http(s)://` URL
    /// - `client.default_config` sets `method` or `url`
    /// - `logging.level` is not a valid filter
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base_url) = &self.client.base_url {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(ConfigError::invalid_value(
                    "client.base_url",
                    format!("expected an http(s) URL, got {base_url}"),
                ));
            }
        }

        for reserved in ["method", "url"] {
            if self.client.default_config.contains_key(reserved) {
                return Err(ConfigError::validation_error(format!(
                    "client.default_config cannot set `{reserved}`; it comes from the route"
                )));
            }
        }

        if self.logging.enabled {
            courier_telemetry::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Pretty, colored, debug-level logs.
    ///
    /// # Example
    ///
    /// ```
    /// use courier_config::{CourierConfig, LogFormat};
    ///
    /// let config = CourierConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// assert_eq!(config.logging.format, LogFormat::Pretty);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        Self {
            client: ClientConfig::default(),
            logging: LoggingConfig {
                enabled: true,
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                ansi_enabled: true,
            },
        }
    }

    /// Create a production configuration preset.
    ///
    /// JSON, info-level logs.
    #[must_use]
    pub fn production() -> Self {
        Self {
            client: ClientConfig::default(),
            logging: LoggingConfig {
                enabled: true,
                level: "info".to_string(),
                format: LogFormat::Json,
                ansi_enabled: false,
            },
        }
    }
}

/// Client defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Placeholder syntax in route URLs.
    #[serde(default)]
    pub path_param_style: PathParamStyle,

    /// Remove substituted fields from the input.
    #[serde(default = "default_true")]
    pub strip_path_params: bool,

    /// Prefix for relative route URLs.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Initial request config of every handler.
    #[serde(default)]
    pub default_config: ConfigMap,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            path_param_style: PathParamStyle::Colon,
            strip_path_params: true,
            base_url: None,
            default_config: ConfigMap::new(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Whether logging is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directives.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// ANSI colors in pretty output.
    #[serde(default)]
    pub ansi_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_level(),
            format: LogFormat::Json,
            ansi_enabled: false,
        }
    }
}

impl LoggingConfig {
    /// Converts this section into the telemetry crate's [`LogConfig`].
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        let base = match self.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            ansi: self.ansi_enabled,
            ..base
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_validate() {
        assert!(CourierConfig::default().validate().is_ok());
        assert!(CourierConfig::development().validate().is_ok());
        assert!(CourierConfig::production().validate().is_ok());
    }

    #[test]
    fn test_rejects_relative_base_url() {
        let mut config = CourierConfig::default();
        config.client.base_url = Some("api.example.com".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_rejects_reserved_default_keys() {
        let mut config = CourierConfig::default();
        config
            .client
            .default_config
            .insert("url".to_string(), json!("/x"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_bad_log_level() {
        let mut config = CourierConfig::default();
        config.logging.level = "courier=loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<CourierConfig, _> =
            serde_json::from_value(json!({"client": {"strip": false}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_to_log_config() {
        let logging = LoggingConfig {
            format: LogFormat::Pretty,
            level: "warn".to_string(),
            ..LoggingConfig::default()
        };
        let log = logging.to_log_config();
        assert!(!log.json_format);
        assert_eq!(log.level, "warn");
        assert!(!log.ansi);
    }
}
