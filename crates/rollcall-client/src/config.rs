//! Client configuration, from an optional TOML file plus `ROLLCALL_*`
//! environment overrides.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl { url: String, source: url::ParseError },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Origin of the attendance backend (the `/register` and
    /// `/attendance` endpoints hang off this).
    pub base_url: String,
    /// V4L2 device path.
    pub camera_device: String,
    /// Timeout for one submission round trip.
    pub request_timeout_secs: u64,
    /// JPEG quality for captured stills (1-100).
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            camera_device: "/dev/video0".to_string(),
            request_timeout_secs: 30,
            jpeg_quality: 85,
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the config file if one
    /// exists, then `ROLLCALL_*` environment variables on top.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_file_path() {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                let config =
                    toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.clone(), source })?;
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Overlay `ROLLCALL_*` environment variables.
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("ROLLCALL_BASE_URL") {
            self.base_url = v;
        }
        if let Ok(v) = std::env::var("ROLLCALL_CAMERA_DEVICE") {
            self.camera_device = v;
        }
        self.request_timeout_secs = env_u64("ROLLCALL_REQUEST_TIMEOUT_SECS", self.request_timeout_secs);
        self.jpeg_quality = env_u8("ROLLCALL_JPEG_QUALITY", self.jpeg_quality);
    }

    /// Parse and validate the configured base URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            source,
        })
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

/// `ROLLCALL_CONFIG` wins; otherwise `$XDG_CONFIG_HOME/rollcall/config.toml`.
fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("ROLLCALL_CONFIG") {
        return Some(PathBuf::from(path));
    }

    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    Some(config_dir.join("rollcall/config.toml"))
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u8(key: &str, default: u8) -> u8 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.camera_device, "/dev/video0");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.jpeg_quality, 85);
    }

    #[test]
    fn test_parse_toml_overrides_defaults() {
        let config: Config = toml::from_str(
            r#"
            base_url = "http://10.0.0.5:8080"
            jpeg_quality = 70
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://10.0.0.5:8080");
        assert_eq!(config.jpeg_quality, 70);
        // Unspecified keys keep their defaults.
        assert_eq!(config.camera_device, "/dev/video0");
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<Config>("base_uri = \"oops\"").is_err());
    }

    #[test]
    fn test_base_url_validation() {
        let mut config = Config::default();
        assert!(config.base_url().is_ok());

        config.base_url = "not a url".to_string();
        assert!(matches!(
            config.base_url(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }
}
