//! Configuration module

use crate::{Error, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Region used when neither the command line nor the config file names one
pub const DEFAULT_REGION: &str = "eu-west-3";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Upload defaults
    #[serde(default)]
    pub upload: UploadConfig,
    /// Store connection settings
    #[serde(default)]
    pub aws: AwsConfig,
}

/// Upload defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Number of chunks the file is split into
    pub chunks: u64,
    /// Number of simultaneously running part uploads
    pub parallel: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunks: 10,
            parallel: 1,
        }
    }
}

/// Credential and endpoint selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Bucket region
    pub region: String,
    /// Named profile from the shared AWS config; the default chain when unset
    pub profile: Option<String>,
    /// Endpoint override for S3-compatible stores
    pub endpoint: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            profile: None,
            endpoint: None,
        }
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir().ok_or_else(|| {
            Error::Config("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join("multiput").join("config.toml"))
    }

    /// Get default configuration content with comments
    pub fn default_config_content() -> String {
        r#"# multiput configuration file

[upload]
# Number of chunks the source file is split into
chunks = 10
# Number of simultaneously running part uploads
parallel = 1

[aws]
# Bucket region
region = "eu-west-3"
# Named profile from ~/.aws/config; the default credential chain is used when unset
# profile = "default"
# Endpoint override for S3-compatible stores
# endpoint = "http://localhost:9000"
"#
        .to_string()
    }

    /// Load configuration from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, falling back to defaults when absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Write the commented default configuration to the default location
    pub fn init() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, Self::default_config_content())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.upload.chunks, 10);
        assert_eq!(config.upload.parallel, 1);
        assert_eq!(config.aws.region, "eu-west-3");
        assert!(config.aws.profile.is_none());
    }

    #[test]
    fn test_default_content_matches_defaults() {
        let parsed: Config = toml::from_str(&Config::default_config_content()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [aws]
            profile = "uploader"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.aws.profile.as_deref(), Some("uploader"));
        assert_eq!(parsed.aws.region, DEFAULT_REGION);
        assert_eq!(parsed.upload, UploadConfig::default());
    }

    #[test]
    fn test_shown_config_loads_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.upload.parallel = 4;
        config.aws.endpoint = Some("http://localhost:9000".into());
        fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[upload]\nchunks = \"many\"\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
