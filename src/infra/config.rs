//! Configuration management infrastructure.
//!
//! Signing preferences live in a TOML file so build pipelines can pin the
//! digest algorithm and attribute choices without repeating CLI flags.

use crate::infra::error::{SigningError, SigningResult};
use crate::{HashAlgorithm, SigningOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Signing preferences loaded from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SigningConfiguration {
    /// Digest algorithm for the image hash and the signature
    pub hash_algorithm: HashAlgorithm,

    /// Add a signingTime authenticated attribute (makes output time-dependent)
    pub include_signing_time: bool,

    /// Program name recorded in the SpcSpOpusInfo attribute
    pub program_name: Option<String>,

    /// Embed intermediate certificates supplied by the signer
    pub embed_chain: bool,
}

impl Default for SigningConfiguration {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::Sha256,
            include_signing_time: false,
            program_name: None,
            embed_chain: true,
        }
    }
}

impl SigningConfiguration {
    /// Resolve into per-run options. The signing time, when enabled, is
    /// taken now.
    #[must_use]
    pub fn to_options(&self) -> SigningOptions {
        SigningOptions {
            hash_algorithm: self.hash_algorithm,
            signing_time: self.include_signing_time.then(SystemTime::now),
            program_name: self.program_name.clone(),
            embed_chain: self.embed_chain,
        }
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> SigningResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> SigningResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("pe-signer").join("config.toml"))
            .ok_or_else(|| {
                SigningError::ConfigurationError(
                    "no user configuration directory on this platform".to_string(),
                )
            })
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default(&self) -> SigningResult<SigningConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::debug!(
                "Configuration file not found, using defaults: {}",
                self.config_path.display()
            );
            Ok(SigningConfiguration::default())
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> SigningResult<SigningConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        let config = Self::parse(&content)?;
        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> SigningResult<SigningConfiguration> {
        toml::from_str(content).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })
    }

    /// Save configuration to file
    pub fn save(&self, config: &SigningConfiguration) -> SigningResult<()> {
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SigningError::ConfigurationError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;
        Ok(())
    }

    fn validate_config(config: &SigningConfiguration) -> SigningResult<()> {
        if let Some(name) = &config.program_name {
            if name.trim().is_empty() {
                return Err(SigningError::ConfigurationError(
                    "program_name must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = SigningConfiguration::default();
        assert_eq!(config.hash_algorithm, HashAlgorithm::Sha256);
        assert!(!config.include_signing_time);
        assert!(config.embed_chain);

        let options = config.to_options();
        assert!(options.signing_time.is_none());
        assert_eq!(options, SigningOptions::default());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = ConfigManager::parse(
            "hash_algorithm = \"sha384\"\nprogram_name = \"Boot Manager\"\n",
        )
        .unwrap();
        assert_eq!(config.hash_algorithm, HashAlgorithm::Sha384);
        assert_eq!(config.program_name.as_deref(), Some("Boot Manager"));
        assert!(config.embed_chain);
    }

    #[test]
    fn test_parse_rejects_unknown_algorithm() {
        let err = ConfigManager::parse("hash_algorithm = \"md5\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_signing_time_resolved_when_enabled() {
        let config = SigningConfiguration {
            include_signing_time: true,
            ..SigningConfiguration::default()
        };
        assert!(config.to_options().signing_time.is_some());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("nested").join("config.toml"));
        assert_eq!(
            manager.load_or_default().unwrap(),
            SigningConfiguration::default()
        );

        let config = SigningConfiguration {
            hash_algorithm: HashAlgorithm::Sha512,
            embed_chain: false,
            ..SigningConfiguration::default()
        };
        manager.save(&config).unwrap();
        assert_eq!(manager.load().unwrap(), config);
    }

    #[test]
    fn test_blank_program_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "program_name = \"  \"\n").unwrap();
        let err = ConfigManager::with_path(&path).load().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
