//! Configuration Loader
//!
//! Environment-aware configuration loading. Layers, lowest precedence first:
//! built-in defaults, `golem_dispatch.{toml,yaml,json}`, the environment file
//! `golem_dispatch.<env>.{toml,yaml,json}`, then `GOLEM_DISPATCH__*` variables.

use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::DispatchConfig;

/// Base name of configuration files
pub const CONFIG_FILE_STEM: &str = "golem_dispatch";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "GOLEM_DISPATCH";

/// Loaded, validated configuration and where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: DispatchConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = %environment,
            config_directory = %config_directory.display(),
            "Loading dispatch configuration"
        );

        let base = config_directory.join(CONFIG_FILE_STEM);
        let overlay = config_directory.join(format!("{CONFIG_FILE_STEM}.{environment}"));

        let config = Self::build(&[base, overlay])?;
        config.validate()?;

        info!(
            environment = %environment,
            exchange = %config.protocol.exchange,
            capability = %config.protocol.capability,
            timeout_seconds = ?config.completion.timeout_seconds,
            "⚙️ Dispatch configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Load configuration from a single explicit file plus environment overrides
    pub fn from_file(path: &Path) -> ConfigResult<Arc<ConfigManager>> {
        if !path.is_file() {
            return Err(ConfigurationError::load(
                path.display().to_string(),
                "configuration file does not exist",
            ));
        }

        let source = Config::builder()
            .add_source(File::from(path.to_path_buf()))
            .add_source(Self::environment_source())
            .build()
            .map_err(|e| ConfigurationError::load(path.display().to_string(), e))?;

        let config: DispatchConfig = source
            .try_deserialize()
            .map_err(|e| ConfigurationError::load(path.display().to_string(), e))?;
        config.validate()?;

        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_directory: path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }))
    }

    /// Wrap an already constructed configuration, validating it first
    pub fn from_config(config: DispatchConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_directory: PathBuf::from("config"),
        }))
    }

    fn build(optional_files: &[PathBuf]) -> ConfigResult<DispatchConfig> {
        let mut builder = Config::builder();
        for path in optional_files {
            builder = builder.add_source(File::with_name(&path.to_string_lossy()).required(false));
        }
        builder = builder.add_source(Self::environment_source());

        let source = builder
            .build()
            .map_err(|e| ConfigurationError::load("configuration sources", e))?;

        source
            .try_deserialize()
            .map_err(|e| ConfigurationError::load("configuration sources", e))
    }

    fn environment_source() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment: GOLEM_ENV || APP_ENV || 'development'
    pub fn detect_environment() -> String {
        env::var("GOLEM_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_directory_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();

        assert_eq!(manager.environment(), "test");
        assert_eq!(manager.config().protocol, super::super::ProtocolConfig::default());
    }

    #[test]
    fn test_environment_file_overrides_base_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("golem_dispatch.toml"),
            r#"
[completion]
timeout_seconds = 120

[artifact]
file_prefix = "track-"
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("golem_dispatch.production.toml"),
            r#"
[completion]
timeout_seconds = 45
"#,
        )
        .unwrap();

        let manager = ConfigManager::load_from_directory_with_env(
            Some(dir.path().to_path_buf()),
            "production",
        )
        .unwrap();

        assert_eq!(manager.config().completion.timeout_seconds, Some(45));
        assert_eq!(manager.config().artifact.file_prefix, "track-");
        assert_eq!(manager.config().artifact.file_extension, "wav");
    }

    #[test]
    fn test_invalid_file_is_rejected_by_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dispatch.toml");
        fs::write(
            &path,
            r#"
[protocol]
exchange = ""
"#,
        )
        .unwrap();

        let result = ConfigManager::from_file(&path);
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingRequiredField { .. })
        ));
    }

    #[test]
    fn test_zero_timeout_in_file_disables_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dispatch.toml");
        fs::write(
            &path,
            r#"
[completion]
timeout_seconds = 0
"#,
        )
        .unwrap();

        let manager = ConfigManager::from_file(&path).unwrap();
        assert_eq!(manager.config().completion.timeout_seconds, Some(0));
        assert_eq!(manager.config().completion.timeout(), None);
    }

    #[test]
    fn test_from_file_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigManager::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigurationError::Load { .. })));
    }
}
