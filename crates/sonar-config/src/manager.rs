use crate::types::SonarConfig;
use sonar_fs::{FileSystem, NativeFileSystem};
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "sonar.toml";

/// Errors that can occur during config management
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error in {path}: {source}")]
    TomlDe {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config file not found at {0}")]
    ConfigNotFound(PathBuf),

    #[error("Config file already exists at {0}")]
    ConfigExists(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Where the active configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config` on the command line
    Explicit,
    /// `./sonar.toml`
    Local,
    /// `~/.sonar/config.toml`
    Global,
    /// No file found
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigSource::Explicit => "explicit",
            ConfigSource::Local => "local",
            ConfigSource::Global => "global",
            ConfigSource::Defaults => "defaults",
        })
    }
}

/// Manager for Sonar configuration
///
/// A manager is bound to one config file. [`ConfigManager::resolve`] picks
/// that file from the lookup order; when none exists the manager holds the
/// defaults and points at `./sonar.toml`, which [`save`](Self::save) creates.
pub struct ConfigManager<F: FileSystem = NativeFileSystem> {
    fs: Arc<F>,
    config_path: PathBuf,
    config: SonarConfig,
    source: ConfigSource,
}

impl ConfigManager {
    /// Get the global config path (~/.sonar/config.toml)
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".sonar").join("config.toml"))
    }

    /// Resolve the active configuration.
    ///
    /// Lookup order: `explicit`, then `./sonar.toml`, then the global file,
    /// then defaults. An explicit path that does not exist is an error.
    pub async fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let mut manager = Self::load_from(path).await?;
            manager.source = ConfigSource::Explicit;
            return Ok(manager);
        }

        let local = std::env::current_dir()?.join(LOCAL_CONFIG_FILE);
        let mut candidates = vec![(local.clone(), ConfigSource::Local)];
        // A missing home directory only rules out the global file
        if let Ok(global) = Self::global_config_path() {
            candidates.push((global, ConfigSource::Global));
        }

        for (path, source) in candidates {
            if path.is_file() {
                let mut manager = Self::load_from(&path).await?;
                manager.source = source;
                return Ok(manager);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self {
            fs: Arc::new(native_for(&local)?),
            config_path: local,
            config: SonarConfig::default(),
            source: ConfigSource::Defaults,
        })
    }

    /// Load config from specific path (useful for testing)
    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let fs = Arc::new(native_for(path)?);
        Self::load_with_filesystem(fs, path).await
    }

    /// Initialize a new config file with defaults.
    ///
    /// Refuses to overwrite an existing file unless `force` is set.
    pub async fn init_at(path: &Path, force: bool) -> Result<Self, ConfigError> {
        let fs = Arc::new(native_for(path)?);
        if !force && fs.exists(path).await? {
            return Err(ConfigError::ConfigExists(path.to_path_buf()));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs.create_dir_all(parent).await?;
        }

        let manager = Self {
            fs,
            config_path: path.to_path_buf(),
            config: SonarConfig::default(),
            source: ConfigSource::Explicit,
        };
        manager.save().await?;
        tracing::info!(path = %path.display(), "Initialized config file");
        Ok(manager)
    }
}

impl<F: FileSystem> ConfigManager<F> {
    /// Load config with a custom FileSystem
    pub async fn load_with_filesystem(fs: Arc<F>, path: &Path) -> Result<Self, ConfigError> {
        if !fs.exists(path).await? {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let contents = fs.read_to_string(path).await?;
        let config: SonarConfig = toml::from_str(&contents).map_err(|source| ConfigError::TomlDe {
            path: path.to_path_buf(),
            source,
        })?;
        validate(&config)?;
        tracing::debug!(path = %path.display(), "Loaded config");

        Ok(Self {
            fs,
            config_path: path.to_path_buf(),
            config,
            source: ConfigSource::Explicit,
        })
    }

    /// Save config to disk atomically
    ///
    /// Uses a temporary file and atomic rename to prevent corruption
    pub async fn save(&self) -> Result<(), ConfigError> {
        validate(&self.config)?;
        let toml_str = toml::to_string_pretty(&self.config)?;

        let temp_path = self.config_path.with_extension("toml.tmp");
        self.fs.write(&temp_path, &toml_str).await?;
        if let Err(e) = self.fs.rename(&temp_path, &self.config_path).await {
            let _ = self.fs.remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    /// Get reference to config
    pub fn config(&self) -> &SonarConfig {
        &self.config
    }

    /// Get mutable reference to config (caller must call save())
    pub fn config_mut(&mut self) -> &mut SonarConfig {
        &mut self.config
    }

    pub fn into_config(self) -> SonarConfig {
        self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn source(&self) -> ConfigSource {
        self.source
    }
}

/// Reject values no scan or store could work with.
pub fn validate(config: &SonarConfig) -> Result<(), ConfigError> {
    let scan = &config.scan;
    if scan.max_files == 0 {
        return Err(ConfigError::Invalid("scan.max_files must be at least 1".into()));
    }
    if scan.worker_count == 0 {
        return Err(ConfigError::Invalid("scan.worker_count must be at least 1".into()));
    }

    let mut components = Path::new(&config.storage.cache_file).components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !plain {
        return Err(ConfigError::Invalid(format!(
            "storage.cache_file must be a plain file name, got '{}'",
            config.storage.cache_file
        )));
    }

    let policy = &config.validation;
    if policy.min_appropriate > policy.max_appropriate
        || policy.max_appropriate > policy.too_large_threshold
    {
        return Err(ConfigError::Invalid(
            "validation thresholds must satisfy min_appropriate <= max_appropriate <= too_large_threshold"
                .into(),
        ));
    }

    Ok(())
}

/// Native filesystem scoped to the directory holding `path`.
fn native_for(path: &Path) -> Result<NativeFileSystem, ConfigError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(NativeFileSystem::new(dir)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sonar.toml");

        let manager = ConfigManager::init_at(&config_path, false).await.unwrap();
        assert_eq!(manager.config(), &SonarConfig::default());
        assert!(!temp_dir.path().join("sonar.toml.tmp").exists());

        let loaded = ConfigManager::load_from(&config_path).await.unwrap();
        assert_eq!(loaded.config(), &SonarConfig::default());
        assert_eq!(loaded.source(), ConfigSource::Explicit);
    }

    #[tokio::test]
    async fn test_init_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sonar.toml");
        fs::write(&config_path, "[scan]\nworker_count = 2\n").unwrap();

        let result = ConfigManager::init_at(&config_path, false).await;
        assert!(matches!(result, Err(ConfigError::ConfigExists(_))));

        ConfigManager::init_at(&config_path, true).await.unwrap();
        let loaded = ConfigManager::load_from(&config_path).await.unwrap();
        assert_eq!(loaded.config().scan.worker_count, 4);
    }

    #[tokio::test]
    async fn test_init_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(".sonar").join("config.toml");
        ConfigManager::init_at(&config_path, false).await.unwrap();
        assert!(config_path.is_file());
    }

    #[tokio::test]
    async fn test_save_persists_changes() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sonar.toml");
        let mut manager = ConfigManager::init_at(&config_path, false).await.unwrap();

        manager.config_mut().scan.repos_path = Some(PathBuf::from("/srv/repos"));
        manager.config_mut().rules.extra_rule_files.push(PathBuf::from("rules/internal.toml"));
        manager.save().await.unwrap();

        let loaded = ConfigManager::load_from(&config_path).await.unwrap();
        assert_eq!(loaded.config().scan.repos_path, Some(PathBuf::from("/srv/repos")));
        assert_eq!(loaded.config().rules.extra_rule_files.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = ConfigManager::load_from(&temp_dir.path().join("nope.toml")).await;
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[tokio::test]
    async fn test_malformed_file_names_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sonar.toml");
        fs::write(&config_path, "[scan\nmax_files = ").unwrap();

        let err = ConfigManager::load_from(&config_path).await.err().unwrap();
        assert!(matches!(err, ConfigError::TomlDe { .. }));
        assert!(err.to_string().contains("sonar.toml"));
    }

    #[tokio::test]
    async fn test_invalid_values_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sonar.toml");

        fs::write(&config_path, "[scan]\nworker_count = 0\n").unwrap();
        assert!(matches!(
            ConfigManager::load_from(&config_path).await,
            Err(ConfigError::Invalid(_))
        ));

        fs::write(&config_path, "[storage]\ncache_file = \"../cache.json\"\n").unwrap();
        assert!(matches!(
            ConfigManager::load_from(&config_path).await,
            Err(ConfigError::Invalid(_))
        ));

        fs::write(&config_path, "[validation]\nmin_appropriate = 20\n").unwrap();
        assert!(matches!(
            ConfigManager::load_from(&config_path).await,
            Err(ConfigError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_explicit_missing_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");
        assert!(matches!(
            ConfigManager::resolve(Some(&path)).await,
            Err(ConfigError::ConfigNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_explicit() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.toml");
        fs::write(&path, "[scan]\nmax_files = 100\n").unwrap();

        let manager = ConfigManager::resolve(Some(&path)).await.unwrap();
        assert_eq!(manager.source(), ConfigSource::Explicit);
        assert_eq!(manager.config().scan.max_files, 100);
        assert_eq!(manager.config_path(), path.as_path());
    }
}
