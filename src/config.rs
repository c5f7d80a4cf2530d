//! qsort-bridge Configuration
//!
//! Handles parsing and management of qsb.toml configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::SortError;
use crate::native::{DynamicQsort, LibcQsort, LibraryLoader, NativeSort, DEFAULT_C_LIBRARY};
use crate::variant::Variant;

/// Name of the configuration file looked up from the working directory
pub const CONFIG_FILE: &str = "qsb.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to set up sort backend: {0}")]
    Backend(#[from] SortError),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching qsb.toml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QsbConfig {
    /// Native sort primitive selection
    #[serde(default)]
    pub backend: BackendConfig,

    /// Default sort behavior for the CLI
    #[serde(default)]
    pub sort: SortConfig,
}

impl QsbConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir()?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    ///
    /// Returns the defaults if no qsb.toml exists on the way to the root.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        match Self::find(start_dir) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Locate the nearest qsb.toml at or above `start_dir`.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        start_dir
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Which native primitive to sort with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// qsort linked from the C library
    #[default]
    Libc,
    /// qsort resolved from a shared library at runtime
    Dynamic,
    /// qsort resolved from the running process image
    Process,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BackendKind::Libc => "libc",
            BackendKind::Dynamic => "dynamic",
            BackendKind::Process => "process",
        })
    }
}

/// Native backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend kind
    #[serde(default)]
    pub kind: BackendKind,

    /// Library to resolve qsort from (kind = "dynamic")
    #[serde(default)]
    pub library: Option<String>,

    /// Extra directories searched before the platform defaults
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
}

impl BackendConfig {
    /// The library a dynamic backend opens
    pub fn library_name(&self) -> &str {
        self.library.as_deref().unwrap_or(DEFAULT_C_LIBRARY)
    }

    /// Loader with the configured search paths in front
    pub fn loader(&self) -> LibraryLoader {
        let mut loader = LibraryLoader::new();
        for path in self.search_paths.iter().rev() {
            loader.prepend_search_path(path);
        }
        loader
    }

    /// Construct the configured native primitive.
    pub fn build(&self) -> ConfigResult<Box<dyn NativeSort>> {
        self.build_kind(self.kind)
    }

    /// Construct `kind` using the rest of this configuration.
    pub fn build_kind(&self, kind: BackendKind) -> ConfigResult<Box<dyn NativeSort>> {
        let native: Box<dyn NativeSort> = match kind {
            BackendKind::Libc => Box::new(LibcQsort),
            BackendKind::Dynamic => Box::new(self.loader().open(self.library_name())?),
            BackendKind::Process => Box::new(DynamicQsort::from_process()?),
        };
        Ok(native)
    }
}

/// Default sort behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    /// Adapter entry point
    #[serde(default)]
    pub variant: Variant,

    /// Sort largest first
    #[serde(default)]
    pub descending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QsbConfig::default();
        assert_eq!(config.backend.kind, BackendKind::Libc);
        assert_eq!(config.backend.library_name(), DEFAULT_C_LIBRARY);
        assert!(config.backend.search_paths.is_empty());
        assert_eq!(config.sort.variant, Variant::Index);
        assert!(!config.sort.descending);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[backend]
kind = "dynamic"
library = "c"
search_paths = ["/opt/lib", "/srv/lib"]

[sort]
variant = "less"
descending = true
"#;

        let config: QsbConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Dynamic);
        assert_eq!(config.backend.library_name(), "c");
        assert_eq!(
            config.backend.search_paths,
            vec![PathBuf::from("/opt/lib"), PathBuf::from("/srv/lib")]
        );
        assert_eq!(config.sort.variant, Variant::Less);
        assert!(config.sort.descending);

        let loader = config.backend.loader();
        assert_eq!(&loader.search_paths()[..2], &config.backend.search_paths[..]);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: QsbConfig = toml::from_str("[sort]\nvariant = \"raw\"\n").unwrap();
        assert_eq!(config.backend, BackendConfig::default());
        assert_eq!(config.sort.variant, Variant::Raw);
    }

    #[test]
    fn test_unknown_backend_is_parse_error() {
        let result: Result<QsbConfig, _> = toml::from_str("[backend]\nkind = \"quantum\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut config = QsbConfig::default();
        config.backend.kind = BackendKind::Process;
        config.sort.variant = Variant::Native;
        config.save(&path).unwrap();

        assert_eq!(QsbConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[sort]\ndescending = true\n").unwrap();

        let config = QsbConfig::find_and_load(&nested).unwrap();
        assert!(config.sort.descending);
    }

    #[test]
    fn test_load_missing_file() {
        let err = QsbConfig::load(Path::new("/nonexistent/qsb.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_build_libc_backend() {
        let native = BackendConfig::default().build().unwrap();
        assert_eq!(native.name(), "libc");
    }

    #[test]
    fn test_build_missing_dynamic_library() {
        let backend = BackendConfig {
            kind: BackendKind::Dynamic,
            library: Some("qsort-bridge-missing".to_string()),
            search_paths: Vec::new(),
        };
        let err = backend.build().err().unwrap();
        assert!(matches!(err, ConfigError::Backend(SortError::LibraryNotFound(_))));
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn test_build_dynamic_backend_and_sort() {
        for library in ["c", DEFAULT_C_LIBRARY] {
            let toml = format!("[backend]\nkind = \"dynamic\"\nlibrary = \"{library}\"\n");
            let config: QsbConfig = toml::from_str(&toml).unwrap();

            let native = config.backend.build().unwrap();
            assert_eq!(native.name(), "dynamic");

            let sorter = crate::Sorter::with_native(native);
            let mut values = [42i64, 9, 101, 95, 27, 25];
            sorter.sort_by(&mut values, |a, b| a.cmp(b));
            assert_eq!(values, [9, 25, 27, 42, 95, 101], "library {library}");
        }
    }
}
