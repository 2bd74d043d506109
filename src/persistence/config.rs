//! Location of the persisted world map file.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable overriding the world map location.
pub const MAP_PATH_ENV: &str = "WORLDMAP_PATH";

/// Directory created under the user's documents directory.
pub const APP_DIR_NAME: &str = "worldmap-persist";

/// File name of the persisted world map.
pub const MAP_FILE_NAME: &str = "worldMap";

/// The persisted-file location could not be established.
///
/// Unlike every other failure in this crate this one is fatal: it means the
/// deployment environment is broken.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no documents or data directory available for this user")]
    NoDocumentDirectory,

    #[error("world map path {} does not name a file", .0.display())]
    InvalidPath(PathBuf),

    #[error("failed to create world map directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where the world map is persisted.
///
/// Computed once at start-up and handed to the session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceConfig {
    pub map_path: PathBuf,
}

impl PersistenceConfig {
    /// Use an explicit file path.
    pub fn new(map_path: impl Into<PathBuf>) -> Self {
        Self {
            map_path: map_path.into(),
        }
    }

    /// Use the standard file name inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(MAP_FILE_NAME))
    }

    /// Resolve the per-user location and make sure its directory exists.
    ///
    /// `WORLDMAP_PATH` wins when set; otherwise the file lives in the user's
    /// documents directory (or data directory on systems without one).
    pub fn resolve() -> Result<Self, ConfigError> {
        let base = dirs::document_dir().or_else(dirs::data_dir);
        let config = Self::resolve_from(std::env::var_os(MAP_PATH_ENV), base)?;
        config.ensure_parent_dir()?;
        Ok(config)
    }

    fn resolve_from(
        env_override: Option<OsString>,
        base_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let map_path = match env_override.filter(|p| !p.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => base_dir
                .ok_or(ConfigError::NoDocumentDirectory)?
                .join(APP_DIR_NAME)
                .join(MAP_FILE_NAME),
        };

        if map_path.file_name().is_none() || map_path.is_dir() {
            return Err(ConfigError::InvalidPath(map_path));
        }
        Ok(Self { map_path })
    }

    /// Create the directory holding the map file.
    pub fn ensure_parent_dir(&self) -> Result<(), ConfigError> {
        match self.map_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
                    path: dir.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_override_wins() {
        let config = PersistenceConfig::resolve_from(
            Some(OsString::from("/tmp/custom/map.bin")),
            Some(PathBuf::from("/home/user/Documents")),
        )
        .unwrap();
        assert_eq!(config.map_path, PathBuf::from("/tmp/custom/map.bin"));
    }

    #[test]
    fn test_default_location_under_documents() {
        let config =
            PersistenceConfig::resolve_from(None, Some(PathBuf::from("/home/user/Documents")))
                .unwrap();
        assert_eq!(
            config.map_path,
            PathBuf::from("/home/user/Documents/worldmap-persist/worldMap")
        );
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let config =
            PersistenceConfig::resolve_from(Some(OsString::new()), Some(PathBuf::from("/docs")))
                .unwrap();
        assert_eq!(config.map_path, PathBuf::from("/docs/worldmap-persist/worldMap"));
    }

    #[test]
    fn test_no_base_directory_is_an_error() {
        let err = PersistenceConfig::resolve_from(None, None).unwrap_err();
        assert!(matches!(err, ConfigError::NoDocumentDirectory));
    }

    #[test]
    fn test_directory_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = PersistenceConfig::resolve_from(Some(dir.path().as_os_str().to_owned()), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPath(_)));
    }

    #[test]
    fn test_ensure_parent_dir_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = PersistenceConfig::in_dir(dir.path().join("a").join("b"));
        config.ensure_parent_dir().unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }
}
