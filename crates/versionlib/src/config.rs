//! Table search configuration.
//!
//! Controls where version tables are looked up and how their file names are
//! built. Can be persisted as JSON next to the host application.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::locator::DirectoryLocator;

/// Default table directory, relative to the working directory.
pub const DEFAULT_SEARCH_DIR: &str = "../../red4ext/versionlib";

pub const DEFAULT_FILE_PREFIX: &str = "versionlib";

pub const DEFAULT_FILE_EXTENSION: &str = "bin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory holding the tables. Relative paths follow the working directory.
    pub search_dir: PathBuf,
    pub file_prefix: String,
    pub file_extension: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            search_dir: PathBuf::from(DEFAULT_SEARCH_DIR),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
        }
    }
}

impl LibraryConfig {
    /// Create a new configuration builder
    pub fn builder() -> LibraryConfigBuilder {
        LibraryConfigBuilder::default()
    }

    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config = serde_json::from_str(&content)?;
        debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing or invalid
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) if e.is_not_found() => {
                debug!("No config at {}, using defaults", path.as_ref().display());
                Self::default()
            }
            Err(e) => {
                warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;
        info!("Saved config to {}", path.as_ref().display());
        Ok(())
    }

    pub fn locator(&self) -> DirectoryLocator {
        DirectoryLocator::from_config(self)
    }
}

/// Builder for LibraryConfig
#[derive(Debug, Clone, Default)]
pub struct LibraryConfigBuilder {
    search_dir: Option<PathBuf>,
    file_prefix: Option<String>,
    file_extension: Option<String>,
}

impl LibraryConfigBuilder {
    /// Set the directory tables are searched in
    pub fn search_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.search_dir = Some(path.into());
        self
    }

    /// Set the file name prefix
    pub fn file_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.file_prefix = Some(prefix.into());
        self
    }

    /// Set the file extension, without the dot
    pub fn file_extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.file_extension = Some(extension.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> LibraryConfig {
        let default = LibraryConfig::default();
        LibraryConfig {
            search_dir: self.search_dir.unwrap_or(default.search_dir),
            file_prefix: self.file_prefix.unwrap_or(default.file_prefix),
            file_extension: self.file_extension.unwrap_or(default.file_extension),
        }
    }
}
