//! Where version tables live on disk.

use std::path::{Component, Path, PathBuf};

use crate::config::LibraryConfig;
use crate::version::Version;

/// Maps a build version to the path of its table.
pub trait FileLocator {
    fn locate(&self, version: &Version) -> PathBuf;
}

/// Looks for `<prefix>-<major>-<minor>-<revision>-<build>.<ext>` in one directory.
///
/// Relative directories are resolved against the working directory at lookup
/// time and normalized lexically.
#[derive(Debug, Clone)]
pub struct DirectoryLocator {
    dir: PathBuf,
    prefix: String,
    extension: String,
}

impl DirectoryLocator {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        let config = LibraryConfig::default();
        Self {
            dir: dir.into(),
            prefix: config.file_prefix,
            extension: config.file_extension,
        }
    }

    pub fn from_config(config: &LibraryConfig) -> Self {
        Self {
            dir: config.search_dir.clone(),
            prefix: config.file_prefix.clone(),
            extension: config.file_extension.clone(),
        }
    }

    pub fn file_name(&self, version: &Version) -> String {
        format!(
            "{}-{}-{}-{}-{}.{}",
            self.prefix,
            version.major,
            version.minor,
            version.revision,
            version.build,
            self.extension
        )
    }
}

impl Default for DirectoryLocator {
    fn default() -> Self {
        Self::from_config(&LibraryConfig::default())
    }
}

impl FileLocator for DirectoryLocator {
    fn locate(&self, version: &Version) -> PathBuf {
        let dir = if self.dir.is_absolute() {
            self.dir.clone()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&self.dir))
                .unwrap_or_else(|_| self.dir.clone())
        };
        normalize_lexically(&dir.join(self.file_name(version)))
    }
}

/// Collapse `.` and `..` without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
