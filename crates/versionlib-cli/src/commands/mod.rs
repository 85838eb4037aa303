//! CLI command implementations.
//!
//! This module contains the implementation of each CLI command.

pub mod dump;
pub mod hex_utils;
pub mod info;
pub mod lookup;
pub mod pack;
pub mod path;

use std::path::PathBuf;

use anyhow::{Context, Result};
use versionlib::{
    Database, ExecutableVersionProvider, FileLocator, LibraryConfig, ModuleResolver,
    NoModuleResolver, Version, VersionProvider,
};

/// Where a command reads its table from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    /// The running executable's version, located through the config
    Current,
    /// An explicit version, located through the config
    Version(Version),
    /// An explicit file
    File(PathBuf),
}

impl TableSource {
    /// Resolve the table file this source refers to.
    pub fn path(&self, config: &LibraryConfig) -> Result<PathBuf> {
        let locator = config.locator();
        match self {
            TableSource::File(path) => Ok(path.clone()),
            TableSource::Version(version) => Ok(locator.locate(version)),
            TableSource::Current => {
                let version = ExecutableVersionProvider.current_version().context(
                    "Could not detect the executable version; pass --table-version or --file",
                )?;
                Ok(locator.locate(&version))
            }
        }
    }
}

/// Resolves every module to the same caller-supplied base.
#[derive(Debug, Clone, Copy)]
pub struct BaseOverride(pub u64);

impl ModuleResolver for BaseOverride {
    fn resolve(&self, _name: Option<&str>) -> Option<u64> {
        Some(self.0)
    }
}

/// Load the table for `source`. Module bases are only known when `base` is given.
pub fn open_database(
    config: &LibraryConfig,
    source: &TableSource,
    base: Option<u64>,
) -> Result<Database> {
    let path = source.path(config)?;
    let builder = Database::builder().config(config);
    let mut db = match base {
        Some(base) => builder.resolver(BaseOverride(base)).build(),
        None => builder.resolver(NoModuleResolver).build(),
    };

    db.try_load_from_path(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(db)
}
