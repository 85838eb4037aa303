//! Pack command implementation.
//!
//! Turns a text dump back into a binary table.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;
use versionlib::{
    Database, FileLocator, LibraryConfig, NoModuleResolver, TableHeader, Version, encode_table,
    parse_dump,
};

/// Header fields for the packed table.
#[derive(Debug, Clone)]
pub struct PackOptions {
    pub version: Version,
    pub module: String,
    pub pointer_size: u32,
    pub force: bool,
}

/// Run the pack command
pub fn run(
    config: &LibraryConfig,
    input: &Path,
    output: Option<&Path>,
    options: PackOptions,
) -> Result<()> {
    let path = pack(config, input, output, &options)?;
    println!("{}", path.display());
    Ok(())
}

fn pack(
    config: &LibraryConfig,
    input: &Path,
    output: Option<&Path>,
    options: &PackOptions,
) -> Result<PathBuf> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let records = parse_dump(&text)?;
    let count = records.len();

    let header = TableHeader::new(options.version, options.module.clone(), options.pointer_size);
    let data = encode_table(&header, records);

    // Round-trip through the loader so a bad table never reaches disk.
    let mut check = Database::builder().resolver(NoModuleResolver).build();
    check
        .try_load_bytes(&data)
        .context("Encoded table failed verification")?;

    let path = match output {
        Some(path) => path.to_path_buf(),
        None => config.locator().locate(&options.version),
    };
    if path.exists() && !options.force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, &data).with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Packed {} records ({} bytes) into {}", count, data.len(), path.display());
    Ok(path)
}
