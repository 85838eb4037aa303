//! Dump command implementation.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use versionlib::LibraryConfig;

use super::{TableSource, open_database};

/// Run the dump command
pub fn run(config: &LibraryConfig, source: TableSource, output: Option<&Path>) -> Result<()> {
    let db = open_database(config, &source, None)?;

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            db.dump(&mut writer)?;
            writer.flush()?;
            info!("Dumped {} entries to {}", db.len(), path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            db.dump(&mut writer)?;
        }
    }

    Ok(())
}
