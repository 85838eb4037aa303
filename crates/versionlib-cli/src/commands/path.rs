//! Path command implementation.

use anyhow::Result;
use versionlib::{FileLocator, LibraryConfig, Version};

/// Run the path command
pub fn run(config: &LibraryConfig, version: Version) -> Result<()> {
    let path = config.locator().locate(&version);
    println!("{}", path.display());
    if !path.exists() {
        eprintln!("(not present)");
    }
    Ok(())
}
