//! Info command implementation.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;
use versionlib::{LibraryConfig, LoadStats, Version};

use super::{TableSource, open_database};

/// Summary of a table file.
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub path: PathBuf,
    pub version: Version,
    pub module: String,
    pub pointer_size: u32,
    pub declared_records: u32,
    pub first_id: Option<u64>,
    pub last_id: Option<u64>,
    pub stats: LoadStats,
}

impl TableInfo {
    /// Read and validate the table at `path`.
    pub fn read(config: &LibraryConfig, path: PathBuf) -> Result<Self> {
        let db = open_database(config, &TableSource::File(path.clone()), None)?;
        let stats = db.stats();

        Ok(Self {
            path,
            version: db.version(),
            module: db.module_name().to_string(),
            pointer_size: db.pointer_size(),
            declared_records: stats.records,
            first_id: db.offsets().keys().next().copied(),
            last_id: db.offsets().keys().next_back().copied(),
            stats,
        })
    }
}

/// Run the info command
pub fn run(config: &LibraryConfig, source: TableSource, json: bool) -> Result<()> {
    let path = source.path(config)?;
    let info = TableInfo::read(config, path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("File:          {}", info.path.display());
    println!("Version:       {}", info.version);
    println!(
        "Module:        {}",
        if info.module.is_empty() { "<primary>" } else { &info.module }
    );
    println!("Pointer size:  {}", info.pointer_size);
    println!("Records:       {}", info.declared_records);
    println!("Unique ids:    {}", info.declared_records - info.stats.duplicate_ids);
    if let (Some(first), Some(last)) = (info.first_id, info.last_id) {
        println!("Id range:      {}..={}", first, last);
    }
    if info.stats.duplicate_ids > 0 || info.stats.duplicate_offsets > 0 {
        println!(
            "Duplicates:    {} ids, {} offsets",
            info.stats.duplicate_ids, info.stats.duplicate_offsets
        );
    }
    if info.stats.trailing_bytes > 0 {
        println!("Trailing:      {} bytes", info.stats.trailing_bytes);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use versionlib::{Record, TableHeader, encode_table};

    #[test]
    fn test_table_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.bin");
        let header = TableHeader::new(Version::new(3, 0, 64, 38113), "game.dll", 4);
        let records = [
            Record::new(25, 0x1B10),
            Record::new(123, 0x8C30),
            Record::new(25, 0x1B18),
        ];
        std::fs::write(&path, encode_table(&header, records)).unwrap();

        let info = TableInfo::read(&LibraryConfig::default(), path).unwrap();
        assert_eq!(info.version, Version::new(3, 0, 64, 38113));
        assert_eq!(info.module, "game.dll");
        assert_eq!(info.pointer_size, 4);
        assert_eq!(info.declared_records, 3);
        assert_eq!(info.first_id, Some(25));
        assert_eq!(info.last_id, Some(123));
        assert_eq!(info.stats.duplicate_ids, 1);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["pointer_size"], 4);
        assert_eq!(json["stats"]["records"], 3);
    }
}
