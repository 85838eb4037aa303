//! Bidirectional identifier/offset database for one build.
//!
//! A [`Database`] is filled by a single load and then only read. Loads are
//! all-or-nothing: if any step fails, every table, the version and the module
//! base are cleared, so a failed load is indistinguishable from no load.
//!
//! ## Example
//!
//! ```ignore
//! use versionlib::{Database, FixedModuleResolver, Version};
//!
//! let mut db = Database::builder()
//!     .resolver(FixedModuleResolver::new(0x1_4000_0000))
//!     .build();
//!
//! if db.load(Version::new(3, 0, 64, 38113)) {
//!     let address = db.address_of(25);
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::LibraryConfig;
use crate::cursor::ByteCursor;
use crate::dump;
use crate::error::{Error, Result};
use crate::header::TableHeader;
use crate::locator::{DirectoryLocator, FileLocator};
use crate::resolver::{ModuleResolver, ProcessModuleResolver};
use crate::stream::{Record, RecordDecoder};
use crate::version::{ExecutableVersionProvider, Version, VersionProvider};

type SharedResolver = Box<dyn ModuleResolver + Send + Sync>;
type SharedLocator = Box<dyn FileLocator + Send + Sync>;
type SharedVersionProvider = Box<dyn VersionProvider + Send + Sync>;

/// Counters collected while populating the tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub records: u32,
    /// Records whose identifier replaced an earlier mapping.
    pub duplicate_ids: u32,
    /// Records whose offset replaced an earlier mapping.
    pub duplicate_offsets: u32,
    /// Bytes left after the last record.
    pub trailing_bytes: usize,
}

pub struct Database {
    id_to_offset: BTreeMap<u64, u64>,
    offset_to_id: BTreeMap<u64, u64>,
    version: Version,
    version_string: String,
    module_name: String,
    module_base: Option<u64>,
    pointer_size: u32,
    stats: LoadStats,
    resolver: SharedResolver,
    locator: SharedLocator,
    version_provider: SharedVersionProvider,
}

impl Default for Database {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("version", &self.version_string)
            .field("module_name", &self.module_name)
            .field("module_base", &self.module_base)
            .field("pointer_size", &self.pointer_size)
            .field("entries", &self.id_to_offset.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Database {
    /// Database using the current process, the executable's version resource
    /// and the default table directory.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &LibraryConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::default()
    }

    /// Drop all loaded state. Collaborators are kept.
    pub fn clear(&mut self) {
        self.id_to_offset.clear();
        self.offset_to_id.clear();
        self.version = Version::default();
        self.version_string.clear();
        self.module_name.clear();
        self.module_base = None;
        self.pointer_size = 0;
        self.stats = LoadStats::default();
    }

    // ---------------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------------

    /// Load the table for the running executable's version.
    pub fn load_current(&mut self) -> bool {
        report(self.try_load_current())
    }

    /// Load the table for `version`.
    pub fn load(&mut self, version: Version) -> bool {
        report(self.try_load(version))
    }

    pub fn try_load_current(&mut self) -> Result<()> {
        self.clear();
        let version = self
            .version_provider
            .current_version()
            .ok_or(Error::VersionUnavailable)?;
        debug!("Detected executable version {}", version);
        self.try_load(version)
    }

    pub fn try_load(&mut self, version: Version) -> Result<()> {
        self.clear();
        let path = self.locator.locate(&version);
        self.try_load_from_path(&path)?;

        if self.version != version {
            warn!(
                "Table {} describes version {}, requested {}",
                path.display(),
                self.version,
                version
            );
        }
        Ok(())
    }

    /// Load a table file directly, bypassing the locator.
    pub fn try_load_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.clear();
        let path = path.as_ref();
        debug!("Reading version table {}", path.display());

        let data = fs::read(path).map_err(|source| Error::FileNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        self.try_load_bytes(&data)
    }

    /// Load a table from memory.
    pub fn try_load_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.clear();
        if let Err(e) = self.populate(data) {
            self.clear();
            return Err(e);
        }

        info!(
            "Loaded {} offsets for version {} (module: {}, base: {})",
            self.id_to_offset.len(),
            self.version_string,
            self.module_display_name(),
            self.module_base
                .map(|base| format!("{:#x}", base))
                .unwrap_or_else(|| "unresolved".to_string())
        );
        Ok(())
    }

    fn populate(&mut self, data: &[u8]) -> Result<()> {
        let mut cursor = ByteCursor::new(data);
        let header = TableHeader::parse(&mut cursor)?;

        self.version = header.version;
        self.version_string = header.version.to_string();
        self.module_name = header.module_name;
        self.pointer_size = header.pointer_size;

        let name = (!self.module_name.is_empty()).then_some(self.module_name.as_str());
        self.module_base = self.resolver.resolve(name);
        if self.module_base.is_none() {
            warn!(
                "Module {} is not loaded; address queries will fail",
                self.module_display_name()
            );
        }

        let decoder = RecordDecoder::new(&mut cursor, header.pointer_size, header.record_count);
        for record in decoder {
            self.insert(record?);
        }

        self.stats.trailing_bytes = cursor.remaining();
        if self.stats.trailing_bytes > 0 {
            debug!("{} trailing bytes after records", self.stats.trailing_bytes);
        }
        if self.stats.duplicate_ids > 0 || self.stats.duplicate_offsets > 0 {
            debug!(
                "Overwrote {} duplicate ids and {} duplicate offsets",
                self.stats.duplicate_ids, self.stats.duplicate_offsets
            );
        }
        Ok(())
    }

    /// Later records win on either key.
    fn insert(&mut self, record: Record) {
        self.stats.records += 1;
        if self.id_to_offset.insert(record.id, record.offset).is_some() {
            self.stats.duplicate_ids += 1;
        }
        if self.offset_to_id.insert(record.offset, record.id).is_some() {
            self.stats.duplicate_offsets += 1;
        }
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn offset_of(&self, id: u64) -> Option<u64> {
        self.id_to_offset.get(&id).copied()
    }

    pub fn id_of_offset(&self, offset: u64) -> Option<u64> {
        self.offset_to_id.get(&offset).copied()
    }

    /// Runtime address of `id`: module base plus offset.
    pub fn address_of(&self, id: u64) -> Option<u64> {
        let base = self.module_base?;
        base.checked_add(self.offset_of(id)?)
    }

    /// Identifier at a runtime address inside the module.
    pub fn id_of_address(&self, address: u64) -> Option<u64> {
        let base = self.module_base?;
        self.id_of_offset(address.checked_sub(base)?)
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn version(&self) -> Version {
        self.version
    }

    /// `major.minor.revision.build` of the loaded table, empty when unloaded.
    pub fn version_string(&self) -> &str {
        &self.version_string
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn module_base(&self) -> Option<u64> {
        self.module_base
    }

    /// Pointer size the table was encoded with, 0 when unloaded.
    pub fn pointer_size(&self) -> u32 {
        self.pointer_size
    }

    /// Identifier to offset mapping, ordered by identifier.
    pub fn offsets(&self) -> &BTreeMap<u64, u64> {
        &self.id_to_offset
    }

    pub fn iter(&self) -> impl Iterator<Item = Record> + '_ {
        self.id_to_offset
            .iter()
            .map(|(&id, &offset)| Record::new(id, offset))
    }

    pub fn len(&self) -> usize {
        self.id_to_offset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_offset.is_empty()
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    fn module_display_name(&self) -> &str {
        if self.module_name.is_empty() {
            "<primary>"
        } else {
            &self.module_name
        }
    }

    /// Write every entry as `<decimal-id>\t<hex-offset>`, ascending by id.
    pub fn dump<W: Write>(&self, out: &mut W) -> Result<()> {
        dump::write_dump(out, &self.id_to_offset)
    }
}

fn report(result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to load version table: {}", e);
            false
        }
    }
}

/// Builder for Database
#[derive(Default)]
pub struct DatabaseBuilder {
    resolver: Option<SharedResolver>,
    locator: Option<SharedLocator>,
    version_provider: Option<SharedVersionProvider>,
}

impl DatabaseBuilder {
    /// Set how module bases are resolved
    pub fn resolver<R: ModuleResolver + Send + Sync + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Set how table paths are built from versions
    pub fn locator<L: FileLocator + Send + Sync + 'static>(mut self, locator: L) -> Self {
        self.locator = Some(Box::new(locator));
        self
    }

    /// Use a directory locator built from `config`
    pub fn config(self, config: &LibraryConfig) -> Self {
        self.locator(DirectoryLocator::from_config(config))
    }

    /// Set where the running version comes from
    pub fn version_provider<V: VersionProvider + Send + Sync + 'static>(
        mut self,
        provider: V,
    ) -> Self {
        self.version_provider = Some(Box::new(provider));
        self
    }

    /// Build an empty database
    pub fn build(self) -> Database {
        Database {
            id_to_offset: BTreeMap::new(),
            offset_to_id: BTreeMap::new(),
            version: Version::default(),
            version_string: String::new(),
            module_name: String::new(),
            module_base: None,
            pointer_size: 0,
            stats: LoadStats::default(),
            resolver: self
                .resolver
                .unwrap_or_else(|| Box::new(ProcessModuleResolver)),
            locator: self
                .locator
                .unwrap_or_else(|| Box::new(DirectoryLocator::default())),
            version_provider: self
                .version_provider
                .unwrap_or_else(|| Box::new(ExecutableVersionProvider)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{FixedModuleResolver, NoModuleResolver};
    use crate::stream::encode_table;

    const BASE: u64 = 0x1_4000_0000;

    fn table(records: &[(u64, u64)]) -> Vec<u8> {
        let header = TableHeader::new(Version::new(3, 0, 64, 38113), "", 8);
        encode_table(&header, records.iter().map(|&(id, offset)| Record::new(id, offset)))
    }

    fn database() -> Database {
        Database::builder()
            .resolver(FixedModuleResolver::new(BASE))
            .build()
    }

    fn assert_empty(db: &Database) {
        assert!(db.is_empty());
        assert_eq!(db.version(), Version::default());
        assert_eq!(db.version_string(), "");
        assert_eq!(db.module_name(), "");
        assert_eq!(db.module_base(), None);
        assert_eq!(db.pointer_size(), 0);
        assert_eq!(db.offset_of(25), None);
        assert_eq!(db.id_of_offset(0x1B10), None);
        assert_eq!(db.address_of(25), None);
    }

    #[test]
    fn test_load_bytes_and_query() {
        let mut db = database();
        db.try_load_bytes(&table(&[(25, 0x1B10), (123, 0x8C30)])).unwrap();

        assert_eq!(db.len(), 2);
        assert_eq!(db.version_string(), "3.0.64.38113");
        assert_eq!(db.pointer_size(), 8);
        assert_eq!(db.offset_of(25), Some(0x1B10));
        assert_eq!(db.id_of_offset(0x8C30), Some(123));
        assert_eq!(db.address_of(25), Some(BASE + 0x1B10));
        assert_eq!(db.id_of_address(BASE + 0x8C30), Some(123));
        assert_eq!(db.offset_of(26), None);
        assert_eq!(db.id_of_address(BASE + 0x1B11), None);
    }

    #[test]
    fn test_pointer_size_follows_header() {
        let header = TableHeader::new(Version::new(1, 2, 3, 4), "", 4);
        let data = encode_table(&header, [Record::new(1, 0x10), Record::new(2, 0x14)]);

        let mut db = database();
        db.try_load_bytes(&data).unwrap();
        assert_eq!(db.pointer_size(), 4);
        assert_eq!(db.stats().records, 2);

        db.try_load_bytes(&data[..data.len() - 1]).unwrap_err();
        assert_empty(&db);
    }

    #[test]
    fn test_address_below_base() {
        let mut db = database();
        db.try_load_bytes(&table(&[(1, 0)])).unwrap();
        assert_eq!(db.id_of_address(BASE), Some(1));
        assert_eq!(db.id_of_address(BASE - 1), None);
    }

    #[test]
    fn test_unresolved_module_is_not_a_failure() {
        let mut db = Database::builder().resolver(NoModuleResolver).build();
        db.try_load_bytes(&table(&[(25, 0x1B10)])).unwrap();

        assert_eq!(db.module_base(), None);
        assert_eq!(db.offset_of(25), Some(0x1B10));
        assert_eq!(db.address_of(25), None);
        assert_eq!(db.id_of_address(0x1B10), None);
    }

    #[test]
    fn test_named_module_resolution() {
        let header = TableHeader::new(Version::new(1, 0, 0, 7), "Game.dll", 8);
        let data = encode_table(&header, [Record::new(1, 0x10)]);

        let mut db = Database::builder()
            .resolver(FixedModuleResolver::new(BASE).with_module("game.dll", 0x7FF0_0000))
            .build();
        db.try_load_bytes(&data).unwrap();
        assert_eq!(db.module_name(), "Game.dll");
        assert_eq!(db.address_of(1), Some(0x7FF0_0010));
    }

    #[test]
    fn test_duplicates_last_write_wins() {
        let mut db = database();
        db.try_load_bytes(&table(&[(1, 0x10), (2, 0x20), (1, 0x30), (3, 0x20)]))
            .unwrap();

        assert_eq!(db.offset_of(1), Some(0x30));
        assert_eq!(db.id_of_offset(0x30), Some(1));
        assert_eq!(db.id_of_offset(0x20), Some(3));
        // Stale reverse entry from the overwritten record survives.
        assert_eq!(db.id_of_offset(0x10), Some(1));

        let stats = db.stats();
        assert_eq!(stats.records, 4);
        assert_eq!(stats.duplicate_ids, 1);
        assert_eq!(stats.duplicate_offsets, 1);
    }

    #[test]
    fn test_failed_load_clears_previous_table() {
        let mut db = database();
        db.try_load_bytes(&table(&[(25, 0x1B10)])).unwrap();
        assert!(!db.is_empty());

        let mut data = table(&[(25, 0x1B10), (26, 0x1B18)]);
        data.pop();
        assert!(db.try_load_bytes(&data).is_err());
        assert_empty(&db);
    }

    #[test]
    fn test_mid_stream_corruption_discards_earlier_records() {
        let mut data = table(&[(1, 0x10), (2, 0x18), (3, 0x20)]);
        // The last record is a bare opcode (increment id, scaled increment offset).
        let last_opcode = data.len() - 1;
        data[last_opcode] = (data[last_opcode] & 0xF0) | 0x0C;

        let mut db = database();
        let err = db.try_load_bytes(&data).unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { index: 2, .. }));
        assert_empty(&db);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::builder()
            .resolver(FixedModuleResolver::new(BASE))
            .locator(DirectoryLocator::new(dir.path()))
            .build();

        assert!(!db.load(Version::new(9, 9, 9, 9)));
        let err = db.try_load(Version::new(9, 9, 9, 9)).unwrap_err();
        assert!(err.is_not_found());
        assert_empty(&db);
    }

    #[test]
    fn test_load_current_without_version() {
        struct NoVersion;
        impl VersionProvider for NoVersion {
            fn current_version(&self) -> Option<Version> {
                None
            }
        }

        let mut db = Database::builder()
            .resolver(FixedModuleResolver::new(BASE))
            .version_provider(NoVersion)
            .build();
        db.try_load_bytes(&table(&[(1, 1)])).unwrap();

        assert!(matches!(db.try_load_current(), Err(Error::VersionUnavailable)));
        assert_empty(&db);
        assert!(!db.load_current());
    }

    #[test]
    fn test_clear() {
        let mut db = database();
        db.try_load_bytes(&table(&[(25, 0x1B10)])).unwrap();
        db.clear();
        assert_empty(&db);
        assert_eq!(db.stats(), LoadStats::default());
    }

    #[test]
    fn test_dump_ascending_ids() {
        let mut db = database();
        db.try_load_bytes(&table(&[(123, 0x8C30), (25, 0x1B10)])).unwrap();

        let mut out = Vec::new();
        db.dump(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "25\t1b10\n123\t8c30\n");
        assert_eq!(
            db.iter().collect::<Vec<_>>(),
            vec![Record::new(25, 0x1B10), Record::new(123, 0x8C30)]
        );
    }

    #[test]
    fn test_trailing_bytes_are_tolerated() {
        let mut data = table(&[(1, 0x10)]);
        data.extend_from_slice(&[0xEE, 0xEE]);

        let mut db = database();
        db.try_load_bytes(&data).unwrap();
        assert_eq!(db.stats().trailing_bytes, 2);
    }

    #[test]
    fn test_database_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Database>();
    }
}
