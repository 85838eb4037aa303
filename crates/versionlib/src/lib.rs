//! # versionlib
//!
//! Resolves version-independent identifiers to offsets inside a loaded module,
//! and back.
//!
//! A version table maps stable numeric identifiers to byte offsets for one
//! specific build. At runtime the table matching the running build is loaded
//! into a [`Database`], which then answers identifier, offset and address
//! queries.
//!
//! This crate provides:
//! - The table format: header parsing and the delta-encoded record stream
//! - An offset database with all-or-nothing loading
//! - Pluggable lookups for module bases, the running version and table paths
//! - Text dumps of loaded tables
//!
//! The OS-facing lookups ([`ProcessModuleResolver`],
//! [`ExecutableVersionProvider`]) only resolve on Windows; elsewhere they report
//! nothing and can be replaced with the fixed implementations.

pub mod codec;
pub mod config;
pub mod cursor;
pub mod database;
pub mod dump;
pub mod error;
pub mod header;
pub mod locator;
pub mod resolver;
pub mod stream;
pub mod version;

pub use codec::{DeltaMode, Opcode};
pub use config::{LibraryConfig, LibraryConfigBuilder};
pub use cursor::ByteCursor;
pub use database::{Database, DatabaseBuilder, LoadStats};
pub use dump::{parse_dump, write_dump};
pub use error::{Error, Result};
pub use header::{FORMAT_TAG, MAX_MODULE_NAME_LEN, TableHeader};
pub use locator::{DirectoryLocator, FileLocator};
pub use resolver::{FixedModuleResolver, ModuleResolver, NoModuleResolver, ProcessModuleResolver};
pub use stream::{Record, RecordDecoder, RecordEncoder, decode_all, encode_table};
pub use version::{ExecutableVersionProvider, FixedVersionProvider, Version, VersionProvider};
