//! Lookup command implementation.

use anyhow::{Result, bail};
use versionlib::LibraryConfig;

use super::hex_utils::{format_hex, parse_hex};
use super::{TableSource, open_database};

/// A single lookup request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    /// Identifier to offset (and address, when a base is known)
    Id(u64),
    /// Module-relative offset to identifier
    Offset(u64),
    /// Absolute address to identifier
    Address(u64),
}

impl Query {
    /// Build a query from the mutually exclusive command-line options.
    pub fn from_args(id: Option<u64>, offset: Option<&str>, address: Option<&str>) -> Result<Self> {
        match (id, offset, address) {
            (Some(id), None, None) => Ok(Query::Id(id)),
            (None, Some(offset), None) => Ok(Query::Offset(parse_hex(offset)?)),
            (None, None, Some(address)) => Ok(Query::Address(parse_hex(address)?)),
            (None, None, None) => bail!("One of --id, --offset or --address is required"),
            _ => bail!("Only one of --id, --offset or --address may be given"),
        }
    }
}

/// Resolve a query against a loaded table and render the answer.
fn answer(db: &versionlib::Database, query: Query) -> Result<String> {
    match query {
        Query::Id(id) => {
            let Some(offset) = db.offset_of(id) else {
                bail!("Id {} is not in the table", id);
            };
            Ok(match db.address_of(id) {
                Some(address) => format!(
                    "{}\toffset {}\taddress {}",
                    id,
                    format_hex(offset),
                    format_hex(address)
                ),
                None => format!("{}\toffset {}", id, format_hex(offset)),
            })
        }
        Query::Offset(offset) => match db.id_of_offset(offset) {
            Some(id) => Ok(format!("{}\t{}", format_hex(offset), id)),
            None => bail!("Offset {} is not in the table", format_hex(offset)),
        },
        Query::Address(address) => match db.id_of_address(address) {
            Some(id) => Ok(format!("{}\t{}", format_hex(address), id)),
            None => bail!("Address {} does not map to an id", format_hex(address)),
        },
    }
}

/// Run the lookup command
pub fn run(
    config: &LibraryConfig,
    source: TableSource,
    base: Option<&str>,
    query: Query,
) -> Result<()> {
    let base = base.map(parse_hex).transpose()?;
    let db = open_database(config, &source, base)?;
    println!("{}", answer(&db, query)?);
    Ok(())
}
