//! Plain-text rendering of a table: `<decimal-id>\t<hex-offset>` per line.
//!
//! The text form is diagnostic. [`parse_dump`] exists so tables can be rebuilt
//! from hand-edited listings, not as a lossless serialization: header fields
//! are not part of it.

use std::io::Write;

use crate::error::{Error, Result};
use crate::stream::Record;

/// Write one line per entry, in iteration order.
pub fn write_dump<'a, W, I>(out: &mut W, entries: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = (&'a u64, &'a u64)>,
{
    for (id, offset) in entries {
        writeln!(out, "{}\t{:x}", id, offset)?;
    }
    out.flush()?;
    Ok(())
}

/// Parse dump text back into records.
///
/// Blank lines and lines starting with `#` are skipped. Offsets may carry a
/// `0x` prefix. Records keep their order in the text.
pub fn parse_dump(text: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let invalid = || Error::InvalidDumpLine {
            line: i + 1,
            content: line.to_string(),
        };

        let mut fields = trimmed.split_whitespace();
        let (Some(id), Some(offset), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(invalid());
        };
        let id = id.parse::<u64>().map_err(|_| invalid())?;
        let offset = offset
            .strip_prefix("0x")
            .or_else(|| offset.strip_prefix("0X"))
            .unwrap_or(offset);
        let offset = u64::from_str_radix(offset, 16).map_err(|_| invalid())?;

        records.push(Record::new(id, offset));
    }
    Ok(records)
}
