//! Fixed-size table header preceding the record stream.

use tracing::debug;

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::version::Version;

/// The only format revision this crate reads.
pub const FORMAT_TAG: i32 = 2;

/// Module names must be shorter than this.
pub const MAX_MODULE_NAME_LEN: i32 = 0x10000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeader {
    pub version: Version,
    /// Module the offsets are relative to; empty means the primary executable.
    pub module_name: String,
    pub pointer_size: u32,
    pub record_count: u32,
}

impl TableHeader {
    pub fn new(version: Version, module_name: impl Into<String>, pointer_size: u32) -> Self {
        Self {
            version,
            module_name: module_name.into(),
            pointer_size,
            record_count: 0,
        }
    }

    /// Parse the header, leaving `cursor` at the first record.
    ///
    /// The format tag is checked before anything else is read.
    pub fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let tag = cursor.read_i32()?;
        if tag != FORMAT_TAG {
            return Err(Error::FormatMismatch {
                expected: FORMAT_TAG,
                found: tag,
            });
        }

        let mut fields = [0u32; 4];
        for field in &mut fields {
            *field = cursor.read_u32()?;
        }
        let version = Version::from(fields);

        let name_len = cursor.read_i32()?;
        if !(0..MAX_MODULE_NAME_LEN).contains(&name_len) {
            return Err(Error::MalformedLength {
                field: "module name",
                value: i64::from(name_len),
            });
        }
        let module_name = decode_module_name(cursor.take(name_len as usize)?);

        let pointer_size = cursor.read_i32()?;
        if pointer_size != 4 && pointer_size != 8 {
            return Err(Error::UnsupportedPointerSize(pointer_size));
        }

        let record_count = cursor.read_i32()?;
        if record_count < 0 {
            return Err(Error::MalformedLength {
                field: "record count",
                value: i64::from(record_count),
            });
        }

        debug!(
            "Table header: version={}, module={:?}, pointer_size={}, records={}",
            version, module_name, pointer_size, record_count
        );

        Ok(Self {
            version,
            module_name,
            pointer_size: pointer_size as u32,
            record_count: record_count as u32,
        })
    }

    /// Append the encoded header to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&FORMAT_TAG.to_le_bytes());
        for field in self.version.to_array() {
            out.extend_from_slice(&field.to_le_bytes());
        }
        out.extend_from_slice(&(self.module_name.len() as i32).to_le_bytes());
        out.extend_from_slice(self.module_name.as_bytes());
        out.extend_from_slice(&(self.pointer_size as i32).to_le_bytes());
        out.extend_from_slice(&(self.record_count as i32).to_le_bytes());
    }
}

/// Names are stored without a terminator but may still carry NUL padding.
fn decode_module_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
