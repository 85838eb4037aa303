//! Record stream: opcode-driven (identifier, offset) pairs.
//!
//! Every record starts with an [`Opcode`] byte followed by the identifier
//! payload and then the offset payload. Both scalars are decoded relative to
//! the previous record's values, so the stream can only be walked in order
//! from the start.

use tracing::debug;

use crate::codec::{self, DeltaMode, Opcode};
use crate::cursor::ByteCursor;
use crate::error::Result;
use crate::header::TableHeader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Record {
    pub id: u64,
    pub offset: u64,
}

impl Record {
    pub const fn new(id: u64, offset: u64) -> Self {
        Self { id, offset }
    }
}

/// Iterator over the records of a stream.
///
/// Yields at most one error, after which it is exhausted.
pub struct RecordDecoder<'a, 'b> {
    cursor: &'b mut ByteCursor<'a>,
    pointer_size: u64,
    remaining: u32,
    index: usize,
    previous_id: u64,
    previous_offset: u64,
    failed: bool,
}

impl<'a, 'b> RecordDecoder<'a, 'b> {
    /// `cursor` must sit right after the header.
    pub fn new(cursor: &'b mut ByteCursor<'a>, pointer_size: u32, count: u32) -> Self {
        Self {
            cursor,
            pointer_size: u64::from(pointer_size),
            remaining: count,
            index: 0,
            previous_id: 0,
            previous_offset: 0,
            failed: false,
        }
    }

    fn decode_next(&mut self) -> Result<Record> {
        let opcode = Opcode::parse(self.cursor.read_u8()?, self.index)?;

        let id = opcode.id.decode(self.cursor, self.previous_id)?;
        let offset = codec::decode_offset(
            self.cursor,
            opcode.offset,
            opcode.scaled,
            self.previous_offset,
            self.pointer_size,
        )?;

        self.previous_id = id;
        self.previous_offset = offset;
        Ok(Record { id, offset })
    }
}

impl Iterator for RecordDecoder<'_, '_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }

        let result = self.decode_next();
        match &result {
            Ok(_) => {
                self.remaining -= 1;
                self.index += 1;
            }
            Err(_) => self.failed = true,
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, Some(self.remaining as usize))
        }
    }
}

/// Decode every record or none of them.
pub fn decode_all(
    cursor: &mut ByteCursor<'_>,
    pointer_size: u32,
    count: u32,
) -> Result<Vec<Record>> {
    let records = RecordDecoder::new(cursor, pointer_size, count).collect::<Result<Vec<_>>>()?;
    if !cursor.is_empty() {
        debug!(
            "{} trailing bytes after {} records",
            cursor.remaining(),
            records.len()
        );
    }
    Ok(records)
}

/// Writes records in stream order, choosing the cheapest opcode for each.
#[derive(Debug)]
pub struct RecordEncoder {
    pointer_size: u64,
    previous_id: u64,
    previous_offset: u64,
    count: u32,
    buf: Vec<u8>,
}

impl RecordEncoder {
    pub fn new(pointer_size: u32) -> Self {
        Self {
            pointer_size: u64::from(pointer_size),
            previous_id: 0,
            previous_offset: 0,
            count: 0,
            buf: Vec::new(),
        }
    }

    pub fn push(&mut self, record: Record) {
        let id_mode = DeltaMode::choose(record.id, self.previous_id);
        let (offset_mode, scaled) =
            codec::choose_offset(record.offset, self.previous_offset, self.pointer_size);

        let opcode = Opcode {
            id: id_mode,
            offset: offset_mode,
            scaled,
        };
        self.buf.push(opcode.to_byte());
        id_mode.write_payload(record.id, self.previous_id, &mut self.buf);
        codec::write_offset(
            offset_mode,
            scaled,
            record.offset,
            self.previous_offset,
            self.pointer_size,
            &mut self.buf,
        );

        self.previous_id = record.id;
        self.previous_offset = record.offset;
        self.count += 1;
    }

    pub fn len(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Encoded record bytes, without a header.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Encode a complete table. `header.record_count` is overwritten.
pub fn encode_table<I>(header: &TableHeader, records: I) -> Vec<u8>
where
    I: IntoIterator<Item = Record>,
{
    let mut encoder = RecordEncoder::new(header.pointer_size);
    for record in records {
        encoder.push(record);
    }

    let header = TableHeader {
        record_count: encoder.len(),
        ..header.clone()
    };
    let mut out = Vec::new();
    header.write(&mut out);
    out.extend_from_slice(&encoder.into_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_decode_hand_written_stream() {
        let data = [
            0x76, 25, 0, 0x10, 0x1B, 0, 0, // id lit16 = 25, offset lit32 = 0x1B10
            0x41, 0x20, 0x71, // id +1 = 26, offset +0x7120 = 0x8C30
            0x95, 0x04, 0, // id -4 (sub16) = 22, offset scaled +1 = (0x8C30/8 + 1) * 8
        ];
        let mut cursor = ByteCursor::new(&data);
        let records = decode_all(&mut cursor, 8, 3).unwrap();

        assert_eq!(
            records,
            vec![
                Record::new(25, 0x1B10),
                Record::new(26, 0x8C30),
                Record::new(22, 0x8C38),
            ]
        );
    }

    #[test]
    fn test_chain_carries_scaled_result() {
        // A scaled record's output is the raw base for the next unscaled record.
        let data = [
            0x06, 0x01, 0x00, 0x10, 0, 0, 0, 0, 0, 0, 0, // id 1, offset lit64 0x10
            0x91, // id 2, offset (0x10/4 + 1) * 4 = 0x14
            0x21, 0x01, // id 3, offset 0x14 + 1 = 0x15
        ];
        let mut cursor = ByteCursor::new(&data);
        let records = decode_all(&mut cursor, 4, 3).unwrap();
        assert_eq!(records[1], Record::new(2, 0x14));
        assert_eq!(records[2], Record::new(3, 0x15));
    }

    #[test]
    fn test_decode_scaled_subtraction_and_literal() {
        let data = [
            0x76, 25, 0, 0x30, 0x8C, 0, 0, // id 25, offset lit32 0x8C30
            0xB1, 0x10, // id 26, offset (0x8C30/8 - 0x10) * 8 = 0x8BB0
            0xD1, 0x00, 0x01, // id 27, offset (0x8BB0/8 - 0x100) * 8 = 0x83B0
            0x81, 0x20, 0, 0, 0, 0, 0, 0, 0, // id 28, offset lit64 0x20 * 8 = 0x100
        ];
        let mut cursor = ByteCursor::new(&data);
        let records = decode_all(&mut cursor, 8, 4).unwrap();

        assert_eq!(
            records,
            vec![
                Record::new(25, 0x8C30),
                Record::new(26, 0x8BB0),
                Record::new(27, 0x83B0),
                Record::new(28, 0x100),
            ]
        );
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_zero_records() {
        let mut cursor = ByteCursor::new(&[0xFF]);
        assert!(decode_all(&mut cursor, 8, 0).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_opcode_fails_whole_stream() {
        let data = [0x11, 0x11, 0x1F, 0x11];
        let mut cursor = ByteCursor::new(&data);
        let err = decode_all(&mut cursor, 8, 4).unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { index: 2, nibble: 0xF, .. }));
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let data = [0x11, 0x08];
        let mut cursor = ByteCursor::new(&data);
        let mut decoder = RecordDecoder::new(&mut cursor, 8, 5);
        assert_eq!(decoder.next().unwrap().unwrap(), Record::new(1, 1));
        assert!(decoder.next().unwrap().is_err());
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_truncated_payload() {
        let data = [0x70, 1, 2, 3, 4, 5, 6, 7, 8, 0xAA];
        let mut cursor = ByteCursor::new(&data);
        let err = decode_all(&mut cursor, 8, 1).unwrap_err();
        assert!(matches!(err, Error::TruncatedStream { needed: 4, remaining: 1, .. }));
    }

    #[test]
    fn test_count_exceeds_data() {
        let data = [0x11, 0x11];
        let mut cursor = ByteCursor::new(&data);
        let err = decode_all(&mut cursor, 8, 3).unwrap_err();
        assert!(matches!(err, Error::TruncatedStream { needed: 1, remaining: 0, .. }));
    }

    #[test]
    fn test_encoder_uses_compact_modes() {
        let mut encoder = RecordEncoder::new(8);
        encoder.push(Record::new(1, 0x1000));
        encoder.push(Record::new(2, 0x1008));
        let bytes = encoder.into_bytes();

        // inc id + lit16 offset, then inc id + scaled inc offset in one byte.
        assert_eq!(bytes, vec![0x61, 0x00, 0x10, 0x91]);
    }

    #[test]
    fn test_encode_decode_table() {
        let records: Vec<Record> = (0..500u64)
            .map(|i| Record::new(i * 3 + (i % 7), 0x1000 + i * 8 + (i % 5) * 0x10000))
            .chain([Record::new(u64::MAX, 0x7FF7_0000_0000), Record::new(5, 1)])
            .collect();

        for pointer_size in [4, 8] {
            let header = TableHeader::new(Default::default(), "", pointer_size);
            let data = encode_table(&header, records.iter().copied());

            let mut cursor = ByteCursor::new(&data);
            let parsed = TableHeader::parse(&mut cursor).unwrap();
            assert_eq!(parsed.record_count as usize, records.len());

            let decoded =
                decode_all(&mut cursor, parsed.pointer_size, parsed.record_count).unwrap();
            assert_eq!(decoded, records);
            assert!(cursor.is_empty());
        }
    }
}
