//! Delta codec for identifier and offset scalars.
//!
//! Each scalar in the record stream is stored relative to the value decoded
//! for the previous record. A 3-bit [`DeltaMode`] selects how many payload
//! bytes follow and how they combine with that previous value. Offsets may
//! additionally be *scaled*: stored as an index into a pointer-sized array,
//! which turns 8-byte strides into single increments.
//!
//! All arithmetic is modular on `u64`.

use strum::{Display, FromRepr};

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};

/// Bit 3 of the offset nibble: the offset is scaled by the pointer size.
pub const SCALED_FLAG: u8 = 0x8;

/// Mask for the mode bits of the offset nibble.
const MODE_MASK: u8 = 0x7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, Display)]
#[repr(u8)]
pub enum DeltaMode {
    /// Absolute 8-byte value.
    #[strum(serialize = "lit64")]
    Literal64 = 0,
    /// `previous + 1`, no payload.
    #[strum(serialize = "inc")]
    Increment = 1,
    #[strum(serialize = "add8")]
    AddU8 = 2,
    #[strum(serialize = "sub8")]
    SubU8 = 3,
    #[strum(serialize = "add16")]
    AddU16 = 4,
    #[strum(serialize = "sub16")]
    SubU16 = 5,
    /// Absolute 2-byte value.
    #[strum(serialize = "lit16")]
    Literal16 = 6,
    /// Absolute 4-byte value.
    #[strum(serialize = "lit32")]
    Literal32 = 7,
}

/// Modes indexed by their 3-bit value.
const MODES: [DeltaMode; 8] = [
    DeltaMode::Literal64,
    DeltaMode::Increment,
    DeltaMode::AddU8,
    DeltaMode::SubU8,
    DeltaMode::AddU16,
    DeltaMode::SubU16,
    DeltaMode::Literal16,
    DeltaMode::Literal32,
];

/// Encoder preference: cheapest payload first, absolute before relative on ties.
const PREFERENCE: [DeltaMode; 8] = [
    DeltaMode::Increment,
    DeltaMode::AddU8,
    DeltaMode::SubU8,
    DeltaMode::Literal16,
    DeltaMode::AddU16,
    DeltaMode::SubU16,
    DeltaMode::Literal32,
    DeltaMode::Literal64,
];

impl DeltaMode {
    /// Map a 4-bit field to a mode. Values 8..=15 have no meaning.
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        Self::from_repr(nibble)
    }

    /// Map the three offset mode bits to a mode. Every value is valid.
    pub fn from_bits(bits: u8) -> Self {
        MODES[usize::from(bits & MODE_MASK)]
    }

    pub fn nibble(self) -> u8 {
        self as u8
    }

    /// Number of payload bytes following the opcode for this mode.
    pub fn payload_len(self) -> usize {
        match self {
            Self::Increment => 0,
            Self::AddU8 | Self::SubU8 => 1,
            Self::AddU16 | Self::SubU16 | Self::Literal16 => 2,
            Self::Literal32 => 4,
            Self::Literal64 => 8,
        }
    }

    /// Read this mode's payload and combine it with `previous`.
    pub fn decode(self, cursor: &mut ByteCursor<'_>, previous: u64) -> Result<u64> {
        let value = match self {
            Self::Literal64 => cursor.read_u64()?,
            Self::Increment => previous.wrapping_add(1),
            Self::AddU8 => previous.wrapping_add(u64::from(cursor.read_u8()?)),
            Self::SubU8 => previous.wrapping_sub(u64::from(cursor.read_u8()?)),
            Self::AddU16 => previous.wrapping_add(u64::from(cursor.read_u16()?)),
            Self::SubU16 => previous.wrapping_sub(u64::from(cursor.read_u16()?)),
            Self::Literal16 => u64::from(cursor.read_u16()?),
            Self::Literal32 => u64::from(cursor.read_u32()?),
        };
        Ok(value)
    }

    /// Whether `value` is representable in this mode relative to `previous`.
    pub fn fits(self, value: u64, previous: u64) -> bool {
        let up = value.wrapping_sub(previous);
        let down = previous.wrapping_sub(value);
        match self {
            Self::Literal64 => true,
            Self::Increment => up == 1,
            Self::AddU8 => up <= u64::from(u8::MAX),
            Self::SubU8 => down <= u64::from(u8::MAX),
            Self::AddU16 => up <= u64::from(u16::MAX),
            Self::SubU16 => down <= u64::from(u16::MAX),
            Self::Literal16 => value <= u64::from(u16::MAX),
            Self::Literal32 => value <= u64::from(u32::MAX),
        }
    }

    /// Pick the mode with the smallest payload able to express `value`.
    pub fn choose(value: u64, previous: u64) -> Self {
        PREFERENCE
            .into_iter()
            .find(|mode| mode.fits(value, previous))
            .unwrap_or(Self::Literal64)
    }

    /// Append this mode's payload for `value`. The mode must [`fit`](Self::fits).
    pub fn write_payload(self, value: u64, previous: u64, out: &mut Vec<u8>) {
        debug_assert!(self.fits(value, previous), "{self} cannot encode {value:#x}");
        let up = value.wrapping_sub(previous);
        let down = previous.wrapping_sub(value);
        match self {
            Self::Literal64 => out.extend_from_slice(&value.to_le_bytes()),
            Self::Increment => {}
            Self::AddU8 => out.push(up as u8),
            Self::SubU8 => out.push(down as u8),
            Self::AddU16 => out.extend_from_slice(&(up as u16).to_le_bytes()),
            Self::SubU16 => out.extend_from_slice(&(down as u16).to_le_bytes()),
            Self::Literal16 => out.extend_from_slice(&(value as u16).to_le_bytes()),
            Self::Literal32 => out.extend_from_slice(&(value as u32).to_le_bytes()),
        }
    }
}

/// Decoded opcode byte: identifier mode in the low nibble, offset mode and
/// scaled flag in the high nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub id: DeltaMode,
    pub offset: DeltaMode,
    pub scaled: bool,
}

impl Opcode {
    /// Split an opcode byte. `index` is the record position, used for errors.
    pub fn parse(byte: u8, index: usize) -> Result<Self> {
        let low = byte & 0x0F;
        let high = byte >> 4;

        let id = DeltaMode::from_nibble(low).ok_or(Error::CorruptRecord {
            index,
            side: "identifier",
            nibble: low,
        })?;
        // Bit 3 of the high nibble is the scaled flag, so only the
        // identifier nibble can name an unused mode.
        Ok(Self {
            id,
            offset: DeltaMode::from_bits(high),
            scaled: high & SCALED_FLAG != 0,
        })
    }

    pub fn to_byte(self) -> u8 {
        let scaled = if self.scaled { SCALED_FLAG } else { 0 };
        ((self.offset.nibble() | scaled) << 4) | self.id.nibble()
    }
}

/// Decode an offset, applying pointer-size scaling when requested.
///
/// The scaled path divides `previous` down to an index, decodes relative to
/// it, and multiplies the result back up.
pub fn decode_offset(
    cursor: &mut ByteCursor<'_>,
    mode: DeltaMode,
    scaled: bool,
    previous: u64,
    pointer_size: u64,
) -> Result<u64> {
    if scaled {
        let index = mode.decode(cursor, previous / pointer_size)?;
        Ok(index.wrapping_mul(pointer_size))
    } else {
        mode.decode(cursor, previous)
    }
}

/// Choose the cheapest encoding for an offset, returning `(mode, scaled)`.
///
/// The scaled form is only used when the offset is pointer-aligned and it
/// saves payload bytes over the raw form.
pub fn choose_offset(value: u64, previous: u64, pointer_size: u64) -> (DeltaMode, bool) {
    let raw = DeltaMode::choose(value, previous);
    if value % pointer_size == 0 {
        let scaled = DeltaMode::choose(value / pointer_size, previous / pointer_size);
        if scaled.payload_len() < raw.payload_len() {
            return (scaled, true);
        }
    }
    (raw, false)
}

/// Append an offset payload produced by [`choose_offset`].
pub fn write_offset(
    mode: DeltaMode,
    scaled: bool,
    value: u64,
    previous: u64,
    pointer_size: u64,
    out: &mut Vec<u8>,
) {
    if scaled {
        mode.write_payload(value / pointer_size, previous / pointer_size, out);
    } else {
        mode.write_payload(value, previous, out);
    }
}
