use crate::Radix;
use serde::{Deserialize, Serialize};

/// Largest digit count any supported layout packs into one word.
pub const MAX_DIGITS_PER_WORD: usize = 19;

/// Binary layout of the packed words in a block payload.
///
/// | format     | width | byte order    | radix 10 | radix 16 |
/// |------------|-------|---------------|----------|----------|
/// | `packed32` | 4     | big-endian    | 9        | 8        |
/// | `ycd64`    | 8     | little-endian | 19       | 16       |
///
/// `ycd64` is the layout of y-cruncher `.ycd` shards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordFormat {
    #[default]
    Packed32,
    Ycd64,
}

impl WordFormat {
    /// Size of one word in bytes.
    pub const fn byte_width(self) -> usize {
        match self {
            Self::Packed32 => 4,
            Self::Ycd64 => 8,
        }
    }

    /// Number of digits packed into one word.
    pub const fn digits_per_word(self, radix: Radix) -> usize {
        match (self, radix) {
            (Self::Packed32, Radix::Decimal) => 9,
            (Self::Packed32, Radix::Hexadecimal) => 8,
            (Self::Ycd64, Radix::Decimal) => 19,
            (Self::Ycd64, Radix::Hexadecimal) => 16,
        }
    }

    /// Bytes needed to store `digits` digits; a partially used final word
    /// still occupies a full word.
    pub const fn bytes_for_digits(self, radix: Radix, digits: u64) -> u64 {
        let dpw = self.digits_per_word(radix) as u64;
        digits.div_ceil(dpw) * self.byte_width() as u64
    }

    /// Reads one word from the front of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than [`WordFormat::byte_width`].
    #[inline]
    pub fn read_word(self, bytes: &[u8]) -> u64 {
        match self {
            Self::Packed32 => {
                let mut raw = [0_u8; 4];
                raw.copy_from_slice(&bytes[..4]);
                u64::from(u32::from_be_bytes(raw))
            }
            Self::Ycd64 => {
                let mut raw = [0_u8; 8];
                raw.copy_from_slice(&bytes[..8]);
                u64::from_le_bytes(raw)
            }
        }
    }

    /// Appends `word` to `out` in the format's byte order.
    ///
    /// Only the low 32 bits of `word` are written for `packed32`.
    pub fn write_word(self, word: u64, out: &mut Vec<u8>) {
        match self {
            Self::Packed32 => out.extend_from_slice(&(word as u32).to_be_bytes()),
            Self::Ycd64 => out.extend_from_slice(&word.to_le_bytes()),
        }
    }
}
