use crate::{BlockDescriptor, Error, Radix, Result, WordFormat};

/// Digit and raw-byte extent of one block in the logical stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSpan {
    pub first_digit: u64,
    pub digits: u64,
    pub first_byte: u64,
    pub bytes: u64,
}

impl BlockSpan {
    pub const fn end_digit(&self) -> u64 {
        self.first_digit + self.digits
    }

    pub const fn end_byte(&self) -> u64 {
        self.first_byte + self.bytes
    }
}

/// Where a digit lives: its block, its word, and its place in that word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WordPosition {
    pub block: usize,
    /// Index of the word within its block.
    pub word_index: u64,
    /// Index of the digit within its word.
    pub digit_in_word: usize,
    /// Absolute digit offset of the word's first digit.
    pub word_first_digit: u64,
    /// Digits of this word that belong to the stream; less than a full word
    /// only for the final word of a block.
    pub valid_digits: usize,
    /// Offset of the word in the raw-byte stream.
    pub raw_offset: u64,
}

/// Prefix sums over a validated block list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockLayout {
    radix: Radix,
    format: WordFormat,
    spans: Vec<BlockSpan>,
    total_digits: u64,
    total_bytes: u64,
}

impl BlockLayout {
    pub(crate) fn new(format: WordFormat, blocks: &[BlockDescriptor]) -> Result<Self> {
        let first = blocks
            .first()
            .ok_or_else(|| Error::invalid_catalog("catalog has no blocks"))?;
        let radix = first.header.radix;

        let mut spans = Vec::with_capacity(blocks.len());
        let mut first_digit = 0_u64;
        let mut first_byte = 0_u64;
        let mut declared_total = 0_u64;

        for (i, block) in blocks.iter().enumerate() {
            let header = &block.header;
            if header.radix != radix {
                return Err(Error::invalid_catalog(format!(
                    "block {} has radix {} but the catalog is radix {radix}",
                    header.block_id, header.radix
                )));
            }
            if header.block_id != first.header.block_id + i as u64 {
                return Err(Error::invalid_catalog(format!(
                    "block ids must be consecutive: expected {}, found {}",
                    first.header.block_id + i as u64,
                    header.block_id
                )));
            }
            if header.block_size == 0 {
                return Err(Error::invalid_catalog(format!(
                    "block {} is empty",
                    header.block_id
                )));
            }

            let bytes = format.bytes_for_digits(radix, header.block_size);
            if header.payload_length != 0 && header.payload_length < bytes {
                return Err(Error::invalid_catalog(format!(
                    "block {} declares {} payload bytes but needs {bytes}",
                    header.block_id, header.payload_length
                )));
            }
            if header.total_digits != 0 {
                declared_total = declared_total.max(header.total_digits);
            }

            spans.push(BlockSpan {
                first_digit,
                digits: header.block_size,
                first_byte,
                bytes,
            });
            first_digit += header.block_size;
            first_byte += bytes;
        }

        let total_digits = if declared_total == 0 {
            first_digit
        } else {
            declared_total.min(first_digit)
        };

        Ok(Self {
            radix,
            format,
            spans,
            total_digits,
            total_bytes: first_byte,
        })
    }

    pub const fn radix(&self) -> Radix {
        self.radix
    }

    pub const fn format(&self) -> WordFormat {
        self.format
    }

    pub const fn digits_per_word(&self) -> usize {
        self.format.digits_per_word(self.radix)
    }

    /// Number of digits the stream serves.
    pub const fn total_digits(&self) -> u64 {
        self.total_digits
    }

    /// Size of the raw stream, including padding in partially used words.
    pub const fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn spans(&self) -> &[BlockSpan] {
        &self.spans
    }

    pub fn span(&self, block: usize) -> Option<&BlockSpan> {
        self.spans.get(block)
    }

    /// Index of the block containing raw byte `offset`.
    pub fn block_for_byte(&self, offset: u64) -> Option<usize> {
        let idx = self.spans.partition_point(|s| s.end_byte() <= offset);
        (idx < self.spans.len()).then_some(idx)
    }

    /// Index of the block containing digit `offset`.
    pub fn block_for_digit(&self, offset: u64) -> Option<usize> {
        let idx = self.spans.partition_point(|s| s.end_digit() <= offset);
        (idx < self.spans.len()).then_some(idx)
    }

    /// Resolves a digit offset to its word.
    ///
    /// Word arithmetic is relative to the containing block's first digit, so a
    /// block whose size is not a multiple of the word width still maps
    /// exactly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when `offset >= total_digits`.
    pub fn locate(&self, offset: u64) -> Result<WordPosition> {
        let out_of_range = || Error::OutOfRange {
            offset,
            len: self.total_digits,
        };
        if offset >= self.total_digits {
            return Err(out_of_range());
        }
        let block = self.block_for_digit(offset).ok_or_else(out_of_range)?;
        let span = &self.spans[block];
        let dpw = self.digits_per_word() as u64;

        let local = offset - span.first_digit;
        let word_index = local / dpw;
        let word_first_digit = span.first_digit + word_index * dpw;
        let word_end = (word_first_digit + dpw)
            .min(span.end_digit())
            .min(self.total_digits);

        Ok(WordPosition {
            block,
            word_index,
            digit_in_word: (local % dpw) as usize,
            word_first_digit,
            valid_digits: (word_end - word_first_digit) as usize,
            raw_offset: span.first_byte + word_index * self.format.byte_width() as u64,
        })
    }
}
