use crate::{
    BlockLayout, Error, MAX_DIGITS_PER_WORD, RawRead, Result, decode_word,
    raw::{check_range, resolve_seek},
};
use std::{io::SeekFrom, sync::Arc};

/// The word under the cursor, already rendered as digits.
#[derive(Clone, Copy, Debug)]
struct DecodedWord {
    /// Absolute offset of `digits[0]`.
    first_digit: u64,
    /// Leading digits that belong to the stream.
    valid: usize,
    digits: [u8; MAX_DIGITS_PER_WORD],
}

impl DecodedWord {
    const fn contains(&self, offset: u64) -> bool {
        offset >= self.first_digit && offset < self.first_digit + self.valid as u64
    }

    fn tail(&self, offset: u64) -> &[u8] {
        let start = (offset - self.first_digit) as usize;
        &self.digits[start..self.valid]
    }
}

/// Random-access, seekable stream of decoded digit characters.
///
/// Offsets are digit positions in `[0, total_digits)`. Sequential reads
/// decode one word at a time through the raw reader's cursor;
/// [`DigitReader::read_at`] decodes only the words a request covers and
/// leaves the cursor and buffered word alone.
///
/// # Example
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), pipal::Error> {
/// use pipal::{
///     BlockDescriptor, BlockHeader, DigitReader, MemoryBucket, Radix, ResultSet, WordFormat,
/// };
/// use std::sync::Arc;
///
/// // One block of nine digits packed into a single big-endian word.
/// let bucket = MemoryBucket::new().with_object("pi-0", 141_592_653_u32.to_be_bytes().to_vec());
/// let set = ResultSet::new(
///     WordFormat::Packed32,
///     vec![BlockDescriptor {
///         header: BlockHeader {
///             radix: Radix::Decimal,
///             block_id: 0,
///             block_size: 9,
///             payload_length: 4,
///             total_digits: 0,
///         },
///         name: "pi-0".to_string(),
///         first_digit_offset: 0,
///     }],
/// )?;
///
/// let reader = DigitReader::new(set.reader(Arc::new(bucket)));
/// let mut digits = [0_u8; 5];
/// reader.read_at(&mut digits, 2).await?;
/// assert_eq!(&digits, b"15926");
/// # Ok(())
/// # }
/// ```
pub struct DigitReader<R> {
    raw: R,
    layout: Arc<BlockLayout>,
    pos: u64,
    word: Option<DecodedWord>,
    closed: bool,
}

impl<R: RawRead> DigitReader<R> {
    pub fn new(raw: R) -> Self {
        let layout = Arc::clone(raw.layout());
        Self {
            raw,
            layout,
            pos: 0,
            word: None,
            closed: false,
        }
    }

    /// Current digit cursor.
    pub const fn position(&self) -> u64 {
        self.pos
    }

    /// Number of digits the stream serves.
    pub fn total_digits(&self) -> u64 {
        self.layout.total_digits()
    }

    pub fn layout(&self) -> &Arc<BlockLayout> {
        &self.layout
    }

    const fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Reads up to `buf.len()` digits at the cursor and advances it.
    ///
    /// Returns `Ok(0)` for an empty `buf`, even on a closed reader, and at the
    /// end of the stream.
    ///
    /// # Errors
    ///
    /// Propagates raw read and decode errors. A failed read leaves the cursor
    /// where the last successfully copied digit ended.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.ensure_open()?;

        let total = self.layout.total_digits();
        let mut filled = 0;
        while filled < buf.len() && self.pos < total {
            let word = match self.word {
                Some(word) if word.contains(self.pos) => word,
                _ => self.load_word(self.pos).await?,
            };
            let tail = word.tail(self.pos);
            let n = tail.len().min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&tail[..n]);
            filled += n;
            self.pos += n as u64;
        }
        Ok(filled)
    }

    /// Fills `buf` completely from the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`], without reading, if fewer than
    /// `buf.len()` digits remain.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.ensure_open()?;
        check_range(self.pos, buf.len(), self.layout.total_digits())?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]).await? {
                0 => {
                    return Err(Error::OutOfRange {
                        offset: self.pos,
                        len: self.layout.total_digits(),
                    });
                }
                n => filled += n,
            }
        }
        Ok(())
    }

    /// Fills `buf` with the digits starting at `offset`.
    ///
    /// The cursor and buffered word are untouched. Each block the request
    /// touches costs one raw [`RawRead::read_at`] covering exactly the words
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the request reaches past
    /// `total_digits`.
    pub async fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.ensure_open()?;
        let total = self.layout.total_digits();
        check_range(offset, buf.len(), total)?;

        let format = self.layout.format();
        let radix = self.layout.radix();
        let width = format.byte_width();
        let dpw = self.layout.digits_per_word();
        let end = offset + buf.len() as u64;

        let mut raw = Vec::new();
        let mut digits = [0_u8; MAX_DIGITS_PER_WORD];
        let mut cursor = offset;
        while cursor < end {
            let first = self.layout.locate(cursor)?;
            let span = self.layout.spans()[first.block];
            let block_end = span.end_digit().min(end);
            let last = self.layout.locate(block_end - 1)?;

            let words = (last.word_index - first.word_index + 1) as usize;
            raw.resize(words * width, 0);
            self.raw.read_at(&mut raw, first.raw_offset).await?;

            for (i, bytes) in raw.chunks_exact(width).enumerate() {
                let word_first = first.word_first_digit + (i * dpw) as u64;
                decode_word(format.read_word(bytes), radix, &mut digits[..dpw])?;

                let from = cursor.max(word_first);
                let to = block_end.min(word_first + dpw as u64);
                let src = &digits[(from - word_first) as usize..(to - word_first) as usize];
                let dst = (from - offset) as usize;
                buf[dst..dst + src.len()].copy_from_slice(src);
            }
            cursor = block_end;
        }
        Ok(buf.len())
    }

    /// Moves the cursor and returns its new position. The buffered word is
    /// kept until a read needs a different one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSeek`] for a negative target.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.ensure_open()?;
        self.pos = resolve_seek(self.pos, self.layout.total_digits(), pos)?;
        Ok(self.pos)
    }

    /// Closes the reader and the raw reader below it. Closing twice is a
    /// no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.word = None;
        self.raw.close().await
    }

    async fn load_word(&mut self, offset: u64) -> Result<DecodedWord> {
        let at = self.layout.locate(offset)?;
        let format = self.layout.format();
        let width = format.byte_width();

        self.raw.seek(SeekFrom::Start(at.raw_offset)).await?;
        let mut bytes = [0_u8; 8];
        let mut filled = 0;
        while filled < width {
            match self.raw.read(&mut bytes[filled..width]).await? {
                0 => {
                    return Err(Error::OutOfRange {
                        offset: at.raw_offset + filled as u64,
                        len: self.layout.total_bytes(),
                    });
                }
                n => filled += n,
            }
        }

        let mut word = DecodedWord {
            first_digit: at.word_first_digit,
            valid: at.valid_digits,
            digits: [0_u8; MAX_DIGITS_PER_WORD],
        };
        let dpw = self.layout.digits_per_word();
        decode_word(
            format.read_word(&bytes[..width]),
            self.layout.radix(),
            &mut word.digits[..dpw],
        )?;

        self.word = Some(word);
        Ok(word)
    }
}
