use crate::{
    BlockDescriptor, BlockLayout, Bucket, Error, Object, RawRead, Result, WordFormat,
    raw::{check_range, resolve_seek},
};
use std::{io::SeekFrom, sync::Arc};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

/// Read-ahead buffer for sequential ranged reads. Words are read a handful of
/// bytes at a time, so each open range is buffered.
const RANGE_BUFFER_SIZE: usize = 64 * 1024;

/// A validated, immutable list of blocks covering `[0, total_digits)`.
///
/// Cloning is cheap; the descriptors and layout are shared.
#[derive(Clone, Debug)]
pub struct ResultSet {
    blocks: Arc<[BlockDescriptor]>,
    layout: Arc<BlockLayout>,
}

impl ResultSet {
    /// Validates `blocks` and precomputes their layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCatalog`] if the list is empty, mixes radices,
    /// has non-consecutive block ids, contains an empty block, or declares a
    /// payload too small for its digits.
    pub fn new(format: WordFormat, blocks: Vec<BlockDescriptor>) -> Result<Self> {
        let layout = BlockLayout::new(format, &blocks)?;
        Ok(Self {
            blocks: blocks.into(),
            layout: Arc::new(layout),
        })
    }

    pub fn blocks(&self) -> &[BlockDescriptor] {
        &self.blocks
    }

    pub fn layout(&self) -> &Arc<BlockLayout> {
        &self.layout
    }

    pub fn total_digits(&self) -> u64 {
        self.layout.total_digits()
    }

    /// Opens a raw-byte reader over the blocks in `bucket`.
    ///
    /// No storage request is made until the first read.
    pub fn reader<B: Bucket>(&self, bucket: Arc<B>) -> ResultSetReader<B> {
        ResultSetReader {
            bucket,
            blocks: Arc::clone(&self.blocks),
            layout: Arc::clone(&self.layout),
            pos: 0,
            open: None,
            closed: false,
        }
    }
}

type RangeReader<B> = BufReader<<<B as Bucket>::Object as Object>::Reader>;

/// An open ranged read positioned somewhere inside one block.
struct OpenRange<R> {
    block: usize,
    reader: R,
    /// Raw stream offset of the next byte `reader` yields.
    next: u64,
    /// Raw stream offset where the block ends.
    end: u64,
}

/// Raw-byte stream over the payloads of a [`ResultSet`], in block order.
///
/// Sequential reads keep one ranged read open on the current block and move
/// to the next object when it is exhausted. Random access through
/// [`RawRead::read_at`] opens its own short-lived ranges and never disturbs
/// the sequential cursor.
pub struct ResultSetReader<B: Bucket> {
    bucket: Arc<B>,
    blocks: Arc<[BlockDescriptor]>,
    layout: Arc<BlockLayout>,
    pos: u64,
    open: Option<OpenRange<RangeReader<B>>>,
    closed: bool,
}

impl<B: Bucket> ResultSetReader<B> {
    /// Current raw cursor.
    pub const fn position(&self) -> u64 {
        self.pos
    }

    const fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn block_at(&self, offset: u64) -> Result<usize> {
        self.layout
            .block_for_byte(offset)
            .ok_or(Error::OutOfRange {
                offset,
                len: self.layout.total_bytes(),
            })
    }

    /// Opens `len` bytes of block `block`, starting `within` bytes into its
    /// payload.
    async fn open_range(
        &self,
        block: usize,
        within: u64,
        len: u64,
    ) -> Result<<B::Object as Object>::Reader> {
        let descriptor = &self.blocks[block];
        let offset = descriptor.first_digit_offset + within;

        #[cfg(feature = "tracing")]
        tracing::trace!(object = %descriptor.name, offset, len, "opening ranged read");

        let reader = self
            .bucket
            .object(&descriptor.name)
            .range_reader(offset, len)
            .await?;
        Ok(reader)
    }

    fn short_read(&self, block: usize, within: u64, expected: u64, got: u64) -> Error {
        let descriptor = &self.blocks[block];
        Error::ShortRead {
            object: descriptor.name.clone(),
            offset: descriptor.first_digit_offset + within,
            expected,
            got,
        }
    }
}

/// Reads until `buf` is full, returning how many bytes arrived before the
/// stream ended.
async fn fill<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

impl<B: Bucket> RawRead for ResultSetReader<B> {
    fn layout(&self) -> &Arc<BlockLayout> {
        &self.layout
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() || self.pos >= self.layout.total_bytes() {
            return Ok(0);
        }

        let mut open = match self.open.take() {
            Some(open) if open.next == self.pos => open,
            _ => {
                let block = self.block_at(self.pos)?;
                let span = self.layout.spans()[block];
                let within = self.pos - span.first_byte;
                let reader = self.open_range(block, within, span.bytes - within).await?;
                OpenRange {
                    block,
                    reader: BufReader::with_capacity(RANGE_BUFFER_SIZE, reader),
                    next: self.pos,
                    end: span.end_byte(),
                }
            }
        };

        let want = (buf.len() as u64).min(open.end - open.next) as usize;
        let n = open.reader.read(&mut buf[..want]).await?;
        if n == 0 {
            let span = self.layout.spans()[open.block];
            let within = open.next - span.first_byte;
            return Err(self.short_read(open.block, within, open.end - open.next, 0));
        }

        open.next += n as u64;
        self.pos += n as u64;
        if open.next < open.end {
            self.open = Some(open);
        }
        Ok(n)
    }

    async fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.ensure_open()?;
        check_range(offset, buf.len(), self.layout.total_bytes())?;

        let mut filled = 0;
        let mut cursor = offset;
        while filled < buf.len() {
            let block = self.block_at(cursor)?;
            let span = self.layout.spans()[block];
            let within = cursor - span.first_byte;
            let take = (span.bytes - within).min((buf.len() - filled) as u64) as usize;

            let mut reader = self.open_range(block, within, take as u64).await?;
            let got = fill(&mut reader, &mut buf[filled..filled + take]).await?;
            if got < take {
                return Err(self.short_read(block, within, take as u64, got as u64));
            }

            filled += take;
            cursor += take as u64;
        }
        Ok(filled)
    }

    async fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.ensure_open()?;
        // An open range is kept and reused if the cursor comes back to it.
        self.pos = resolve_seek(self.pos, self.layout.total_bytes(), pos)?;
        Ok(self.pos)
    }

    async fn close(&mut self) -> Result<()> {
        self.open = None;
        self.closed = true;
        Ok(())
    }
}
