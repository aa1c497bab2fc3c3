use core::ops::Range;

/// One unit of scan work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// First digit the chunk contributes; names its output file.
    pub id: u64,
    /// First digit read.
    pub start: u64,
    /// Digits read, always the configured chunk size.
    pub length: usize,
    /// Leading digits shared with the previous chunk; 0 for the first chunk
    /// of a run.
    pub overlap: usize,
    /// Whether this is the final chunk of the run.
    pub last: bool,
}

impl Chunk {
    pub const fn is_first(&self) -> bool {
        self.overlap == 0
    }

    /// Radius the scan starts from. The first chunk has no earlier data to
    /// lean on, so it is scanned from radius 0.
    pub const fn safe_offset(&self, configured: usize) -> usize {
        if self.is_first() { 0 } else { configured }
    }

    /// Absolute centers this chunk reports.
    ///
    /// The shared region between two chunks is split at its midpoint, so
    /// every center in the stream belongs to exactly one chunk. The owner
    /// sees a palindrome whole when its radius is below `overlap / 2`.
    pub const fn owned_centers(&self, overlap: usize) -> Range<u64> {
        let lead = if self.is_first() { 0 } else { overlap / 2 };
        let trail = if self.last { 0 } else { overlap.div_ceil(2) };
        self.start + lead as u64..self.start + (self.length - trail) as u64
    }
}

/// Cuts `[start, total)` into fixed-size chunks overlapping by a fixed
/// amount.
///
/// Chunk `k > 0` starts `chunk_size - overlap` digits after chunk `k - 1`.
/// Chunks are produced while their first contributed digit is below the
/// total; the last one may reach past the end of the stream.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    total: u64,
    chunk_size: usize,
    overlap: usize,
    next: Option<Chunk>,
}

impl ChunkPlan {
    /// `overlap` must be smaller than `chunk_size`.
    pub fn new(start: u64, total: u64, chunk_size: usize, overlap: usize) -> Self {
        debug_assert!(overlap < chunk_size);
        let next = (start < total).then(|| Chunk {
            id: start,
            start,
            length: chunk_size,
            overlap: 0,
            last: start + chunk_size as u64 >= total,
        });
        Self {
            total,
            chunk_size,
            overlap,
            next,
        }
    }
}

impl Iterator for ChunkPlan {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let chunk = self.next.take()?;
        if !chunk.last {
            let start = chunk.start + (self.chunk_size - self.overlap) as u64;
            self.next = Some(Chunk {
                id: start + self.overlap as u64,
                start,
                length: self.chunk_size,
                overlap: self.overlap,
                last: start + self.chunk_size as u64 >= self.total,
            });
        }
        Some(chunk)
    }
}
