//! Expand-around-center search for long odd-length palindromes.

use core::{fmt, ops::Range};

/// Smallest final radius that is reported. A palindrome of radius `r` is
/// `2r - 1` digits long, so the shortest match is 17 digits.
pub const MIN_RADIUS: usize = 9;

/// A maximal odd-length palindrome inside a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palindrome {
    /// Index of the middle character.
    pub center: usize,
    /// Final expansion radius; the palindrome spans `center ± (radius - 1)`.
    pub radius: usize,
}

impl Palindrome {
    #[allow(clippy::len_without_is_empty)]
    pub const fn len(&self) -> usize {
        2 * self.radius - 1
    }

    /// Byte range of the palindrome in the scanned buffer.
    pub const fn range(&self) -> Range<usize> {
        self.center + 1 - self.radius..self.center + self.radius
    }
}

/// Finds maximal odd-length palindromes of at least [`MIN_RADIUS`] in `s`.
///
/// Every center `i` in `[safe_offset, s.len() - 1 - safe_offset)` is expanded
/// starting from radius `safe_offset`; the first `safe_offset` rings are
/// assumed to match. A palindrome touching the first byte of `s` is not
/// reported because it may continue further left.
pub fn find_palindromes(s: &[u8], safe_offset: usize) -> impl Iterator<Item = Palindrome> + '_ {
    let n = s.len();
    let end = n.saturating_sub(1 + safe_offset);
    (safe_offset..end).filter_map(move |i| {
        let mut r = safe_offset;
        while i >= r && i + r < n && s[i - r] == s[i + r] {
            r += 1;
        }
        (r >= MIN_RADIUS && i > r).then_some(Palindrome {
            center: i,
            radius: r,
        })
    })
}

/// A palindrome found in a chunk, located in the whole stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PalindromeRecord {
    /// First digit of the chunk that was scanned.
    pub chunk_start: u64,
    /// Absolute digit offset of the middle digit.
    pub center: u64,
    pub text: String,
    pub length: usize,
}

impl PalindromeRecord {
    /// Locates `palindrome`, found in `chunk` read from `chunk_start`.
    pub fn new(chunk_start: u64, chunk: &[u8], palindrome: Palindrome) -> Self {
        Self {
            chunk_start,
            center: chunk_start + palindrome.center as u64,
            text: String::from_utf8_lossy(&chunk[palindrome.range()]).into_owned(),
            length: palindrome.len(),
        }
    }

    /// Absolute digit offset of the first digit.
    pub fn offset(&self) -> u64 {
        self.center - (self.length as u64 - 1) / 2
    }
}

impl fmt::Display for PalindromeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.chunk_start, self.center, self.text, self.length
        )
    }
}
