//! Decoded-digit view over a raw packed stream.
//!
//! [`DigitReader`] turns any [`RawRead`](crate::RawRead) into a seekable
//! stream of ASCII digits. Words are decoded lazily, one at a time, and only
//! the word under the cursor is kept.

mod reader;

pub use reader::*;
