use crate::{Error, MAX_DIGITS_PER_WORD, Radix, Result, WordFormat};

const ALPHABET: &[u8; 16] = b"0123456789abcdef";

/// Renders `value` as exactly `out.len()` radix digits, most significant
/// first and left padded with `0`.
///
/// Writes into the caller's buffer and never allocates; the digit stream calls
/// this once per word.
///
/// # Errors
///
/// Returns [`Error::WordOverflow`] if `value` needs more than `out.len()`
/// digits. Valid shards never contain such words.
#[inline]
pub fn decode_word(value: u64, radix: Radix, out: &mut [u8]) -> Result<()> {
    let base = radix.base();
    let mut acc = value;
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(acc % base) as usize];
        acc /= base;
    }
    if acc != 0 {
        return Err(Error::WordOverflow {
            value,
            radix,
            digits: out.len(),
        });
    }
    Ok(())
}

/// Packs up to one word's worth of digits back into a word, the inverse of
/// [`decode_word`]. Fewer digits than `width` are left aligned and padded
/// with `0`, the layout of a block's partially used final word.
///
/// # Errors
///
/// Returns [`Error::InvalidDigit`] for characters outside the radix alphabet
/// and [`Error::WordOverflow`] if `digits` is longer than `width`.
pub fn encode_word(digits: &[u8], radix: Radix, width: usize) -> Result<u64> {
    if digits.len() > width {
        return Err(Error::WordOverflow {
            value: 0,
            radix,
            digits: width,
        });
    }
    let base = radix.base();
    let mut acc = 0_u64;
    for i in 0..width {
        let digit = match digits.get(i) {
            Some(&c) => digit_value(c, radix)?,
            None => 0,
        };
        acc = acc * base + digit;
    }
    Ok(acc)
}

fn digit_value(c: u8, radix: Radix) -> Result<u64> {
    let value = match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        _ => return Err(Error::InvalidDigit(c)),
    };
    if value as u64 >= radix.base() {
        return Err(Error::InvalidDigit(c));
    }
    Ok(value as u64)
}

/// Decodes one word into a [`String`] of `format.digits_per_word(radix)`
/// digits.
///
/// This is the allocating convenience over [`decode_word`].
///
/// # Errors
///
/// See [`decode_word`].
pub fn decode(word: u64, radix: Radix, format: WordFormat) -> Result<String> {
    let mut buf = [0_u8; MAX_DIGITS_PER_WORD];
    let digits = format.digits_per_word(radix);
    decode_word(word, radix, &mut buf[..digits])?;
    Ok(buf[..digits].iter().copied().map(char::from).collect())
}
