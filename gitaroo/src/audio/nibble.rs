//! Packing and unpacking of 4-bit values, two per byte with the low nibble first.

use super::{Error, Result};

/// Sign-extends the low 4 bits of `nibble` into the range `-8..=7`.
#[inline]
pub fn sign_extend(nibble: u8) -> i8 {
    ((nibble << 4) as i8) >> 4
}

/// Packs two nibble values into one byte, `low` in bits 0-3 and `high` in bits 4-7. Only the low
/// 4 bits of each value are kept, so signed values in `-8..=7` pack as two's complement.
#[inline]
pub fn pack_pair(low: i8, high: i8) -> u8 {
    ((high as u8 & 0xf) << 4) | (low as u8 & 0xf)
}

/// An iterator over the nibbles in a byte slice, low nibble first.
#[derive(Debug, Clone)]
pub struct Nibbles<'a> {
    bytes: &'a [u8],
    index: usize,
    signed: bool,
}

impl<'a> Nibbles<'a> {
    /// Creates an iterator over the nibbles in `bytes`. If `signed` is true, nibbles `0x8..=0xf`
    /// are yielded as `-8..=-1`.
    pub fn new(bytes: &'a [u8], signed: bool) -> Self {
        Self { bytes, index: 0, signed }
    }
}

impl Iterator for Nibbles<'_> {
    type Item = i8;

    fn next(&mut self) -> Option<Self::Item> {
        let byte = *self.bytes.get(self.index / 2)?;
        let nibble = if self.index % 2 == 0 { byte & 0xf } else { byte >> 4 };
        self.index += 1;
        Some(if self.signed { sign_extend(nibble) } else { nibble as i8 })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bytes.len() * 2 - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Nibbles<'_> {}

/// Unpacks every nibble in `bytes`, low nibble first.
pub fn unpack_nibbles(bytes: &[u8], signed: bool) -> Vec<i8> {
    Nibbles::new(bytes, signed).collect()
}

/// Packs `values` into bytes two at a time. Values may be signed (`-8..=7`) or unsigned
/// (`0..=15`). Fails if there is an odd number of values.
pub fn pack_nibbles(values: &[i8]) -> Result<Vec<u8>> {
    if values.len() % 2 != 0 {
        return Err(Error::OddNibbleCount(values.len()));
    }
    Ok(values.chunks_exact(2).map(|pair| pack_pair(pair[0], pair[1])).collect())
}
