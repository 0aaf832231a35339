/*
    ====================  support/wobbly_text/src/lib.rs  =====================
    Lenient decoding of library string tables

    Strings in a library are mostly UTF-8, but producers are allowed to write
    supplementary characters as two separately encoded surrogate halves. This
    decoder accepts both forms and never fails: anything it cannot make sense
    of becomes U+FFFD.
    ---------------------------------------------------------------------------
*/

use std::borrow::Cow;

pub const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

/// Decodes `bytes` into text, substituting U+FFFD for malformed input.
///
/// ```
/// assert_eq!(wobbly_text::decode(b"kotlin.Any"), "kotlin.Any");
/// assert_eq!(wobbly_text::decode(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
/// ```
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(WobblyChars::new(bytes).map(|(c, _)| c).collect()),
    }
}

/// Iterator over the characters of a wobbly byte string.
///
/// Yields each character together with whether it was substituted.
pub struct WobblyChars<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> WobblyChars<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn continuation(&self, offset: usize) -> Option<u32> {
        self.bytes
            .get(self.position + offset)
            .filter(|byte| **byte & 0xC0 == 0x80)
            .map(|byte| u32::from(*byte & 0x3F))
    }

    /// Decodes a three byte sequence at `offset` without checking whether the
    /// value is a surrogate.
    fn three_byte_at(&self, offset: usize) -> Option<u32> {
        let lead = *self.bytes.get(self.position + offset)?;

        if lead & 0xF0 != 0xE0 {
            return None;
        }

        let b1 = self.continuation(offset + 1)?;
        let b2 = self.continuation(offset + 2)?;
        let code = (u32::from(lead & 0x0F) << 12) | (b1 << 6) | b2;
        (code >= 0x800).then_some(code)
    }

    fn take(&mut self, length: usize, code: u32) -> (char, bool) {
        self.position += length;

        match char::from_u32(code) {
            Some(c) => (c, false),
            None => (REPLACEMENT, true),
        }
    }

    fn reject(&mut self, length: usize) -> (char, bool) {
        self.position += length;
        (REPLACEMENT, true)
    }
}

impl Iterator for WobblyChars<'_> {
    type Item = (char, bool);

    fn next(&mut self) -> Option<Self::Item> {
        let lead = *self.bytes.get(self.position)?;

        Some(match lead {
            0x00..=0x7F => self.take(1, u32::from(lead)),
            0xC2..=0xDF => match self.continuation(1) {
                Some(b1) => self.take(2, (u32::from(lead & 0x1F) << 6) | b1),
                None => self.reject(1),
            },
            0xE0..=0xEF => match self.three_byte_at(0) {
                Some(high @ 0xD800..=0xDBFF) => match self.three_byte_at(3) {
                    Some(low @ 0xDC00..=0xDFFF) => {
                        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                        self.take(6, code)
                    }
                    _ => self.reject(3),
                },
                Some(0xDC00..=0xDFFF) => self.reject(3),
                Some(code) => self.take(3, code),
                None => self.reject(1),
            },
            0xF0..=0xF4 => {
                let decoded = self.continuation(1).and_then(|b1| {
                    let b2 = self.continuation(2)?;
                    let b3 = self.continuation(3)?;
                    Some((u32::from(lead & 0x07) << 18) | (b1 << 12) | (b2 << 6) | b3)
                });

                match decoded {
                    Some(code @ 0x10000..=0x10FFFF) => self.take(4, code),
                    Some(_) => self.reject(4),
                    None => self.reject(1),
                }
            }
            _ => self.reject(1),
        })
    }
}
