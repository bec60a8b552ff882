//! Streaming UTF-8 validation for WebSocket text payloads (RFC 3629).
//!
//! Text messages may be split across any number of frames, and a frame may
//! end in the middle of a multi-byte code point. [`Utf8Validator`] keeps just
//! enough state to resume the current code point in the next chunk, so a
//! message never has to be buffered to be validated.
//!
//! Validation fails on the first byte that cannot continue any valid
//! encoding, even when the offending sequence started in an earlier chunk.

use crate::error::{Error, Result};

/// Accepted range for a plain continuation byte.
const CONT_LOW: u8 = 0x80;
const CONT_HIGH: u8 = 0xBF;

/// Incremental UTF-8 validator for fragmented WebSocket messages.
///
/// The validator does not retain decoded characters. It tracks how many
/// continuation bytes the current code point still needs and which range the
/// next one must fall in (this is what rejects overlong forms, surrogates and
/// code points above U+10FFFF as soon as their second byte arrives).
#[derive(Debug, Clone)]
pub struct Utf8Validator {
    /// Continuation bytes still expected for the current code point (0-3).
    needed: u8,
    /// Lowest acceptable value for the next continuation byte.
    lower: u8,
    /// Highest acceptable value for the next continuation byte.
    upper: u8,
    /// Complete code points seen since the last reset.
    length: usize,
}

impl Default for Utf8Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Utf8Validator {
    /// Create a new UTF-8 validator.
    pub fn new() -> Self {
        Self {
            needed: 0,
            lower: CONT_LOW,
            upper: CONT_HIGH,
            length: 0,
        }
    }

    /// Feed the next chunk of the message.
    ///
    /// A chunk that ends inside a valid multi-byte sequence is accepted; the
    /// partial state carries over to the next call.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUtf8` at the first byte that cannot be part of
    /// a valid encoding.
    pub fn process(&mut self, chunk: &[u8]) -> Result<()> {
        let mut bytes = chunk;

        while let Some((&byte, rest)) = bytes.split_first() {
            bytes = rest;

            if self.needed > 0 {
                if byte < self.lower || byte > self.upper {
                    return Err(Error::InvalidUtf8);
                }
                self.needed -= 1;
                self.lower = CONT_LOW;
                self.upper = CONT_HIGH;
                if self.needed == 0 {
                    self.length += 1;
                }
                continue;
            }

            if byte.is_ascii() {
                // Skip the rest of an ASCII run in one go.
                let run = bytes.iter().take_while(|b| b.is_ascii()).count();
                self.length += 1 + run;
                bytes = &bytes[run..];
                continue;
            }

            let (needed, lower, upper) = match byte {
                0xC2..=0xDF => (1, CONT_LOW, CONT_HIGH),
                // Overlong 3-byte forms.
                0xE0 => (2, 0xA0, CONT_HIGH),
                0xE1..=0xEC | 0xEE..=0xEF => (2, CONT_LOW, CONT_HIGH),
                // Surrogates U+D800..U+DFFF.
                0xED => (2, CONT_LOW, 0x9F),
                // Overlong 4-byte forms.
                0xF0 => (3, 0x90, CONT_HIGH),
                0xF1..=0xF3 => (3, CONT_LOW, CONT_HIGH),
                // Above U+10FFFF.
                0xF4 => (3, CONT_LOW, 0x8F),
                _ => return Err(Error::InvalidUtf8),
            };
            self.needed = needed;
            self.lower = lower;
            self.upper = upper;
        }

        Ok(())
    }

    /// Returns `true` if no multi-byte sequence is left half-finished.
    ///
    /// Check this when the final fragment of a message has been processed.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.needed == 0
    }

    /// Number of complete code points validated since the last reset.
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Start a new message, discarding any partial sequence.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Validate that a byte slice is valid UTF-8.
///
/// This is a convenience function for validating complete (non-fragmented) data.
///
/// # Errors
///
/// Returns `Error::InvalidUtf8` if the data is not valid UTF-8.
pub fn validate_utf8(data: &[u8]) -> Result<()> {
    std::str::from_utf8(data)
        .map(|_| ())
        .map_err(|_| Error::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARTY: [u8; 4] = [0xf0, 0x9f, 0x8e, 0x89]; // 🎉

    fn check(data: &[u8]) -> Result<()> {
        let mut validator = Utf8Validator::new();
        validator.process(data)?;
        if validator.is_complete() {
            Ok(())
        } else {
            Err(Error::InvalidUtf8)
        }
    }

    #[test]
    fn test_valid_utf8() {
        assert!(check(b"Hello, World!").is_ok());
        assert!(check("こんにちは".as_bytes()).is_ok());
        assert!(check("Hello 世界 🌍".as_bytes()).is_ok());

        assert!(validate_utf8(b"Valid UTF-8").is_ok());
        assert!(validate_utf8("émoji 🎉".as_bytes()).is_ok());
    }

    #[test]
    fn test_invalid_utf8() {
        // Lone continuation byte
        assert!(check(&[0x80]).is_err());
        // Overlong 2-byte encoding
        assert!(check(&[0xc0, 0x80]).is_err());
        // Overlong 3-byte encoding
        assert!(check(&[0xe0, 0x80, 0x80]).is_err());
        // Overlong 4-byte encoding
        assert!(check(&[0xf0, 0x80, 0x80, 0x80]).is_err());
        // Surrogate U+D800
        assert!(check(&[0xed, 0xa0, 0x80]).is_err());
        // U+110000
        assert!(check(&[0xf4, 0x90, 0x80, 0x80]).is_err());
        // Invalid lead bytes
        assert!(check(&[0xff]).is_err());
        assert!(check(&[0xf5, 0x80, 0x80, 0x80]).is_err());
        // Truncated sequence followed by ASCII
        assert!(check(&[0xe2, 0x82, 0x41]).is_err());

        assert!(validate_utf8(&[0x80, 0x81]).is_err());
    }

    #[test]
    fn test_split_four_byte_code_point_at_every_boundary() {
        for split in 1..PARTY.len() {
            let mut validator = Utf8Validator::new();
            assert!(validator.process(&PARTY[..split]).is_ok(), "split {split}");
            assert!(!validator.is_complete());
            assert!(validator.process(&PARTY[split..]).is_ok(), "split {split}");
            assert!(validator.is_complete());
            assert_eq!(validator.length(), 1);
        }
    }

    #[test]
    fn test_surrogate_detected_across_chunks() {
        let mut validator = Utf8Validator::new();
        assert!(validator.process(&[0xed]).is_ok());
        assert!(validator.process(&[0xa0]).is_err());
    }

    #[test]
    fn test_overlong_detected_across_chunks() {
        let mut validator = Utf8Validator::new();
        assert!(validator.process(b"ok ").is_ok());
        assert!(validator.process(&[0xf0]).is_ok());
        assert!(validator.process(&[0x8f]).is_err());
    }

    #[test]
    fn test_empty_chunk_preserves_state() {
        let mut validator = Utf8Validator::new();
        assert!(validator.process(&[]).is_ok());
        assert!(validator.is_complete());

        assert!(validator.process(&[0xe2]).is_ok());
        assert!(validator.process(&[]).is_ok());
        assert!(!validator.is_complete());
        assert!(validator.process(&[0x82, 0xac]).is_ok());
        assert!(validator.is_complete());
    }

    #[test]
    fn test_length_counts_code_points() {
        let mut validator = Utf8Validator::new();
        let text = "Hello 世界 🌍";
        let bytes = text.as_bytes();
        validator.process(&bytes[..7]).unwrap();
        validator.process(&bytes[7..]).unwrap();
        assert_eq!(validator.length(), text.chars().count());
    }

    #[test]
    fn test_reset() {
        let mut validator = Utf8Validator::new();
        assert!(validator.process(&[0xe2]).is_ok());
        assert!(!validator.is_complete());

        validator.reset();
        assert!(validator.is_complete());
        assert_eq!(validator.length(), 0);
        assert!(validator.process(b"Fresh start").is_ok());
    }

    #[test]
    fn test_invalid_in_middle() {
        let mut validator = Utf8Validator::new();
        let data = &[0x48, 0x65, 0x80, 0x6c, 0x6f]; // "He" + invalid + "lo"
        assert!(validator.process(data).is_err());
    }
}
