//! Word and length-prefix primitives.
//!
//! Integers travel as 32-byte little-endian words (uint256). Variable
//! fields are `LE32(len) || bytes`, the same framing used for
//! [`encode_multi_field`](veriprice_crypto::blake3::encode_multi_field).

use crate::{Result, WireError};

/// Width of an encoded uint256 word.
pub const WORD_LEN: usize = 32;

/// Width of a length prefix.
pub const LEN_PREFIX: usize = 4;

/// Encode an unsigned integer as a 32-byte little-endian word.
pub fn word(value: u128) -> [u8; WORD_LEN] {
    let mut out = [0u8; WORD_LEN];
    out[..16].copy_from_slice(&value.to_le_bytes());
    out
}

/// Append a uint256 word.
pub fn put_word(out: &mut Vec<u8>, value: u128) {
    out.extend_from_slice(&word(value));
}

/// Append a length-prefixed field, enforcing `max`.
pub fn put_bytes(out: &mut Vec<u8>, field: &'static str, bytes: &[u8], max: usize) -> Result<()> {
    if bytes.len() > max {
        return Err(WireError::FieldTooLong {
            field,
            len: bytes.len(),
            max,
        });
    }
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

/// Cursor over an encoded buffer.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, field: &'static str, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(WireError::Truncated {
                field,
                needed: n,
                available: self.remaining(),
            });
        }
        let buf = self.buf;
        let slice = &buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        Ok(self.take(field, 1)?[0])
    }

    /// Read a uint256 word that must fit in a `u128`.
    pub fn read_word_u128(&mut self, field: &'static str) -> Result<u128> {
        let bytes = self.take(field, WORD_LEN)?;
        if bytes[16..].iter().any(|b| *b != 0) {
            return Err(WireError::WordOverflow(field));
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&bytes[..16]);
        Ok(u128::from_le_bytes(low))
    }

    /// Read a uint256 word that must fit in a `u64`.
    pub fn read_word_u64(&mut self, field: &'static str) -> Result<u64> {
        let value = self.read_word_u128(field)?;
        u64::try_from(value).map_err(|_| WireError::WordOverflow(field))
    }

    /// Read a length-prefixed field of at most `max` bytes.
    pub fn read_bytes(&mut self, field: &'static str, max: usize) -> Result<&'a [u8]> {
        let prefix = self.take(field, LEN_PREFIX)?;
        let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        if len > max {
            return Err(WireError::FieldTooLong { field, len, max });
        }
        self.take(field, len)
    }

    /// Read a length-prefixed UTF-8 string of at most `max` bytes.
    pub fn read_str(&mut self, field: &'static str, max: usize) -> Result<&'a str> {
        let bytes = self.read_bytes(field, max)?;
        std::str::from_utf8(bytes).map_err(|_| WireError::InvalidUtf8(field))
    }

    /// Require that the whole buffer was consumed.
    pub fn finish(self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(WireError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_layout() {
        let w = word(0x0102);
        assert_eq!(w[0], 0x02);
        assert_eq!(w[1], 0x01);
        assert!(w[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_read_word_high_bits_rejected() {
        let mut buf = word(5).to_vec();
        buf[31] = 1;
        let err = Reader::new(&buf).read_word_u128("price").expect_err("overflow");
        assert_eq!(err, WireError::WordOverflow("price"));
    }

    #[test]
    fn test_read_word_u64_overflow() {
        let buf = word(u128::from(u64::MAX) + 1);
        let err = Reader::new(&buf).read_word_u64("observed_at").expect_err("overflow");
        assert_eq!(err, WireError::WordOverflow("observed_at"));
    }

    #[test]
    fn test_length_past_end() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&10u32.to_le_bytes());
        buf.extend_from_slice(b"abc");
        let err = Reader::new(&buf).read_bytes("source", 64).expect_err("truncated");
        assert_eq!(
            err,
            WireError::Truncated {
                field: "source",
                needed: 10,
                available: 3
            }
        );
    }

    #[test]
    fn test_length_over_limit_checked_before_read() {
        let buf = u32::MAX.to_le_bytes();
        let err = Reader::new(&buf).read_bytes("proof", 512).expect_err("too long");
        assert!(matches!(err, WireError::FieldTooLong { field: "proof", .. }));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buf = Vec::new();
        put_bytes(&mut buf, "source", &[0xFF, 0xFE], 64).expect("encode");
        let err = Reader::new(&buf).read_str("source", 64).expect_err("utf8");
        assert_eq!(err, WireError::InvalidUtf8("source"));
    }

    #[test]
    fn test_finish_trailing() {
        let buf = [1u8, 2, 3];
        let mut reader = Reader::new(&buf);
        reader.read_u8("version").expect("byte");
        assert_eq!(reader.finish(), Err(WireError::TrailingBytes(2)));
    }
}
