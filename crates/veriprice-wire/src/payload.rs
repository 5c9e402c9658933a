//! Quote payload encoding.

use veriprice_types::{Price, PriceQuote, UnixSeconds, MAX_SOURCE_LEN};

use crate::codec::{put_bytes, put_word, Reader, LEN_PREFIX, WORD_LEN};
use crate::Result;

/// A payload as read back from the wire.
///
/// Unlike [`PriceQuote`] this does not enforce `price > 0`; the verifier
/// compares it against call parameters that are checked separately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedPayload {
    pub price: Price,
    pub observed_at: UnixSeconds,
    pub source: String,
}

/// Encode a quote as `price || observed_at || LE32 len || source`.
pub fn encode_payload(quote: &PriceQuote) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(2 * WORD_LEN + LEN_PREFIX + quote.source().len());
    put_word(&mut out, quote.value());
    put_word(&mut out, u128::from(quote.observed_at()));
    put_bytes(&mut out, "source", quote.source().as_bytes(), MAX_SOURCE_LEN)?;
    Ok(out)
}

/// Decode a payload, rejecting any trailing bytes.
pub fn decode_payload(bytes: &[u8]) -> Result<DecodedPayload> {
    let mut reader = Reader::new(bytes);
    let price = reader.read_word_u128("price")?;
    let observed_at = reader.read_word_u64("observed_at")?;
    let source = reader.read_str("source", MAX_SOURCE_LEN)?.to_string();
    reader.finish()?;
    Ok(DecodedPayload {
        price,
        observed_at,
        source,
    })
}
