//! Committed record data hash.

use veriprice_crypto::blake3::{contexts, derive_key, encode_multi_field};
use veriprice_types::{Hash, Price, ProducerId, UnixSeconds};
use veriprice_wire::codec::word;

/// `dataHash = BLAKE3::derive_key("Veriprice v1 price-data-hash", fields)`
/// where `fields = LE32-prefixed(word(price), word(observed_at), producer_id)`.
pub fn price_data_hash(price: Price, observed_at: UnixSeconds, producer_id: &ProducerId) -> Hash {
    let material = encode_multi_field(&[
        &word(price),
        &word(u128::from(observed_at)),
        producer_id.as_str().as_bytes(),
    ]);
    derive_key(contexts::PRICE_DATA_HASH, &material)
}
