//! Domain-separated BLAKE3.
//!
//! Each digest the protocol computes has its own context string, so bytes
//! hashed for one purpose never produce a value valid for another:
//!
//! | Context | Use |
//! |---|---|
//! | [`contexts::PRICE_DATA_HASH`] | `data_hash` of the committed record |
//! | [`contexts::ATTESTATION_BINDING`] | key of the digest-binding proof |
//! | [`contexts::TRANSACTION_ID`] | ids assigned by the ledger host |

/// Registered BLAKE3 context strings.
pub mod contexts {
    pub const PRICE_DATA_HASH: &str = "Veriprice v1 price-data-hash";
    pub const ATTESTATION_BINDING: &str = "Veriprice v1 attestation-binding";
    pub const TRANSACTION_ID: &str = "Veriprice v1 transaction-id";

    pub const ALL_CONTEXTS: &[&str] = &[PRICE_DATA_HASH, ATTESTATION_BINDING, TRANSACTION_ID];
}

/// `BLAKE3::derive_key(context, material)`.
pub fn derive_key(context: &str, material: &[u8]) -> [u8; 32] {
    ::blake3::Hasher::new_derive_key(context)
        .update(material)
        .finalize()
        .into()
}

/// `BLAKE3::keyed_hash(key, message)`.
pub fn keyed_hash(key: &[u8; 32], message: &[u8]) -> [u8; 32] {
    ::blake3::keyed_hash(key, message).into()
}

pub fn is_registered_context(context: &str) -> bool {
    contexts::ALL_CONTEXTS.contains(&context)
}

/// Placeholder binding digest over attestation signing bytes.
///
/// `keyed_hash(derive_key(ATTESTATION_BINDING, ""), message)`. Anyone can
/// compute it, so it binds content without authenticating the producer.
pub fn attestation_binding(message: &[u8]) -> [u8; 32] {
    let key = derive_key(contexts::ATTESTATION_BINDING, b"");
    keyed_hash(&key, message)
}

/// Concatenate fields, each prefixed with its length as LE32.
///
/// Fields longer than `u32::MAX` bytes cannot occur: every input is bounded
/// by the envelope size limits.
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(fields.iter().map(|f| 4 + f.len()).sum());
    for field in fields {
        out.extend_from_slice(&(field.len() as u32).to_le_bytes());
        out.extend_from_slice(field);
    }
    out
}
