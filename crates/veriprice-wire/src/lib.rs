//! # veriprice-wire
//!
//! Canonical byte layout of attestation envelopes.
//!
//! Both the attestation producer and the verifier encode through this crate,
//! so the verifier can recompute the exact bytes a producer bound its proof
//! to. Every variable-length field is length-prefixed and every field has a
//! fixed position; a decoder can never misalign.
//!
//! ```text
//! Envelope
//!     version:     u8         (= 1)
//!     producer_id: LE32 len || utf-8
//!     attested_at: uint256    (32 bytes, little-endian)
//!     payload:     LE32 len || Payload
//!     proof:       LE32 len || opaque
//!
//! Payload
//!     price:       uint256
//!     observed_at: uint256
//!     source:      LE32 len || utf-8
//! ```
//!
//! - [`codec`]: Word and length-prefix primitives
//! - [`payload`]: Quote payload encoding
//! - [`envelope`]: Envelope encoding and proof signing bytes

pub mod codec;
pub mod envelope;
pub mod payload;

pub use envelope::{decode_envelope, encode_envelope, signing_bytes};
pub use payload::{decode_payload, encode_payload, DecodedPayload};

/// Current envelope layout version.
pub const WIRE_VERSION: u8 = 1;

/// Maximum accepted proof size in bytes.
pub const MAX_PROOF_LEN: usize = 512;

/// Maximum accepted encoded envelope size in bytes.
pub const MAX_ENVELOPE_LEN: usize = 4096;

/// Structural decoding and encoding failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Input ended before a field was complete.
    #[error("truncated {field}: need {needed} bytes, have {available}")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    /// Bytes remain after the last field.
    #[error("{0} trailing bytes after envelope")]
    TrailingBytes(usize),

    /// Envelope version byte is not [`WIRE_VERSION`].
    #[error("unsupported wire version: {0}")]
    UnsupportedVersion(u8),

    /// A length-prefixed field exceeds its limit.
    #[error("{field} too long: {len} bytes, max {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// A 256-bit word does not fit the field's Rust type.
    #[error("{0} does not fit in its integer type")]
    WordOverflow(&'static str),

    /// A string field is not valid UTF-8.
    #[error("{0} is not valid utf-8")]
    InvalidUtf8(&'static str),

    /// The producer id failed validation.
    #[error("invalid producer id: {0}")]
    InvalidProducerId(String),

    /// The whole envelope exceeds [`MAX_ENVELOPE_LEN`].
    #[error("envelope too large: {0} bytes, max {MAX_ENVELOPE_LEN}")]
    EnvelopeTooLarge(usize),
}

/// Result type alias for wire operations.
pub type Result<T> = std::result::Result<T, WireError>;
