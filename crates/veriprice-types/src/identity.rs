//! Submitter addresses and producer identifiers.
//!
//! A submitter is the account that calls the verifier's update entry point.
//! A producer is the logical process that observed and attested a quote.
//! The two are authorized independently.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::{TypesError, MAX_PRODUCER_ID_LEN};

/// A 20-byte account address, rendered as `0x`-prefixed lowercase hex.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| TypesError::InvalidAddress(e.to_string()))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| TypesError::InvalidAddress(format!("{} bytes", b.len())))?;
        Ok(Address(arr))
    }
}

/// Identifier of the off-chain process that produced an attestation.
///
/// Non-empty UTF-8, at most [`MAX_PRODUCER_ID_LEN`] bytes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProducerId(String);

impl ProducerId {
    /// Validate and wrap a producer identifier.
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() || id.len() > MAX_PRODUCER_ID_LEN {
            return Err(TypesError::InvalidProducerId(id));
        }
        Ok(Self(id))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProducerId {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ProducerId::new(value)
    }
}

impl From<ProducerId> for String {
    fn from(id: ProducerId) -> Self {
        id.0
    }
}

impl AsRef<str> for ProducerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
