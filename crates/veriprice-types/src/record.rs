//! Verifier-owned singletons.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{Address, Hash, Price, UnixSeconds};

/// The single authoritative price record.
///
/// Overwritten as a whole on each accepted update; no history is kept.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestRecord {
    #[serde_as(as = "DisplayFromStr")]
    pub price: Price,
    pub observed_at: UnixSeconds,
    pub submitter: Address,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub data_hash: Hash,
}

/// Owner-configured alert bounds.
///
/// When `enabled`, `upper_bound > lower_bound` always holds.
#[serde_as]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde_as(as = "DisplayFromStr")]
    pub upper_bound: Price,
    #[serde_as(as = "DisplayFromStr")]
    pub lower_bound: Price,
    pub enabled: bool,
}

impl ThresholdConfig {
    /// Whether this configuration may be installed.
    pub fn is_valid(&self) -> bool {
        !self.enabled || self.upper_bound > self.lower_bound
    }
}
