//! Events emitted by the verifier and its registry.
//!
//! Only the latest record is kept by the verifier; consumers reconstruct
//! price history from the stream of [`VerifierEvent::Updated`] events.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{Address, Price, ProducerId, UnixSeconds};

/// Which alert bound a committed price crossed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachSide {
    Upper,
    Lower,
}

/// All verifier events.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "payload")]
pub enum VerifierEvent {
    /// A price update was accepted and committed.
    Updated {
        #[serde_as(as = "DisplayFromStr")]
        price: Price,
        observed_at: UnixSeconds,
        submitter: Address,
        producer_id: ProducerId,
    },

    /// A committed price lies outside the configured alert range.
    ThresholdBreached {
        #[serde_as(as = "DisplayFromStr")]
        price: Price,
        side: BreachSide,
        #[serde_as(as = "DisplayFromStr")]
        bound_value: Price,
    },

    /// Alert bounds were reconfigured.
    ThresholdConfigured {
        #[serde_as(as = "DisplayFromStr")]
        upper_bound: Price,
        #[serde_as(as = "DisplayFromStr")]
        lower_bound: Price,
        enabled: bool,
    },

    ProducerAuthorized {
        producer_id: ProducerId,
        authorized: bool,
    },

    SubmitterAuthorized {
        submitter: Address,
        authorized: bool,
    },

    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
}

impl VerifierEvent {
    /// Event type name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Updated { .. } => "Updated",
            Self::ThresholdBreached { .. } => "ThresholdBreached",
            Self::ThresholdConfigured { .. } => "ThresholdConfigured",
            Self::ProducerAuthorized { .. } => "ProducerAuthorized",
            Self::SubmitterAuthorized { .. } => "SubmitterAuthorized",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }

    /// For a breach event, whether the upper bound was crossed.
    pub fn is_upper_breach(&self) -> Option<bool> {
        match self {
            Self::ThresholdBreached { side, .. } => Some(*side == BreachSide::Upper),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = VerifierEvent::Updated {
            price: 200_000_000_000,
            observed_at: 1_700_000_000,
            submitter: Address([0xA1; 20]),
            producer_id: ProducerId::new("p1").expect("producer id"),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["event_type"], "Updated");
        assert_eq!(json["payload"]["price"], "200000000000");
        assert_eq!(json["payload"]["producer_id"], "p1");

        let back: VerifierEvent = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn test_name_matches_tag() {
        let event = VerifierEvent::ThresholdBreached {
            price: 3,
            side: BreachSide::Lower,
            bound_value: 5,
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["event_type"], event.name());
        assert_eq!(event.is_upper_breach(), Some(false));
    }
}
