//! Owner-gated authorization and threshold configuration.
//!
//! Every mutator checks the caller against the owner before touching any
//! field, so a rejected call leaves the registry unchanged. Changes apply to
//! the very next `update_price` call; nothing is cached.

use std::collections::BTreeSet;

use tracing::info;
use veriprice_types::events::VerifierEvent;
use veriprice_types::{Address, Price, ProducerId, ThresholdConfig};

use crate::{Result, VerifierError};

/// Authorization sets, alert thresholds and the owner allowed to edit them.
#[derive(Debug, Clone)]
pub struct Registry {
    owner: Address,
    producers: BTreeSet<ProducerId>,
    submitters: BTreeSet<Address>,
    thresholds: ThresholdConfig,
}

impl Registry {
    /// Empty registry owned by `owner`, thresholds disabled.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            producers: BTreeSet::new(),
            submitters: BTreeSet::new(),
            thresholds: ThresholdConfig::default(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn thresholds(&self) -> ThresholdConfig {
        self.thresholds
    }

    pub fn is_producer_authorized(&self, producer_id: &ProducerId) -> bool {
        self.producers.contains(producer_id)
    }

    pub fn is_submitter_authorized(&self, submitter: &Address) -> bool {
        self.submitters.contains(submitter)
    }

    fn require_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            return Err(VerifierError::UnauthorizedCaller(caller));
        }
        Ok(())
    }

    /// Grant or revoke a producer.
    pub fn set_producer_authorization(
        &mut self,
        caller: Address,
        producer_id: ProducerId,
        authorized: bool,
    ) -> Result<VerifierEvent> {
        self.require_owner(caller)?;
        if authorized {
            self.producers.insert(producer_id.clone());
        } else {
            self.producers.remove(&producer_id);
        }
        info!(producer = %producer_id, authorized, "producer authorization set");
        Ok(VerifierEvent::ProducerAuthorized {
            producer_id,
            authorized,
        })
    }

    /// Grant or revoke a submitter.
    pub fn set_submitter_authorization(
        &mut self,
        caller: Address,
        submitter: Address,
        authorized: bool,
    ) -> Result<VerifierEvent> {
        self.require_owner(caller)?;
        if authorized {
            self.submitters.insert(submitter);
        } else {
            self.submitters.remove(&submitter);
        }
        info!(submitter = %submitter, authorized, "submitter authorization set");
        Ok(VerifierEvent::SubmitterAuthorized {
            submitter,
            authorized,
        })
    }

    /// Replace the alert thresholds.
    ///
    /// # Errors
    ///
    /// - [`VerifierError::UnauthorizedCaller`] if `caller` is not the owner
    /// - [`VerifierError::InvalidThresholdRange`] if `enabled && upper <= lower`
    pub fn set_thresholds(
        &mut self,
        caller: Address,
        upper: Price,
        lower: Price,
        enabled: bool,
    ) -> Result<VerifierEvent> {
        self.require_owner(caller)?;
        let config = ThresholdConfig {
            upper_bound: upper,
            lower_bound: lower,
            enabled,
        };
        if !config.is_valid() {
            return Err(VerifierError::InvalidThresholdRange { upper, lower });
        }
        self.thresholds = config;
        info!(upper, lower, enabled, "thresholds configured");
        Ok(VerifierEvent::ThresholdConfigured {
            upper_bound: upper,
            lower_bound: lower,
            enabled,
        })
    }

    /// Hand the registry to a new owner.
    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<VerifierEvent> {
        self.require_owner(caller)?;
        let previous_owner = std::mem::replace(&mut self.owner, new_owner);
        info!(previous = %previous_owner, new = %new_owner, "ownership transferred");
        Ok(VerifierEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        })
    }
}
