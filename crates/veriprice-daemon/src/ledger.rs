//! In-process ledger hosting the verifier.
//!
//! [`LocalLedger`] plays the role of the shared ledger for local runs and
//! tests. It serializes every call through a single mutex around the
//! [`Verifier`], charges a fixed cost per accepted update against per-account
//! balances, assigns transaction ids and republishes emitted events on the
//! [`EventBus`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use veriprice_crypto::blake3::{contexts, derive_key};
use veriprice_feeder::submit::{LedgerError, LedgerReceipt, LedgerTransport, Submission};
use veriprice_feeder::Clock;
use veriprice_types::{Address, Hash};
use veriprice_verifier::{CallContext, Verifier};

use crate::events::EventBus;

/// A verifier behind a mutex, with fees and an event feed.
pub struct LocalLedger {
    verifier: Mutex<Verifier>,
    balances: Mutex<BTreeMap<Address, u128>>,
    clock: Arc<dyn Clock>,
    bus: EventBus,
    call_cost: u128,
    nonce: AtomicU64,
}

impl LocalLedger {
    pub fn new(verifier: Verifier, clock: Arc<dyn Clock>, bus: EventBus, call_cost: u128) -> Self {
        Self {
            verifier: Mutex::new(verifier),
            balances: Mutex::new(BTreeMap::new()),
            clock,
            bus,
            call_cost,
            nonce: AtomicU64::new(0),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn call_cost(&self) -> u128 {
        self.call_cost
    }

    /// Credit `amount` to `account`.
    pub async fn fund(&self, account: Address, amount: u128) {
        let mut balances = self.balances.lock().await;
        let balance = balances.entry(account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Run `f` against the verifier as `caller`, publishing any events it emits.
    ///
    /// Used for registry administration and reads.
    pub async fn execute<T>(
        &self,
        caller: Address,
        f: impl FnOnce(&mut Verifier, &CallContext) -> veriprice_verifier::Result<T>,
    ) -> veriprice_verifier::Result<T> {
        let now = self.clock.now();
        let ctx = CallContext::new(caller, now);
        let mut verifier = self.verifier.lock().await;
        let result = f(&mut *verifier, &ctx);
        // Publish under the guard so bus order is commit order.
        self.bus.emit_verifier_events(&verifier.drain_events(), now);
        result
    }

    /// Read-only access to the verifier.
    pub async fn read<T>(&self, f: impl FnOnce(&Verifier) -> T) -> T {
        let verifier = self.verifier.lock().await;
        f(&*verifier)
    }

    fn next_tx_id(&self, attestation: &[u8]) -> Hash {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut material = Vec::with_capacity(attestation.len() + 8);
        material.extend_from_slice(attestation);
        material.extend_from_slice(&nonce.to_le_bytes());
        derive_key(contexts::TRANSACTION_ID, &material)
    }
}

#[async_trait]
impl LedgerTransport for LocalLedger {
    async fn estimate_fee(&self) -> Result<u128, LedgerError> {
        Ok(self.call_cost)
    }

    async fn balance(&self, account: &Address) -> Result<u128, LedgerError> {
        Ok(self.balances.lock().await.get(account).copied().unwrap_or(0))
    }

    async fn send(&self, submission: &Submission) -> Result<LedgerReceipt, LedgerError> {
        if submission.fee < self.call_cost {
            return Err(LedgerError::Underpriced {
                offered: submission.fee,
                required: self.call_cost,
            });
        }

        let mut balances = self.balances.lock().await;
        let available = balances.get(&submission.submitter).copied().unwrap_or(0);
        if available < self.call_cost {
            return Err(LedgerError::InsufficientBalance {
                needed: self.call_cost,
                available,
            });
        }

        let now = self.clock.now();
        let ctx = CallContext::new(submission.submitter, now);
        let mut verifier = self.verifier.lock().await;
        let receipt = verifier.update_price(
            &ctx,
            submission.price,
            submission.observed_at,
            &submission.attestation,
        )?;
        let events = verifier.drain_events();
        self.bus.emit_verifier_events(&events, now);
        drop(verifier);

        balances.insert(submission.submitter, available - self.call_cost);
        drop(balances);

        let tx_id = self.next_tx_id(&submission.attestation);
        debug!(submitter = %submission.submitter, events = events.len(), "ledger call applied");

        Ok(LedgerReceipt {
            tx_id,
            fee_paid: self.call_cost,
            events: receipt.events,
        })
    }
}

impl std::fmt::Debug for LocalLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalLedger")
            .field("call_cost", &self.call_cost)
            .field("bus", &self.bus)
            .finish()
    }
}
