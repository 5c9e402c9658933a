//! # veriprice-daemon
//!
//! Hosts the verifier in-process and drives the feeder pipeline on a fixed
//! poll interval.
//!
//! ## Modules
//!
//! - [`config`]: `config.toml` loading and validation
//! - [`events`]: Event bus republishing verifier events
//! - [`ledger`]: In-process ledger hosting the verifier
//! - [`node`]: Node assembly and the poll loop

pub mod config;
pub mod events;
pub mod ledger;
pub mod node;

pub use config::DaemonConfig;
pub use events::{Event, EventBus};
pub use ledger::LocalLedger;
pub use node::{build, run_poll_loop, Node};
