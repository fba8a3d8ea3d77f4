#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Rollup batch submitter driver
//!
//! Each submitter role runs a service loop that, every poll interval:
//! - Finds the next range of L2 blocks to commit to L1
//! - Builds the batch transaction for it
//! - Publishes it and replaces it at higher fees until it is confirmed

/// The L1 operations the submitter depends on.
mod backend;
pub use backend::{L1Backend, Receipt};

/// The capability set of a submitter role.
mod driver;
pub use driver::BatchDriver;

/// Driver errors.
mod errors;
pub use errors::DriverError;

/// Fee selection, signing and pending transaction clearing.
mod fees;
pub use fees::{FeeManager, GasFees};

/// The publication loop.
mod txmgr;
pub use txmgr::{SendOutcome, TxManager, TxManagerConfig};

/// The sequencer role, submitting L2 transactions to the CTC.
mod sequencer;
pub use sequencer::{SequencerConfig, SequencerDriver};

/// The proposer role, submitting L2 state roots to the SCC.
mod proposer;
pub use proposer::{ProposerConfig, ProposerDriver};

/// The periodic submission cycle.
mod service;
pub use service::{Service, ServiceConfig, TickOutcome};

/// The runtime configuration.
mod config;
pub use config::RuntimeConfig;

/// Helper functions.
mod helpers;

/// The metrics of the submitter roles.
mod metrics;
pub use metrics::SubmitterMetrics;

/// Startup of the enabled roles.
mod submitter;
pub use submitter::spawn_submitters;
