#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Configuration for the rollup batch submitter.

use alloy::signers::local::LocalSignerError;
use clap::{
    Parser,
    builder::{
        Styles,
        styling::{AnsiColor, Color, Style},
    },
};
use thiserror::Error;

mod chain;
pub use chain::{ContractAddresses, L1Opts, L2Opts};

mod keys;
pub use keys::{KeyOpts, RoleSigners};

mod submitter;
pub use submitter::{ProposerOpts, SequencerOpts, ServiceOpts};

mod telemetry;
pub use telemetry::{LogProvider, TelemetryError, TelemetryOpts};

mod txmgr;
pub use txmgr::TxManagerOpts;

/// CLI options for the batch submitter.
#[derive(Debug, Clone, Parser)]
#[command(author, version, styles = cli_styles(), about)]
pub struct Opts {
    /// A unique name for this instance, used in metrics and logs
    #[clap(long, env = "BSS_INSTANCE_NAME", default_value = "batch-submitter")]
    pub instance_name: String,
    /// L1-related configuration options
    #[clap(flatten)]
    pub l1: L1Opts,
    /// L2-related configuration options
    #[clap(flatten)]
    pub l2: L2Opts,
    /// The contract addresses the submitter writes to.
    #[clap(flatten)]
    pub contracts: ContractAddresses,
    /// Sequencer batch options
    #[clap(flatten)]
    pub sequencer: SequencerOpts,
    /// State root proposer options
    #[clap(flatten)]
    pub proposer: ProposerOpts,
    /// Transaction manager options
    #[clap(flatten)]
    pub txmgr: TxManagerOpts,
    /// Options shared by both roles
    #[clap(flatten)]
    pub service: ServiceOpts,
    /// Key material of the submitter roles
    #[clap(flatten)]
    pub keys: KeyOpts,
    /// Telemetry-related configuration options
    #[clap(flatten)]
    pub telemetry: TelemetryOpts,
}

/// An invalid configuration. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one of the tx batch submitter and the state batch submitter must run")]
    NoRoleEnabled,
    #[error("missing private key for the {0} role")]
    MissingPrivateKey(&'static str),
    #[error("missing HD derivation path for the {0} role")]
    MissingHdPath(&'static str),
    #[error("cannot use a mnemonic together with private keys")]
    MnemonicAndPrivateKey,
    #[error("sequencer and proposer must use different HD derivation paths")]
    SameHdPath,
    #[error("sequencer and proposer must use different keys")]
    SameKey,
    #[error("failed to derive key from mnemonic: {0}")]
    Signer(#[from] LocalSignerError),
    #[error("min L1 tx size ({min}) must be lower than max L1 tx size ({max})")]
    InvalidTxSizeWindow { min: usize, max: usize },
    #[error("min state root elements ({min}) must be in 1..={max}")]
    InvalidStateRootWindow { min: usize, max: usize },
    #[error("number of confirmations must be at least 1")]
    ZeroConfirmations,
    #[error("poll interval must be at least 1 second")]
    ZeroPollInterval,
    #[error("resubmission timeout must be at least 1 second")]
    ZeroResubmissionTimeout,
    #[error("receipt query interval must be at least 1 millisecond")]
    ZeroReceiptQueryInterval,
    #[error("metrics are enabled but the metrics port is 0")]
    InvalidMetricsPort,
}

impl Opts {
    /// Validates the options and resolves the signers of the enabled roles.
    pub fn validate(&self) -> Result<RoleSigners, ConfigError> {
        let run_sequencer = self.service.run_tx_batch_submitter;
        let run_proposer = self.service.run_state_batch_submitter;

        if !run_sequencer && !run_proposer {
            return Err(ConfigError::NoRoleEnabled);
        }

        if run_sequencer && self.sequencer.min_l1_tx_size >= self.sequencer.max_l1_tx_size {
            return Err(ConfigError::InvalidTxSizeWindow {
                min: self.sequencer.min_l1_tx_size,
                max: self.sequencer.max_l1_tx_size,
            });
        }

        let (min_roots, max_roots) =
            (self.proposer.min_state_root_elements, self.proposer.max_state_root_elements);
        if run_proposer && (min_roots == 0 || min_roots > max_roots) {
            return Err(ConfigError::InvalidStateRootWindow { min: min_roots, max: max_roots });
        }

        if self.txmgr.num_confirmations == 0 {
            return Err(ConfigError::ZeroConfirmations);
        }

        if self.txmgr.resubmission_timeout_secs == 0 {
            return Err(ConfigError::ZeroResubmissionTimeout);
        }

        if self.txmgr.receipt_query_interval_ms == 0 {
            return Err(ConfigError::ZeroReceiptQueryInterval);
        }

        if self.service.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }

        if !self.telemetry.disable_metrics && self.telemetry.metrics_port == 0 {
            return Err(ConfigError::InvalidMetricsPort);
        }

        self.keys.signers(run_sequencer, run_proposer)
    }
}

/// Styles for the CLI.
const fn cli_styles() -> Styles {
    Styles::styled()
        .usage(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
        .header(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
        .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .invalid(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .error(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .valid(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::White))))
}
