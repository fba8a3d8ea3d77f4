use std::time::Duration;

use alloy::{consensus::constants::ETH_TO_WEI, primitives::U256};
use bss_primitives::ctc::BatchType;
use clap::{ArgAction, Parser};

/// Sequencer batch (CTC) submission options
#[derive(Debug, Clone, Parser)]
pub struct SequencerOpts {
    /// Calldata size below which a batch is not worth submitting, in bytes
    #[clap(long = "sequencer.min-tx-size", env = "BSS_MIN_L1_TX_SIZE", default_value_t = 32_000)]
    pub min_l1_tx_size: usize,
    /// Maximum calldata size of a batch transaction, in bytes. Larger batches are pruned.
    #[clap(long = "sequencer.max-tx-size", env = "BSS_MAX_L1_TX_SIZE", default_value_t = 90_000)]
    pub max_l1_tx_size: usize,
    /// Maximum size of the length-prefixed transactions of a batch before encoding, in bytes
    #[clap(
        long = "sequencer.max-plaintext-batch-size",
        env = "BSS_MAX_PLAINTEXT_BATCH_SIZE",
        default_value_t = 120_000
    )]
    pub max_plaintext_batch_size: usize,
    /// Maximum number of L2 transactions per batch. 0 disables the cap.
    #[clap(long = "sequencer.max-tx-count", env = "BSS_MAX_TX_BATCH_COUNT", default_value_t = 0)]
    pub max_tx_batch_count: usize,
    /// Seconds after the last submission after which a batch below the size floor is
    /// submitted anyway. 0 disables forced submission.
    #[clap(
        long = "sequencer.max-batch-submission-time",
        env = "BSS_MAX_BATCH_SUBMISSION_TIME",
        default_value_t = 0
    )]
    pub max_batch_submission_time_secs: u64,
    /// The encoding of batch transactions: `legacy` or `zlib`
    #[clap(long = "sequencer.batch-type", env = "BSS_SEQUENCER_BATCH_TYPE", default_value_t = BatchType::Legacy)]
    pub batch_type: BatchType,
}

impl SequencerOpts {
    /// The forced submission age, if enabled.
    pub const fn max_batch_submission_time(&self) -> Option<Duration> {
        if self.max_batch_submission_time_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.max_batch_submission_time_secs))
        }
    }
}

/// State root (SCC) proposer options
#[derive(Debug, Clone, Parser)]
pub struct ProposerOpts {
    /// Minimum number of state roots per batch
    #[clap(long = "proposer.min-state-roots", env = "BSS_MIN_STATE_ROOT_ELEMENTS", default_value_t = 1)]
    pub min_state_root_elements: usize,
    /// Maximum number of state roots per batch
    #[clap(long = "proposer.max-state-roots", env = "BSS_MAX_STATE_ROOT_ELEMENTS", default_value_t = 3_000)]
    pub max_state_root_elements: usize,
    /// Number of L1 confirmations a CTC batch needs before its state roots are proposed
    #[clap(
        long = "proposer.finality-confirmations",
        env = "BSS_FINALITY_CONFIRMATIONS",
        default_value_t = 0
    )]
    pub finality_confirmations: u64,
}

/// Options shared by both submitter roles
#[derive(Debug, Clone, Parser)]
pub struct ServiceOpts {
    /// Seconds between two submission cycles
    #[clap(long = "service.poll-interval", env = "BSS_POLL_INTERVAL", default_value_t = 5)]
    pub poll_interval_secs: u64,
    /// Offset between CTC element indices and L2 block numbers
    #[clap(long = "service.block-offset", env = "BSS_BLOCK_OFFSET", default_value_t = 1)]
    pub block_offset: u64,
    /// Run the sequencer batch submitter
    #[clap(
        long = "service.run-tx-batch-submitter",
        env = "BSS_RUN_TX_BATCH_SUBMITTER",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub run_tx_batch_submitter: bool,
    /// Run the state batch submitter
    #[clap(
        long = "service.run-state-batch-submitter",
        env = "BSS_RUN_STATE_BATCH_SUBMITTER",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub run_state_batch_submitter: bool,
    /// Replace any pending transaction of the submitter accounts on startup
    #[clap(long = "service.clear-pending-txs", env = "BSS_CLEAR_PENDING_TXS", default_value_t = false)]
    pub clear_pending_txs: bool,
    /// Balance (in wei) under which a low balance warning is logged
    ///
    /// Default: 0.1 ETH
    #[clap(
        long = "service.safe-minimum-balance",
        env = "BSS_SAFE_MINIMUM_ETHER_BALANCE",
        default_value_t = U256::from(ETH_TO_WEI / 10)
    )]
    pub safe_minimum_ether_balance: U256,
    /// Force HTTP/1.1 on every RPC connection
    #[clap(long = "service.disable-http2", env = "BSS_HTTP2_DISABLE", default_value_t = false)]
    pub disable_http2: bool,
}

impl ServiceOpts {
    /// The period of a submission cycle.
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
