use std::time::Duration;

use clap::Parser;

/// Transaction manager options
#[derive(Debug, Clone, Parser)]
pub struct TxManagerOpts {
    /// Number of confirmations to wait for before a transaction is considered final
    #[clap(long = "txmgr.num-confirmations", env = "BSS_NUM_CONFIRMATIONS", default_value_t = 1)]
    pub num_confirmations: u64,
    /// Seconds to wait for a receipt before resubmitting with higher fees
    #[clap(
        long = "txmgr.resubmission-timeout",
        env = "BSS_RESUBMISSION_TIMEOUT",
        default_value_t = 60
    )]
    pub resubmission_timeout_secs: u64,
    /// Milliseconds between two receipt queries
    #[clap(
        long = "txmgr.receipt-query-interval",
        env = "BSS_RECEIPT_QUERY_INTERVAL",
        default_value_t = 1_000
    )]
    pub receipt_query_interval_ms: u64,
    /// Number of "nonce too low" errors after which a submission is assumed confirmed
    #[clap(
        long = "txmgr.safe-abort-nonce-too-low-count",
        env = "BSS_SAFE_ABORT_NONCE_TOO_LOW_COUNT",
        default_value_t = 3
    )]
    pub safe_abort_nonce_too_low_count: u64,
    /// Substring identifying a "nonce too low" error from the L1 node
    #[clap(
        long = "txmgr.nonce-too-low-msg",
        env = "BSS_NONCE_TOO_LOW_MSG",
        default_value = "nonce too low"
    )]
    pub nonce_too_low_message: String,
    /// Priority fee (in wei) used when the L1 node does not implement
    /// `eth_maxPriorityFeePerGas`
    ///
    /// Default: 1.5 gwei
    #[clap(
        long = "txmgr.fallback-tip-cap",
        env = "BSS_FALLBACK_GAS_TIP_CAP",
        default_value_t = 1_500_000_000
    )]
    pub fallback_tip_cap: u128,
}

impl TxManagerOpts {
    /// Per-attempt confirmation watch.
    pub const fn resubmission_timeout(&self) -> Duration {
        Duration::from_secs(self.resubmission_timeout_secs)
    }

    /// Receipt polling period.
    pub const fn receipt_query_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_query_interval_ms)
    }
}
