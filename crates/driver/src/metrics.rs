use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Metrics of a submitter role. Every instrument is labelled with the role name.
#[derive(Debug, Clone, Copy)]
pub struct SubmitterMetrics {
    role: &'static str,
}

impl SubmitterMetrics {
    /// Creates the metrics handle of the given role.
    pub const fn new(role: &'static str) -> Self {
        Self { role }
    }

    /// Records the build version of the running binary.
    pub fn set_version_info(version: &'static str) {
        gauge!("batch_submitter_version_info", "version" => version).set(1);
    }

    // ################ COUNTERS ################ //

    /// Increments the amount of batches confirmed on L1
    pub fn increment_batches_submitted(&self) {
        counter!("batch_submitter_batches_submitted", "role" => self.role).increment(1);
    }

    /// Increments the amount of failed submission cycles
    pub fn increment_submission_failures(&self, reason: String) {
        counter!("batch_submitter_submission_failures", "role" => self.role, "reason" => reason)
            .increment(1);
    }

    /// Increments the amount of submissions aborted after repeated "nonce too low" errors
    pub fn increment_nonce_too_low_aborts(&self) {
        counter!("batch_submitter_nonce_too_low_aborts", "role" => self.role).increment(1);
    }

    /// Increments the amount of publications at higher fees
    pub fn increment_resubmissions(&self) {
        counter!("batch_submitter_resubmissions", "role" => self.role).increment(1);
    }

    /// Increments the amount of confirmed transactions that reverted
    pub fn increment_reverted_txs(&self, reason: String) {
        counter!("batch_submitter_reverted_txs", "role" => self.role, "reason" => reason)
            .increment(1);
    }

    /// Increments the amount of pending transactions cleared on startup
    pub fn increment_pending_txs_cleared(&self) {
        counter!("batch_submitter_pending_txs_cleared", "role" => self.role).increment(1);
    }

    // ################ GAUGES ################ //

    /// Sets the submitter balance in ETH
    pub fn set_balance(&self, value: f64) {
        gauge!("batch_submitter_balance_eth", "role" => self.role).set(value);
    }

    /// Sets the EIP-2718 encoded size of the last signed batch transaction
    pub fn set_batch_size_bytes(&self, value: usize) {
        gauge!("batch_submitter_batch_size_bytes", "role" => self.role).set(value as f64);
    }

    /// Sets the number of elements in the last sequencer batch
    pub fn set_num_elements_per_batch(&self, value: usize) {
        gauge!("batch_submitter_num_elements_per_batch", "role" => self.role).set(value as f64);
    }

    /// Sets the number of prune rounds of the last sequencer batch
    pub fn set_batch_prune_count(&self, value: usize) {
        gauge!("batch_submitter_batch_prune_count", "role" => self.role).set(value as f64);
    }

    /// Sets the number of state roots in the last proposer batch
    pub fn set_num_state_roots(&self, value: usize) {
        gauge!("batch_submitter_num_state_roots", "role" => self.role).set(value as f64);
    }

    /// Sets the gas used by the last confirmed batch
    pub fn set_batch_gas_used(&self, value: u64) {
        gauge!("batch_submitter_batch_gas_used", "role" => self.role).set(value as f64);
    }

    // ################ HISTOGRAMS ################ //

    /// Records the time it took to craft a batch transaction
    pub fn record_batch_build_time(&self, elapsed: Duration) {
        histogram!("batch_submitter_batch_build_time", "role" => self.role)
            .record(elapsed.as_secs_f64());
    }

    /// Records the time between the first publication of a batch and its confirmation
    pub fn record_batch_confirmation_time(&self, elapsed: Duration) {
        histogram!("batch_submitter_batch_confirmation_time", "role" => self.role)
            .record(elapsed.as_secs_f64());
    }
}
