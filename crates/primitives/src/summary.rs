use alloy::consensus::{Transaction, TxEnvelope};

use crate::ctc::AppendSequencerBatchParams;

/// A trait for objects that can be summarized into a string for logging purposes.
///
/// Sometimes the Debug impl is too verbose, and the Display impl does something different
/// than what we want. This trait allows us to have our custom verbosity.
pub trait Summary {
    /// Returns a summary of the object.
    fn summary(&self) -> String;
}

impl Summary for TxEnvelope {
    fn summary(&self) -> String {
        format!(
            "chain_id={}, nonce={}, gas_limit={}, max_fee_per_gas={}, max_priority_fee_per_gas={}, to={}, value={}, input_size={}, hash={}",
            self.chain_id().unwrap_or_default(),
            self.nonce(),
            self.gas_limit(),
            self.max_fee_per_gas(),
            self.max_priority_fee_per_gas().unwrap_or_default(),
            self.to().unwrap_or_default(),
            self.value(),
            self.input().len(),
            self.tx_hash()
        )
    }
}

impl Summary for AppendSequencerBatchParams {
    fn summary(&self) -> String {
        let queued: u64 = self.contexts.iter().map(|ctx| ctx.num_subsequent_queue_txs).sum();
        format!(
            "should_start_at_element={}, total_elements={}, contexts={}, sequenced_txs={}, queued_txs={}, plaintext_size={}",
            self.should_start_at_element,
            self.total_elements_to_append,
            self.contexts.len(),
            self.txs.len(),
            queued,
            self.plaintext_size_hint(),
        )
    }
}
