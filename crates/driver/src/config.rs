use alloy::signers::local::PrivateKeySigner;
use bss_config::{Opts, RoleSigners};
use bss_primitives::{summary::Summary, wei_to_eth};
use derive_more::derive::Deref;

use crate::{backend::L1Backend, errors::DriverError};

/// The runtime configuration of the submitter.
#[derive(Debug, Clone, Deref)]
pub struct RuntimeConfig {
    /// CLI options that can be accessed as dereferenced fields.
    #[deref]
    pub opts: Opts,
    /// The keys of the enabled roles.
    pub signers: RoleSigners,
    /// The L1 chain id, read once on startup.
    pub chain_id: u64,
}

impl RuntimeConfig {
    /// Create a new [`RuntimeConfig`], reading the chain id from `l1`.
    pub async fn new<B: L1Backend>(
        opts: Opts,
        signers: RoleSigners,
        l1: &B,
    ) -> Result<Self, DriverError> {
        let chain_id = l1.chain_id().await?;
        Ok(Self { opts, signers, chain_id })
    }
}

fn role(signer: Option<&PrivateKeySigner>) -> String {
    signer.map_or_else(|| "disabled".to_owned(), |signer| signer.address().to_string())
}

impl Summary for RuntimeConfig {
    fn summary(&self) -> String {
        format!(
            "Running with the following configuration:
            - Instance name: {}
            - L1: chain_id={}, ctc={}, scc={}
            - Sequencer: {}, batch_type={}, tx_size={}..{}b, max_plaintext={}b, max_tx_count={}
            - Proposer: {}, state_roots={}..={}, finality_confirmations={}
            - Service: poll_interval={}s, block_offset={}, clear_pending_txs={}, min_balance={:.3} ETH
            - Tx manager: confirmations={}, resubmission_timeout={}s, safe_abort_nonce_too_low={}
            ",
            self.instance_name,
            self.chain_id,
            self.contracts.ctc,
            self.contracts.scc,
            role(self.signers.sequencer.as_ref()),
            self.sequencer.batch_type,
            self.sequencer.min_l1_tx_size,
            self.sequencer.max_l1_tx_size,
            self.sequencer.max_plaintext_batch_size,
            self.sequencer.max_tx_batch_count,
            role(self.signers.proposer.as_ref()),
            self.proposer.min_state_root_elements,
            self.proposer.max_state_root_elements,
            self.proposer.finality_confirmations,
            self.service.poll_interval_secs,
            self.service.block_offset,
            self.service.clear_pending_txs,
            wei_to_eth(self.service.safe_minimum_ether_balance),
            self.txmgr.num_confirmations,
            self.txmgr.resubmission_timeout_secs,
            self.txmgr.safe_abort_nonce_too_low_count,
        )
    }
}
