use alloy::{
    contract::Result as ContractResult, eips::BlockId, providers::ProviderBuilder,
    rpc::client::RpcClient, sol,
};
use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolCall;

use ICanonicalTransactionChain::{ICanonicalTransactionChainInstance, appendSequencerBatchCall};

use crate::DefaultProvider;

sol! {
    #[sol(rpc)]
    #[allow(missing_docs)]
    interface ICanonicalTransactionChain {
        /// Number of elements appended to the chain so far, sequencer and queued.
        function getTotalElements() external view returns (uint256 _totalElements);

        /// Appends a sequencer batch. The arguments are read from raw calldata following
        /// the selector in a custom packed encoding.
        function appendSequencerBatch() external;
    }
}

/// A wrapper over the `CanonicalTransactionChain` contract.
#[derive(Debug, Clone)]
pub struct CanonicalTransactionChain(ICanonicalTransactionChainInstance<DefaultProvider>);

impl CanonicalTransactionChain {
    /// Create a new instance at `address` using the given RPC client.
    pub fn new(client: RpcClient, address: Address) -> Self {
        let provider = ProviderBuilder::new().connect_client(client);
        Self(ICanonicalTransactionChainInstance::new(address, provider))
    }

    /// The contract address.
    pub const fn address(&self) -> &Address {
        self.0.address()
    }

    /// Returns the total number of elements in the chain at the latest block.
    pub async fn total_elements(&self) -> ContractResult<u64> {
        self.total_elements_at(BlockId::latest()).await
    }

    /// Returns the total number of elements in the chain at the given block.
    pub async fn total_elements_at(&self, block: BlockId) -> ContractResult<u64> {
        let total = self.0.getTotalElements().call().block(block).await?;
        Ok(total.saturating_to())
    }

    /// Builds the calldata of an `appendSequencerBatch` call carrying an encoded batch.
    pub fn append_sequencer_batch_calldata(batch: &[u8]) -> Bytes {
        let mut calldata = Vec::with_capacity(4 + batch.len());
        calldata.extend_from_slice(&appendSequencerBatchCall::SELECTOR);
        calldata.extend_from_slice(batch);
        calldata.into()
    }
}
