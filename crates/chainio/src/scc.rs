use alloy::{
    contract::Result as ContractResult, providers::ProviderBuilder, rpc::client::RpcClient, sol,
};
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::SolCall;

use IStateCommitmentChain::{IStateCommitmentChainInstance, appendStateBatchCall};

use crate::DefaultProvider;

sol! {
    #[sol(rpc)]
    #[allow(missing_docs)]
    interface IStateCommitmentChain {
        /// Number of state roots appended so far.
        function getTotalElements() external view returns (uint256 _totalElements);

        /// Appends a batch of state roots starting at the given element index.
        function appendStateBatch(bytes32[] calldata _batch, uint256 _shouldStartAtElement) external;
    }
}

/// A wrapper over the `StateCommitmentChain` contract.
#[derive(Debug, Clone)]
pub struct StateCommitmentChain(IStateCommitmentChainInstance<DefaultProvider>);

impl StateCommitmentChain {
    /// Create a new instance at `address` using the given RPC client.
    pub fn new(client: RpcClient, address: Address) -> Self {
        let provider = ProviderBuilder::new().connect_client(client);
        Self(IStateCommitmentChainInstance::new(address, provider))
    }

    /// The contract address.
    pub const fn address(&self) -> &Address {
        self.0.address()
    }

    /// Returns the number of state roots committed so far.
    pub async fn total_elements(&self) -> ContractResult<u64> {
        let total = self.0.getTotalElements().call().await?;
        Ok(total.saturating_to())
    }

    /// Builds the calldata of an `appendStateBatch` call.
    pub fn append_state_batch_calldata(roots: Vec<B256>, should_start_at_element: u64) -> Bytes {
        appendStateBatchCall {
            _batch: roots,
            _shouldStartAtElement: U256::from(should_start_at_element),
        }
        .abi_encode()
        .into()
    }
}
