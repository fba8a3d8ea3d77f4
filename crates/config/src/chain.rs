use alloy::primitives::Address;
use clap::Parser;
use url::Url;

/// L1-related configuration options
#[derive(Debug, Clone, Parser)]
pub struct L1Opts {
    /// The URL of the L1 execution client HTTP connection
    #[clap(long = "l1.rpc-url", env = "BSS_L1_RPC_URL", id = "l1-rpc-url")]
    pub rpc_url: Url,
}

/// L2-related configuration options
#[derive(Debug, Clone, Parser)]
pub struct L2Opts {
    /// The URL of the L2 rollup node HTTP connection
    #[clap(long = "l2.rpc-url", env = "BSS_L2_RPC_URL", id = "l2-rpc-url")]
    pub rpc_url: Url,
}

/// The L1 contract addresses the submitter writes to.
#[derive(Debug, Clone, Parser)]
pub struct ContractAddresses {
    /// The address of the `CanonicalTransactionChain` contract
    #[clap(long = "contracts.ctc", env = "BSS_CTC_ADDRESS")]
    pub ctc: Address,
    /// The address of the `StateCommitmentChain` contract
    #[clap(long = "contracts.scc", env = "BSS_SCC_ADDRESS")]
    pub scc: Address,
}
