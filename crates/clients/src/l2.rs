use alloy::{
    rpc::{
        client::RpcClient,
        types::{BlockNumberOrTag, SyncStatus},
    },
    transports::{TransportErrorKind, TransportResult},
};
use alloy_primitives::U64;
use bss_chainio::http_rpc_client;
use bss_primitives::l2::L2Block;
use url::Url;

/// A JSON-RPC client for the rollup's L2 node.
///
/// Blocks are fetched with full transaction objects, including the L2 extension fields
/// (`l1BlockNumber`, `queueOrigin`) that the standard RPC types do not know about.
#[derive(Clone, Debug)]
pub struct L2Client {
    rpc: RpcClient,
}

impl L2Client {
    /// Create a new [`L2Client`] for the given HTTP URL.
    pub fn new(url: Url, disable_http2: bool) -> Result<Self, reqwest::Error> {
        Ok(Self { rpc: http_rpc_client(url, disable_http2)? })
    }

    /// Get the latest L2 block number.
    pub async fn get_head(&self) -> TransportResult<u64> {
        let result: U64 = self.rpc.request("eth_blockNumber", ()).await?;

        Ok(result.to())
    }

    /// Get the block with the given number, with full transactions.
    pub async fn block_by_number(&self, number: u64) -> TransportResult<L2Block> {
        let tag = BlockNumberOrTag::Number(number);

        let block: Option<L2Block> = self.rpc.request("eth_getBlockByNumber", (tag, true)).await?;
        block.ok_or_else(|| TransportErrorKind::custom_str(&format!("L2 block not found: {number}")))
    }

    /// Check if the node is synced.
    pub async fn is_synced(&self) -> TransportResult<bool> {
        let status: SyncStatus = self.rpc.request("eth_syncing", ()).await?;
        Ok(matches!(status, SyncStatus::None))
    }
}
