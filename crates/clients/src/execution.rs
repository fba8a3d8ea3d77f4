use std::fmt;

use alloy::{
    providers::ProviderBuilder,
    rpc::{
        client::RpcClient,
        types::{Block, BlockNumberOrTag, SyncStatus},
    },
    transports::{TransportErrorKind, TransportResult},
};
use alloy_primitives::{Address, B256, Bytes, U64, U128};
use alloy_rpc_types_trace::geth::{
    CallConfig, CallFrame, GethDebugBuiltInTracerType, GethDebugTracerType, GethDebugTracingOptions,
};
use bss_chainio::{DefaultProvider, http_rpc_client};
use derive_more::derive::Deref;
use url::Url;

/// An HTTP-based JSON-RPC client for the L1 execution layer.
///
/// This struct is a wrapper over an inner [`DefaultProvider`] and extends it with the
/// raw calls the submitter relies on. Provider methods are available by dereferencing.
#[derive(Clone, Debug, Deref)]
pub struct ExecutionClient {
    /// The RPC client shared with the provider, used for raw requests.
    rpc: RpcClient,
    /// The inner provider that implements all the JSON-RPC methods.
    #[deref]
    inner: DefaultProvider,
}

impl ExecutionClient {
    /// Create a new [`ExecutionClient`] for the given HTTP URL.
    pub fn new(url: Url, disable_http2: bool) -> Result<Self, reqwest::Error> {
        let rpc = http_rpc_client(url, disable_http2)?;
        let inner = ProviderBuilder::new().connect_client(rpc.clone());
        Ok(Self { rpc, inner })
    }

    /// The underlying RPC client, for building contract bindings on the same connection pool.
    pub fn rpc_client(&self) -> RpcClient {
        self.rpc.clone()
    }

    /// Get the latest block number
    pub async fn get_head(&self) -> TransportResult<u64> {
        let result: U64 = self.rpc.request("eth_blockNumber", ()).await?;

        Ok(result.to())
    }

    /// Get the block with the given number. If `None`, the latest block is returned.
    pub async fn get_block(&self, block_number: Option<u64>, full: bool) -> TransportResult<Block> {
        let tag = block_number.map_or(BlockNumberOrTag::Latest, BlockNumberOrTag::Number);

        let block: Option<Block> = self.rpc.request("eth_getBlockByNumber", (tag, full)).await?;
        block.ok_or_else(|| TransportErrorKind::custom_str(&format!("Block not found: {tag}")))
    }

    /// Returns the base fee of the latest block.
    pub async fn latest_base_fee(&self) -> TransportResult<u128> {
        let block = self.get_block(None, false).await?;
        block.header.base_fee_per_gas.map(u128::from).ok_or_else(|| {
            TransportErrorKind::custom_str(&format!("Block {} has no base fee", block.header.number))
        })
    }

    /// Returns the node's suggested priority fee.
    ///
    /// Not every L1 backend implements `eth_maxPriorityFeePerGas`; callers are expected to
    /// handle the "method not found" error.
    pub async fn max_priority_fee_per_gas(&self) -> TransportResult<u128> {
        let fee: U128 = self.rpc.request("eth_maxPriorityFeePerGas", ()).await?;
        Ok(fee.to())
    }

    /// Returns the account nonce including transactions in the node's mempool.
    pub async fn pending_nonce(&self, address: Address) -> TransportResult<u64> {
        self.nonce_at(address, BlockNumberOrTag::Pending).await
    }

    /// Returns the account nonce as of the latest block.
    pub async fn latest_nonce(&self, address: Address) -> TransportResult<u64> {
        self.nonce_at(address, BlockNumberOrTag::Latest).await
    }

    async fn nonce_at(&self, address: Address, tag: BlockNumberOrTag) -> TransportResult<u64> {
        let nonce: U64 = self.rpc.request("eth_getTransactionCount", (address, tag)).await?;
        Ok(nonce.to())
    }

    /// Send a raw transaction to the network.
    pub async fn send_raw_transaction(&self, raw: Bytes) -> TransportResult<B256> {
        self.rpc.request("eth_sendRawTransaction", [raw]).await
    }

    /// Check if the client is synced. Returns `true` if the client is synced.
    pub async fn is_synced(&self) -> TransportResult<bool> {
        let status: SyncStatus = self.rpc.request("eth_syncing", ()).await?;
        Ok(matches!(status, SyncStatus::None))
    }

    /// Runs a simple `debug_traceTransaction` RPC call to establish the revert reason of a
    /// transaction, if any.
    ///
    /// NOTE: assumes a client compatible with the `debug_traceTransaction` RPC call
    pub async fn debug_revert_reason(&self, tx_hash: B256) -> TransportResult<RevertReasonTrace> {
        let opts = GethDebugTracingOptions::default()
            .with_tracer(GethDebugTracerType::BuiltInTracer(GethDebugBuiltInTracerType::CallTracer))
            .with_config(CallConfig::default().only_top_call());

        let trace: CallFrame = self.rpc.request("debug_traceTransaction", (tx_hash, opts)).await?;

        // Return the revert reason if it exists, otherwise return the raw output bytes.
        match trace.revert_reason {
            Some(reason) => Ok(RevertReasonTrace::String(reason)),
            None => match trace.output {
                Some(output) => Ok(RevertReasonTrace::ContractBytes(output)),
                None => Ok(RevertReasonTrace::Unknown),
            },
        }
    }
}

/// The result of a `debug_traceTransaction` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertReasonTrace {
    /// The revert reason is a string.
    String(String),
    /// The output is a bytes object.
    ContractBytes(Bytes),
    /// The reason is unknown
    Unknown,
}

impl fmt::Display for RevertReasonTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(reason) => f.write_str(reason),
            Self::ContractBytes(bytes) => write!(f, "{bytes}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc, thread};

    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;

    /// Serves a single JSON-RPC reply for `method` from a background thread.
    fn serve(
        method: &'static str,
        reply: serde_json::Value,
    ) -> (Url, mockito::Mock, thread::JoinHandle<()>) {
        let (server_tx, server_rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let mut server = Server::new();
            let mock = server
                .mock("POST", "/")
                .match_body(Matcher::PartialJson(json!({ "method": method })))
                .with_header("content-type", "application/json")
                .with_body(reply.to_string())
                .create();

            server_tx.send((server.url(), mock)).unwrap();
            thread::park();
        });

        let (url, mock) = server_rx.recv().unwrap();
        (Url::parse(&url).unwrap(), mock, handle)
    }

    #[tokio::test]
    async fn pending_nonce() {
        let (url, mock, handle) =
            serve("eth_getTransactionCount", json!({ "jsonrpc": "2.0", "id": 0, "result": "0x2a" }));

        let client = ExecutionClient::new(url, true).unwrap();
        let nonce = client.pending_nonce(Address::repeat_byte(1)).await.unwrap();

        mock.assert();
        assert_eq!(nonce, 42);

        handle.thread().unpark();
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn priority_fee_method_not_found() {
        let (url, mock, handle) = serve(
            "eth_maxPriorityFeePerGas",
            json!({
                "jsonrpc": "2.0",
                "id": 0,
                "error": { "code": -32601, "message": "Method eth_maxPriorityFeePerGas not found" }
            }),
        );

        let client = ExecutionClient::new(url, false).unwrap();
        let err = client.max_priority_fee_per_gas().await.unwrap_err();

        mock.assert();
        assert!(err.to_string().contains("Method eth_maxPriorityFeePerGas not found"));

        handle.thread().unpark();
        handle.join().unwrap();
    }

    #[test]
    fn revert_reason_display() {
        assert_eq!(RevertReasonTrace::String("BLOCK_NUMBER".to_owned()).to_string(), "BLOCK_NUMBER");
        assert_eq!(RevertReasonTrace::Unknown.to_string(), "unknown");
    }
}
