use std::fmt;

use alloy::{
    providers::Provider,
    rpc::types::{TransactionReceipt, TransactionRequest},
    transports::TransportResult,
};
use alloy_primitives::{Address, B256, Bytes, U256};
use bss_clients::execution::ExecutionClient;

/// The subset of a transaction receipt the submitter acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    /// The hash of the mined transaction.
    pub tx_hash: B256,
    /// The L1 block the transaction was included in.
    pub block_number: u64,
    /// The gas used by the transaction.
    pub gas_used: u64,
    /// Whether the transaction executed successfully.
    pub status: bool,
    /// The price paid per unit of gas.
    pub effective_gas_price: u128,
}

impl Receipt {
    /// Converts an RPC receipt. Returns `None` for receipts without a block number.
    pub fn from_rpc(receipt: &TransactionReceipt) -> Option<Self> {
        Some(Self {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number?,
            gas_used: receipt.gas_used,
            status: receipt.status(),
            effective_gas_price: receipt.effective_gas_price,
        })
    }
}

/// The L1 operations used to price, publish and confirm transactions.
///
/// Implemented by [`ExecutionClient`]; tests drive the tx manager and service loop with
/// in-memory implementations.
pub trait L1Backend: Clone + fmt::Debug + Send + Sync + 'static {
    /// Returns the L1 chain id.
    fn chain_id(&self) -> impl Future<Output = TransportResult<u64>> + Send;

    /// Returns the latest L1 block number.
    fn head_number(&self) -> impl Future<Output = TransportResult<u64>> + Send;

    /// Returns the balance of `address` at the latest block.
    fn balance_at(&self, address: Address) -> impl Future<Output = TransportResult<U256>> + Send;

    /// Returns the nonce of `address` including mempool transactions.
    fn pending_nonce_at(&self, address: Address)
    -> impl Future<Output = TransportResult<u64>> + Send;

    /// Returns the nonce of `address` at the latest block.
    fn latest_nonce_at(&self, address: Address)
    -> impl Future<Output = TransportResult<u64>> + Send;

    /// Returns the suggested priority fee per gas.
    fn suggest_gas_tip_cap(&self) -> impl Future<Output = TransportResult<u128>> + Send;

    /// Returns the base fee of the latest block.
    fn latest_base_fee(&self) -> impl Future<Output = TransportResult<u128>> + Send;

    /// Estimates the gas used by `tx`.
    fn estimate_gas(&self, tx: TransactionRequest)
    -> impl Future<Output = TransportResult<u64>> + Send;

    /// Publishes a signed, EIP-2718 encoded transaction.
    fn publish(&self, raw: Bytes) -> impl Future<Output = TransportResult<B256>> + Send;

    /// Returns the receipt of `hash`, if it was mined.
    fn receipt(&self, hash: B256) -> impl Future<Output = TransportResult<Option<Receipt>>> + Send;

    /// Returns the revert reason of a mined transaction.
    fn revert_reason(&self, hash: B256) -> impl Future<Output = TransportResult<String>> + Send;
}

impl L1Backend for ExecutionClient {
    async fn chain_id(&self) -> TransportResult<u64> {
        self.get_chain_id().await
    }

    async fn head_number(&self) -> TransportResult<u64> {
        self.get_head().await
    }

    async fn balance_at(&self, address: Address) -> TransportResult<U256> {
        self.get_balance(address).await
    }

    async fn pending_nonce_at(&self, address: Address) -> TransportResult<u64> {
        self.pending_nonce(address).await
    }

    async fn latest_nonce_at(&self, address: Address) -> TransportResult<u64> {
        self.latest_nonce(address).await
    }

    async fn suggest_gas_tip_cap(&self) -> TransportResult<u128> {
        self.max_priority_fee_per_gas().await
    }

    async fn latest_base_fee(&self) -> TransportResult<u128> {
        Self::latest_base_fee(self).await
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> TransportResult<u64> {
        Provider::estimate_gas(&**self, tx).await
    }

    async fn publish(&self, raw: Bytes) -> TransportResult<B256> {
        self.send_raw_transaction(raw).await
    }

    async fn receipt(&self, hash: B256) -> TransportResult<Option<Receipt>> {
        let receipt = self.get_transaction_receipt(hash).await?;
        Ok(receipt.as_ref().and_then(Receipt::from_rpc))
    }

    async fn revert_reason(&self, hash: B256) -> TransportResult<String> {
        self.debug_revert_reason(hash).await.map(|reason| reason.to_string())
    }
}

/// In-memory L1 used by the tx manager and service tests.
#[cfg(test)]
pub(crate) mod mock {
    use std::{
        collections::{HashMap, VecDeque},
        sync::{Arc, Mutex, MutexGuard},
    };

    use alloy::{
        consensus::{Transaction, TxEnvelope},
        eips::eip2718::Decodable2718,
        transports::TransportErrorKind,
    };

    use super::*;

    /// How the mock answers a publication.
    #[derive(Debug, Clone)]
    pub(crate) enum PublishReply {
        /// Accept the tx and mine it in the next block with the given status.
        Mine(bool),
        /// Accept the tx but never mine it.
        Drop,
        /// Reject the tx with an RPC error.
        Reject(&'static str),
    }

    #[derive(Debug)]
    pub(crate) struct MockState {
        pub(crate) head: u64,
        pub(crate) balance: U256,
        pub(crate) pending_nonce: u64,
        pub(crate) latest_nonce: u64,
        pub(crate) tip: u128,
        pub(crate) base_fee: u128,
        pub(crate) gas_estimate: u64,
        /// Errors returned by the next priority fee queries, in order.
        pub(crate) tip_errors: VecDeque<&'static str>,
        /// Replies to the next publications, in order. Defaults to [`PublishReply::Mine`].
        pub(crate) publish_replies: VecDeque<PublishReply>,
        pub(crate) published: Vec<TxEnvelope>,
        pub(crate) receipts: HashMap<B256, Receipt>,
        pub(crate) tip_queries: usize,
    }

    impl Default for MockState {
        fn default() -> Self {
            Self {
                head: 100,
                balance: U256::from(10u128.pow(18)),
                pending_nonce: 0,
                latest_nonce: 0,
                tip: 2_000_000_000,
                base_fee: 10_000_000_000,
                gas_estimate: 100_000,
                tip_errors: VecDeque::new(),
                publish_replies: VecDeque::new(),
                published: Vec::new(),
                receipts: HashMap::new(),
                tip_queries: 0,
            }
        }
    }

    #[derive(Debug, Clone, Default)]
    pub(crate) struct MockBackend {
        state: Arc<Mutex<MockState>>,
    }

    impl MockBackend {
        pub(crate) fn state(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap()
        }
    }

    impl L1Backend for MockBackend {
        async fn chain_id(&self) -> TransportResult<u64> {
            Ok(1)
        }

        async fn head_number(&self) -> TransportResult<u64> {
            Ok(self.state().head)
        }

        async fn balance_at(&self, _address: Address) -> TransportResult<U256> {
            Ok(self.state().balance)
        }

        async fn pending_nonce_at(&self, _address: Address) -> TransportResult<u64> {
            Ok(self.state().pending_nonce)
        }

        async fn latest_nonce_at(&self, _address: Address) -> TransportResult<u64> {
            Ok(self.state().latest_nonce)
        }

        async fn suggest_gas_tip_cap(&self) -> TransportResult<u128> {
            let mut state = self.state();
            state.tip_queries += 1;
            match state.tip_errors.pop_front() {
                Some(msg) => Err(TransportErrorKind::custom_str(msg)),
                None => Ok(state.tip),
            }
        }

        async fn latest_base_fee(&self) -> TransportResult<u128> {
            Ok(self.state().base_fee)
        }

        async fn estimate_gas(&self, _tx: TransactionRequest) -> TransportResult<u64> {
            Ok(self.state().gas_estimate)
        }

        async fn publish(&self, raw: Bytes) -> TransportResult<B256> {
            let tx = TxEnvelope::decode_2718(&mut raw.as_ref())
                .map_err(|e| TransportErrorKind::custom_str(&e.to_string()))?;
            let hash = *tx.tx_hash();

            let mut state = self.state();
            match state.publish_replies.pop_front().unwrap_or(PublishReply::Mine(true)) {
                PublishReply::Reject(msg) => return Err(TransportErrorKind::custom_str(msg)),
                PublishReply::Drop => {}
                PublishReply::Mine(status) => {
                    state.head += 1;
                    let receipt = Receipt {
                        tx_hash: hash,
                        block_number: state.head,
                        gas_used: tx.gas_limit() / 2,
                        status,
                        effective_gas_price: tx.max_fee_per_gas(),
                    };
                    state.receipts.insert(hash, receipt);
                    state.latest_nonce = tx.nonce() + 1;
                    state.pending_nonce = state.latest_nonce;
                }
            }
            state.published.push(tx);

            Ok(hash)
        }

        async fn receipt(&self, hash: B256) -> TransportResult<Option<Receipt>> {
            Ok(self.state().receipts.get(&hash).copied())
        }

        async fn revert_reason(&self, _hash: B256) -> TransportResult<String> {
            Ok("mock revert".to_owned())
        }
    }
}
