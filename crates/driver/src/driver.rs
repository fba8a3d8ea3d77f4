use alloy::consensus::{TxEip1559, TxEnvelope};
use alloy_primitives::{Address, B256};
use tokio_util::sync::CancellationToken;

use crate::{
    backend::L1Backend, errors::DriverError, fees::GasFees, metrics::SubmitterMetrics,
    txmgr::TxManager,
};

/// A submitter role: builds the transactions the service loop publishes.
pub trait BatchDriver: Send + Sync + 'static {
    /// The L1 backend the role publishes to.
    type Backend: L1Backend;

    /// The role name, used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// The address the role signs with.
    fn wallet_address(&self) -> Address;

    /// The metrics of the role.
    fn metrics(&self) -> &SubmitterMetrics;

    /// Replaces any pending transaction of the role and waits for it to be confirmed.
    fn clear_pending_tx(
        &self,
        txmgr: &TxManager<Self::Backend>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Returns the `[start, end)` range of L2 blocks to submit next.
    fn get_batch_block_range(&self) -> impl Future<Output = Result<(u64, u64), DriverError>> + Send;

    /// Builds the unsigned transaction submitting `[start, end)` at `nonce`, or `None` if
    /// there is nothing worth submitting. `force` ignores the minimum batch size.
    fn craft_batch_tx(
        &self,
        start: u64,
        end: u64,
        nonce: u64,
        force: bool,
    ) -> impl Future<Output = Result<Option<TxEip1559>, DriverError>> + Send;

    /// Re-prices `tx` at the current fees, strictly above `floor` if given, and signs it.
    fn update_gas_price(
        &self,
        tx: &TxEip1559,
        floor: Option<GasFees>,
    ) -> impl Future<Output = Result<TxEnvelope, DriverError>> + Send;

    /// Publishes a signed transaction.
    fn send_transaction(
        &self,
        tx: TxEnvelope,
    ) -> impl Future<Output = Result<B256, DriverError>> + Send;
}
