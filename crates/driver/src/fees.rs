use std::{fmt, time::Duration};

use alloy::{
    consensus::{SignableTransaction, TxEip1559, TxEnvelope},
    eips::eip2718::Encodable2718,
    rpc::types::TransactionRequest,
    signers::{SignerSync, local::PrivateKeySigner},
};
use alloy_primitives::{Address, B256, Bytes, TxKind, U256};
use bss_primitives::summary::Summary;
use tokio_retry::{RetryIf, strategy::FixedInterval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    backend::L1Backend,
    errors::DriverError,
    txmgr::{SendOutcome, TxManager},
};

/// Gas limit of a plain ETH transfer.
const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Attempts at clearing a pending transaction before giving up.
const CLEAR_PENDING_TX_ATTEMPTS: usize = 3;

/// Delay between two clearing attempts.
const CLEAR_PENDING_TX_RETRY_DELAY: Duration = Duration::from_secs(1);

/// EIP-1559 fee parameters of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasFees {
    /// The priority fee per gas.
    pub tip_cap: u128,
    /// The maximum fee per gas.
    pub fee_cap: u128,
}

impl GasFees {
    /// Fees from the latest base fee and a priority fee: `fee_cap = 2 * base_fee + tip_cap`.
    pub const fn from_base_fee(base_fee: u128, tip_cap: u128) -> Self {
        Self { tip_cap, fee_cap: base_fee.saturating_mul(2).saturating_add(tip_cap) }
    }

    /// Returns fees strictly above `prev` in both fields, bumping by at least 10% over the
    /// previous values where the market has not moved enough.
    pub const fn bumped_over(self, prev: Self) -> Self {
        Self {
            tip_cap: bump_over(self.tip_cap, prev.tip_cap),
            fee_cap: bump_over(self.fee_cap, prev.fee_cap),
        }
    }

    /// The fees of a signed transaction.
    pub fn of(tx: &TxEip1559) -> Self {
        Self { tip_cap: tx.max_priority_fee_per_gas, fee_cap: tx.max_fee_per_gas }
    }
}

impl fmt::Display for GasFees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tip_cap={}, fee_cap={}", self.tip_cap, self.fee_cap)
    }
}

const fn bump_over(new: u128, prev: u128) -> u128 {
    let bumped = prev.saturating_mul(110) / 100;
    let min = if bumped > prev { bumped } else { prev.saturating_add(1) };
    if new > min { new } else { min }
}

/// Prices, signs and publishes the transactions of a submitter role.
#[derive(Debug, Clone)]
pub struct FeeManager<B> {
    backend: B,
    signer: PrivateKeySigner,
    chain_id: u64,
    fallback_tip_cap: u128,
}

impl<B: L1Backend> FeeManager<B> {
    /// Creates a fee manager signing with `signer` for chain `chain_id`.
    pub const fn new(
        backend: B,
        signer: PrivateKeySigner,
        chain_id: u64,
        fallback_tip_cap: u128,
    ) -> Self {
        Self { backend, signer, chain_id, fallback_tip_cap }
    }

    /// The address transactions are signed with.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// The L1 backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the current market fees.
    ///
    /// Falls back to the configured tip if the backend does not implement
    /// `eth_maxPriorityFeePerGas`.
    pub async fn suggest_fees(&self) -> Result<GasFees, DriverError> {
        let tip_cap = match self.backend.suggest_gas_tip_cap().await.map_err(DriverError::from) {
            Ok(tip) => tip,
            Err(e) if e.is_max_priority_fee_not_found() => {
                warn!(
                    fallback = self.fallback_tip_cap,
                    "eth_maxPriorityFeePerGas is unsupported, using fallback tip"
                );
                self.fallback_tip_cap
            }
            Err(e) => return Err(e),
        };

        let base_fee = self.backend.latest_base_fee().await?;
        Ok(GasFees::from_base_fee(base_fee, tip_cap))
    }

    /// Builds an unsigned transaction calling `to` with `input` at `nonce`, with fees and a
    /// padded gas limit from the current market.
    pub async fn craft_tx(
        &self,
        to: Address,
        input: Bytes,
        nonce: u64,
    ) -> Result<TxEip1559, DriverError> {
        let fees = self.suggest_fees().await?;

        let request = TransactionRequest::default()
            .from(self.address())
            .to(to)
            .input(input.clone().into())
            .max_fee_per_gas(fees.fee_cap)
            .max_priority_fee_per_gas(fees.tip_cap)
            .value(U256::ZERO);
        let gas_estimate = self.backend.estimate_gas(request).await?;

        Ok(TxEip1559 {
            chain_id: self.chain_id,
            nonce,
            // +20% over the estimate
            gas_limit: gas_estimate.saturating_mul(6) / 5,
            max_fee_per_gas: fees.fee_cap,
            max_priority_fee_per_gas: fees.tip_cap,
            to: TxKind::Call(to),
            value: U256::ZERO,
            access_list: Default::default(),
            input,
        })
    }

    /// Re-prices `tx` at the current market fees and signs it. With a `floor`, the new fees
    /// are strictly higher than it.
    pub async fn update_gas_price(
        &self,
        tx: &TxEip1559,
        floor: Option<GasFees>,
    ) -> Result<TxEnvelope, DriverError> {
        let mut fees = self.suggest_fees().await?;
        if let Some(prev) = floor {
            fees = fees.bumped_over(prev);
        }

        let tx = TxEip1559 {
            max_fee_per_gas: fees.fee_cap,
            max_priority_fee_per_gas: fees.tip_cap,
            ..tx.clone()
        };
        self.sign(tx)
    }

    /// Signs `tx` with the role key.
    pub fn sign(&self, tx: TxEip1559) -> Result<TxEnvelope, DriverError> {
        let signature = self.signer.sign_hash_sync(&tx.signature_hash())?;
        Ok(TxEnvelope::Eip1559(tx.into_signed(signature)))
    }

    /// Publishes a signed transaction, returning its hash.
    pub async fn send_transaction(&self, tx: TxEnvelope) -> Result<B256, DriverError> {
        debug!(tx = tx.summary(), "Publishing transaction");
        Ok(self.backend.publish(tx.encoded_2718().into()).await?)
    }

    /// Replaces any pending transaction of the role with a 0-value self-transfer at the
    /// latest nonce, and waits for it to be confirmed.
    ///
    /// A "nonce too low" rejection means the stuck transaction was included meanwhile and
    /// counts as success. Gives up after a few attempts.
    pub async fn clear_pending_tx(
        &self,
        txmgr: &TxManager<B>,
        cancel: &CancellationToken,
    ) -> Result<(), DriverError> {
        let address = self.address();
        let (pending, latest) = tokio::try_join!(
            self.backend.pending_nonce_at(address),
            self.backend.latest_nonce_at(address)
        )?;

        if pending == latest {
            debug!(%address, nonce = latest, "No pending transaction to clear");
            return Ok(());
        }

        info!(%address, pending, latest, "🧹 Clearing pending transactions");
        let strategy =
            FixedInterval::new(CLEAR_PENDING_TX_RETRY_DELAY).take(CLEAR_PENDING_TX_ATTEMPTS - 1);
        RetryIf::spawn(
            strategy,
            move || async move {
                self.try_clear_pending_tx(txmgr, cancel, latest).await.inspect_err(|e| {
                    warn!(error = %e, "Failed to clear pending transaction");
                })
            },
            |e: &DriverError| !matches!(e, DriverError::Cancelled),
        )
        .await
    }

    async fn try_clear_pending_tx(
        &self,
        txmgr: &TxManager<B>,
        cancel: &CancellationToken,
        nonce: u64,
    ) -> Result<(), DriverError> {
        let fees = self.suggest_fees().await?;
        let tx = TxEip1559 {
            chain_id: self.chain_id,
            nonce,
            gas_limit: TRANSFER_GAS_LIMIT,
            max_fee_per_gas: fees.fee_cap,
            max_priority_fee_per_gas: fees.tip_cap,
            to: TxKind::Call(self.address()),
            value: U256::ZERO,
            access_list: Default::default(),
            input: Bytes::new(),
        };

        let outcome = txmgr
            .send(
                cancel,
                |floor| self.update_gas_price(&tx, floor),
                |signed| self.send_transaction(signed),
            )
            .await;

        match outcome {
            Ok(SendOutcome::Confirmed(receipt)) => {
                info!(
                    hash = %receipt.tx_hash,
                    block = receipt.block_number,
                    "Pending transactions cleared"
                );
                Ok(())
            }
            Ok(SendOutcome::AbortedNonceTooLow) => {
                info!("Pending transaction was included while clearing");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
