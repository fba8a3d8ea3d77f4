use std::{sync::Mutex, time::Duration};

use alloy::consensus::TxEnvelope;
use alloy_primitives::B256;
use bss_config::TxManagerOpts;
use futures::{StreamExt, stream::FuturesUnordered};
use tokio::time::{Instant, interval, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    backend::{L1Backend, Receipt},
    errors::DriverError,
    fees::GasFees,
    metrics::SubmitterMetrics,
};

mod state;
use state::SendState;

/// Configuration of a [`TxManager`].
#[derive(Debug, Clone)]
pub struct TxManagerConfig {
    /// How long a publication is watched before a replacement at higher fees is sent.
    pub resubmission_timeout: Duration,
    /// Period of receipt queries.
    pub receipt_query_interval: Duration,
    /// Number of blocks, including the inclusion block, before a receipt is final.
    pub num_confirmations: u64,
    /// Number of "nonce too low" errors tolerated before the send is aborted.
    pub safe_abort_nonce_too_low_count: u64,
    /// Substring identifying a "nonce too low" error.
    pub nonce_too_low_message: String,
}

impl From<&TxManagerOpts> for TxManagerConfig {
    fn from(opts: &TxManagerOpts) -> Self {
        Self {
            resubmission_timeout: opts.resubmission_timeout(),
            receipt_query_interval: opts.receipt_query_interval(),
            num_confirmations: opts.num_confirmations,
            safe_abort_nonce_too_low_count: opts.safe_abort_nonce_too_low_count,
            nonce_too_low_message: opts.nonce_too_low_message.clone(),
        }
    }
}

/// How a send completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// A publication reached the configured confirmation depth.
    Confirmed(Receipt),
    /// The nonce was reported as used too often while nothing was mined. An earlier
    /// replacement is assumed to have been included.
    AbortedNonceTooLow,
}

/// Drives a transaction to confirmation, replacing it at higher fees and the same nonce
/// whenever it is not mined within the resubmission timeout.
#[derive(Debug, Clone)]
pub struct TxManager<B> {
    backend: B,
    cfg: TxManagerConfig,
    metrics: SubmitterMetrics,
}

impl<B: L1Backend> TxManager<B> {
    /// Creates a new tx manager.
    ///
    /// # Panics
    ///
    /// Panics if `cfg.num_confirmations` is zero.
    pub fn new(backend: B, cfg: TxManagerConfig, metrics: SubmitterMetrics) -> Self {
        assert!(cfg.num_confirmations > 0, "num_confirmations must be at least 1");
        Self { backend, cfg, metrics }
    }

    /// Publishes the transaction produced by `update_gas_price` with `send_tx` and waits for
    /// it to be confirmed.
    ///
    /// `update_gas_price` receives the fees of the previous attempt, if any, and must return
    /// a transaction signed at strictly higher fees. Every attempt keeps running until one
    /// of them is confirmed, the send is aborted or `cancel` fires.
    pub async fn send<U, UF, S, SF>(
        &self,
        cancel: &CancellationToken,
        update_gas_price: U,
        send_tx: S,
    ) -> Result<SendOutcome, DriverError>
    where
        U: Fn(Option<GasFees>) -> UF,
        UF: Future<Output = Result<TxEnvelope, DriverError>>,
        S: Fn(TxEnvelope) -> SF,
        SF: Future<Output = Result<B256, DriverError>>,
    {
        let state =
            SendState::new(&self.cfg.nonce_too_low_message, self.cfg.safe_abort_nonce_too_low_count);
        let last_fees = Mutex::new(None);

        let mut publications = FuturesUnordered::new();
        publications.push(self.publish(&state, &last_fees, &update_gas_price, &send_tx, cancel));

        let timeout = self.cfg.resubmission_timeout;
        let mut resubmit = interval_at(Instant::now() + timeout, timeout);

        loop {
            if state.should_abort_immediately() {
                warn!(
                    "Nonce too low reported too many times, assuming an earlier publication \
                     was included"
                );
                return Ok(SendOutcome::AbortedNonceTooLow);
            }

            tokio::select! {
                _ = resubmit.tick() => {
                    if state.is_waiting_for_confirmation() {
                        debug!("Publication mined, waiting for confirmations instead of resubmitting");
                        continue;
                    }

                    self.metrics.increment_resubmissions();
                    publications.push(self.publish(
                        &state,
                        &last_fees,
                        &update_gas_price,
                        &send_tx,
                        cancel,
                    ));
                }
                Some(receipt) = publications.next() => {
                    let Some(receipt) = receipt else { continue };
                    if receipt.status {
                        return Ok(SendOutcome::Confirmed(receipt));
                    }
                    return Err(DriverError::Reverted(receipt));
                }
                _ = cancel.cancelled() => return Err(DriverError::Cancelled),
            }
        }
    }

    /// Signs and publishes one attempt, then waits for it to be confirmed. Returns `None` if
    /// the attempt failed or was cancelled.
    async fn publish<U, UF, S, SF>(
        &self,
        state: &SendState,
        last_fees: &Mutex<Option<GasFees>>,
        update_gas_price: &U,
        send_tx: &S,
        cancel: &CancellationToken,
    ) -> Option<Receipt>
    where
        U: Fn(Option<GasFees>) -> UF,
        UF: Future<Output = Result<TxEnvelope, DriverError>>,
        S: Fn(TxEnvelope) -> SF,
        SF: Future<Output = Result<B256, DriverError>>,
    {
        let floor = *last_fees.lock().unwrap_or_else(|e| e.into_inner());
        let tx = match update_gas_price(floor).await {
            Ok(tx) => tx,
            Err(e) => {
                warn!(error = %e, "Failed to update gas price");
                state.process_send_error(&e);
                return None;
            }
        };

        let fees = tx.as_eip1559().map(|signed| GasFees::of(signed.tx()));
        *last_fees.lock().unwrap_or_else(|e| e.into_inner()) = fees;

        let hash = *tx.tx_hash();
        if let Err(e) = send_tx(tx).await {
            warn!(%hash, error = %e, "Failed to publish transaction");
            state.process_send_error(&e);
            return None;
        }

        match fees {
            Some(fees) => info!(%hash, %fees, "📨 Transaction published"),
            None => info!(%hash, "📨 Transaction published"),
        }

        self.wait_mined(hash, state, cancel).await
    }

    /// Polls the receipt of `hash` until it is buried under enough confirmations.
    pub(crate) async fn wait_mined(
        &self,
        hash: B256,
        state: &SendState,
        cancel: &CancellationToken,
    ) -> Option<Receipt> {
        let mut poll = interval(self.cfg.receipt_query_interval);

        loop {
            tokio::select! {
                _ = poll.tick() => {}
                _ = cancel.cancelled() => return None,
            }

            let receipt = match self.backend.receipt(hash).await {
                Ok(Some(receipt)) => receipt,
                Ok(None) => {
                    state.tx_not_mined(hash);
                    trace!(%hash, "Transaction not yet mined");
                    continue;
                }
                Err(e) => {
                    warn!(%hash, error = %e, "Failed to query receipt");
                    continue;
                }
            };

            state.tx_mined(hash);

            let head = match self.backend.head_number().await {
                Ok(head) => head,
                Err(e) => {
                    warn!(%hash, error = %e, "Failed to query L1 head");
                    continue;
                }
            };

            if receipt.block_number + self.cfg.num_confirmations <= head + 1 {
                debug!(%hash, block = receipt.block_number, head, "Transaction confirmed");
                return Some(receipt);
            }

            trace!(
                %hash,
                block = receipt.block_number,
                head,
                confirmations = self.cfg.num_confirmations,
                "Waiting for confirmations"
            );
        }
    }
}
