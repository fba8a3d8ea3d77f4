use std::time::Duration;

use alloy::eips::eip2718::Encodable2718;
use alloy_primitives::U256;
use bss_config::Opts;
use bss_primitives::wei_to_eth;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    backend::{L1Backend, Receipt},
    driver::BatchDriver,
    errors::DriverError,
    txmgr::{SendOutcome, TxManager, TxManagerConfig},
};

/// Settings of the service loop of a role.
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    /// Period of the submission cycle.
    pub poll_interval: Duration,
    /// Clear pending transactions before the first cycle.
    pub clear_pending_txs: bool,
    /// Balance under which a warning is logged on every cycle.
    pub safe_minimum_ether_balance: U256,
    /// Age of the last submission after which the minimum batch size is ignored.
    pub max_batch_submission_time: Option<Duration>,
}

impl From<&Opts> for ServiceConfig {
    fn from(opts: &Opts) -> Self {
        Self {
            poll_interval: opts.service.poll_interval(),
            clear_pending_txs: opts.service.clear_pending_txs,
            safe_minimum_ether_balance: opts.service.safe_minimum_ether_balance,
            max_batch_submission_time: opts.sequencer.max_batch_submission_time(),
        }
    }
}

/// The result of a submission cycle that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// There was nothing to submit.
    EmptyRange,
    /// The driver found the batch too small to submit.
    BelowMinimum,
    /// The batch transaction was confirmed.
    Confirmed(Receipt),
    /// The send was aborted, assuming an earlier publication was included.
    AbortedNonceTooLow,
}

/// Runs the submission cycle of a role.
#[derive(Debug)]
pub struct Service<D: BatchDriver> {
    driver: D,
    backend: D::Backend,
    txmgr: TxManager<D::Backend>,
    cfg: ServiceConfig,
    last_submission: Instant,
}

impl<D: BatchDriver> Service<D> {
    /// Creates the service of `driver`.
    pub fn new(
        driver: D,
        backend: D::Backend,
        txmgr_cfg: TxManagerConfig,
        cfg: ServiceConfig,
    ) -> Self {
        let txmgr = TxManager::new(backend.clone(), txmgr_cfg, *driver.metrics());
        Self { driver, backend, txmgr, cfg, last_submission: Instant::now() }
    }

    /// Runs submission cycles every poll interval until `cancel` fires.
    ///
    /// Failed cycles are logged and retried on the next tick. Only a failure to clear
    /// pending transactions on startup is returned.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), DriverError> {
        let name = self.driver.name();
        info!(role = name, address = %self.driver.wallet_address(), "🚀 Starting submitter");

        if self.cfg.clear_pending_txs {
            let cleared = tokio::select! {
                res = self.driver.clear_pending_tx(&self.txmgr, &cancel) => res,
                _ = cancel.cancelled() => Err(DriverError::Cancelled),
            };
            match cleared {
                Ok(()) => self.driver.metrics().increment_pending_txs_cleared(),
                Err(DriverError::Cancelled) => {
                    info!(role = name, "Submitter stopped while clearing pending transactions");
                    return Ok(());
                }
                Err(e) => {
                    error!(role = name, error = %e, "Failed to clear pending transactions");
                    return Err(e);
                }
            }
        }

        loop {
            tokio::select! {
                _ = sleep(self.cfg.poll_interval) => {}
                _ = cancel.cancelled() => {
                    info!(role = name, "Submitter stopped");
                    return Ok(());
                }
            }

            // Every RPC of the cycle is abandoned on cancellation
            let res = tokio::select! {
                res = self.tick(&cancel) => res,
                _ = cancel.cancelled() => Err(DriverError::Cancelled),
            };

            match res {
                Ok(outcome) => debug!(role = name, ?outcome, "Cycle completed"),
                Err(DriverError::Cancelled) => debug!(role = name, "Cycle cancelled"),
                Err(e) => {
                    error!(role = name, error = %e, "Cycle failed");
                    self.driver.metrics().increment_submission_failures(e.kind().to_owned());
                }
            }
        }
    }

    /// Runs a single submission cycle.
    pub(crate) async fn tick(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<TickOutcome, DriverError> {
        let name = self.driver.name();
        let address = self.driver.wallet_address();
        let metrics = *self.driver.metrics();

        let balance = self.backend.balance_at(address).await?;
        metrics.set_balance(wei_to_eth(balance));
        if balance < self.cfg.safe_minimum_ether_balance {
            warn!(
                role = name,
                %address,
                balance = wei_to_eth(balance),
                minimum = wei_to_eth(self.cfg.safe_minimum_ether_balance),
                "⚠️ Submitter balance is low"
            );
        }

        let (start, end) = self.driver.get_batch_block_range().await?;
        if start == end {
            debug!(role = name, start, "No new blocks to submit");
            return Ok(TickOutcome::EmptyRange);
        }

        let nonce = self.backend.pending_nonce_at(address).await?;
        let force = self
            .cfg
            .max_batch_submission_time
            .is_some_and(|max| self.last_submission.elapsed() >= max);

        let Some(tx) = self.driver.craft_batch_tx(start, end, nonce, force).await? else {
            return Ok(TickOutcome::BelowMinimum);
        };

        let published = Instant::now();
        let (driver, tx) = (&self.driver, &tx);
        let outcome = self
            .txmgr
            .send(
                cancel,
                |floor| async move {
                    let signed = driver.update_gas_price(tx, floor).await?;
                    metrics.set_batch_size_bytes(signed.encode_2718_len());
                    Ok::<_, DriverError>(signed)
                },
                |signed| driver.send_transaction(signed),
            )
            .await;

        match outcome {
            Ok(SendOutcome::Confirmed(receipt)) => {
                info!(
                    role = name,
                    hash = %receipt.tx_hash,
                    block = receipt.block_number,
                    gas_used = receipt.gas_used,
                    effective_gas_price = receipt.effective_gas_price,
                    "🦅 Batch confirmed"
                );
                metrics.record_batch_confirmation_time(published.elapsed());
                metrics.set_batch_gas_used(receipt.gas_used);
                metrics.increment_batches_submitted();
                self.last_submission = Instant::now();
                Ok(TickOutcome::Confirmed(receipt))
            }
            Ok(SendOutcome::AbortedNonceTooLow) => {
                metrics.increment_nonce_too_low_aborts();
                self.last_submission = Instant::now();
                Ok(TickOutcome::AbortedNonceTooLow)
            }
            Err(DriverError::Reverted(receipt)) => {
                let backend = self.backend.clone();
                tokio::spawn(async move {
                    let hash = receipt.tx_hash;
                    let reason = backend.revert_reason(hash).await.unwrap_or_else(|e| {
                        error!(error = %e, %hash, "Failed to get revert reason by tracing the tx");
                        "unknown".to_owned()
                    });

                    error!(
                        role = name,
                        reason,
                        %hash,
                        block = receipt.block_number,
                        "‼️ Batch reverted"
                    );
                    metrics.increment_reverted_txs(reason);
                });

                Err(DriverError::Reverted(receipt))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use alloy::{
        consensus::{Transaction, TxEip1559, TxEnvelope},
        signers::local::PrivateKeySigner,
    };
    use alloy_primitives::{Address, B256, Bytes};
    use metrics_exporter_prometheus::PrometheusBuilder;

    use super::*;
    use crate::{
        backend::mock::{MockBackend, PublishReply},
        fees::{FeeManager, GasFees},
        metrics::SubmitterMetrics,
    };

    #[derive(Debug)]
    struct MockDriver {
        fees: FeeManager<MockBackend>,
        metrics: SubmitterMetrics,
        range: (u64, u64),
        below_minimum: bool,
        stall_range: bool,
        craft_calls: AtomicUsize,
        forced: Mutex<Vec<bool>>,
    }

    impl MockDriver {
        fn new(backend: &MockBackend, range: (u64, u64)) -> Self {
            Self {
                fees: FeeManager::new(
                    backend.clone(),
                    PrivateKeySigner::random(),
                    1,
                    1_500_000_000,
                ),
                metrics: SubmitterMetrics::new("mock"),
                range,
                below_minimum: false,
                stall_range: false,
                craft_calls: AtomicUsize::new(0),
                forced: Mutex::new(Vec::new()),
            }
        }
    }

    impl BatchDriver for MockDriver {
        type Backend = MockBackend;

        fn name(&self) -> &'static str {
            "mock"
        }

        fn wallet_address(&self) -> Address {
            self.fees.address()
        }

        fn metrics(&self) -> &SubmitterMetrics {
            &self.metrics
        }

        async fn clear_pending_tx(
            &self,
            txmgr: &TxManager<MockBackend>,
            cancel: &CancellationToken,
        ) -> Result<(), DriverError> {
            self.fees.clear_pending_tx(txmgr, cancel).await
        }

        async fn get_batch_block_range(&self) -> Result<(u64, u64), DriverError> {
            if self.stall_range {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok(self.range)
        }

        async fn craft_batch_tx(
            &self,
            _start: u64,
            _end: u64,
            nonce: u64,
            force: bool,
        ) -> Result<Option<TxEip1559>, DriverError> {
            self.craft_calls.fetch_add(1, Ordering::SeqCst);
            self.forced.lock().unwrap().push(force);
            if self.below_minimum && !force {
                return Ok(None);
            }

            let to = Address::repeat_byte(0xcc);
            self.fees.craft_tx(to, Bytes::from_static(b"batch"), nonce).await.map(Some)
        }

        async fn update_gas_price(
            &self,
            tx: &TxEip1559,
            floor: Option<GasFees>,
        ) -> Result<TxEnvelope, DriverError> {
            self.fees.update_gas_price(tx, floor).await
        }

        async fn send_transaction(&self, tx: TxEnvelope) -> Result<B256, DriverError> {
            self.fees.send_transaction(tx).await
        }
    }

    fn txmgr_config() -> TxManagerConfig {
        TxManagerConfig {
            resubmission_timeout: Duration::from_millis(50),
            receipt_query_interval: Duration::from_millis(5),
            num_confirmations: 1,
            safe_abort_nonce_too_low_count: 3,
            nonce_too_low_message: "nonce too low".to_owned(),
        }
    }

    fn service_config() -> ServiceConfig {
        ServiceConfig {
            poll_interval: Duration::from_millis(10),
            clear_pending_txs: false,
            safe_minimum_ether_balance: U256::ZERO,
            max_batch_submission_time: None,
        }
    }

    fn service(backend: &MockBackend, driver: MockDriver) -> Service<MockDriver> {
        Service::new(driver, backend.clone(), txmgr_config(), service_config())
    }

    #[tokio::test]
    async fn empty_range_is_skipped() {
        let backend = MockBackend::default();
        let mut service = service(&backend, MockDriver::new(&backend, (100, 100)));

        let outcome = service.tick(&CancellationToken::new()).await.unwrap();

        assert_eq!(outcome, TickOutcome::EmptyRange);
        assert_eq!(service.driver.craft_calls.load(Ordering::SeqCst), 0);
        assert!(backend.state().published.is_empty());
    }

    #[tokio::test]
    async fn below_minimum_is_skipped() {
        let backend = MockBackend::default();
        let driver = MockDriver { below_minimum: true, ..MockDriver::new(&backend, (1, 2)) };
        let mut service = service(&backend, driver);

        let outcome = service.tick(&CancellationToken::new()).await.unwrap();

        assert_eq!(outcome, TickOutcome::BelowMinimum);
        assert_eq!(*service.driver.forced.lock().unwrap(), vec![false]);
        assert!(backend.state().published.is_empty());
    }

    #[tokio::test]
    async fn aged_batch_is_forced() {
        let backend = MockBackend::default();
        let driver = MockDriver { below_minimum: true, ..MockDriver::new(&backend, (1, 2)) };
        let cfg = ServiceConfig {
            max_batch_submission_time: Some(Duration::ZERO),
            ..service_config()
        };
        let mut service = Service::new(driver, backend.clone(), txmgr_config(), cfg);

        let outcome = service.tick(&CancellationToken::new()).await.unwrap();

        assert!(matches!(outcome, TickOutcome::Confirmed(_)));
        assert_eq!(*service.driver.forced.lock().unwrap(), vec![true]);
    }

    #[tokio::test]
    async fn confirms_batch_at_pending_nonce() {
        let backend = MockBackend::default();
        {
            let mut state = backend.state();
            state.pending_nonce = 5;
            state.latest_nonce = 5;
        }
        let mut service = service(&backend, MockDriver::new(&backend, (1, 2)));

        let outcome = service.tick(&CancellationToken::new()).await.unwrap();

        let state = backend.state();
        assert_eq!(state.published.len(), 1);
        assert_eq!(state.published[0].nonce(), 5);
        assert_eq!(&state.published[0].input()[..], b"batch");
        let TickOutcome::Confirmed(receipt) = outcome else { panic!("expected confirmation") };
        assert_eq!(receipt.tx_hash, *state.published[0].tx_hash());
    }

    #[tokio::test]
    async fn nonce_too_low_abort_is_not_a_failure() {
        let backend = MockBackend::default();
        {
            let mut state = backend.state();
            state.publish_replies.push_back(PublishReply::Drop);
            for _ in 0..4 {
                state.publish_replies.push_back(PublishReply::Reject("nonce too low"));
            }
        }
        let mut service = service(&backend, MockDriver::new(&backend, (1, 2)));

        let outcome = service.tick(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, TickOutcome::AbortedNonceTooLow);
    }

    #[tokio::test]
    async fn reverted_batch_fails_the_cycle() {
        let backend = MockBackend::default();
        backend.state().publish_replies.push_back(PublishReply::Mine(false));
        let mut service = service(&backend, MockDriver::new(&backend, (1, 2)));

        let err = service.tick(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DriverError::Reverted(_)));
    }

    #[tokio::test]
    async fn run_until_cancelled() {
        let backend = MockBackend::default();
        let service = service(&backend, MockDriver::new(&backend, (1, 2)));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(service.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        handle.await.unwrap().unwrap();
        assert!(!backend.state().published.is_empty());
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_stalled_cycle() {
        let backend = MockBackend::default();
        let driver = MockDriver { stall_range: true, ..MockDriver::new(&backend, (1, 2)) };
        let service = service(&backend, driver);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(service.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        let res = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("service should stop promptly after cancellation");
        res.unwrap().unwrap();
        assert!(backend.state().published.is_empty());
    }

    #[test]
    fn records_signed_batch_size() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let backend = MockBackend::default();
        let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();

        metrics::with_local_recorder(&recorder, || {
            rt.block_on(async {
                let mut service = service(&backend, MockDriver::new(&backend, (1, 2)));
                service.tick(&CancellationToken::new()).await.unwrap();
            })
        });

        let signed_len = backend.state().published[0].encode_2718_len();
        let rendered = handle.render();
        let gauge = rendered
            .lines()
            .find(|line| line.starts_with("batch_submitter_batch_size_bytes{"))
            .and_then(|line| line.split_whitespace().last())
            .map(|value| value.parse::<f64>().unwrap())
            .expect("batch size gauge recorded");

        assert_eq!(gauge, signed_len as f64);
        assert!(signed_len > backend.state().published[0].input().len());
    }

    #[tokio::test]
    async fn run_clears_pending_txs_first() {
        let backend = MockBackend::default();
        backend.state().pending_nonce = 1;
        let cfg = ServiceConfig { clear_pending_txs: true, ..service_config() };
        let service =
            Service::new(MockDriver::new(&backend, (1, 1)), backend.clone(), txmgr_config(), cfg);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(service.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        handle.await.unwrap().unwrap();
        let state = backend.state();
        assert_eq!(state.published.len(), 1);
        assert_eq!(state.published[0].gas_limit(), 21_000);
    }
}
