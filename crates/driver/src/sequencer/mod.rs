use alloy::consensus::{TxEip1559, TxEnvelope};
use alloy_primitives::{Address, B256};
use bss_chainio::ctc::CanonicalTransactionChain;
use bss_clients::l2::L2Client;
use bss_config::Opts;
use bss_primitives::{
    ctc::{BatchElement, BatchType},
    summary::Summary,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    backend::L1Backend,
    driver::BatchDriver,
    errors::DriverError,
    fees::{FeeManager, GasFees},
    metrics::SubmitterMetrics,
    txmgr::TxManager,
};

mod batch;
use batch::{BatchAccumulator, Push, build_batch};

/// Batch construction settings of the sequencer role.
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Calldata size below which a batch is not worth submitting.
    pub min_tx_size: usize,
    /// Calldata size above which a batch is pruned.
    pub max_tx_size: usize,
    /// Budget of length-prefixed transaction bytes collected before encoding.
    pub max_plaintext_batch_size: usize,
    /// Maximum number of elements per batch, 0 for no limit.
    pub max_tx_batch_count: usize,
    /// The encoding of the transaction section.
    pub batch_type: BatchType,
    /// Offset between CTC element indices and L2 block numbers.
    pub block_offset: u64,
}

impl From<&Opts> for SequencerConfig {
    fn from(opts: &Opts) -> Self {
        Self {
            min_tx_size: opts.sequencer.min_l1_tx_size,
            max_tx_size: opts.sequencer.max_l1_tx_size,
            max_plaintext_batch_size: opts.sequencer.max_plaintext_batch_size,
            max_tx_batch_count: opts.sequencer.max_tx_batch_count,
            batch_type: opts.sequencer.batch_type,
            block_offset: opts.service.block_offset,
        }
    }
}

/// Submits L2 transactions to the Canonical Transaction Chain.
#[derive(Debug, Clone)]
pub struct SequencerDriver<B> {
    cfg: SequencerConfig,
    l2: L2Client,
    ctc: CanonicalTransactionChain,
    fees: FeeManager<B>,
    metrics: SubmitterMetrics,
}

impl<B: L1Backend> SequencerDriver<B> {
    /// The name of the role.
    pub const NAME: &'static str = "sequencer";

    /// Creates a new sequencer driver.
    pub const fn new(
        cfg: SequencerConfig,
        l2: L2Client,
        ctc: CanonicalTransactionChain,
        fees: FeeManager<B>,
    ) -> Self {
        Self { cfg, l2, ctc, fees, metrics: SubmitterMetrics::new(Self::NAME) }
    }
}

/// The next range of L2 blocks to append to the CTC: from the first block not yet in the
/// chain up to and including the L2 head.
fn sequencer_range(
    ctc_total: u64,
    block_offset: u64,
    l2_head: u64,
) -> Result<(u64, u64), DriverError> {
    let start = ctc_total + block_offset;
    let end = l2_head + 1;
    if start > end {
        return Err(DriverError::InvalidRange { start, end });
    }
    Ok((start, end))
}

impl<B: L1Backend> BatchDriver for SequencerDriver<B> {
    type Backend = B;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn wallet_address(&self) -> Address {
        self.fees.address()
    }

    fn metrics(&self) -> &SubmitterMetrics {
        &self.metrics
    }

    async fn clear_pending_tx(
        &self,
        txmgr: &TxManager<B>,
        cancel: &CancellationToken,
    ) -> Result<(), DriverError> {
        self.fees.clear_pending_tx(txmgr, cancel).await
    }

    async fn get_batch_block_range(&self) -> Result<(u64, u64), DriverError> {
        let (ctc_total, l2_head) = tokio::try_join!(
            async { self.ctc.total_elements().await.map_err(DriverError::from) },
            async { self.l2.get_head().await.map_err(DriverError::from) },
        )?;

        sequencer_range(ctc_total, self.cfg.block_offset, l2_head)
    }

    async fn craft_batch_tx(
        &self,
        start: u64,
        end: u64,
        nonce: u64,
        force: bool,
    ) -> Result<Option<TxEip1559>, DriverError> {
        let started = Instant::now();
        debug!(start, end, "Building sequencer batch");

        let mut acc = BatchAccumulator::new(&self.cfg);
        for number in start..end {
            let block = self.l2.block_by_number(number).await?;
            match acc.push(BatchElement::from_block(&block)) {
                Push::Added => {}
                Push::Full => {
                    debug!(number, "Batch budget exhausted");
                    break;
                }
                Push::Oversized { size } => {
                    return Err(DriverError::TxTooLarge {
                        block: number,
                        size,
                        limit: self.cfg.max_plaintext_batch_size,
                    });
                }
            }
        }

        let (elements, has_large_next_tx) = acc.finish();
        let should_start_at_element = start.saturating_sub(self.cfg.block_offset);
        let Some(batch) =
            build_batch(&self.cfg, should_start_at_element, elements, has_large_next_tx, force)?
        else {
            info!(
                start,
                end,
                min_tx_size = self.cfg.min_tx_size,
                "Batch below minimum size, skipping"
            );
            return Ok(None);
        };

        info!(
            summary = batch.params.summary(),
            calldata_size = batch.calldata.len(),
            prune_count = batch.prune_count,
            batch_type = %self.cfg.batch_type,
            "🧑‍🍳 Sequencer batch built"
        );
        self.metrics.set_num_elements_per_batch(batch.params.total_elements_to_append as usize);
        self.metrics.set_batch_prune_count(batch.prune_count);

        let tx = self.fees.craft_tx(*self.ctc.address(), batch.calldata, nonce).await?;
        self.metrics.record_batch_build_time(started.elapsed());

        Ok(Some(tx))
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
