use alloy::{
    consensus::{TxEip1559, TxEnvelope},
    eips::BlockId,
};
use alloy_primitives::{Address, B256, Bytes};
use bss_chainio::{ctc::CanonicalTransactionChain, scc::StateCommitmentChain};
use bss_clients::l2::L2Client;
use bss_config::Opts;
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

/// Batch construction settings of the proposer role.
#[derive(Debug, Clone, Copy)]
pub struct ProposerConfig {
    /// Minimum number of state roots per batch.
    pub min_state_root_elements: usize,
    /// Maximum number of state roots per batch.
    pub max_state_root_elements: usize,
    /// L1 depth at which the CTC total is read.
    pub finality_confirmations: u64,
    /// Offset between chain element indices and L2 block numbers.
    pub block_offset: u64,
}

impl From<&Opts> for ProposerConfig {
    fn from(opts: &Opts) -> Self {
        Self {
            min_state_root_elements: opts.proposer.min_state_root_elements,
            max_state_root_elements: opts.proposer.max_state_root_elements,
            finality_confirmations: opts.proposer.finality_confirmations,
            block_offset: opts.service.block_offset,
        }
    }
}

/// Submits L2 state roots to the State Commitment Chain.
#[derive(Debug, Clone)]
pub struct ProposerDriver<B> {
    cfg: ProposerConfig,
    l2: L2Client,
    ctc: CanonicalTransactionChain,
    scc: StateCommitmentChain,
    fees: FeeManager<B>,
    metrics: SubmitterMetrics,
}

impl<B: L1Backend> ProposerDriver<B> {
    /// The name of the role.
    pub const NAME: &'static str = "proposer";

    /// Creates a new proposer driver.
    pub const fn new(
        cfg: ProposerConfig,
        l2: L2Client,
        ctc: CanonicalTransactionChain,
        scc: StateCommitmentChain,
        fees: FeeManager<B>,
    ) -> Self {
        Self { cfg, l2, ctc, scc, fees, metrics: SubmitterMetrics::new(Self::NAME) }
    }

    /// The block the CTC total is read at.
    async fn finalized_block(&self) -> Result<BlockId, DriverError> {
        if self.cfg.finality_confirmations == 0 {
            return Ok(BlockId::latest());
        }

        let head = self.fees.backend().head_number().await?;
        Ok(BlockId::number(head.saturating_sub(self.cfg.finality_confirmations)))
    }
}

/// The state roots to commit next: those of the blocks appended to the CTC but not yet to
/// the SCC.
fn proposer_range(
    scc_total: u64,
    ctc_total: u64,
    block_offset: u64,
) -> Result<(u64, u64), DriverError> {
    let start = scc_total + block_offset;
    let end = ctc_total + block_offset;
    if start > end {
        return Err(DriverError::InvalidRange { start, end });
    }
    Ok((start, end))
}

/// Builds the `appendStateBatch` calldata, or `None` if there are fewer roots than the
/// minimum and the batch is not forced.
fn state_batch_calldata(
    cfg: &ProposerConfig,
    start: u64,
    roots: Vec<B256>,
    force: bool,
) -> Option<Bytes> {
    if roots.is_empty() || (roots.len() < cfg.min_state_root_elements && !force) {
        return None;
    }

    let should_start_at_element = start.saturating_sub(cfg.block_offset);
    Some(StateCommitmentChain::append_state_batch_calldata(roots, should_start_at_element))
}

impl<B: L1Backend> BatchDriver for ProposerDriver<B> {
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
        let finalized = self.finalized_block().await?;
        let (scc_total, ctc_total) =
            tokio::try_join!(self.scc.total_elements(), self.ctc.total_elements_at(finalized))?;

        proposer_range(scc_total, ctc_total, self.cfg.block_offset)
    }

    async fn craft_batch_tx(
        &self,
        start: u64,
        end: u64,
        nonce: u64,
        force: bool,
    ) -> Result<Option<TxEip1559>, DriverError> {
        let started = Instant::now();
        let end = end.min(start.saturating_add(self.cfg.max_state_root_elements as u64));
        debug!(start, end, "Building state batch");

        let mut roots = Vec::with_capacity((end - start) as usize);
        for number in start..end {
            roots.push(self.l2.block_by_number(number).await?.state_root);
        }

        let num_roots = roots.len();
        let Some(calldata) = state_batch_calldata(&self.cfg, start, roots, force) else {
            info!(
                num_roots,
                min = self.cfg.min_state_root_elements,
                "State batch below minimum size, skipping"
            );
            return Ok(None);
        };

        info!(start, num_roots, calldata_size = calldata.len(), "🧑‍🍳 State batch built");
        self.metrics.set_num_state_roots(num_roots);

        let tx = self.fees.craft_tx(*self.scc.address(), calldata, nonce).await?;
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
