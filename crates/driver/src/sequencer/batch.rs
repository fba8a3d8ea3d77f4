use alloy_primitives::Bytes;
use bss_chainio::ctc::CanonicalTransactionChain;
use bss_primitives::ctc::{AppendSequencerBatchParams, BatchElement, TX_LEN_SIZE};

use super::SequencerConfig;
use crate::errors::DriverError;

/// Outcome of [`BatchAccumulator::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Push {
    /// The element was added.
    Added,
    /// The batch is full. The element starts the next batch.
    Full,
    /// The element exceeds the plaintext budget on its own.
    Oversized { size: usize },
}

/// Collects batch elements until the plaintext or element count budget is exhausted.
#[derive(Debug)]
pub(crate) struct BatchAccumulator<'a> {
    cfg: &'a SequencerConfig,
    elements: Vec<BatchElement>,
    total_tx_bytes: usize,
    has_large_next_tx: bool,
}

impl<'a> BatchAccumulator<'a> {
    pub(crate) const fn new(cfg: &'a SequencerConfig) -> Self {
        Self { cfg, elements: Vec::new(), total_tx_bytes: 0, has_large_next_tx: false }
    }

    /// Adds `element` if it fits. Once the batch is full the element is dropped and no
    /// further elements should be pushed.
    pub(crate) fn push(&mut self, element: BatchElement) -> Push {
        if self.cfg.max_tx_batch_count > 0 && self.elements.len() >= self.cfg.max_tx_batch_count {
            return Push::Full;
        }

        if let Some(tx) = &element.tx {
            let size = TX_LEN_SIZE + tx.size();
            if self.total_tx_bytes + size > self.cfg.max_plaintext_batch_size {
                if self.elements.is_empty() {
                    return Push::Oversized { size };
                }
                // The size floor cannot be reached if what fits is already below it.
                self.has_large_next_tx = self.total_tx_bytes < self.cfg.min_tx_size;
                return Push::Full;
            }
            self.total_tx_bytes += size;
        }

        self.elements.push(element);
        Push::Added
    }

    /// Returns the collected elements and whether the element that stopped the batch made
    /// the size floor unreachable.
    pub(crate) fn finish(self) -> (Vec<BatchElement>, bool) {
        (self.elements, self.has_large_next_tx)
    }
}

/// An encoded sequencer batch ready to be sent to the CTC.
#[derive(Debug)]
pub(crate) struct SequencerBatch {
    pub(crate) params: AppendSequencerBatchParams,
    pub(crate) calldata: Bytes,
    pub(crate) prune_count: usize,
}

/// Encodes `elements` into `appendSequencerBatch` calldata, dropping the last tenth of the
/// elements until the calldata fits `max_tx_size`.
///
/// Returns `None` if there are no elements, or if the calldata is below `min_tx_size`
/// while neither pruning happened, nor the next element was too large, nor `force` is set.
/// Fails if the first element alone exceeds `max_tx_size`.
pub(crate) fn build_batch(
    cfg: &SequencerConfig,
    should_start_at_element: u64,
    mut elements: Vec<BatchElement>,
    has_large_next_tx: bool,
    force: bool,
) -> Result<Option<SequencerBatch>, DriverError> {
    if elements.is_empty() {
        return Ok(None);
    }

    let mut prune_count = 0;

    loop {
        let params = AppendSequencerBatchParams::from_elements(should_start_at_element, &elements)?;
        let encoded = params.encode(cfg.batch_type)?;
        let calldata = CanonicalTransactionChain::append_sequencer_batch_calldata(&encoded);

        if calldata.len() > cfg.max_tx_size {
            if elements.len() == 1 {
                return Err(DriverError::TxTooLarge {
                    block: should_start_at_element + cfg.block_offset,
                    size: calldata.len(),
                    limit: cfg.max_tx_size,
                });
            }
            let new_len = elements.len() * 9 / 10;
            elements.truncate(new_len);
            prune_count += 1;
            continue;
        }

        if calldata.len() < cfg.min_tx_size && prune_count == 0 && !has_large_next_tx && !force {
            return Ok(None);
        }

        return Ok(Some(SequencerBatch { params, calldata, prune_count }));
    }
}
