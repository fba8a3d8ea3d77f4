use crate::l2::L2Block;

use super::{BatchContext, CachedTx, EncodeError};

/// The atomic unit of an L2 update submitted to the CTC.
///
/// Sequencer elements carry their transaction. Queued elements only contribute their
/// `(timestamp, block_number)` since the deposit is already recorded on L1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchElement {
    /// The L1 timestamp associated with the L2 block.
    pub timestamp: u64,
    /// The L1 block number associated with the L2 block.
    pub block_number: u64,
    /// The cached transaction, present iff the element is sequencer-originated.
    pub tx: Option<CachedTx>,
}

impl BatchElement {
    /// Converts an L2 block into a batch element.
    ///
    /// # Panics
    ///
    /// Panics if the block does not contain exactly one transaction.
    pub fn from_block(block: &L2Block) -> Self {
        assert_eq!(
            block.transactions.len(),
            1,
            "L2 block {} must contain exactly one transaction",
            block.number()
        );

        let tx = &block.transactions[0];
        Self {
            timestamp: block.timestamp(),
            block_number: tx.l1_block_number.to(),
            tx: tx.is_sequencer().then(|| CachedTx::new(tx.to_envelope())),
        }
    }

    /// Returns true if the element was submitted to the sequencer.
    pub const fn is_sequencer(&self) -> bool {
        self.tx.is_some()
    }

    const fn l1_origin(&self) -> (u64, u64) {
        (self.timestamp, self.block_number)
    }
}

/// Groups consecutive elements into contexts and collects the aligned sequencer
/// transactions.
///
/// A new context starts when the `(timestamp, block_number)` pair changes or when a
/// sequencer element follows a queued one, so that within a context sequencer
/// transactions always precede queued deposits.
pub fn group_elements(
    elements: &[BatchElement],
) -> Result<(Vec<BatchContext>, Vec<CachedTx>), EncodeError> {
    let mut contexts = Vec::new();
    let mut txs = Vec::new();
    let mut current: Option<BatchContext> = None;
    let mut prev: Option<&BatchElement> = None;

    for el in elements {
        let starts_group = prev.is_none_or(|prev| {
            prev.l1_origin() != el.l1_origin() || (el.is_sequencer() && !prev.is_sequencer())
        });
        if starts_group {
            contexts.extend(current.take());
        }

        let ctx = current.get_or_insert(BatchContext {
            timestamp: el.timestamp,
            block_number: el.block_number,
            ..Default::default()
        });
        match &el.tx {
            Some(tx) => {
                ctx.num_sequenced_txs += 1;
                txs.push(tx.clone());
            }
            None => ctx.num_subsequent_queue_txs += 1,
        }

        prev = Some(el);
    }
    contexts.extend(current);

    if let Some(idx) = contexts.iter().position(|ctx| ctx.num_elements() == 0) {
        return Err(EncodeError::EmptyContext(idx));
    }

    Ok((contexts, txs))
}
