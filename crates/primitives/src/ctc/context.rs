use std::io::{self, Read, Write};

use crate::varwidth::{read_uint, write_uint};

/// Width of the `num_sequenced_txs` field.
pub const NUM_SEQUENCED_TXS_SIZE: usize = 3;
/// Width of the `num_subsequent_queue_txs` field.
pub const NUM_SUBSEQUENT_QUEUE_TXS_SIZE: usize = 3;
/// Width of the `timestamp` field.
pub const TIMESTAMP_SIZE: usize = 5;
/// Width of the `block_number` field.
pub const BLOCK_NUMBER_SIZE: usize = 5;
/// Encoded size of a [`BatchContext`].
pub const BATCH_CONTEXT_SIZE: usize =
    NUM_SEQUENCED_TXS_SIZE + NUM_SUBSEQUENT_QUEUE_TXS_SIZE + TIMESTAMP_SIZE + BLOCK_NUMBER_SIZE;

/// A run of batch elements that share the same L1 timestamp and block number.
///
/// Sequencer transactions come first, followed by `num_subsequent_queue_txs` queued
/// deposits. A context with `timestamp == 0` is a marker context whose `block_number`
/// identifies the batch encoding (see [`super::BatchType`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchContext {
    /// Number of sequencer transactions in the context.
    pub num_sequenced_txs: u64,
    /// Number of queued deposits following the sequencer transactions.
    pub num_subsequent_queue_txs: u64,
    /// The L1 timestamp shared by the context.
    pub timestamp: u64,
    /// The L1 block number shared by the context.
    pub block_number: u64,
}

impl BatchContext {
    /// Returns true if this is a marker context.
    pub const fn is_marker(&self) -> bool {
        self.timestamp == 0
    }

    /// Total number of elements covered by the context.
    pub const fn num_elements(&self) -> u64 {
        self.num_sequenced_txs + self.num_subsequent_queue_txs
    }

    /// Writes the 16-byte encoding of the context.
    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        write_uint(w, self.num_sequenced_txs, NUM_SEQUENCED_TXS_SIZE)?;
        write_uint(w, self.num_subsequent_queue_txs, NUM_SUBSEQUENT_QUEUE_TXS_SIZE)?;
        write_uint(w, self.timestamp, TIMESTAMP_SIZE)?;
        write_uint(w, self.block_number, BLOCK_NUMBER_SIZE)
    }

    /// Reads a context from its 16-byte encoding.
    pub fn read<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            num_sequenced_txs: read_uint(r, NUM_SEQUENCED_TXS_SIZE)?,
            num_subsequent_queue_txs: read_uint(r, NUM_SUBSEQUENT_QUEUE_TXS_SIZE)?,
            timestamp: read_uint(r, TIMESTAMP_SIZE)?,
            block_number: read_uint(r, BLOCK_NUMBER_SIZE)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENCODED: [u8; BATCH_CONTEXT_SIZE] =
        [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f];

    const CONTEXT: BatchContext = BatchContext {
        num_sequenced_txs: 0x000102,
        num_subsequent_queue_txs: 0x030405,
        timestamp: 0x06_0708_090a,
        block_number: 0x0b_0c0d_0e0f,
    };

    #[test]
    fn encode_field_positions() {
        let mut out = Vec::new();
        CONTEXT.write(&mut out).unwrap();
        assert_eq!(out, ENCODED);
    }

    #[test]
    fn decode_field_positions() {
        let decoded = BatchContext::read(&mut &ENCODED[..]).unwrap();
        assert_eq!(decoded, CONTEXT);
    }

    #[test]
    fn truncated_context() {
        let err = BatchContext::read(&mut &ENCODED[..10]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
