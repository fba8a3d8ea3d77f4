//! Canonical Transaction Chain batch types and the `appendSequencerBatch` wire codec.

mod batch_type;
pub use batch_type::{BatchType, UnknownBatchType};

mod cached_tx;
pub use cached_tx::CachedTx;

mod context;
pub use context::{BATCH_CONTEXT_SIZE, BatchContext};

mod element;
pub use element::{BatchElement, group_elements};

mod error;
pub use error::{DecodeError, EncodeError};

mod params;
pub use params::{AppendSequencerBatchParams, BATCH_HEADER_SIZE, TX_LEN_SIZE};

/// Helpers for building signed test transactions and batch elements.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use alloy::{
        consensus::{SignableTransaction, TxEnvelope, TxLegacy},
        signers::{SignerSync, local::PrivateKeySigner},
    };
    use alloy_primitives::{Address, TxKind, U256};

    use super::{BatchElement, CachedTx};

    /// Signs a legacy transaction with a random key carrying `input_len` random bytes of
    /// calldata.
    pub fn random_tx(input_len: usize) -> CachedTx {
        let signer = PrivateKeySigner::random();
        let input: Vec<u8> = (0..input_len).map(|_| rand::random::<u8>()).collect();

        let tx = TxLegacy {
            chain_id: Some(288),
            nonce: rand::random::<u32>().into(),
            gas_price: 1_000_000_000,
            gas_limit: 1_000_000,
            to: TxKind::Call(Address::repeat_byte(0x42)),
            value: U256::ZERO,
            input: input.into(),
        };
        let signature = signer.sign_hash_sync(&tx.signature_hash()).expect("local signing");

        CachedTx::new(TxEnvelope::Legacy(tx.into_signed(signature)))
    }

    /// A sequencer element with a random transaction.
    pub fn sequencer_element(timestamp: u64, block_number: u64, input_len: usize) -> BatchElement {
        BatchElement { timestamp, block_number, tx: Some(random_tx(input_len)) }
    }

    /// A queued deposit element.
    pub const fn queued_element(timestamp: u64, block_number: u64) -> BatchElement {
        BatchElement { timestamp, block_number, tx: None }
    }
}
