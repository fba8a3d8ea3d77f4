use alloy::{
    consensus::TxEnvelope,
    eips::{Decodable2718, Encodable2718, eip2718::Eip2718Error},
};
use alloy_primitives::{B256, Bytes};

/// An L2 transaction paired with its canonical encoding, computed once at construction.
///
/// The cached bytes are used both to measure the transaction against the batch size
/// budget and to write it into the batch payload.
#[derive(Debug, Clone)]
pub struct CachedTx {
    tx: TxEnvelope,
    raw: Bytes,
}

impl CachedTx {
    /// Wraps `tx` and caches its encoding.
    pub fn new(tx: TxEnvelope) -> Self {
        let raw = tx.encoded_2718().into();
        Self { tx, raw }
    }

    /// Decodes a transaction from its canonical encoding.
    pub fn decode(raw: &[u8]) -> Result<Self, Eip2718Error> {
        let tx = TxEnvelope::decode_2718(&mut &raw[..])?;
        Ok(Self { tx, raw: Bytes::copy_from_slice(raw) })
    }

    /// The canonical encoding of the transaction.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// The length of [`Self::raw_bytes`].
    pub fn size(&self) -> usize {
        self.raw.len()
    }

    /// The wrapped transaction.
    pub const fn tx(&self) -> &TxEnvelope {
        &self.tx
    }

    /// The transaction hash.
    pub fn hash(&self) -> B256 {
        *self.tx.tx_hash()
    }
}

impl PartialEq for CachedTx {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for CachedTx {}

impl From<TxEnvelope> for CachedTx {
    fn from(tx: TxEnvelope) -> Self {
        Self::new(tx)
    }
}
