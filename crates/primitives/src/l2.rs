//! L2 block and transaction types as returned by the rollup node's JSON-RPC API.
//!
//! Besides the standard legacy transaction fields, every L2 transaction carries the L1
//! block number it was ordered at and the queue it originated from.

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_primitives::{Address, B256, Bytes, Signature, TxKind, U64, U256};
use serde::{Deserialize, Serialize};

/// The queue an L2 transaction originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueOrigin {
    /// Submitted directly to the sequencer.
    #[serde(rename = "sequencer")]
    Sequencer,
    /// An L1 to L2 deposit, already ordered on L1 through the CTC queue.
    #[serde(rename = "l1")]
    L1ToL2,
}

/// An L2 transaction with the rollup-specific extension fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L2Transaction {
    /// The transaction hash.
    pub hash: B256,
    /// Sender nonce.
    pub nonce: U64,
    /// Gas price in wei.
    pub gas_price: U256,
    /// Gas limit.
    pub gas: U64,
    /// Recipient, `None` for contract creations.
    pub to: Option<Address>,
    /// Transferred value.
    pub value: U256,
    /// Call data.
    pub input: Bytes,
    /// Signature `v` value, possibly EIP-155 encoded.
    pub v: U64,
    /// Signature `r` value.
    pub r: U256,
    /// Signature `s` value.
    pub s: U256,
    /// The originating queue.
    pub queue_origin: QueueOrigin,
    /// The L1 block number the transaction was ordered at.
    pub l1_block_number: U64,
    /// The L1 sender of a deposit.
    #[serde(default)]
    pub l1_tx_origin: Option<Address>,
    /// The CTC queue index of a deposit.
    #[serde(default)]
    pub queue_index: Option<U64>,
}

impl L2Transaction {
    /// Returns true if the transaction was submitted to the sequencer.
    pub fn is_sequencer(&self) -> bool {
        self.queue_origin == QueueOrigin::Sequencer
    }

    /// Rebuilds the signed transaction from its RPC fields.
    pub fn to_envelope(&self) -> TxEnvelope {
        let (y_parity, chain_id) = decode_v(self.v.to());

        let tx = TxLegacy {
            chain_id,
            nonce: self.nonce.to(),
            gas_price: self.gas_price.saturating_to(),
            gas_limit: self.gas.to(),
            to: self.to.map_or(TxKind::Create, TxKind::Call),
            value: self.value,
            input: self.input.clone(),
        };

        TxEnvelope::Legacy(tx.into_signed(Signature::new(self.r, self.s, y_parity)))
    }
}

/// Splits a legacy `v` value into the y-parity and the optional EIP-155 chain id.
const fn decode_v(v: u64) -> (bool, Option<u64>) {
    match v {
        0 | 1 => (v == 1, None),
        27 | 28 => (v == 28, None),
        v if v >= 35 => ((v - 35) % 2 == 1, Some((v - 35) / 2)),
        _ => (false, None),
    }
}

/// An L2 block with full transaction objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L2Block {
    /// Block number.
    pub number: U64,
    /// Block hash.
    pub hash: B256,
    /// Block timestamp. On the rollup this is the L1 timestamp the block was ordered at.
    pub timestamp: U64,
    /// The post-state root of the block.
    pub state_root: B256,
    /// The block's transactions.
    pub transactions: Vec<L2Transaction>,
}

impl L2Block {
    /// Returns the block number.
    pub fn number(&self) -> u64 {
        self.number.to()
    }

    /// Returns the block timestamp.
    pub fn timestamp(&self) -> u64 {
        self.timestamp.to()
    }
}

#[cfg(test)]
mod tests {
    use alloy::{consensus::Transaction, eips::Encodable2718};

    use super::*;

    const BLOCK_JSON: &str = r#"{
        "number": "0x10",
        "hash": "0x1111111111111111111111111111111111111111111111111111111111111111",
        "timestamp": "0x64",
        "stateRoot": "0x2222222222222222222222222222222222222222222222222222222222222222",
        "gasLimit": "0xb71b00",
        "transactions": [{
            "hash": "0x3333333333333333333333333333333333333333333333333333333333333333",
            "nonce": "0x2",
            "gasPrice": "0x3b9aca00",
            "gas": "0x5208",
            "to": "0x4200000000000000000000000000000000000006",
            "value": "0x0",
            "input": "0xdeadbeef",
            "v": "0x2a",
            "r": "0x1",
            "s": "0x2",
            "queueOrigin": "sequencer",
            "l1BlockNumber": "0x7",
            "l1TxOrigin": null,
            "index": "0xf",
            "queueIndex": null
        }]
    }"#;

    #[test]
    fn deserialize_extended_block() {
        let block: L2Block = serde_json::from_str(BLOCK_JSON).unwrap();
        assert_eq!(block.number(), 16);
        assert_eq!(block.timestamp(), 100);

        let tx = &block.transactions[0];
        assert!(tx.is_sequencer());
        assert_eq!(tx.l1_block_number.to::<u64>(), 7);
        assert_eq!(tx.l1_tx_origin, None);
    }

    #[test]
    fn queue_origin_names() {
        let origin: QueueOrigin = serde_json::from_str(r#""l1""#).unwrap();
        assert_eq!(origin, QueueOrigin::L1ToL2);
        assert_eq!(serde_json::to_string(&QueueOrigin::Sequencer).unwrap(), r#""sequencer""#);
    }

    #[test]
    fn rebuilds_legacy_envelope() {
        let block: L2Block = serde_json::from_str(BLOCK_JSON).unwrap();
        let envelope = block.transactions[0].to_envelope();

        // v = 0x2a = 42 -> chain id 3, parity 1
        assert_eq!(envelope.chain_id(), Some(3));
        assert_eq!(envelope.nonce(), 2);
        assert_eq!(envelope.gas_limit(), 21_000);
        assert_eq!(envelope.input().as_ref(), [0xde, 0xad, 0xbe, 0xef]);
        assert!(!envelope.encoded_2718().is_empty());
    }

    #[test]
    fn decode_v_values() {
        assert_eq!(decode_v(27), (false, None));
        assert_eq!(decode_v(28), (true, None));
        assert_eq!(decode_v(37), (false, Some(1)));
        assert_eq!(decode_v(38), (true, Some(1)));
    }
}
