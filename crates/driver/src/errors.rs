use alloy::{
    contract::Error as ContractError,
    signers::Error as SignerError,
    transports::{RpcError, TransportErrorKind},
};
use bss_primitives::ctc::EncodeError;
use thiserror::Error;

use crate::backend::Receipt;

/// The error message returned by L1 backends that do not implement
/// `eth_maxPriorityFeePerGas`.
pub(crate) const MAX_PRIORITY_FEE_NOT_FOUND_ERROR: &str =
    "Method eth_maxPriorityFeePerGas not found";

/// Errors that can occur while building or submitting a batch.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Rpc(#[from] RpcError<TransportErrorKind>),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Contract call failed: {0}")]
    Contract(#[from] ContractError),
    #[error("Failed to sign transaction: {0}")]
    Signer(#[from] SignerError),
    #[error("Failed to encode batch: {0}")]
    Encode(#[from] EncodeError),
    #[error("Invalid range: start {start} is past end {end}")]
    InvalidRange { start: u64, end: u64 },
    #[error("L2 block {block} cannot be batched: {size} bytes exceed the {limit} bytes limit")]
    TxTooLarge { block: u64, size: usize, limit: usize },
    #[error("Transaction {} reverted in block {}", .0.tx_hash, .0.block_number)]
    Reverted(Receipt),
    #[error("Submission cancelled before confirmation")]
    Cancelled,
}

impl DriverError {
    /// A short label of the error kind, for metrics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Rpc(_) => "rpc",
            Self::HttpClient(_) => "http_client",
            Self::Contract(_) => "contract",
            Self::Signer(_) => "signer",
            Self::Encode(_) => "encode",
            Self::InvalidRange { .. } => "invalid_range",
            Self::TxTooLarge { .. } => "tx_too_large",
            Self::Reverted(_) => "reverted",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` if the error message contains `needle`, ignoring case.
    pub(crate) fn message_contains(&self, needle: &str) -> bool {
        self.to_string().to_lowercase().contains(&needle.to_lowercase())
    }

    /// Returns `true` if the L1 backend does not implement `eth_maxPriorityFeePerGas`.
    pub(crate) fn is_max_priority_fee_not_found(&self) -> bool {
        self.message_contains(MAX_PRIORITY_FEE_NOT_FOUND_ERROR)
    }
}
