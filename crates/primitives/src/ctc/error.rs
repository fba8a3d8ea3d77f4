use std::io;

use alloy::eips::eip2718::Eip2718Error;
use thiserror::Error;

/// Errors raised while building or encoding sequencer batch params.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed batch: {0} transactions but no contexts")]
    TxsWithoutContexts(usize),
    #[error("contexts declare {expected} sequencer transactions but {actual} were provided")]
    TxCountMismatch { expected: u64, actual: usize },
    #[error("context {0} has no elements")]
    EmptyContext(usize),
    #[error("{field} value {value} does not fit in {width} bytes")]
    FieldOverflow { field: &'static str, value: u64, width: usize },
}

/// Errors raised while decoding sequencer batch params.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed batch: {0}")]
    Malformed(&'static str),
    #[error("invalid transaction: {0}")]
    Transaction(#[from] Eip2718Error),
}
