#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Batch submitter primitive types, codecs and utilities.

use alloy::eips::eip4895::GWEI_TO_WEI;
use alloy_primitives::U256;

/// Big-endian fixed-width integer codec.
pub mod varwidth;

/// Canonical Transaction Chain batch types and wire codec.
pub mod ctc;

/// L2 block and transaction wire types.
pub mod l2;

/// Transport retries utilities
pub mod retries;

/// Utility for summarizing objects into a string for logging purposes.
pub mod summary;

/// Utilities for reacting to process termination signals.
pub mod shutdown;

/// Utilities for handling long-running tasks.
pub mod task;

/// From a balance expressed in wei, return the balance in ETH as a f64 with gwei precision.
///
/// NOTE:
/// * returns zero if the balance is less than 1 gwei;
/// * returns at most a balance of ~9M ETH to avoid floating point inaccuracies above certain
///   numbers.
pub fn wei_to_eth(balance: U256) -> f64 {
    const GWEI_IN_ETH: f64 = 1e-9;
    const F64_REPRESENTATION_THRESHOLD: u64 = 1 << 53; // 2^53

    let balance_in_gwei = balance / U256::from(GWEI_TO_WEI);

    if balance_in_gwei.is_zero() {
        return 0.0;
    }

    if balance_in_gwei > U256::from(F64_REPRESENTATION_THRESHOLD) {
        // Directly return 2^53 * [`GWEI_IN_ETH`]
        return 9_007_199.254740992;
    }

    // The first limb holds the whole balance at this point.
    balance_in_gwei.as_limbs()[0] as f64 * GWEI_IN_ETH
}
