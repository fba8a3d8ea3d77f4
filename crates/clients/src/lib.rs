#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! JSON-RPC client connections to the L1 and L2 nodes

/// L1 execution layer client connection
pub mod execution;

/// Rollup L2 node client connection
pub mod l2;
