#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Chain I/O module to interact with the rollup's L1 contracts.

use std::time::Duration;

use alloy::{
    providers::{RootProvider, fillers::FillProvider, utils::JoinedRecommendedFillers},
    rpc::client::{ClientBuilder, RpcClient},
};
use alloy_transport_http::Http;
use bss_primitives::retries::DEFAULT_RETRY_LAYER;
use url::Url;

/// Canonical Transaction Chain bindings.
pub mod ctc;

/// State Commitment Chain bindings.
pub mod scc;

/// Timeout of a single JSON-RPC request.
pub const RPC_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Alias to the default provider with all recommended fillers (read-only).
pub type DefaultProvider = FillProvider<JoinedRecommendedFillers, RootProvider>;

/// Create a JSON-RPC client over HTTP with the default retry layer.
///
/// Some endpoints stall under HTTP/2 connection reuse, so `disable_http2` forces the
/// underlying connection pool to HTTP/1.1. Requests time out after [`RPC_REQUEST_TIMEOUT`].
pub fn http_rpc_client(url: Url, disable_http2: bool) -> Result<RpcClient, reqwest::Error> {
    let mut builder = reqwest::Client::builder().timeout(RPC_REQUEST_TIMEOUT);
    if disable_http2 {
        builder = builder.http1_only();
    }

    let http = Http::with_client(builder.build()?, url);
    let is_local = http.guess_local();
    Ok(ClientBuilder::default().layer(DEFAULT_RETRY_LAYER).transport(http, is_local))
}
