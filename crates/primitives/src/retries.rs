use alloy::transports::layers::RetryBackoffLayer;

/// Maximum number of retries on rate-limit responses.
const MAX_RATE_LIMIT_RETRIES: u32 = 10;
/// Initial backoff in milliseconds.
const INITIAL_BACKOFF_MS: u64 = 500;
/// Compute units per second assumed for the provider.
const COMPUTE_UNITS_PER_SECOND: u64 = 1_000;

/// The retry layer applied to every JSON-RPC client.
///
/// Retries rate-limited and transient transport errors with exponential backoff. Errors
/// returned by the node itself (reverts, nonce errors) are surfaced immediately.
pub const DEFAULT_RETRY_LAYER: RetryBackoffLayer =
    RetryBackoffLayer::new(MAX_RATE_LIMIT_RETRIES, INITIAL_BACKOFF_MS, COMPUTE_UNITS_PER_SECOND);
