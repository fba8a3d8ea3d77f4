use std::time::Duration;

use bss_clients::{execution::ExecutionClient, l2::L2Client};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::DriverError;

/// Delay between two sync status checks.
const SYNC_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Future that waits for the L1 and L2 nodes to sync before resolving.
pub(crate) async fn wait_for_clients_sync(
    l1: &ExecutionClient,
    l2: &L2Client,
    cancel: &CancellationToken,
) -> Result<(), DriverError> {
    debug!("Waiting for L1 and L2 to sync...");
    loop {
        let (l1_synced, l2_synced) = tokio::try_join!(l1.is_synced(), l2.is_synced())?;
        if l1_synced && l2_synced {
            return Ok(());
        }

        for (chain, synced) in [("L1", l1_synced), ("L2", l2_synced)] {
            if !synced {
                info!("{chain} is syncing...");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(SYNC_POLL_INTERVAL) => {}
            _ = cancel.cancelled() => return Err(DriverError::Cancelled),
        }
    }
}
