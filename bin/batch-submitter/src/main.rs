#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Batch submitter for optimistic rollups.
//!
//! Commits L2 transaction batches to the Canonical Transaction Chain and L2 state roots to
//! the State Commitment Chain on L1.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use bss_config::Opts;
use bss_driver::{DriverError, SubmitterMetrics, spawn_submitters};
use bss_primitives::shutdown::{ShutdownSignal, run_until_shutdown};

mod allocator;
use allocator::{Allocator, new_allocator};

#[global_allocator]
static ALLOC: Allocator = new_allocator();

#[tokio::main]
async fn main() -> eyre::Result<()> {
    if let Ok(custom_env_file) = std::env::var("ENV_FILE") {
        // Try from custom env file, and abort if it fails
        dotenvy::from_filename(custom_env_file)?;
    } else {
        // The default .env file is optional
        dotenvy::dotenv().ok();
    }

    let opts = Opts::parse();
    let signers = opts.validate()?;

    let log_provider = opts.telemetry.setup(&opts.instance_name)?;
    SubmitterMetrics::set_version_info(env!("CARGO_PKG_VERSION"));

    info!("📦 Batch submitter starting...");

    let cancel = CancellationToken::new();
    let run = {
        let cancel = cancel.clone();
        async move {
            let tasks = match spawn_submitters(opts, signers, cancel).await {
                Ok(tasks) => tasks,
                // Shutdown requested before the nodes were synced
                Err(DriverError::Cancelled) => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            tasks.join().await?;
            Ok::<_, eyre::Report>(())
        }
    };

    let res = run_until_shutdown(run, ShutdownSignal::new(), || {
        info!("👋 Batch submitter shutting down...");
        cancel.cancel();
    })
    .await;

    log_provider.shutdown();
    res
}
