use bss_chainio::{ctc::CanonicalTransactionChain, scc::StateCommitmentChain};
use bss_clients::{execution::ExecutionClient, l2::L2Client};
use bss_config::{Opts, RoleSigners};
use bss_primitives::{summary::Summary, task::CriticalTasks};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    config::RuntimeConfig,
    errors::DriverError,
    fees::FeeManager,
    helpers::wait_for_clients_sync,
    proposer::{ProposerConfig, ProposerDriver},
    sequencer::{SequencerConfig, SequencerDriver},
    service::{Service, ServiceConfig},
    txmgr::TxManagerConfig,
};

/// Connects to L1 and L2, then spawns the service loop of every enabled role as a critical
/// task bound to `cancel`.
pub async fn spawn_submitters(
    opts: Opts,
    signers: RoleSigners,
    cancel: CancellationToken,
) -> Result<CriticalTasks<DriverError>, DriverError> {
    let l1 = ExecutionClient::new(opts.l1.rpc_url.clone(), opts.service.disable_http2)?;
    let l2 = L2Client::new(opts.l2.rpc_url.clone(), opts.service.disable_http2)?;

    wait_for_clients_sync(&l1, &l2, &cancel).await?;

    let cfg = RuntimeConfig::new(opts, signers, &l1).await?;
    info!("{}", cfg.summary());

    let ctc = CanonicalTransactionChain::new(l1.rpc_client(), cfg.contracts.ctc);
    let service_cfg = ServiceConfig::from(&cfg.opts);
    let txmgr_cfg = TxManagerConfig::from(&cfg.txmgr);

    let mut tasks = CriticalTasks::new(cancel.clone());

    if let Some(signer) = cfg.signers.sequencer.clone() {
        let fees = FeeManager::new(l1.clone(), signer, cfg.chain_id, cfg.txmgr.fallback_tip_cap);
        let driver =
            SequencerDriver::new(SequencerConfig::from(&cfg.opts), l2.clone(), ctc.clone(), fees);
        let service = Service::new(driver, l1.clone(), txmgr_cfg.clone(), service_cfg);
        tasks.spawn(SequencerDriver::<ExecutionClient>::NAME, service.run(cancel.clone()));
    }

    if let Some(signer) = cfg.signers.proposer.clone() {
        let scc = StateCommitmentChain::new(l1.rpc_client(), cfg.contracts.scc);
        let fees = FeeManager::new(l1.clone(), signer, cfg.chain_id, cfg.txmgr.fallback_tip_cap);
        let driver =
            ProposerDriver::new(ProposerConfig::from(&cfg.opts), l2.clone(), ctc, scc, fees);
        let service = Service::new(driver, l1.clone(), txmgr_cfg, service_cfg);
        tasks.spawn(ProposerDriver::<ExecutionClient>::NAME, service.run(cancel.clone()));
    }

    Ok(tasks)
}
