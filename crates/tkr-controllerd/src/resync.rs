use std::{sync::Arc, time::Duration};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tkr_core::{cluster::InMemoryCluster, reconciler::TaskRunReconciler};

/// Outcome counts of one resync pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub reconciled: usize,
    pub failed: usize,
}

/// Reconcile every run currently stored in `cluster`, concurrently.
pub async fn resync_once(
    reconciler: &Arc<TaskRunReconciler>,
    cluster: &InMemoryCluster,
) -> PassSummary {
    let mut set = JoinSet::new();
    for key in cluster.task_run_keys().await {
        let reconciler = Arc::clone(reconciler);
        set.spawn(async move { reconciler.reconcile(&key).await });
    }

    let mut summary = PassSummary::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(())) => summary.reconciled += 1,
            // already logged and counted by the reconciler
            Ok(Err(_)) => summary.failed += 1,
            Err(e) => {
                warn!(error = %e, "reconcile task panicked");
                summary.failed += 1;
            }
        }
    }
    summary
}

/// Run resync passes every `period` until `token` is cancelled.
pub async fn run(
    reconciler: Arc<TaskRunReconciler>,
    cluster: Arc<InMemoryCluster>,
    period: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    info!(period = ?period, "resync loop started");

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let summary = resync_once(&reconciler, &cluster).await;
                debug!(reconciled = summary.reconciled, failed = summary.failed, "resync pass done");
            }
        }
    }
    info!("resync loop stopped");
}
