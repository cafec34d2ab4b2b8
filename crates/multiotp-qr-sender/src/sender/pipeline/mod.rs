//! Staged detection, generation and delivery of QR codes.
//!
//! ```text
//!  resync ──token──▶ diff ──Identity──▶ generate ──Generated──▶ deliver ──Processed──▶ aggregate
//!  (task)           (task)             (task)                  (task)                (main task)
//! ```
//!
//! Stages talk only through the channels above and hand values over by move.
//! The aggregator is the only owner of the [`RunReport`]. Per-identity failures
//! travel down the graph as values; run-fatal errors come back through the
//! resync and diff join handles and are surfaced by [`Pipeline::run`].
//!
//! ## Submodules
//!
//! - [`stages`] - The stage loops and the aggregator.

pub mod stages;

use crate::sender::service::mailer::Mailer;
use crate::sender::service::{ArtifactGenerator, Resync};
use multiotp_qr_core::{DirectoryDiff, Error, Result, RunReport};
use stages::{aggregate, deliver_stage, diff_stage, generate_stage, resync_stage};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// One end-to-end run, from resync to the aggregated report.
pub struct Pipeline {
    resync: Arc<dyn Resync>,
    diff: DirectoryDiff,
    generator: Arc<dyn ArtifactGenerator>,
    mailer: Arc<Mailer>,
}

impl Pipeline {
    pub fn new(
        resync: Arc<dyn Resync>,
        diff: DirectoryDiff,
        generator: Arc<dyn ArtifactGenerator>,
        mailer: Mailer,
    ) -> Self {
        Self {
            resync,
            diff,
            generator,
            mailer: Arc::new(mailer),
        }
    }

    /// Spawns the stages and waits for the report.
    ///
    /// # Errors
    ///
    /// Returns the resync or directory listing error that aborted the run, or
    /// [`Error::Stage`] if a stage task panicked. Identities that failed
    /// generation or delivery are reported in the [`RunReport`] instead.
    pub async fn run(self) -> Result<RunReport> {
        let (resynced_tx, resynced_rx) = oneshot::channel();
        let (pending_tx, pending_rx) = mpsc::unbounded_channel();
        let (generated_tx, generated_rx) = mpsc::unbounded_channel();
        let (delivered_tx, delivered_rx) = mpsc::unbounded_channel();

        let resync = tokio::spawn(resync_stage(self.resync, resynced_tx));
        let diff = tokio::spawn(diff_stage(self.diff, resynced_rx, pending_tx));
        let generate = tokio::spawn(generate_stage(self.generator, pending_rx, generated_tx));
        let deliver = tokio::spawn(deliver_stage(self.mailer, generated_rx, delivered_tx));

        // A fatal error drops the failing stage's sender, so every downstream
        // stage drains and exits on its own.
        join_stage("resync", resync).await??;
        join_stage("diff", diff).await??;

        let report = aggregate(delivered_rx).await;

        join_stage("generate", generate).await?;
        join_stage("deliver", deliver).await?;

        tracing::info!(
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            "Pipeline drained"
        );
        Ok(report)
    }
}

async fn join_stage<T>(stage: &'static str, handle: JoinHandle<T>) -> Result<T> {
    handle.await.map_err(|e| {
        tracing::error!(stage, err = %e, "Stage terminated abnormally");
        Error::Stage {
            stage,
            context: e.to_string(),
        }
    })
}
