//! The four pipeline stages and the aggregator.
//!
//! Each stage is a free function spawned as its own Tokio task. A stage drains
//! its input until the upstream sender is dropped and closes its own output by
//! dropping its sender on return, so shutdown cascades down the graph without
//! any extra signalling.

use crate::sender::service::mailer::Mailer;
use crate::sender::service::{ArtifactGenerator, Resync};
use multiotp_qr_core::{DirectoryDiff, Error, Generated, Identity, Processed, Result, RunReport};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Runs the enrollment resync once and releases the diff stage on success.
///
/// On failure the completion token is dropped unsent, which tells the diff
/// stage not to list a stale enrollment store.
#[tracing::instrument(name = "resync", skip_all)]
pub async fn resync_stage(resync: Arc<dyn Resync>, done: oneshot::Sender<()>) -> Result<()> {
    tracing::info!("Start to resync LDAP users");
    if let Err(err) = resync.resync().await {
        tracing::error!(%err, "Failed to resync LDAP users of MultiOTP");
        return Err(err);
    }
    tracing::info!("Done resync LDAP users");

    // The diff stage only goes away if the run is already being torn down.
    let _ = done.send(());
    Ok(())
}

/// Waits for the resync token, then streams every pending identity.
///
/// Returns `Ok(())` without listing anything if resync never completed; the
/// resync stage reports that failure itself.
#[tracing::instrument(name = "diff", skip_all)]
pub async fn diff_stage(
    diff: DirectoryDiff,
    resynced: oneshot::Receiver<()>,
    pending_tx: mpsc::UnboundedSender<Identity>,
) -> Result<()> {
    if resynced.await.is_err() {
        tracing::debug!("Resync did not complete, skipping diff");
        return Ok(());
    }

    tracing::info!("Collecting all new users");
    // Directory listing is blocking I/O.
    let pending = tokio::task::spawn_blocking(move || diff.pending())
        .await
        .map_err(|e| Error::Stage {
            stage: "diff",
            context: e.to_string(),
        })?
        .inspect_err(|err| tracing::error!(%err, "Failed to list MultiOTP directories"))?;

    let mut emitted = 0_usize;
    for identity in pending {
        tracing::debug!(user = %identity, "New user without QR");
        if pending_tx.send(identity).is_err() {
            tracing::warn!("Generate stage is gone, stopping diff");
            break;
        }
        emitted += 1;
    }
    tracing::info!(count = emitted, "Collected new users");
    Ok(())
}

/// Generates a QR for each pending identity.
///
/// Exactly one [`Generated`] is forwarded per identity received; failures
/// become [`Generated::Skipped`].
#[tracing::instrument(name = "generate", skip_all)]
pub async fn generate_stage(
    generator: Arc<dyn ArtifactGenerator>,
    mut pending_rx: mpsc::UnboundedReceiver<Identity>,
    generated_tx: mpsc::UnboundedSender<Generated>,
) {
    while let Some(identity) = pending_rx.recv().await {
        tracing::info!(user = %identity, "Generating QR for user");
        let generated = match generator.generate(&identity).await {
            Ok(record) => Generated::Ready(record),
            Err(err) => {
                tracing::warn!(user = %identity, %err, "Failed to generate user's QR png, skipping");
                Generated::Skipped {
                    identity,
                    reason: err.to_string(),
                }
            }
        };

        if generated_tx.send(generated).is_err() {
            tracing::warn!("Deliver stage is gone, stopping generation");
            break;
        }
    }
}

/// Mails every generated QR and forwards one [`Processed`] per identity.
#[tracing::instrument(name = "deliver", skip_all)]
pub async fn deliver_stage(
    mailer: Arc<Mailer>,
    mut generated_rx: mpsc::UnboundedReceiver<Generated>,
    delivered_tx: mpsc::UnboundedSender<Processed>,
) {
    while let Some(generated) = generated_rx.recv().await {
        let processed = match generated {
            Generated::Skipped { identity, reason } => Processed::Skipped { identity, reason },
            Generated::Ready(record) => Processed::Delivered(mailer.deliver(record).await),
        };

        if delivered_tx.send(processed).is_err() {
            tracing::warn!("Aggregator is gone, stopping delivery");
            break;
        }
    }
}

/// Drains the deliver stage into a [`RunReport`].
///
/// Completes once the deliver stage has dropped its sender, which makes this
/// the run's completion barrier.
pub async fn aggregate(mut delivered_rx: mpsc::UnboundedReceiver<Processed>) -> RunReport {
    let mut report = RunReport::new();
    while let Some(processed) = delivered_rx.recv().await {
        let identity = processed.identity().clone();
        if !report.record(processed) {
            tracing::warn!(user = %identity, "Duplicate outcome ignored");
        }
    }
    report
}
