use crate::sender::service::MailTransport;
use crate::sender::service::mail::Mail;
use core::time::Duration;
use multiotp_qr_core::{AdminRecipients, Error, Result, RunReport};
use std::path::Path;
use std::sync::Arc;

/// Mails run reports to the admin distribution list.
///
/// Reporting is best effort: every failure is logged and swallowed, and a
/// disabled list sends nothing at all.
pub struct AdminReporter {
    transport: Arc<dyn MailTransport>,
    admins: AdminRecipients,
    subject: String,
}

impl AdminReporter {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        admins: AdminRecipients,
        issuer_description: &str,
    ) -> Self {
        Self {
            transport,
            admins,
            subject: format!("Report - {issuer_description}"),
        }
    }

    /// Sends the current log file after a run-fatal error.
    pub async fn report_fatal(&self, log_path: &Path) {
        if !self.admins.is_enabled() {
            return;
        }
        tracing::info!("Sending admin report");
        if let Err(err) = self.try_report_fatal(log_path).await {
            tracing::warn!(admins = ?self.admins.as_slice(), %err, "Failed to send mail to admins");
        }
    }

    async fn try_report_fatal(&self, log_path: &Path) -> Result<()> {
        let body = tokio::fs::read_to_string(log_path)
            .await
            .map_err(|e| Error::Mail {
                context: format!("failed to form report from file {}: {e}", log_path.display()),
            })?;
        self.transport
            .send(Mail::plain(&self.subject, body, self.admins.as_slice()))
            .await
    }

    /// Sends the final lists once the run completed, if anything happened.
    pub async fn report_final(&self, report: &RunReport, elapsed: Duration) {
        if !self.admins.is_enabled() || report.is_empty() {
            return;
        }
        tracing::info!("Sending FINAL report to admins");
        let mail = Mail::plain(
            format!("{}(FINAL)", self.subject),
            report.render_admin_body(elapsed),
            self.admins.as_slice(),
        );
        if let Err(err) = self.transport.send(mail).await {
            tracing::warn!(admins = ?self.admins.as_slice(), %err, "Failed to send FINAL report to admins");
        }
    }
}
