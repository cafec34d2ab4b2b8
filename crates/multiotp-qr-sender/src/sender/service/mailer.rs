use super::MailTransport;
use super::mail::{Mail, MailFormat};
use multiotp_qr_core::{ArtifactRecord, DeliveryOutcome, MailDomain};
use std::sync::Arc;

/// Mails freshly generated QR codes to their owners.
///
/// The recipient is always `{identity}@{domain}`. When delivery fails the QR
/// image is deleted so the identity shows up as pending on the next run.
pub struct Mailer {
    transport: Arc<dyn MailTransport>,
    domain: MailDomain,
    subject: String,
    body: String,
}

impl Mailer {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        domain: MailDomain,
        subject: impl Into<String>,
        email_text: &str,
        issuer_description: &str,
    ) -> Self {
        Self {
            transport,
            domain,
            subject: subject.into(),
            body: format!("<html><body><p>{email_text}: {issuer_description}</p></body></html>"),
        }
    }

    #[tracing::instrument(skip_all, fields(user = %record.identity))]
    pub async fn deliver(&self, record: ArtifactRecord) -> DeliveryOutcome {
        let ArtifactRecord { identity, location } = record;
        let email = self.domain.address_for(&identity);
        tracing::info!(%email, "Sending QR to user");

        let mail = Mail {
            format: MailFormat::Html,
            subject: self.subject.clone(),
            body: self.body.clone(),
            recipients: vec![email.clone()],
            attachments: vec![location.clone()],
        };

        match self.transport.send(mail).await {
            Ok(()) => DeliveryOutcome::delivered(identity, email),
            Err(err) => {
                tracing::warn!(%email, %err, "Failed to send email to user, skipping");

                tracing::info!(artifact = %location.display(), "Deleting generated QR of failed user");
                if let Err(rm_err) = tokio::fs::remove_file(&location).await {
                    tracing::warn!(
                        artifact = %location.display(),
                        err = %rm_err,
                        "Failed to delete generated QR of failed user"
                    );
                }

                DeliveryOutcome::failed(identity, email, err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::testing::RecordingTransport;
    use multiotp_qr_core::Identity;
    use tempfile::TempDir;

    fn mailer(transport: Arc<RecordingTransport>) -> Mailer {
        Mailer::new(
            transport,
            MailDomain::from_sender("multiotp@corp.example").unwrap(),
            "Your QR Code",
            "Your OTP QR",
            "OTP-SRV",
        )
    }

    fn issued(dir: &TempDir, name: &str) -> ArtifactRecord {
        let record = ArtifactRecord::new(dir.path(), Identity::parse(name).unwrap());
        std::fs::write(&record.location, b"png").unwrap();
        record
    }

    #[tokio::test]
    async fn delivers_to_derived_address() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let record = issued(&dir, "alice");
        let location = record.location.clone();

        let outcome = mailer(transport.clone()).deliver(record).await;
        assert!(outcome.is_delivered());
        assert_eq!(outcome.email, "alice@corp.example");

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].format, MailFormat::Html);
        assert_eq!(sent[0].recipients, ["alice@corp.example"]);
        assert_eq!(sent[0].attachments, [location.clone()]);
        assert_eq!(
            sent[0].body,
            "<html><body><p>Your OTP QR: OTP-SRV</p></body></html>"
        );
        assert!(location.exists());
    }

    #[tokio::test]
    async fn failed_delivery_removes_artifact() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(RecordingTransport::failing_for(["bob@corp.example"]));
        let record = issued(&dir, "bob");
        let location = record.location.clone();

        let outcome = mailer(transport).deliver(record).await;
        assert!(!outcome.is_delivered());
        assert_eq!(outcome.identity.as_str(), "bob");
        assert!(!location.exists());
    }

    #[tokio::test]
    async fn cleanup_failure_is_not_escalated() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(RecordingTransport::failing_for(["carol@corp.example"]));
        // Never written, so the removal fails.
        let record = ArtifactRecord::new(dir.path(), Identity::parse("carol").unwrap());

        let outcome = mailer(transport).deliver(record).await;
        assert!(outcome.failure.is_some());
    }
}
