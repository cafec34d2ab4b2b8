use super::MailTransport;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use multiotp_qr_core::{Error, Result};
use std::path::PathBuf;

/// Body format of a [`Mail`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MailFormat {
    Html,
    Plain,
}

/// A message ready to be handed to a [`MailTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mail {
    pub format: MailFormat,
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
    /// Files attached as `image/png`.
    pub attachments: Vec<PathBuf>,
}

impl Mail {
    pub fn plain(subject: impl Into<String>, body: impl Into<String>, recipients: &[String]) -> Self {
        Self {
            format: MailFormat::Plain,
            subject: subject.into(),
            body: body.into(),
            recipients: recipients.to_vec(),
            attachments: Vec::new(),
        }
    }
}

/// Unauthenticated SMTP relay, as used on internal mail hosts.
pub struct SmtpTransport {
    from: String,
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    /// The sender address is only parsed when a message is sent, so a bad
    /// address fails each send rather than the transport setup.
    pub fn new(host: &str, port: u16, from: impl Into<String>) -> Self {
        let inner = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();
        Self {
            from: from.into(),
            inner,
        }
    }

    async fn build(&self, mail: Mail) -> Result<Message> {
        let from: Mailbox = self.from.parse().map_err(|e| Error::Mail {
            context: format!("invalid sender `{}`: {e}", self.from),
        })?;

        let mut builder = Message::builder().from(from).subject(mail.subject);
        for recipient in &mail.recipients {
            let to: Mailbox = recipient.parse().map_err(|e| Error::Mail {
                context: format!("invalid recipient `{recipient}`: {e}"),
            })?;
            builder = builder.to(to);
        }

        let body = match mail.format {
            MailFormat::Html => SinglePart::html(mail.body),
            MailFormat::Plain => SinglePart::plain(mail.body),
        };

        let message = if mail.attachments.is_empty() {
            builder.singlepart(body)
        } else {
            let png = ContentType::parse("image/png").map_err(|e| Error::Mail {
                context: format!("invalid attachment content type: {e}"),
            })?;
            let mut parts = MultiPart::mixed().singlepart(body);
            for path in &mail.attachments {
                let content = tokio::fs::read(path).await.map_err(|e| Error::Mail {
                    context: format!("failed to read attachment {}: {e}", path.display()),
                })?;
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "qrcode.png".to_owned());
                parts = parts.singlepart(Attachment::new(filename).body(content, png.clone()));
            }
            builder.multipart(parts)
        };

        message.map_err(|e| Error::Mail {
            context: format!("failed to build message: {e}"),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, mail: Mail) -> Result<()> {
        let message = self.build(mail).await?;
        self.inner.send(message).await.map_err(|e| Error::Mail {
            context: format!("failed to send: {e}"),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn transport(from: &str) -> SmtpTransport {
        SmtpTransport::new("127.0.0.1", 2525, from)
    }

    #[tokio::test]
    async fn builds_html_mail_with_attachment() {
        let dir = TempDir::new().unwrap();
        let qr = dir.path().join("bob.png");
        std::fs::write(&qr, b"\x89PNG").unwrap();

        let mail = Mail {
            format: MailFormat::Html,
            subject: "Your QR Code".into(),
            body: "<html><body><p>Your OTP QR: OTP-SRV</p></body></html>".into(),
            recipients: vec!["bob@example.com".into()],
            attachments: vec![qr],
        };
        let message = transport("multiotp@example.com").build(mail).await.unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: bob@example.com"));
        assert!(raw.contains("Subject: Your QR Code"));
        assert!(raw.contains("image/png"));
        assert!(raw.contains("bob.png"));
    }

    #[tokio::test]
    async fn invalid_sender_is_mail_error() {
        let mail = Mail::plain("Report", "body", &["root@example.com".into()]);
        let err = transport("multiotp@").build(mail).await.unwrap_err();
        assert!(matches!(err, Error::Mail { .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn missing_attachment_is_mail_error() {
        let dir = TempDir::new().unwrap();
        let mut mail = Mail::plain("s", "b", &["bob@example.com".into()]);
        mail.attachments.push(dir.path().join("gone.png"));
        let err = transport("multiotp@example.com")
            .build(mail)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("gone.png"));
    }
}
