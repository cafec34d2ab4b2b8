//! In-memory stand-ins for the external systems.

use crate::sender::service::mail::Mail;
use crate::sender::service::{ArtifactGenerator, MailTransport, Resync};
use async_trait::async_trait;
use multiotp_qr_core::{ArtifactRecord, Error, Identity, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Records every mail; fails sends addressed to any of `fail_for`.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Mail>>,
    attempts: AtomicUsize,
    fail_for: HashSet<String>,
    fail_all: bool,
}

impl RecordingTransport {
    pub fn failing_for<const N: usize>(recipients: [&str; N]) -> Self {
        Self {
            fail_for: recipients.into_iter().map(str::to_owned).collect(),
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Mails that were accepted.
    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().unwrap().clone()
    }

    /// Every send call, accepted or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, mail: Mail) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_all || mail.recipients.iter().any(|r| self.fail_for.contains(r)) {
            return Err(Error::Mail {
                context: "550 mailbox unavailable".into(),
            });
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

/// Writes an empty QR file unless the identity is listed in `fail_for`.
pub struct ScriptedGenerator {
    qr_codes_dir: PathBuf,
    fail_for: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(qr_codes_dir: impl Into<PathBuf>) -> Self {
        Self {
            qr_codes_dir: qr_codes_dir.into(),
            fail_for: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_for<const N: usize>(mut self, identities: [&str; N]) -> Self {
        self.fail_for = identities.into_iter().map(str::to_owned).collect();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactGenerator for ScriptedGenerator {
    async fn generate(&self, identity: &Identity) -> Result<ArtifactRecord> {
        self.calls.lock().unwrap().push(identity.to_string());
        if self.fail_for.contains(identity.as_str()) {
            return Err(Error::Generation {
                identity: identity.to_string(),
                context: "exit code 21".into(),
            });
        }
        let record = ArtifactRecord::new(&self.qr_codes_dir, identity.clone());
        tokio::fs::write(&record.location, b"png").await.map_err(|e| Error::Generation {
            identity: identity.to_string(),
            context: e.to_string(),
        })?;
        Ok(record)
    }
}

/// Resync that succeeds or fails on demand and counts its calls.
#[derive(Default)]
pub struct StaticResync {
    fail: bool,
    calls: AtomicUsize,
}

impl StaticResync {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resync for StaticResync {
    async fn resync(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(Error::Resync {
                context: "exit code 28: LDAP bind failed".into(),
            })
        } else {
            Ok(())
        }
    }
}
