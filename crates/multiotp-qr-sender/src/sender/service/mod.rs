//! Boundaries to the systems a run talks to.
//!
//! The pipeline only sees the traits below. Production wiring uses
//! [`multiotp::MultiOtpCli`] for the enrollment store and QR generation and
//! [`mail::SmtpTransport`] for email; tests swap in in-memory doubles.
//!
//! ## Submodules
//!
//! - [`multiotp`] - MultiOTP command line wrapper (resync, QR generation).
//! - [`mail`] - Mail message type and the SMTP transport.
//! - [`mailer`] - Per-identity QR delivery with orphan cleanup.

pub mod mail;
pub mod mailer;
pub mod multiotp;

use async_trait::async_trait;
use mail::Mail;
use multiotp_qr_core::{ArtifactRecord, Identity, Result};

/// Refreshes the enrollment store from its upstream directory.
#[async_trait]
pub trait Resync: Send + Sync {
    /// Runs a single blocking resync.
    async fn resync(&self) -> Result<()>;
}

/// Produces the QR artifact for one identity.
#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    /// Generates the QR image and returns where it was written.
    ///
    /// Only the generator's success signal is checked, not the image itself.
    async fn generate(&self, identity: &Identity) -> Result<ArtifactRecord>;
}

/// Hands a fully described message to a mail server.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<()>;
}
