//! Error types for the QR delivery run.
//!
//! This module defines the central `Error` enum shared by the directory diff,
//! the collaborator wrappers and the pipeline stages. Every variant belongs to
//! one of two classes, queried through [`Error::is_fatal`]:
//!
//! ## Run-fatal
//! - `DirectoryRead`: The enrollment or artifact directory could not be listed.
//! - `Resync`: The enrollment store could not be resynchronized.
//! - `InvalidSender`: The configured sender address has no domain part.
//! - `Stage`: A pipeline stage task died without producing its result.
//!
//! ## Per-identity
//! - `InvalidIdentity`: A name cannot be used as an identity.
//! - `Generation`: The external QR generation failed for one identity.
//! - `Mail`: A message could not be built or handed to the mail server.

use core::fmt;
use std::path::PathBuf;

pub type Result<T> = core::result::Result<T, Error>;

/// Which of the two watched directories an I/O failure refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectoryKind {
    /// Directory of `*.db` enrollment records.
    Enrollment,
    /// Directory of `*.png` issued QR artifacts.
    Artifact,
}

impl fmt::Display for DirectoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enrollment => write!(f, "enrollment"),
            Self::Artifact => write!(f, "artifact"),
        }
    }
}

/// Unified error type for a delivery run.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Listing one of the watched directories failed.
    #[error("Failed to read {kind} directory {}: {source}", path.display())]
    DirectoryRead {
        kind: DirectoryKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The sender address has nothing usable after `@`.
    #[error("Invalid sender address `{address}`: domain after '@' cannot be empty")]
    InvalidSender { address: String },

    /// The value does not match the identity pattern.
    #[error("Invalid identity `{0}`")]
    InvalidIdentity(String),

    /// The external enrollment resync reported failure.
    #[error("Resync failed: {context}")]
    Resync { context: String },

    /// The external QR generation reported failure.
    #[error("QR generation failed for {identity}: {context}")]
    Generation { identity: String, context: String },

    /// Building or sending an email failed.
    #[error("Mail error: {context}")]
    Mail { context: String },

    /// A pipeline stage ended abnormally (panic or abort).
    #[error("Stage `{stage}` terminated abnormally: {context}")]
    Stage { stage: &'static str, context: String },
}

impl Error {
    /// Returns `true` when the error must end the whole run.
    ///
    /// Per-identity failures are recorded against the identity and the run
    /// moves on to the next one.
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::DirectoryRead { .. }
            | Self::InvalidSender { .. }
            | Self::Resync { .. }
            | Self::Stage { .. } => true,
            Self::InvalidIdentity(_) | Self::Generation { .. } | Self::Mail { .. } => false,
        }
    }

    pub(crate) fn directory_read(
        kind: DirectoryKind,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::DirectoryRead {
            kind,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_fatal_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(Error::directory_read(DirectoryKind::Artifact, "/qr", io).is_fatal());
        assert!(
            Error::Resync {
                context: "exit 1".into()
            }
            .is_fatal()
        );
        assert!(
            Error::InvalidSender {
                address: "multiotp@".into()
            }
            .is_fatal()
        );
    }

    #[test]
    fn classifies_per_identity_errors() {
        assert!(
            !Error::Generation {
                identity: "bob".into(),
                context: "exit 2".into()
            }
            .is_fatal()
        );
        assert!(
            !Error::Mail {
                context: "connection refused".into()
            }
            .is_fatal()
        );
    }

    #[test]
    fn directory_read_names_the_directory() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::directory_read(DirectoryKind::Enrollment, "/etc/multiotp/users", io);
        let msg = err.to_string();
        assert!(msg.contains("enrollment directory"));
        assert!(msg.contains("/etc/multiotp/users"));
    }
}
