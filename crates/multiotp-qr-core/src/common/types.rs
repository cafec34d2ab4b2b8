//! # Domain types shared by every pipeline stage
//!
//! ## Overview
//!
//! - [`Identity`] - an enrolled username, validated against the record-file
//!   pattern
//! - [`ArtifactRecord`] - where the QR image for an identity lives
//! - [`Generated`] - the message handed from generation to delivery
//! - [`MailDomain`] - the recipient domain derived from the sender address
//! - [`AdminRecipients`] - the optional admin distribution list
//!
//! All of them are owned values. Stages hand them across channels by move, so
//! no stage ever observes another stage's mutation.

use crate::{Error, Result};
use core::fmt;
use std::path::{Path, PathBuf};

/// File extension of enrollment records (`{identity}.db`).
pub const ENROLLMENT_EXT: &str = "db";

/// File extension of issued QR artifacts (`{identity}.png`).
pub const ARTIFACT_EXT: &str = "png";

/// Value of the admin list that turns admin reporting off.
pub const ADMINS_DISABLED: &str = "NONE";

/// An enrolled username.
///
/// Only ASCII word characters (`[0-9A-Za-z_]`) are accepted, which keeps the
/// name safe to splice into file names and email local parts.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(String);

impl Identity {
    /// Builds an identity from a raw name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if the trimmed name is empty or
    /// contains anything other than word characters.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self> {
        let name = raw.as_ref().trim();
        if !name.is_empty() && name.bytes().all(is_word_byte) {
            Ok(Self(name.to_owned()))
        } else {
            Err(Error::InvalidIdentity(raw.as_ref().to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

const fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// A QR image issued for an identity. Never mutated once created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub identity: Identity,
    pub location: PathBuf,
}

impl ArtifactRecord {
    /// Record for `identity` at its canonical location inside `artifact_dir`.
    pub fn new(artifact_dir: &Path, identity: Identity) -> Self {
        let location = Self::location_for(artifact_dir, &identity);
        Self { identity, location }
    }

    /// `{artifact_dir}/{identity}.png`
    pub fn location_for(artifact_dir: &Path, identity: &Identity) -> PathBuf {
        artifact_dir.join(format!("{identity}.{ARTIFACT_EXT}"))
    }
}

/// Message carried from the generate stage to the deliver stage.
///
/// Every pending identity produces exactly one `Generated`, so the deliver
/// stage sees the same number of items the diff stage emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Generated {
    /// The QR image was produced and can be mailed.
    Ready(ArtifactRecord),
    /// Generation failed; the identity must not be mailed.
    Skipped { identity: Identity, reason: String },
}

impl Generated {
    pub const fn identity(&self) -> &Identity {
        match self {
            Self::Ready(record) => &record.identity,
            Self::Skipped { identity, .. } => identity,
        }
    }
}

/// Domain part of the sender address, reused for every recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailDomain(String);

impl MailDomain {
    /// Extracts the substring after `@` from the sender address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSender`] when there is no `@` or nothing
    /// follows it.
    pub fn from_sender(sender: &str) -> Result<Self> {
        match sender.split_once('@') {
            Some((_, domain)) if !domain.is_empty() => Ok(Self(domain.to_owned())),
            _ => Err(Error::InvalidSender {
                address: sender.to_owned(),
            }),
        }
    }

    /// `{identity}@{domain}`
    pub fn address_for(&self, identity: &Identity) -> String {
        format!("{identity}@{}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Admin distribution list for run reports.
///
/// An empty list means reporting is disabled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdminRecipients(Vec<String>);

impl AdminRecipients {
    /// Parses a comma-separated list. [`ADMINS_DISABLED`] yields an empty
    /// list; blank entries are dropped.
    pub fn parse(list: &str) -> Self {
        if list.trim() == ADMINS_DISABLED {
            return Self::default();
        }
        Self(
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    pub fn is_enabled(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}
