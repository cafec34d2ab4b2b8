//! Detection of enrolled identities that still lack a QR artifact.
//!
//! Both directories are listed in full before anything is compared, so a
//! listing failure surfaces before a single identity is emitted. The result is
//! a lazy iterator over the set difference `names(enrollment) - names(artifact)`.

use crate::{ARTIFACT_EXT, DirectoryKind, ENROLLMENT_EXT, Error, Identity, Result};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static ENROLLMENT_FILE: LazyLock<Regex> = LazyLock::new(|| record_pattern(ENROLLMENT_EXT));
static ARTIFACT_FILE: LazyLock<Regex> = LazyLock::new(|| record_pattern(ARTIFACT_EXT));

fn record_pattern(ext: &str) -> Regex {
    // ASCII-only word class; `\w` in `regex` is Unicode-aware.
    Regex::new(&format!(r"^([0-9A-Za-z_]+)\.{}$", regex::escape(ext)))
        .expect("record file pattern is a valid regex")
}

/// Compares the enrollment directory against the artifact directory.
#[derive(Clone, Debug)]
pub struct DirectoryDiff {
    enrollment_dir: PathBuf,
    artifact_dir: PathBuf,
}

impl DirectoryDiff {
    pub fn new(enrollment_dir: impl Into<PathBuf>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            enrollment_dir: enrollment_dir.into(),
            artifact_dir: artifact_dir.into(),
        }
    }

    /// Lists both directories and returns the identities with no artifact.
    ///
    /// Matching is exact string equality on the captured name; there is no
    /// case folding. Identities come out sorted, without duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DirectoryRead`] if either directory cannot be listed.
    /// The enrollment directory is listed first.
    pub fn pending(&self) -> Result<Pending> {
        let enrolled = list_identities(
            &self.enrollment_dir,
            &ENROLLMENT_FILE,
            DirectoryKind::Enrollment,
        )?;
        let issued = list_identities(&self.artifact_dir, &ARTIFACT_FILE, DirectoryKind::Artifact)?;

        Ok(Pending {
            enrolled: enrolled.into_iter(),
            issued: issued.into_iter().collect(),
        })
    }
}

/// Lazy sequence of pending identities produced by [`DirectoryDiff::pending`].
#[derive(Debug)]
pub struct Pending {
    enrolled: std::collections::btree_set::IntoIter<Identity>,
    issued: HashSet<Identity>,
}

impl Iterator for Pending {
    type Item = Identity;

    fn next(&mut self) -> Option<Self::Item> {
        self.enrolled.find(|identity| !self.issued.contains(identity))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.enrolled.size_hint().1)
    }
}

/// Collects the captured names of every regular entry in `dir` matching
/// `pattern`. Subdirectories and non-matching names are skipped.
fn list_identities(dir: &Path, pattern: &Regex, kind: DirectoryKind) -> Result<BTreeSet<Identity>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::directory_read(kind, dir, e))?;
    let mut names = BTreeSet::new();

    for entry in entries {
        let entry = entry.map_err(|e| Error::directory_read(kind, dir, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| Error::directory_read(kind, dir, e))?;
        if file_type.is_dir() {
            continue;
        }

        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            #[cfg(feature = "tracing")]
            tracing::trace!(?file_name, %kind, "skipping non UTF-8 file name");
            continue;
        };

        match pattern
            .captures(file_name)
            .and_then(|caps| caps.get(1))
            .map(|name| Identity::parse(name.as_str()))
        {
            Some(Ok(identity)) => {
                names.insert(identity);
            }
            _ => {
                #[cfg(feature = "tracing")]
                tracing::trace!(file_name, %kind, "skipping non-matching entry");
            }
        }
    }

    Ok(names)
}
