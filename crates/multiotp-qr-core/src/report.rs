//! Aggregation of per-identity outcomes into the final run report.
//!
//! A [`RunReport`] is keyed by [`Identity`] and keeps insertion order, which is
//! the order outcomes arrived at the deliver stage. Each identity is recorded
//! at most once, so "succeeded" and "failed" are mutually exclusive by
//! construction.

use crate::Identity;
use core::fmt::{self, Write as _};
use core::time::Duration;
use indexmap::IndexMap;
use indexmap::map::Entry;

/// Pipeline stage at which an identity failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureStage {
    Generation,
    Delivery,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generation => write!(f, "generation"),
            Self::Delivery => write!(f, "delivery"),
        }
    }
}

/// Result of handing one identity's QR to the mail transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub identity: Identity,
    pub email: String,
    /// `None` when the message was accepted by the mail server.
    pub failure: Option<String>,
}

impl DeliveryOutcome {
    pub const fn delivered(identity: Identity, email: String) -> Self {
        Self {
            identity,
            email,
            failure: None,
        }
    }

    pub const fn failed(identity: Identity, email: String, detail: String) -> Self {
        Self {
            identity,
            email,
            failure: Some(detail),
        }
    }

    pub const fn is_delivered(&self) -> bool {
        self.failure.is_none()
    }
}

/// Message carried from the deliver stage to the aggregator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Processed {
    /// Delivery was attempted, successfully or not.
    Delivered(DeliveryOutcome),
    /// Generation failed upstream, so delivery was never attempted.
    Skipped { identity: Identity, reason: String },
}

impl Processed {
    pub const fn identity(&self) -> &Identity {
        match self {
            Self::Delivered(outcome) => &outcome.identity,
            Self::Skipped { identity, .. } => identity,
        }
    }
}

/// Why an identity ended up in the failed list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub stage: FailureStage,
    /// Recipient address, known only once delivery was attempted.
    pub email: Option<String>,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Outcome {
    Succeeded { email: String },
    Failed(Failure),
}

/// Succeeded and failed identities of a single run.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    outcomes: IndexMap<Identity, Outcome>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one message from the deliver stage.
    ///
    /// Returns `false` (and records nothing) if the identity already has an
    /// outcome.
    pub fn record(&mut self, processed: Processed) -> bool {
        match processed {
            Processed::Delivered(outcome) => self.record_delivery(outcome),
            Processed::Skipped { identity, reason } => self.record_skipped(identity, reason),
        }
    }

    /// Records the outcome of a delivery attempt.
    ///
    /// Returns `false` (and records nothing) if the identity already has an
    /// outcome.
    pub fn record_delivery(&mut self, outcome: DeliveryOutcome) -> bool {
        let DeliveryOutcome {
            identity,
            email,
            failure,
        } = outcome;
        let outcome = match failure {
            None => Outcome::Succeeded { email },
            Some(detail) => Outcome::Failed(Failure {
                stage: FailureStage::Delivery,
                email: Some(email),
                detail,
            }),
        };
        self.insert_once(identity, outcome)
    }

    /// Records an identity whose QR generation failed upstream.
    ///
    /// Returns `false` (and records nothing) if the identity already has an
    /// outcome.
    pub fn record_skipped(&mut self, identity: Identity, reason: String) -> bool {
        self.insert_once(
            identity,
            Outcome::Failed(Failure {
                stage: FailureStage::Generation,
                email: None,
                detail: reason,
            }),
        )
    }

    fn insert_once(&mut self, identity: Identity, outcome: Outcome) -> bool {
        match self.outcomes.entry(identity) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(outcome);
                true
            }
        }
    }

    /// Succeeded identities with their resolved addresses, in arrival order.
    pub fn succeeded(&self) -> impl Iterator<Item = (&Identity, &str)> {
        self.outcomes.iter().filter_map(|(identity, outcome)| match outcome {
            Outcome::Succeeded { email } => Some((identity, email.as_str())),
            Outcome::Failed(_) => None,
        })
    }

    /// Failed identities with the failing stage, in arrival order.
    pub fn failed(&self) -> impl Iterator<Item = (&Identity, &Failure)> {
        self.outcomes.iter().filter_map(|(identity, outcome)| match outcome {
            Outcome::Failed(failure) => Some((identity, failure)),
            Outcome::Succeeded { .. } => None,
        })
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    /// `true` when no identity was processed during the run.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Short summary printed to the console at the end of a run.
    pub fn render_summary(&self) -> String {
        let mut out = format!(
            "succeeded: {}, failed: {}\n",
            self.succeeded_count(),
            self.failed_count()
        );
        for (identity, email) in self.succeeded() {
            let _ = writeln!(out, "  + {identity} <{email}>");
        }
        for (identity, failure) in self.failed() {
            let _ = writeln!(out, "  - {identity} [{}]", failure.stage);
        }
        out
    }

    /// Plain-text body of the final admin report.
    pub fn render_admin_body(&self, elapsed: Duration) -> String {
        let mut out = String::from("Succeeded users:\n");
        if self.succeeded_count() == 0 {
            out.push_str("\t(none)\n");
        }
        for (identity, email) in self.succeeded() {
            let _ = writeln!(out, "\t{identity} <{email}>");
        }

        out.push_str("Failed users:\n");
        if self.failed_count() == 0 {
            out.push_str("\t(none)\n");
        }
        for (identity, failure) in self.failed() {
            let _ = write!(out, "\t{identity}");
            if let Some(email) = &failure.email {
                let _ = write!(out, " <{email}>");
            }
            let _ = writeln!(out, " [{}]: {}", failure.stage, failure.detail);
        }

        let _ = write!(out, "Elapsed: {:.3}s", elapsed.as_secs_f64());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identity {
        Identity::parse(name).unwrap()
    }

    #[test]
    fn keeps_arrival_order() {
        let mut report = RunReport::new();
        report.record_delivery(DeliveryOutcome::delivered(id("zed"), "zed@x.io".into()));
        report.record_skipped(id("bob"), "exit 1".into());
        report.record_delivery(DeliveryOutcome::delivered(id("amy"), "amy@x.io".into()));

        let succeeded: Vec<_> = report.succeeded().map(|(i, e)| (i.as_str(), e)).collect();
        assert_eq!(succeeded, [("zed", "zed@x.io"), ("amy", "amy@x.io")]);
        assert_eq!(report.failed_count(), 1);
    }

    #[test]
    fn succeeded_and_failed_are_exclusive() {
        let mut report = RunReport::new();
        assert!(report.record_delivery(DeliveryOutcome::failed(
            id("carol"),
            "carol@x.io".into(),
            "550 mailbox unavailable".into(),
        )));
        assert!(!report.record_delivery(DeliveryOutcome::delivered(
            id("carol"),
            "carol@x.io".into()
        )));
        assert!(!report.record_skipped(id("carol"), "late".into()));

        assert_eq!(report.succeeded_count(), 0);
        let (identity, failure) = report.failed().next().unwrap();
        assert_eq!(identity.as_str(), "carol");
        assert_eq!(failure.stage, FailureStage::Delivery);
        assert_eq!(failure.email.as_deref(), Some("carol@x.io"));
    }

    #[test]
    fn record_dispatches_on_message_kind() {
        let mut report = RunReport::new();
        let delivered = Processed::Delivered(DeliveryOutcome::delivered(
            id("erin"),
            "erin@x.io".into(),
        ));
        assert_eq!(delivered.identity().as_str(), "erin");
        assert!(report.record(delivered));
        assert!(report.record(Processed::Skipped {
            identity: id("frank"),
            reason: "exit 21".into(),
        }));
        assert_eq!(report.succeeded_count(), 1);
        assert_eq!(report.failed_count(), 1);
    }

    #[test]
    fn skipped_identity_has_no_address() {
        let mut report = RunReport::new();
        report.record_skipped(id("dave"), "qrcode exited with 21".into());
        let (_, failure) = report.failed().next().unwrap();
        assert_eq!(failure.stage, FailureStage::Generation);
        assert!(failure.email.is_none());
    }

    #[test]
    fn renders_admin_body() {
        let mut report = RunReport::new();
        report.record_delivery(DeliveryOutcome::delivered(id("alice"), "alice@x.io".into()));
        report.record_skipped(id("bob"), "boom".into());

        let body = report.render_admin_body(Duration::from_millis(1500));
        assert_eq!(
            body,
            "Succeeded users:\n\talice <alice@x.io>\nFailed users:\n\tbob [generation]: boom\nElapsed: 1.500s"
        );
    }

    #[test]
    fn renders_console_summary() {
        let mut report = RunReport::new();
        report.record_delivery(DeliveryOutcome::delivered(id("alice"), "alice@x.io".into()));
        report.record_delivery(DeliveryOutcome::failed(
            id("carol"),
            "carol@x.io".into(),
            "timeout".into(),
        ));

        assert_eq!(
            report.render_summary(),
            "succeeded: 1, failed: 1\n  + alice <alice@x.io>\n  - carol [delivery]\n"
        );
    }

    #[test]
    fn renders_empty_lists() {
        let report = RunReport::new();
        assert!(report.is_empty());
        let body = report.render_admin_body(Duration::ZERO);
        assert!(body.contains("Succeeded users:\n\t(none)\n"));
        assert!(body.contains("Failed users:\n\t(none)\n"));
        assert_eq!(report.render_summary(), "succeeded: 0, failed: 0\n");
    }
}
