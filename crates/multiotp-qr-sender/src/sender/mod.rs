//! Building blocks of the `send-multiotp-qr` run.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/env configuration and its validation.
//! - [`telemetry`] - Log file setup and rotation.
//! - [`service`] - Boundaries to MultiOTP and the mail server.
//! - [`pipeline`] - The staged resync/diff/generate/deliver graph.
//! - [`report`] - Admin report mails.
//! - [`run`] - One complete run, wiring everything together.

pub mod config;
pub mod pipeline;
pub mod report;
pub mod run;
pub mod service;
pub mod telemetry;
#[cfg(test)]
mod testing;
