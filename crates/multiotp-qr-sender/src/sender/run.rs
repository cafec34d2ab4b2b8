use crate::sender::config::RunConfig;
use crate::sender::pipeline::Pipeline;
use crate::sender::report::AdminReporter;
use crate::sender::service::mail::SmtpTransport;
use crate::sender::service::mailer::Mailer;
use crate::sender::service::multiotp::MultiOtpCli;
use crate::sender::service::{ArtifactGenerator, MailTransport, Resync};
use crate::sender::telemetry::LogSink;
use multiotp_qr_core::{DirectoryDiff, MailDomain, Result, RunReport};
use std::sync::Arc;
use std::time::Instant;

/// External systems a run depends on.
pub struct Collaborators {
    pub resync: Arc<dyn Resync>,
    pub generator: Arc<dyn ArtifactGenerator>,
    pub transport: Arc<dyn MailTransport>,
}

impl Collaborators {
    /// MultiOTP command line plus an SMTP relay, as configured.
    pub fn from_config(config: &RunConfig) -> Self {
        let multiotp = Arc::new(MultiOtpCli::new(&config.multiotp_bin, &config.qr_codes_dir));
        Self {
            resync: multiotp.clone(),
            generator: multiotp,
            transport: Arc::new(SmtpTransport::new(
                &config.mail.host,
                config.mail.port,
                &config.mail.from,
            )),
        }
    }
}

/// Validates the sender domain, runs the pipeline and reports the result.
///
/// On a run-fatal error the log file is mailed to the admins before the error
/// is returned. Admin reporting never changes the outcome.
pub async fn run(config: &RunConfig, log: &LogSink, collaborators: Collaborators) -> Result<RunReport> {
    let started = Instant::now();
    let Collaborators {
        resync,
        generator,
        transport,
    } = collaborators;

    let reporter = AdminReporter::new(
        transport.clone(),
        config.admins.clone(),
        &config.issuer_description,
    );

    let domain = match MailDomain::from_sender(&config.mail.from) {
        Ok(domain) => domain,
        Err(err) => {
            tracing::error!(mail_from = %config.mail.from, %err, "Wrong mail sender domain");
            reporter.report_fatal(&log.path).await;
            return Err(err);
        }
    };

    let mailer = Mailer::new(
        transport,
        domain,
        &config.mail.subject,
        &config.email_text,
        &config.issuer_description,
    );
    let pipeline = Pipeline::new(
        resync,
        DirectoryDiff::new(&config.users_dir, &config.qr_codes_dir),
        generator,
        mailer,
    );

    let report = match pipeline.run().await {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(%err, "Run aborted");
            reporter.report_fatal(&log.path).await;
            return Err(err);
        }
    };

    log_report(&report);
    let elapsed = started.elapsed();
    tracing::info!(elapsed_secs = elapsed.as_secs_f64(), "Program done");

    reporter.report_final(&report, elapsed).await;
    Ok(report)
}

fn log_report(report: &RunReport) {
    if report.succeeded_count() == 0 {
        tracing::info!("No new users processed");
    }
    for (identity, email) in report.succeeded() {
        tracing::info!(user = %identity, %email, "New user processed");
    }
    for (identity, failure) in report.failed() {
        tracing::warn!(
            user = %identity,
            stage = %failure.stage,
            err = %failure.detail,
            "Failed user"
        );
    }
}
