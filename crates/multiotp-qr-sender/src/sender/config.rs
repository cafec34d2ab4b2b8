use anyhow::bail;
use clap::Parser;
use multiotp_qr_core::AdminRecipients;
use std::path::PathBuf;

use crate::sender::telemetry::APP_NAME;

/// Command-line surface of the `send-multiotp-qr` binary.
///
/// Every flag falls back to an environment variable, which may also come from
/// a `.env` file in the working directory.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "send-multiotp-qr",
    version,
    about = "Send MultiOTP QR codes to newly enrolled users"
)]
pub struct CliArgs {
    /// Directory for run logs.
    ///
    /// Defaults to `logs_send-multiotp-qr` next to the executable.
    ///
    /// Environment variable: `LOG_DIR`
    #[arg(long = "log-dir", env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Number of log files to keep after rotation.
    ///
    /// Environment variable: `KEEP_LOGS`
    #[arg(long = "keep-logs", env = "KEEP_LOGS", default_value_t = 7)]
    pub keep_logs: usize,

    /// Full path to the MultiOTP binary.
    ///
    /// Environment variable: `MULTIOTP_BIN`
    #[arg(
        long = "mpath",
        env = "MULTIOTP_BIN",
        default_value = "/usr/local/bin/multiotp/multiotp.php"
    )]
    pub multiotp_bin: PathBuf,

    /// Directory where QR code images are written.
    ///
    /// Environment variable: `QR_CODES_DIR`
    #[arg(long = "qrpath", env = "QR_CODES_DIR", default_value = "/etc/multiotp/qrcodes")]
    pub qr_codes_dir: PathBuf,

    /// MultiOTP users directory (`*.db` files).
    ///
    /// Environment variable: `USERS_DIR`
    #[arg(long = "upath", env = "USERS_DIR", default_value = "/etc/multiotp/users")]
    pub users_dir: PathBuf,

    /// Issuer (your MultiOTP server) description, shown in the email body.
    ///
    /// Environment variable: `ISSUER_DESCRIPTION`
    #[arg(long = "idesc", env = "ISSUER_DESCRIPTION", default_value = "TEST-SRV-OTP")]
    pub issuer_description: String,

    /// Text of the email body, followed by the issuer description.
    ///
    /// Environment variable: `EMAIL_TEXT`
    #[arg(long = "etext", env = "EMAIL_TEXT", default_value = "Your OTP QR")]
    pub email_text: String,

    /// Mail host (IP or hostname).
    ///
    /// Environment variable: `MAIL_HOST`
    #[arg(long = "mhost", env = "MAIL_HOST", default_value = "mail.example.com")]
    pub mail_host: String,

    /// Mail port.
    ///
    /// Environment variable: `MAIL_PORT`
    #[arg(long = "mport", env = "MAIL_PORT", default_value_t = 25)]
    pub mail_port: u16,

    /// Sender address. Its domain is used as the users' mail domain.
    ///
    /// Environment variable: `MAIL_FROM`
    #[arg(long = "mfrom", env = "MAIL_FROM", default_value = "multiotp@example.com")]
    pub mail_from: String,

    /// Subject of the mail sent to users.
    ///
    /// Environment variable: `MAIL_SUBJECT`
    #[arg(long = "msubj", env = "MAIL_SUBJECT", default_value = "Your QR Code")]
    pub mail_subject: String,

    /// Admin addresses separated by commas, or `NONE` to disable reports.
    ///
    /// Environment variable: `MAIL_ADMINS`
    #[arg(long = "madmins", env = "MAIL_ADMINS", default_value = "NONE")]
    pub mail_admins: String,
}

/// SMTP settings shared by user and admin mails.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    pub from: String,
    pub subject: String,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub log_dir: PathBuf,
    pub keep_logs: usize,
    pub multiotp_bin: PathBuf,
    pub qr_codes_dir: PathBuf,
    pub users_dir: PathBuf,
    pub issuer_description: String,
    pub email_text: String,
    pub mail: MailSettings,
    pub admins: AdminRecipients,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    // The sender domain is validated later, once logging is up, so that the
    // failure lands in the log and the admin report.
    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.keep_logs == 0 {
            bail!("KEEP_LOGS must be greater than 0");
        }

        if args.mail_port == 0 {
            bail!("MAIL_PORT must be greater than 0");
        }

        if args.mail_host.trim().is_empty() {
            bail!("MAIL_HOST cannot be empty");
        }

        let log_dir = args.log_dir.unwrap_or_else(default_log_dir);

        Ok(Self {
            log_dir,
            keep_logs: args.keep_logs,
            multiotp_bin: args.multiotp_bin,
            qr_codes_dir: args.qr_codes_dir,
            users_dir: args.users_dir,
            issuer_description: args.issuer_description,
            email_text: args.email_text,
            mail: MailSettings {
                host: args.mail_host,
                port: args.mail_port,
                from: args.mail_from,
                subject: args.mail_subject,
            },
            admins: AdminRecipients::parse(&args.mail_admins),
        })
    }
}

/// `logs_send-multiotp-qr` next to the running executable, or in the working
/// directory if the executable path cannot be resolved.
fn default_log_dir() -> PathBuf {
    let dir_name = format!("logs_{APP_NAME}");
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&dir_name)))
        .unwrap_or_else(|| PathBuf::from(dir_name))
}
