use super::{ArtifactGenerator, Resync};
use async_trait::async_trait;
use multiotp_qr_core::{ArtifactRecord, Error, Identity, Result};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Output;
use tokio::process::Command;

/// Exit codes MultiOTP uses for a completed operation. Administrative commands
/// answer `19` ("requested operation successfully done") rather than `0`.
const SUCCESS_CODES: [i32; 2] = [0, 19];

/// Drives the MultiOTP command line tool.
#[derive(Debug, Clone)]
pub struct MultiOtpCli {
    binary: PathBuf,
    qr_codes_dir: PathBuf,
}

impl MultiOtpCli {
    pub fn new(binary: impl Into<PathBuf>, qr_codes_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            qr_codes_dir: qr_codes_dir.into(),
        }
    }

    /// Runs the binary to completion and returns a failure description on
    /// spawn errors or unexpected exit codes.
    async fn exec<I, S>(&self, args: I) -> core::result::Result<(), String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("failed to run {}: {e}", self.binary.display()))?;

        check_status(&output)
    }
}

fn check_status(output: &Output) -> core::result::Result<(), String> {
    match output.status.code() {
        Some(code) if SUCCESS_CODES.contains(&code) => Ok(()),
        code => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let last_line = |text: &str| -> Option<String> {
                text.lines()
                    .rfind(|line| !line.trim().is_empty())
                    .map(|line| line.trim().to_owned())
            };
            let detail = last_line(&stderr)
                .or_else(|| last_line(&stdout))
                .unwrap_or_else(|| "no output".to_owned());
            Err(match code {
                Some(code) => format!("exit code {code}: {detail}"),
                None => format!("terminated by signal: {detail}"),
            })
        }
    }
}

#[async_trait]
impl Resync for MultiOtpCli {
    async fn resync(&self) -> Result<()> {
        self.exec(["-ldap-users-sync"])
            .await
            .map_err(|context| Error::Resync { context })
    }
}

#[async_trait]
impl ArtifactGenerator for MultiOtpCli {
    async fn generate(&self, identity: &Identity) -> Result<ArtifactRecord> {
        let record = ArtifactRecord::new(&self.qr_codes_dir, identity.clone());
        self.exec([
            OsStr::new("-qrcode"),
            OsStr::new(identity.as_str()),
            record.location.as_os_str(),
        ])
        .await
        .map_err(|context| Error::Generation {
            identity: identity.to_string(),
            context,
        })?;
        Ok(record)
    }
}
