//! Login trigger: hand credentials to the legacy archival system through
//! its registered custom URL scheme.
//!
//! The URL is `<protocol>://login?id=<id>&pw=<password>`, built by
//! [`protocol_setup::login_url`]. Whether a handler exists is only known
//! after the fact, so the handoff is a race between the opener reporting
//! back and a fixed timeout. Nothing is retried and nothing is stored.

use crate::config::LaunchConfig;
use crate::error::ScanError;
use crate::log::RunLog;
use async_trait::async_trait;
use protocol_setup::{login_url, masked_login_url};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Required length of an employee ID.
pub const EMPLOYEE_ID_LEN: usize = 5;

/// How a protocol handoff ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchOutcome {
    /// A handler took the URL.
    Claimed,
    /// No handler answered in time, or the system reported none.
    Unclaimed,
}

/// Opens a protocol URL with whatever the host provides.
#[async_trait]
pub trait ProtocolOpener: Send + Sync {
    /// Resolve with `Claimed` once a handler accepted `url`, `Unclaimed` if
    /// the host reports that none exists. `Err` only when the opener itself
    /// could not run. May never resolve; the caller applies a timeout.
    async fn open(&self, url: &str) -> Result<LaunchOutcome, ScanError>;
}

/// The platform URL opener: `xdg-open`, `open`, or `url.dll` on Windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl SystemOpener {
    fn command(url: &str) -> Command {
        #[cfg(target_os = "windows")]
        {
            // `cmd /C start` would split the URL at `&`.
            let mut cmd = Command::new("rundll32");
            cmd.arg("url.dll,FileProtocolHandler").arg(url);
            cmd
        }
        #[cfg(target_os = "macos")]
        {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        }
    }
}

#[async_trait]
impl ProtocolOpener for SystemOpener {
    async fn open(&self, url: &str) -> Result<LaunchOutcome, ScanError> {
        let status = Self::command(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| ScanError::LaunchFailed {
                url: mask_password(url),
                reason: e.to_string(),
            })?;
        debug!("URL opener exited with {}", status);
        Ok(if status.success() {
            LaunchOutcome::Claimed
        } else {
            LaunchOutcome::Unclaimed
        })
    }
}

/// Check the login form: a five-digit employee ID and a non-empty password.
pub fn validate_credentials(employee_id: &str, password: &str) -> Result<(), ScanError> {
    if employee_id.len() != EMPLOYEE_ID_LEN || !employee_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScanError::InvalidCredentials(format!(
            "employee ID must be {EMPLOYEE_ID_LEN} digits"
        )));
    }
    if password.is_empty() {
        return Err(ScanError::InvalidCredentials(
            "password must not be empty".into(),
        ));
    }
    Ok(())
}

/// Replace everything after `pw=` with `****`.
pub fn mask_password(url: &str) -> String {
    match url.find("pw=") {
        Some(idx) => format!("{}pw=****", &url[..idx]),
        None => url.to_string(),
    }
}

/// Validate, build the URL, hand it to `opener` and wait at most
/// `config.timeout` for it to be claimed.
pub async fn trigger_login(
    employee_id: &str,
    password: &str,
    config: &LaunchConfig,
    opener: &dyn ProtocolOpener,
    log: &mut RunLog,
) -> Result<LaunchOutcome, ScanError> {
    validate_credentials(employee_id, password)?;

    log.info("Starting IE-mode auto login...");
    log.info(format!(
        "Protocol call: {}",
        masked_login_url(&config.protocol, employee_id)
    ));

    let url = login_url(&config.protocol, employee_id, password);
    let outcome = tokio::select! {
        res = opener.open(&url) => match res {
            Ok(outcome) => outcome,
            Err(e) => {
                log.error(&e);
                return Err(e);
            }
        },
        _ = tokio::time::sleep(config.timeout) => LaunchOutcome::Unclaimed,
    };

    match outcome {
        LaunchOutcome::Claimed => log.success("IE auto login launch complete"),
        LaunchOutcome::Unclaimed => log.notice(
            "Protocol handler is not registered. Run `scan2png setup` and install the bundle first.",
        ),
    }
    info!("Protocol handoff: {:?}", outcome);
    Ok(outcome)
}
