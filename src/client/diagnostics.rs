//! Best-effort network diagnostics
//!
//! After a request timeout the exporter traces the route to the API host so
//! the log shows where connectivity broke. Nothing here can fail the export:
//! every probe failure is logged and swallowed.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::DiagnosticsConfig;

/// Traceroute against a single host
#[derive(Debug, Clone)]
pub struct NetworkProbe {
    host: String,
    timeout: Duration,
    program: String,
}

impl NetworkProbe {
    /// Create a probe for the host part of `base_url`
    ///
    /// Returns `None` when no host can be extracted.
    pub fn for_base_url(base_url: &str, config: &DiagnosticsConfig) -> Option<Self> {
        let host = reqwest::Url::parse(base_url).ok()?.host_str()?.to_string();
        Some(Self {
            host,
            timeout: Duration::from_secs(config.probe_timeout),
            program: "traceroute".to_string(),
        })
    }

    /// Use a different probe executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Run the probe, logging its outcome
    pub async fn run(&self) {
        info!("Request timed out, tracing route to {}", self.host);

        let child = Command::new(&self.program)
            .arg(&self.host)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                for line in stdout.lines() {
                    debug!("{}: {}", self.program, line);
                }
                info!(
                    "{} to {} finished ({} hops)",
                    self.program,
                    self.host,
                    stdout.lines().count().saturating_sub(1)
                );
            }
            Ok(Ok(output)) => {
                warn!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Ok(Err(e)) => warn!("Failed to run {}: {}", self.program, e),
            Err(_) => warn!(
                "{} did not finish within {}s",
                self.program,
                self.timeout.as_secs()
            ),
        }
    }
}
