//! Start Pure Data with the receiver patch open.
//!
//! Only used when `[environment].pd_path` is set; otherwise patchcraft
//! expects a Pd instance to be listening already. Pd's console is left on
//! the terminal's stderr, and the process outlives patchcraft so the
//! generated patch stays on screen.

use crate::config::EnvironmentConfig;
use crate::error::{Error, ErrorKind, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::info;

pub struct PdLauncher {
    program: PathBuf,
    receiver_patch: PathBuf,
    startup_delay: Duration,
}

impl PdLauncher {
    pub fn new(program: impl Into<PathBuf>, receiver_patch: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            receiver_patch: receiver_patch.into(),
            startup_delay: Duration::from_secs(2),
        }
    }

    /// A launcher for the configured Pd, or `None` when Pd is started elsewhere
    pub fn from_config(environment: &EnvironmentConfig) -> Option<Self> {
        let program = environment.pd_path.as_ref()?;
        Some(
            Self::new(program, &environment.receiver_patch)
                .with_startup_delay(Duration::from_millis(environment.startup_delay_ms)),
        )
    }

    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// `pd -d 4 -open <receiver_patch> -stderr`
    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-d")
            .arg("4")
            .arg("-open")
            .arg(&self.receiver_patch)
            .arg("-stderr")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        command
    }

    /// Spawn Pd, then wait out the startup delay so the receiver patch is
    /// listening before the first connection attempt.
    pub async fn launch(&self) -> Result<Child> {
        if !self.receiver_patch.is_file() {
            return Err(Error::new(ErrorKind::FileNotFound, "receiver patch not found")
                .with_operation("launcher::launch")
                .with_context("path", self.receiver_patch.display().to_string()));
        }

        let child = self.command().spawn().map_err(|e| {
            Error::from(e)
                .with_operation("launcher::spawn")
                .with_context("program", self.program.display().to_string())
        })?;
        info!(
            program = %self.program.display(),
            patch = %self.receiver_patch.display(),
            pid = child.id(),
            "started pd"
        );

        tokio::time::sleep(self.startup_delay).await;
        Ok(child)
    }
}
