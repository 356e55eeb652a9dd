//! websockify bridge process lifecycle
//!
//! The bridge child serves the noVNC static files over HTTP on a local port
//! and relays WebSocket connections on that same port to the remote VNC
//! endpoint over TCP. Readiness is not signaled by the child; callers poll
//! the port (see [`crate::port::wait_for_port`]) before treating it as up.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Grace period between the stop request and force kill.
const STOP_GRACE: Duration = Duration::from_secs(5);

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Launch parameters for the websockify child.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Directory served as static HTTP content (the extracted noVNC bundle).
    pub web_root: PathBuf,
    /// Local port for both the HTTP UI and the WebSocket proxy.
    pub local_port: u16,
    /// Remote VNC server address.
    pub remote_host: String,
    /// Remote VNC server port.
    pub remote_port: u16,
    /// Inherit the child's stdout/stderr instead of discarding them.
    pub verbose: bool,
}

/// Handle to a running websockify process.
///
/// A session owns at most one of these. [`BridgeProcess::stop`] is
/// idempotent: stopping an already-exited child is a no-op.
#[derive(Debug)]
pub struct BridgeProcess {
    child: Child,
}

impl BridgeProcess {
    /// Locate websockify on `PATH` and spawn it for `config`.
    pub fn launch(config: &BridgeConfig) -> Result<Self> {
        let exe = which::which("websockify").map_err(|_| {
            Error::Launch(
                "websockify not found in PATH (install it with `pip install websockify`)"
                    .to_string(),
            )
        })?;

        let target = format!("{}:{}", config.remote_host, config.remote_port);
        debug!(
            exe = %exe.display(),
            web = %config.web_root.display(),
            port = config.local_port,
            %target,
            "spawning websockify"
        );

        let mut cmd = Command::new(exe);
        cmd.arg("--web")
            .arg(&config.web_root)
            .arg(config.local_port.to_string())
            .arg(target);
        if config.verbose {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        // The child goes into its own process group so a terminal Ctrl+C is
        // delivered to the launcher alone; shutdown is sequenced from there
        // rather than raced.
        #[cfg(unix)]
        cmd.process_group(0);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);

        Self::spawn(cmd)
    }

    /// Spawn an already-configured command under bridge supervision.
    ///
    /// [`BridgeProcess::launch`] is the normal entry point; this seam also
    /// lets tests supervise a stand-in child.
    pub fn spawn(mut cmd: Command) -> Result<Self> {
        let child = cmd
            .spawn()
            .map_err(|e| Error::Launch(format!("failed to spawn bridge process: {e}")))?;
        Ok(Self { child })
    }

    /// OS process id, while the child is running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Exit status if the child has already terminated.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Two-phase shutdown: request termination, wait up to the grace period,
    /// force-kill on deadline exceeded.
    pub async fn stop(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(%status, "bridge already exited");
                return;
            }
            Ok(None) => {}
            Err(err) => {
                warn!(%err, "could not poll bridge before stopping it");
                return;
            }
        }

        self.request_termination();
        match time::timeout(STOP_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "bridge exited after stop request"),
            Ok(Err(err)) => warn!(%err, "failed waiting for bridge exit"),
            Err(_) => {
                warn!(
                    grace_secs = STOP_GRACE.as_secs(),
                    "bridge ignored the stop request, killing it"
                );
                if let Err(err) = self.child.kill().await {
                    warn!(%err, "failed to kill bridge");
                }
            }
        }
    }

    #[cfg(unix)]
    fn request_termination(&mut self) {
        // SIGINT, matching what websockify expects from a terminal.
        if let Some(pid) = self.child.id() {
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGINT);
            }
        }
    }

    #[cfg(windows)]
    fn request_termination(&mut self) {
        // No cross-process-group Ctrl+C worth relying on; go straight to kill.
        if let Err(err) = self.child.start_kill() {
            warn!(%err, "failed to terminate bridge");
        }
    }
}
