//! Session orchestration
//!
//! Linear state machine over the runtime pieces: provision assets, allocate
//! a port, launch the bridge, await readiness, open the browser, then
//! supervise the child until it exits or the user interrupts. Cleanup runs
//! exactly once on every path: [`run`] races Ctrl+C against the whole drive
//! sequence in a single select and follows it with one unconditional
//! shutdown step.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};
use webvnc_runtime::bridge::{BridgeConfig, BridgeProcess};
use webvnc_runtime::{Error, assets, port, url};

use crate::cli::Cli;

/// Exit code when asset provisioning fails.
pub const EXIT_PROVISIONING: i32 = 2;
/// Exit code when the bridge never opens its port.
pub const EXIT_NOT_READY: i32 = 3;

const READY_TIMEOUT: Duration = Duration::from_secs(8);
const LIVENESS_INTERVAL: Duration = Duration::from_millis(500);

/// Drive a whole viewing session and return the process exit code.
pub async fn run(cli: Cli) -> i32 {
    let mut session = Session { cli, bridge: None };

    let code = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("\nClosing...");
            0
        }
        code = session.drive() => code,
    };

    session.shutdown().await;
    code
}

struct Session {
    cli: Cli,
    /// The one bridge process this session may own.
    bridge: Option<BridgeProcess>,
}

impl Session {
    async fn drive(&mut self) -> i32 {
        let cache_root = assets::default_cache_root();
        let web_root = match assets::ensure_bundle(&cache_root, assets::NOVNC_VERSION).await {
            Ok(dir) => dir,
            Err(err) => {
                error!(%err, "failed to prepare the noVNC assets");
                return EXIT_PROVISIONING;
            }
        };

        let local_port = if self.cli.local_port != 0 {
            self.cli.local_port
        } else {
            match port::find_free_port(port::DEFAULT_PORT_RANGE) {
                Ok(p) => p,
                Err(err) => {
                    error!(%err, "could not allocate a local port");
                    return 1;
                }
            }
        };
        info!(local_port, "serving the noVNC UI and WebSocket proxy");

        let config = BridgeConfig {
            web_root,
            local_port,
            remote_host: self.cli.host.clone(),
            remote_port: self.cli.port,
            verbose: self.cli.verbose,
        };
        let bridge = match BridgeProcess::launch(&config) {
            Ok(bridge) => bridge,
            Err(err) => {
                error!(%err, "failed to launch websockify");
                return 1;
            }
        };
        let bridge = self.bridge.insert(bridge);
        info!(pid = bridge.id(), "websockify started");

        attend(
            bridge,
            local_port,
            self.cli.password.as_deref(),
            self.cli.no_open,
            READY_TIMEOUT,
        )
        .await
    }

    /// Unconditional cleanup step. A no-op when no bridge was ever launched
    /// or it already exited; [`BridgeProcess::stop`] is idempotent.
    async fn shutdown(&mut self) {
        if let Some(bridge) = self.bridge.as_mut() {
            bridge.stop().await;
        }
    }
}

/// Post-launch phases: await readiness, print and open the client URL, then
/// supervise the child. Returns the session exit code; the caller performs
/// the shutdown.
async fn attend(
    bridge: &mut BridgeProcess,
    local_port: u16,
    password: Option<&str>,
    no_open: bool,
    ready_timeout: Duration,
) -> i32 {
    if !port::wait_for_port(local_port, ready_timeout).await {
        let err = Error::ReadinessTimeout {
            port: local_port,
            timeout: ready_timeout,
        };
        error!(%err, "websockify did not come up in time");
        return EXIT_NOT_READY;
    }

    let client_url = url::build_client_url(local_port, password, &[]);
    println!("Connection URL: {client_url}");
    if no_open {
        info!("browser launch suppressed");
    } else if let Err(err) = open::that(&client_url) {
        warn!(%err, "could not open the browser");
    } else {
        println!("Opening the browser...");
    }

    println!("Press Ctrl+C to finish; the proxy and UI stay up until then.");
    supervise(bridge).await
}

/// Poll the bridge until it exits on its own; map its status to an exit
/// code. A non-zero child code becomes the session's own exit code; exit by
/// signal counts as clean.
async fn supervise(bridge: &mut BridgeProcess) -> i32 {
    let mut ticker = time::interval(LIVENESS_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match bridge.try_wait() {
            Ok(Some(status)) => {
                return match status.code() {
                    Some(0) | None => 0,
                    Some(code) => {
                        error!(code, "websockify exited with an error");
                        code
                    }
                };
            }
            Ok(None) => {}
            Err(err) => {
                warn!(%err, "could not poll websockify");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, TcpListener};
    use std::process::Stdio;
    use tokio::process::Command;

    fn shell(script: &str) -> BridgeProcess {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script])
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        BridgeProcess::spawn(cmd).unwrap()
    }

    #[tokio::test]
    async fn readiness_timeout_exits_3_without_reaching_the_browser() {
        // A port nobody listens on: bind, read the number, release.
        let dead_port = {
            let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut bridge = shell("sleep 30");

        let code = attend(
            &mut bridge,
            dead_port,
            None,
            true,
            Duration::from_millis(300),
        )
        .await;
        assert_eq!(code, EXIT_NOT_READY);
        // The child is still up; the caller's shutdown step stops it.
        assert!(bridge.try_wait().unwrap().is_none());

        bridge.stop().await;
        assert!(bridge.try_wait().unwrap().is_some());
    }

    #[tokio::test]
    async fn child_exit_code_is_propagated() {
        // Stand in for a ready bridge with a plain listener.
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let local_port = listener.local_addr().unwrap().port();
        let mut bridge = shell("exit 7");

        let code = attend(
            &mut bridge,
            local_port,
            None,
            true,
            Duration::from_secs(2),
        )
        .await;
        assert_eq!(code, 7);

        // Stopping an already-exited child stays a no-op.
        bridge.stop().await;
        bridge.stop().await;
    }

    #[tokio::test]
    async fn clean_child_exit_maps_to_zero() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let local_port = listener.local_addr().unwrap().port();
        let mut bridge = shell("exit 0");

        let code = attend(
            &mut bridge,
            local_port,
            None,
            true,
            Duration::from_secs(2),
        )
        .await;
        assert_eq!(code, 0);
    }
}
