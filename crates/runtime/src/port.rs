//! Loopback port allocation and readiness probing.

use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::ops::Range;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{self, Instant};

use crate::error::{Error, Result};

/// Range scanned for a free bridge port, inclusive-exclusive.
pub const DEFAULT_PORT_RANGE: Range<u16> = 6080..65000;

const PROBE_INTERVAL: Duration = Duration::from_millis(200);
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// First port in `range` that can be bound on loopback.
///
/// The probe listener is released before returning, so another process can
/// claim the port before the bridge binds it. That race is accepted: the
/// bridge fails to bind and the readiness probe reports it.
pub fn find_free_port(range: Range<u16>) -> Result<u16> {
    let (start, end) = (range.start, range.end);
    for port in range {
        if TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok() {
            return Ok(port);
        }
    }
    Err(Error::PortExhausted { start, end })
}

/// Poll loopback `port` until it accepts a TCP connection or `timeout`
/// elapses. Returns whether the port became connectable.
pub async fn wait_for_port(port: u16, timeout: Duration) -> bool {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        match time::timeout(PROBE_TIMEOUT, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => return true,
            _ => time::sleep(PROBE_INTERVAL).await,
        }
    }
    false
}
