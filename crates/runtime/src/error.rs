use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Download failure, non-success HTTP status, unparseable archive, or a
    /// bundle missing its marker file after extraction.
    #[error("asset provisioning failed: {0}")]
    Provisioning(String),

    #[error("no free loopback port in {start}..{end}")]
    PortExhausted { start: u16, end: u16 },

    #[error("bridge launch failed: {0}")]
    Launch(String),

    #[error("bridge not reachable on 127.0.0.1:{port} within {}s", .timeout.as_secs())]
    ReadinessTimeout { port: u16, timeout: Duration },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
