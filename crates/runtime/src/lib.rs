//! Runtime pieces for the webvnc launcher.
//!
//! Everything the session orchestrator composes lives here: provisioning the
//! noVNC asset bundle into the per-user cache, finding a free loopback port,
//! supervising the websockify bridge process, and building the client URL.

pub mod assets;
pub mod bridge;
pub mod error;
pub mod port;
pub mod url;

pub use error::{Error, Result};
