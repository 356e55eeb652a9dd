//! Command-line front end for the webvnc launcher.

pub mod cli;
pub mod logging;
pub mod session;
