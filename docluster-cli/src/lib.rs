//! Support library for the docluster CLI binary.
//!
//! Exposes the command layer, logging setup and the HTML viewer so tests can
//! exercise them without spawning a process.

pub mod cli;
pub mod logging;
pub mod viewer;
