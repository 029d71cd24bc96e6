//! Service implementations
//!
//! Real implementations of the command execution boundary.

pub mod executor;

#[cfg(test)]
mod tests;

pub use executor::{ensure_success, ShellExecutor, SshExecutor, SystemConnector};
