//! Command-line interface for the `zkmcp` application.
//!
//! This crate serves as the main entry point for the executable, delegating
//! its core functionality to the `zkmcp-server` crate.

fn main() -> anyhow::Result<()> {
    zkmcp_server::run()
}
