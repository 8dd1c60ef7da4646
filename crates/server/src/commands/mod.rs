//! CLI command handlers for the zkmcp application.

mod approvals;
mod bridge;
mod inspect;

pub(crate) use approvals::handle_approvals_command;
pub(crate) use bridge::handle_bridge_command;
pub(crate) use inspect::{
    handle_convert_command, handle_parse_path_command, handle_schema_command,
};

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::bridge::Bridge;
use crate::catalog::{build_sources, load_catalogs};
use crate::config::Settings;
use crate::registry::InMemoryToolRegistry;

/// Builds a bridge over the configured catalogs, publishing in memory.
pub(crate) fn build_bridge(settings: &Settings) -> Result<(Bridge, Arc<InMemoryToolRegistry>)> {
    let catalog = load_catalogs(&settings.catalogs)?;
    let (sources, _) = build_sources(&catalog, &settings.entities);
    let registry = Arc::new(InMemoryToolRegistry::new());
    let bridge = Bridge::new(registry.clone(), sources, settings.options);
    Ok((bridge, registry))
}

/// Approval file from settings, falling back to `~/.zkmcp/approvals.json`.
pub(crate) fn approvals_path(settings: &Settings) -> Result<PathBuf> {
    match &settings.approvals_file {
        Some(path) => Ok(path.clone()),
        None => zkmcp_state::approvals_file(),
    }
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
