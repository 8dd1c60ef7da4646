//! Entry point for the `zkmcp` binary.

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands, MetadataArgs};
use crate::commands::{
    approvals_path, handle_approvals_command, handle_bridge_command, handle_convert_command,
    handle_parse_path_command, handle_schema_command,
};
use crate::config::{apply_config_to_env, Settings};

/// Applies CLI overrides on top of environment and file settings.
pub(crate) fn settings_with_overrides(mut settings: Settings, args: &MetadataArgs) -> Settings {
    if !args.catalogs.is_empty() {
        settings.catalogs = args.catalogs.clone();
    }
    if let Some(depth) = args.max_depth {
        settings.options.schema.max_depth = depth;
    }
    if args.no_heuristic_fallback {
        settings.options.heuristics.unmatched_as_no_args = false;
    }
    settings
}

/// Parses the command line and runs the selected command.
pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let entities = apply_config_to_env()?;
    let cli = Cli::parse();
    let mut settings = settings_with_overrides(Settings::from_env(entities), &cli.metadata);

    match cli.command {
        Commands::Schema { interface, method } => {
            handle_schema_command(&settings, &interface, method.as_deref())
        }
        Commands::Convert {
            interface,
            method,
            arguments,
        } => handle_convert_command(&settings, &interface, &method, &arguments),
        Commands::ParsePath { path } => handle_parse_path_command(&path),
        Commands::Approvals { file, command } => {
            if file.is_some() {
                settings.approvals_file = file;
            }
            handle_approvals_command(&approvals_path(&settings)?, &command)
        }
        Commands::Bridge {
            approvals_file,
            reconcile_secs,
        } => {
            if approvals_file.is_some() {
                settings.approvals_file = approvals_file;
            }
            if let Some(secs) = reconcile_secs.filter(|s| *s > 0) {
                settings.reconcile_interval = std::time::Duration::from_secs(secs);
            }
            handle_bridge_command(&settings)
        }
    }
}
