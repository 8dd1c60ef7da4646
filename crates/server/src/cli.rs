use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per entry.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Command-line interface for the `zkmcp` application.
#[derive(Debug, Parser)]
#[command(
    name = "zkmcp",
    about = "Publish ZooKeeper-discovered RPC services as MCP tools"
)]
pub struct Cli {
    #[command(flatten)]
    pub metadata: MetadataArgs,
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that resolves signatures.
#[derive(Debug, Clone, Default, Args)]
pub struct MetadataArgs {
    /// Metadata catalog file (repeatable; overrides `ZKMCP_CATALOGS`).
    #[arg(long = "catalog", value_name = "FILE", global = true)]
    pub catalogs: Vec<PathBuf>,
    /// Object nesting expanded into tool schemas (overrides `ZKMCP_MAX_DEPTH`).
    #[arg(long, value_name = "N", global = true)]
    pub max_depth: Option<usize>,
    /// Publish unrecognised method names with the positional `args` schema
    /// instead of as zero-argument tools.
    #[arg(long, default_value_t = false, global = true)]
    pub no_heuristic_fallback: bool,
}

/// Available `zkmcp` commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Prints the tool definition for one method, or for every method of an interface.
    Schema {
        /// Fully-qualified interface name.
        interface: String,
        /// Method name; all catalogued methods when omitted.
        method: Option<String>,
    },
    /// Converts a JSON argument object against a method's resolved signature.
    Convert {
        /// Fully-qualified interface name.
        interface: String,
        /// Method name.
        method: String,
        /// Tool call arguments as a JSON object.
        arguments: String,
    },
    /// Decodes a ZooKeeper provider node path into a provider event.
    ParsePath {
        /// Node path, e.g. `/dubbo/<iface>/providers/<encoded url>`.
        path: String,
    },
    /// Manages service approval requests.
    Approvals {
        /// Approval snapshot file (overrides `ZKMCP_APPROVALS_FILE`).
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
        #[command(subcommand)]
        command: ApprovalCommands,
    },
    /// Reads provider events from stdin and keeps published tools reconciled.
    Bridge {
        /// Approval snapshot file (overrides `ZKMCP_APPROVALS_FILE`).
        #[arg(long, value_name = "FILE")]
        approvals_file: Option<PathBuf>,
        /// Seconds between reconcile passes (overrides `ZKMCP_RECONCILE_SECS`).
        #[arg(long, value_name = "SECS")]
        reconcile_secs: Option<u64>,
    },
}

/// `zkmcp approvals` subcommands.
#[derive(Debug, Subcommand)]
pub enum ApprovalCommands {
    /// Lists approval requests.
    List {
        /// Only pending requests.
        #[arg(long, default_value_t = false)]
        pending: bool,
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Opens an approval request (or resubmits the latest decided one).
    Create {
        /// Service key: `interface[:version[:group]]`.
        service: String,
        /// Project the service will be exposed to.
        #[arg(long)]
        project: Option<String>,
        /// Who is asking.
        #[arg(long)]
        applicant: Option<String>,
        /// Justification.
        #[arg(long)]
        reason: Option<String>,
    },
    /// Approves a pending request.
    Approve(Decision),
    /// Rejects a pending request.
    Reject(Decision),
    /// Cancels a pending request.
    Cancel(Decision),
    /// Moves an approved or rejected request back to pending.
    Resubmit {
        /// Request id.
        id: u64,
        /// Operator name.
        #[arg(long = "by")]
        operator: String,
        /// Justification.
        #[arg(long)]
        reason: Option<String>,
    },
    /// Shows the audit log of one request.
    History {
        /// Request id.
        id: u64,
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Prints the current approval status of a service.
    Status {
        /// Service key: `interface[:version[:group]]`.
        service: String,
    },
}

/// Arguments of a decision on a pending request.
#[derive(Debug, Clone, Args)]
pub struct Decision {
    /// Request id.
    pub id: u64,
    /// Who decides.
    #[arg(long = "by")]
    pub operator: String,
    /// Comment recorded in the audit log.
    #[arg(long)]
    pub comment: Option<String>,
}
