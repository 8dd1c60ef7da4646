//! Handler for the `approvals` command family.
//!
//! Every invocation loads the snapshot, applies one action, and writes the
//! snapshot back when the action changed it. A running `bridge` picks the
//! change up on its next reconcile tick.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use zkmcp_discovery::{ApprovalStatus, ServiceKey};
use zkmcp_state::{
    load_gate, save_gate, ApprovalGate, ApprovalLogEntry, ApprovalRecord, ApprovalRequest,
};

use super::print_json;
use crate::cli::{ApprovalCommands, OutputFormat};

/// Result of one approvals action.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum ApprovalOutput {
    Records(Vec<ApprovalRecord>),
    Record(ApprovalRecord),
    History(Vec<ApprovalLogEntry>),
    Status {
        service: String,
        status: Option<ApprovalStatus>,
    },
}

fn parse_service(raw: &str) -> Result<ServiceKey> {
    ServiceKey::parse(raw).ok_or_else(|| anyhow!("invalid service key: {raw:?}"))
}

/// Applies one action to the gate. Returns the output and whether the gate
/// changed.
pub(crate) fn execute(
    gate: &ApprovalGate,
    command: &ApprovalCommands,
) -> Result<(ApprovalOutput, bool)> {
    let output = match command {
        ApprovalCommands::List { pending, .. } => {
            let records = if *pending { gate.pending() } else { gate.list() };
            return Ok((ApprovalOutput::Records(records), false));
        }
        ApprovalCommands::History { id, .. } => {
            if gate.get(*id).is_none() {
                return Err(zkmcp_state::ApprovalError::NotFound(*id).into());
            }
            return Ok((ApprovalOutput::History(gate.history(*id)), false));
        }
        ApprovalCommands::Status { service } => {
            let key = parse_service(service)?;
            return Ok((
                ApprovalOutput::Status {
                    service: key.to_string(),
                    status: gate.status_of(&key),
                },
                false,
            ));
        }
        ApprovalCommands::Create {
            service,
            project,
            applicant,
            reason,
        } => gate.create(ApprovalRequest {
            subject: parse_service(service)?,
            project_id: project.clone(),
            applicant: applicant.clone(),
            reason: reason.clone(),
        })?,
        ApprovalCommands::Approve(d) => gate.approve(d.id, &d.operator, d.comment.as_deref())?,
        ApprovalCommands::Reject(d) => gate.reject(d.id, &d.operator, d.comment.as_deref())?,
        ApprovalCommands::Cancel(d) => gate.cancel(d.id, &d.operator, d.comment.as_deref())?,
        ApprovalCommands::Resubmit {
            id,
            operator,
            reason,
        } => gate.resubmit(*id, operator, reason.as_deref())?,
    };
    info!(
        target: "zkmcp::approvals",
        id = output.id,
        service = %output.subject,
        status = %output.status,
        "approval updated"
    );
    Ok((ApprovalOutput::Record(output), true))
}

fn format_of(command: &ApprovalCommands) -> OutputFormat {
    match command {
        ApprovalCommands::List { format, .. } | ApprovalCommands::History { format, .. } => *format,
        _ => OutputFormat::Json,
    }
}

fn print_text(output: &ApprovalOutput) {
    match output {
        ApprovalOutput::Records(records) => {
            if records.is_empty() {
                println!("No approval requests.");
            }
            for r in records {
                println!(
                    "{:>4}  {:<9}  {}  {}",
                    r.id,
                    r.status.label(),
                    r.subject,
                    r.applicant.as_deref().unwrap_or("-")
                );
            }
        }
        ApprovalOutput::History(entries) => {
            for e in entries {
                let from = e.old_status.map(|s| s.label()).unwrap_or("-");
                println!(
                    "{:>4}  {}  {} -> {}  by {}{}",
                    e.seq,
                    e.at,
                    from,
                    e.new_status.label(),
                    e.operator.as_deref().unwrap_or("-"),
                    e.comment
                        .as_deref()
                        .map(|c| format!(": {c}"))
                        .unwrap_or_default()
                );
            }
        }
        ApprovalOutput::Record(_) | ApprovalOutput::Status { .. } => {}
    }
}

/// Handle the `approvals` command.
pub(crate) fn handle_approvals_command(path: &Path, command: &ApprovalCommands) -> Result<()> {
    let gate = load_gate(path)?;
    let (output, changed) = execute(&gate, command)?;
    if changed {
        save_gate(path, &gate)?;
    }
    match (format_of(command), &output) {
        (OutputFormat::Text, ApprovalOutput::Records(_) | ApprovalOutput::History(_)) => {
            print_text(&output);
            Ok(())
        }
        _ => print_json(&output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Decision;
    use zkmcp_test_utils::TestFixture;

    fn create(service: &str) -> ApprovalCommands {
        ApprovalCommands::Create {
            service: service.into(),
            project: Some("crm".into()),
            applicant: Some("dana".into()),
            reason: None,
        }
    }

    fn decision(id: u64) -> Decision {
        Decision {
            id,
            operator: "ops".into(),
            comment: Some("fine".into()),
        }
    }

    #[test]
    fn actions_persist_between_invocations() {
        let fixture = TestFixture::new().unwrap();
        let path = fixture.home_path().join(".zkmcp").join("approvals.json");

        handle_approvals_command(&path, &create("com.acme.UserService:1.0.0")).unwrap();
        handle_approvals_command(&path, &ApprovalCommands::Approve(decision(1))).unwrap();

        let gate = load_gate(&path).unwrap();
        let key = ServiceKey::new("com.acme.UserService").with_version("1.0.0");
        assert!(gate.is_approved(&key));
        assert_eq!(gate.history(1).len(), 2);
    }

    #[test]
    fn read_only_actions_do_not_write() {
        let fixture = TestFixture::new().unwrap();
        let path = fixture.home_path().join("approvals.json");
        let list = ApprovalCommands::List {
            pending: false,
            format: OutputFormat::Json,
        };
        handle_approvals_command(&path, &list).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn invalid_transitions_surface_as_errors() {
        let gate = ApprovalGate::new();
        execute(&gate, &create("a.S")).unwrap();
        execute(&gate, &ApprovalCommands::Reject(decision(1))).unwrap();
        let err = execute(&gate, &ApprovalCommands::Approve(decision(1))).unwrap_err();
        assert!(err.to_string().contains("REJECTED"));
        assert!(execute(&gate, &ApprovalCommands::Cancel(decision(9))).is_err());
    }

    #[test]
    fn status_reports_latest_request() {
        let gate = ApprovalGate::new();
        execute(&gate, &create("a.S:2.0")).unwrap();
        let (output, changed) = execute(
            &gate,
            &ApprovalCommands::Status {
                service: "a.S:2.0:default".into(),
            },
        )
        .unwrap();
        assert!(!changed);
        let ApprovalOutput::Status { status, .. } = output else {
            panic!("expected status");
        };
        assert_eq!(status, Some(ApprovalStatus::Pending));
    }

    #[test]
    fn blank_service_key_is_rejected() {
        let gate = ApprovalGate::new();
        assert!(execute(&gate, &create("  ")).is_err());
    }
}
