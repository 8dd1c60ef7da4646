//! Approval gate deciding whether a discovered service may expose tools.
//!
//! Transitions:
//!
//! ```text
//! (none) --create--> PENDING --approve--> APPROVED --resubmit--> PENDING
//!                       |    --reject---> REJECTED --resubmit--> PENDING
//!                       +----cancel----> CANCELLED (terminal)
//! ```
//!
//! Every transition appends one immutable [`ApprovalLogEntry`].

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use zkmcp_discovery::{ApprovalStatus, ServiceKey};

/// Result type for approval operations.
pub type Result<T> = std::result::Result<T, ApprovalError>;

/// Errors returned by the approval gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ApprovalError {
    /// No approval record has this id.
    #[error("approval {0} not found")]
    NotFound(u64),
    /// The record is not in a state that allows the requested action.
    #[error("cannot {action} approval {id}: current status is {current}")]
    InvalidState {
        /// Record id.
        id: u64,
        /// Status at the time of the call.
        current: ApprovalStatus,
        /// Attempted action.
        action: &'static str,
    },
}

/// A request to expose a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Service to approve.
    pub subject: ServiceKey,
    /// Project the service will be exposed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Who asked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant: Option<String>,
    /// Free-form justification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ApprovalRequest {
    /// Creates a request for a service with no applicant details.
    pub fn new(subject: ServiceKey) -> Self {
        Self {
            subject,
            project_id: None,
            applicant: None,
            reason: None,
        }
    }
}

/// Current state of one approval request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Monotonic id.
    pub id: u64,
    /// Service under review.
    pub subject: ServiceKey,
    /// Current status.
    pub status: ApprovalStatus,
    /// Project the service will be exposed to.
    pub project_id: Option<String>,
    /// Who asked.
    pub applicant: Option<String>,
    /// Justification given at creation or resubmission.
    pub reason: Option<String>,
    /// Who made the last decision.
    pub approver: Option<String>,
    /// Comment attached to the last transition.
    pub comment: Option<String>,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last transition time.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Time of the last approve or reject.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub decided_at: Option<OffsetDateTime>,
}

/// One audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLogEntry {
    /// Position in the log.
    pub seq: u64,
    /// Record the transition applied to.
    pub approval_id: u64,
    /// Service under review.
    pub subject: ServiceKey,
    /// Status before the transition; `None` for creation.
    pub old_status: Option<ApprovalStatus>,
    /// Status after the transition.
    pub new_status: ApprovalStatus,
    /// Who performed the transition.
    pub operator: Option<String>,
    /// Comment supplied with the transition.
    pub comment: Option<String>,
    /// When it happened.
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// Serializable gate contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSnapshot {
    /// Records ordered by id.
    pub records: Vec<ApprovalRecord>,
    /// Full audit log in append order.
    pub log: Vec<ApprovalLogEntry>,
}

#[derive(Debug, Default)]
struct GateState {
    records: BTreeMap<u64, ApprovalRecord>,
    // Latest record per subject.
    by_subject: HashMap<ServiceKey, u64>,
    log: Vec<ApprovalLogEntry>,
    next_id: u64,
}

impl GateState {
    fn from_snapshot(snapshot: ApprovalSnapshot) -> Self {
        let mut state = GateState::default();
        for record in snapshot.records {
            state.next_id = state.next_id.max(record.id);
            let latest = state.by_subject.entry(record.subject.clone()).or_insert(record.id);
            if record.id > *latest {
                *latest = record.id;
            }
            state.records.insert(record.id, record);
        }
        state.log = snapshot.log;
        state
    }

    fn append(
        &mut self,
        id: u64,
        old_status: Option<ApprovalStatus>,
        operator: Option<&str>,
        comment: Option<&str>,
    ) {
        let Some(record) = self.records.get(&id) else {
            return;
        };
        let entry = ApprovalLogEntry {
            seq: self.log.len() as u64 + 1,
            approval_id: id,
            subject: record.subject.clone(),
            old_status,
            new_status: record.status,
            operator: operator.map(str::to_string),
            comment: comment.map(str::to_string),
            at: record.updated_at,
        };
        self.log.push(entry);
    }

    fn transition(
        &mut self,
        id: u64,
        allowed: &[ApprovalStatus],
        next: ApprovalStatus,
        action: &'static str,
        operator: Option<&str>,
        comment: Option<&str>,
    ) -> Result<ApprovalRecord> {
        let record = self.records.get_mut(&id).ok_or(ApprovalError::NotFound(id))?;
        let current = record.status;
        if !allowed.contains(&current) {
            return Err(ApprovalError::InvalidState {
                id,
                current,
                action,
            });
        }
        let now = OffsetDateTime::now_utc();
        record.status = next;
        record.updated_at = now;
        record.comment = comment.map(str::to_string);
        if matches!(next, ApprovalStatus::Approved | ApprovalStatus::Rejected) {
            record.approver = operator.map(str::to_string);
            record.decided_at = Some(now);
        }
        let updated = record.clone();
        self.append(id, Some(current), operator, comment);
        info!(
            target: "zkmcp::approval",
            id,
            service = %updated.subject,
            from = %current,
            to = %next,
            "approval transition"
        );
        Ok(updated)
    }
}

/// Thread-safe approval state machine with an append-only audit log.
#[derive(Debug, Default)]
pub struct ApprovalGate {
    state: RwLock<GateState>,
}

impl ApprovalGate {
    /// Creates an empty gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a gate from a snapshot.
    pub fn from_snapshot(snapshot: ApprovalSnapshot) -> Self {
        Self {
            state: RwLock::new(GateState::from_snapshot(snapshot)),
        }
    }

    /// Replaces the gate contents with a snapshot, e.g. one written by
    /// another process.
    pub fn restore(&self, snapshot: ApprovalSnapshot) {
        *self.state.write() = GateState::from_snapshot(snapshot);
    }

    /// Copies the gate contents for persistence.
    pub fn snapshot(&self) -> ApprovalSnapshot {
        let state = self.state.read();
        ApprovalSnapshot {
            records: state.records.values().cloned().collect(),
            log: state.log.clone(),
        }
    }

    /// Opens a request for a service.
    ///
    /// A subject whose latest request is approved or rejected is resubmitted
    /// instead; a pending subject is an invalid-state error; a cancelled or
    /// unknown subject gets a fresh record.
    pub fn create(&self, request: ApprovalRequest) -> Result<ApprovalRecord> {
        let mut state = self.state.write();
        if let Some(&latest) = state.by_subject.get(&request.subject) {
            let current = state.records.get(&latest).map(|r| r.status);
            match current {
                Some(ApprovalStatus::Pending) => {
                    return Err(ApprovalError::InvalidState {
                        id: latest,
                        current: ApprovalStatus::Pending,
                        action: "create",
                    })
                }
                Some(ApprovalStatus::Approved | ApprovalStatus::Rejected) => {
                    if let Some(record) = state.records.get_mut(&latest) {
                        record.reason = request.reason.clone();
                        if request.applicant.is_some() {
                            record.applicant = request.applicant.clone();
                        }
                    }
                    return state.transition(
                        latest,
                        &[ApprovalStatus::Approved, ApprovalStatus::Rejected],
                        ApprovalStatus::Pending,
                        "resubmit",
                        request.applicant.as_deref(),
                        request.reason.as_deref(),
                    );
                }
                Some(ApprovalStatus::Cancelled) | None => {}
            }
        }

        state.next_id += 1;
        let id = state.next_id;
        let now = OffsetDateTime::now_utc();
        let record = ApprovalRecord {
            id,
            subject: request.subject.clone(),
            status: ApprovalStatus::Pending,
            project_id: request.project_id,
            applicant: request.applicant,
            reason: request.reason,
            approver: None,
            comment: None,
            created_at: now,
            updated_at: now,
            decided_at: None,
        };
        state.records.insert(id, record.clone());
        state.by_subject.insert(request.subject, id);
        let applicant = record.applicant.clone();
        let reason = record.reason.clone();
        state.append(id, None, applicant.as_deref(), reason.as_deref());
        info!(target: "zkmcp::approval", id, service = %record.subject, "approval requested");
        Ok(record)
    }

    /// Moves an approved or rejected record back to pending.
    pub fn resubmit(&self, id: u64, operator: &str, reason: Option<&str>) -> Result<ApprovalRecord> {
        let mut state = self.state.write();
        if let Some(record) = state.records.get_mut(&id) {
            if matches!(
                record.status,
                ApprovalStatus::Approved | ApprovalStatus::Rejected
            ) {
                record.reason = reason.map(str::to_string);
            }
        }
        state.transition(
            id,
            &[ApprovalStatus::Approved, ApprovalStatus::Rejected],
            ApprovalStatus::Pending,
            "resubmit",
            Some(operator),
            reason,
        )
    }

    /// Approves a pending record.
    pub fn approve(&self, id: u64, approver: &str, comment: Option<&str>) -> Result<ApprovalRecord> {
        self.state.write().transition(
            id,
            &[ApprovalStatus::Pending],
            ApprovalStatus::Approved,
            "approve",
            Some(approver),
            comment,
        )
    }

    /// Rejects a pending record.
    pub fn reject(&self, id: u64, approver: &str, comment: Option<&str>) -> Result<ApprovalRecord> {
        self.state.write().transition(
            id,
            &[ApprovalStatus::Pending],
            ApprovalStatus::Rejected,
            "reject",
            Some(approver),
            comment,
        )
    }

    /// Cancels a pending record. Cancelled records are terminal.
    pub fn cancel(&self, id: u64, operator: &str, comment: Option<&str>) -> Result<ApprovalRecord> {
        self.state.write().transition(
            id,
            &[ApprovalStatus::Pending],
            ApprovalStatus::Cancelled,
            "cancel",
            Some(operator),
            comment,
        )
    }

    /// Whether the latest request for a service is approved.
    pub fn is_approved(&self, subject: &ServiceKey) -> bool {
        self.status_of(subject) == Some(ApprovalStatus::Approved)
    }

    /// Status of the latest request for a service.
    pub fn status_of(&self, subject: &ServiceKey) -> Option<ApprovalStatus> {
        let state = self.state.read();
        state
            .by_subject
            .get(subject)
            .and_then(|id| state.records.get(id))
            .map(|r| r.status)
    }

    /// Looks up a record by id.
    pub fn get(&self, id: u64) -> Option<ApprovalRecord> {
        self.state.read().records.get(&id).cloned()
    }

    /// Latest record for a service.
    pub fn by_subject(&self, subject: &ServiceKey) -> Option<ApprovalRecord> {
        let state = self.state.read();
        state
            .by_subject
            .get(subject)
            .and_then(|id| state.records.get(id))
            .cloned()
    }

    /// All records ordered by id.
    pub fn list(&self) -> Vec<ApprovalRecord> {
        self.state.read().records.values().cloned().collect()
    }

    /// Records awaiting a decision.
    pub fn pending(&self) -> Vec<ApprovalRecord> {
        self.state
            .read()
            .records
            .values()
            .filter(|r| r.status == ApprovalStatus::Pending)
            .cloned()
            .collect()
    }

    /// Audit entries for one record, oldest first.
    pub fn history(&self, id: u64) -> Vec<ApprovalLogEntry> {
        self.state
            .read()
            .log
            .iter()
            .filter(|e| e.approval_id == id)
            .cloned()
            .collect()
    }

    /// The whole audit log.
    pub fn log(&self) -> Vec<ApprovalLogEntry> {
        self.state.read().log.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ServiceKey {
        ServiceKey::new(format!("com.example.{name}")).with_version("1.0.0")
    }

    fn pending(gate: &ApprovalGate, name: &str) -> u64 {
        gate.create(ApprovalRequest::new(key(name))).unwrap().id
    }

    #[test]
    fn create_starts_pending_and_logs_creation() {
        let gate = ApprovalGate::new();
        let id = pending(&gate, "UserService");
        assert_eq!(gate.get(id).unwrap().status, ApprovalStatus::Pending);
        let history = gate.history(id);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].old_status, None);
        assert_eq!(history[0].new_status, ApprovalStatus::Pending);
    }

    #[test]
    fn approve_from_pending_appends_one_entry() {
        let gate = ApprovalGate::new();
        let id = pending(&gate, "UserService");
        let record = gate.approve(id, "alice", Some("ok")).unwrap();
        assert_eq!(record.status, ApprovalStatus::Approved);
        assert_eq!(record.approver.as_deref(), Some("alice"));
        assert!(record.decided_at.is_some());
        assert!(gate.is_approved(&key("UserService")));

        let history = gate.history(id);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].old_status, Some(ApprovalStatus::Pending));
        assert_eq!(history[1].new_status, ApprovalStatus::Approved);
        assert_eq!(history[1].operator.as_deref(), Some("alice"));
    }

    #[test]
    fn decisions_only_from_pending() {
        let gate = ApprovalGate::new();
        let approved = pending(&gate, "A");
        gate.approve(approved, "bob", None).unwrap();
        let rejected = pending(&gate, "B");
        gate.reject(rejected, "bob", None).unwrap();
        let cancelled = pending(&gate, "C");
        gate.cancel(cancelled, "bob", None).unwrap();

        for id in [approved, rejected, cancelled] {
            let before = gate.log().len();
            let err = gate.approve(id, "bob", None).unwrap_err();
            assert!(matches!(err, ApprovalError::InvalidState { action: "approve", .. }));
            let err = gate.reject(id, "bob", None).unwrap_err();
            assert!(matches!(err, ApprovalError::InvalidState { action: "reject", .. }));
            assert_eq!(gate.log().len(), before, "failed transitions must not log");
        }
    }

    #[test]
    fn unknown_id_is_not_found() {
        let gate = ApprovalGate::new();
        assert_eq!(gate.approve(42, "x", None), Err(ApprovalError::NotFound(42)));
        assert_eq!(gate.cancel(42, "x", None), Err(ApprovalError::NotFound(42)));
    }

    #[test]
    fn create_on_pending_subject_fails() {
        let gate = ApprovalGate::new();
        let id = pending(&gate, "A");
        let err = gate.create(ApprovalRequest::new(key("A"))).unwrap_err();
        assert_eq!(
            err,
            ApprovalError::InvalidState {
                id,
                current: ApprovalStatus::Pending,
                action: "create"
            }
        );
    }

    #[test]
    fn create_on_decided_subject_resubmits_same_record() {
        let gate = ApprovalGate::new();
        let id = pending(&gate, "A");
        gate.reject(id, "carol", Some("missing docs")).unwrap();
        let again = gate.create(ApprovalRequest::new(key("A"))).unwrap();
        assert_eq!(again.id, id);
        assert_eq!(again.status, ApprovalStatus::Pending);
        assert_eq!(
            gate.history(id).last().unwrap().old_status,
            Some(ApprovalStatus::Rejected)
        );
    }

    #[test]
    fn cancelled_is_terminal_and_create_opens_new_record() {
        let gate = ApprovalGate::new();
        let id = pending(&gate, "A");
        gate.cancel(id, "dave", None).unwrap();
        assert!(gate.resubmit(id, "dave", None).is_err());
        let fresh = pending(&gate, "A");
        assert_ne!(fresh, id);
        assert_eq!(gate.by_subject(&key("A")).unwrap().id, fresh);
    }

    #[test]
    fn resubmit_revokes_approval() {
        let gate = ApprovalGate::new();
        let id = pending(&gate, "A");
        gate.approve(id, "erin", None).unwrap();
        gate.resubmit(id, "erin", Some("new version")).unwrap();
        assert!(!gate.is_approved(&key("A")));
        assert_eq!(gate.pending().len(), 1);
    }

    #[test]
    fn snapshot_restores_records_and_ids() {
        let gate = ApprovalGate::new();
        let a = pending(&gate, "A");
        gate.approve(a, "frank", None).unwrap();
        pending(&gate, "B");

        let restored = ApprovalGate::from_snapshot(gate.snapshot());
        assert!(restored.is_approved(&key("A")));
        assert_eq!(restored.log().len(), 3);
        let c = pending(&restored, "C");
        assert_eq!(c, 3);
    }

    #[test]
    fn restore_replaces_existing_state() {
        let source = ApprovalGate::new();
        let a = pending(&source, "A");
        source.approve(a, "grace", None).unwrap();

        let gate = ApprovalGate::new();
        pending(&gate, "Z");
        gate.restore(source.snapshot());
        assert!(gate.is_approved(&key("A")));
        assert!(gate.by_subject(&key("Z")).is_none());
        assert_eq!(gate.list().len(), 1);
    }
}
