use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::approval::{ApprovalGate, ApprovalSnapshot};

/// Loads an approval snapshot; a missing file yields an empty snapshot.
pub fn load_snapshot(path: &Path) -> Result<ApprovalSnapshot> {
    if !path.exists() {
        return Ok(ApprovalSnapshot::default());
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read approvals from {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("failed to parse approvals in {}", path.display()))
}

/// Writes a snapshot atomically (temp file then rename).
pub fn save_snapshot(path: &Path, snapshot: &ApprovalSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create dir {}", parent.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(snapshot)?)
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move {} into place", tmp.display()))?;
    Ok(())
}

/// Restores a gate from disk.
pub fn load_gate(path: &Path) -> Result<ApprovalGate> {
    Ok(ApprovalGate::from_snapshot(load_snapshot(path)?))
}

/// Persists a gate to disk.
pub fn save_gate(path: &Path, gate: &ApprovalGate) -> Result<()> {
    save_snapshot(path, &gate.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovalRequest;
    use tempfile::tempdir;
    use zkmcp_discovery::ServiceKey;

    #[test]
    fn missing_file_is_empty_snapshot() {
        let tmp = tempdir().unwrap();
        let snap = load_snapshot(&tmp.path().join("nope.json")).unwrap();
        assert!(snap.records.is_empty());
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested/approvals.json");
        let gate = ApprovalGate::new();
        gate.create(ApprovalRequest::new(ServiceKey::new("a.B")))
            .unwrap();
        save_gate(&path, &gate).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_reports_path() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("approvals.json");
        fs::write(&path, "{not json").unwrap();
        let err = load_snapshot(&path).unwrap_err();
        assert!(format!("{err:#}").contains("approvals.json"));
    }
}
