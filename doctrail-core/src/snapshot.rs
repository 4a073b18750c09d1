// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Serialized Repository State
//!
//! JSON form handed to persistence backends, and the export bundle that
//! wraps it with a format version for download/import.

use super::approval::ApprovalRequest;
use super::objects::{Change, Commit, CommitHash};
use super::refs::Branch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current export format version
pub const EXPORT_FORMAT_VERSION: &str = "1";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot has no state identifier")]
    MissingStateId,

    #[error("Unsupported export format version: {0}")]
    UnsupportedFormat(String),

    #[error("Current branch '{0}' is not in the snapshot")]
    UnknownCurrentBranch(String),

    #[error("Branch '{0}' appears more than once")]
    DuplicateBranch(String),

    #[error("Commit {0} appears more than once")]
    DuplicateCommit(CommitHash),
}

/// Session-local sets, persisted only when configured
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    pub staged: Vec<Change>,
    #[serde(default)]
    pub working: Vec<Change>,
    #[serde(default)]
    pub approvals: Vec<ApprovalRequest>,
}

/// Full repository state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySnapshot {
    /// State identifier; required on import
    #[serde(default)]
    pub id: String,
    /// Commits in append order
    pub commits: Vec<Commit>,
    pub branches: Vec<Branch>,
    pub current_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionState>,
}

impl RepositorySnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reject a snapshot without a usable state identifier
    pub fn require_id(&self) -> Result<(), SnapshotError> {
        if self.id.trim().is_empty() {
            return Err(SnapshotError::MissingStateId);
        }
        Ok(())
    }
}

/// Downloadable export of a repository snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub format_version: String,
    pub exported_at: DateTime<Utc>,
    pub state: RepositorySnapshot,
}

impl ExportBundle {
    /// Wrap a snapshot with the current format version and time
    pub fn new(state: RepositorySnapshot) -> Self {
        Self {
            format_version: EXPORT_FORMAT_VERSION.to_string(),
            exported_at: Utc::now(),
            state,
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an export, checking the format version and state identifier
    pub fn import(json: &str) -> Result<RepositorySnapshot, SnapshotError> {
        let bundle: ExportBundle = serde_json::from_str(json)?;
        if bundle.format_version != EXPORT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedFormat(bundle.format_version));
        }
        bundle.state.require_id()?;
        Ok(bundle.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_state(id: &str) -> RepositorySnapshot {
        RepositorySnapshot {
            id: id.to_string(),
            commits: vec![],
            branches: vec![Branch::new("main", None)],
            current_branch: "main".to_string(),
            session: None,
        }
    }

    #[test]
    fn test_export_import_round_trip() {
        let state = empty_state("ws-1");
        let json = ExportBundle::new(state.clone()).to_json().unwrap();
        assert!(json.contains("\"formatVersion\": \"1\""));
        assert!(json.contains("\"exportedAt\""));

        let imported = ExportBundle::import(&json).unwrap();
        assert_eq!(imported, state);
    }

    #[test]
    fn test_import_requires_state_id() {
        let json = ExportBundle::new(empty_state("  ")).to_json().unwrap();
        assert!(matches!(
            ExportBundle::import(&json),
            Err(SnapshotError::MissingStateId)
        ));

        let missing = r#"{"formatVersion":"1","exportedAt":"2025-01-01T00:00:00Z",
            "state":{"commits":[],"branches":[],"currentBranch":"main"}}"#;
        assert!(matches!(
            ExportBundle::import(missing),
            Err(SnapshotError::MissingStateId)
        ));
    }

    #[test]
    fn test_import_rejects_unknown_format() {
        let mut bundle = ExportBundle::new(empty_state("ws-1"));
        bundle.format_version = "99".to_string();
        let json = bundle.to_json().unwrap();
        assert!(matches!(
            ExportBundle::import(&json),
            Err(SnapshotError::UnsupportedFormat(v)) if v == "99"
        ));
    }

    #[test]
    fn test_import_rejects_garbage() {
        assert!(matches!(
            ExportBundle::import("not json"),
            Err(SnapshotError::Json(_))
        ));
    }
}
