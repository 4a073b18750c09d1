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

//! Doctrail Core
//!
//! A branching version-control engine for content changes to named paths
//! inside a workspace.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Repository                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   stage    ┌────────────┐   commit            │
//! │  │  Working   │──────────► │   Staged   │──────────┐          │
//! │  │    set     │◄────────── │    set     │          │          │
//! │  └────────────┘  unstage   └────────────┘          ▼          │
//! │                                  │         ┌──────────────┐   │
//! │                                  └────────►│ Approval gate│   │
//! │                                            └──────┬───────┘   │
//! │                                                   ▼           │
//! │  ┌────────────┐  head   ┌───────────────────────────────────┐ │
//! │  │  Branches  │────────►│   Version store (append-only DAG) │ │
//! │  └────────────┘         └───────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is synchronous and in-memory. Persistence goes through
//! [`RepositorySnapshot`], which the `doctrail-storage` crate hands to a
//! backend.
//!
//! ## Usage
//!
//! ```rust
//! use doctrail_core::{Change, Repository};
//!
//! let mut repo = Repository::default();
//! repo.stage_change(Change::add("notes.md", "hello"));
//! let hash = repo.commit("Add notes", "alice").unwrap();
//! assert_eq!(repo.get_version(hash.as_str()).unwrap().message, "Add notes");
//! ```

pub mod approval;
pub mod config;
pub mod diff;
pub mod hash;
pub mod objects;
pub mod refs;
pub mod repository;
pub mod snapshot;
pub mod staging;
pub mod store;

pub use approval::{
    ApprovalLedger, ApprovalNotifier, ApprovalRequest, LogNotifier, NotifyError, Redemption,
};
pub use config::{ConfigError, RepositoryConfig, DEFAULT_APPROVAL_TTL_SECS, MAX_APPROVAL_TTL_SECS};
pub use diff::{DiffLine, DiffStats, LineChange, LineDiff, RangeDiff};
pub use hash::{Blake3Hasher, ContentHasher, HashAlgorithm, RollingHash32};
pub use objects::{Change, ChangeType, Commit, CommitHash, CommitMetadata};
pub use refs::{validate_branch_name, Branch, BranchTable, RefError};
pub use repository::{
    BranchInfo, History, MergeOutcome, Repository, RepositoryError, ResetMode, Status,
};
pub use snapshot::{
    ExportBundle, RepositorySnapshot, SessionState, SnapshotError, EXPORT_FORMAT_VERSION,
};
pub use staging::StagingArea;
pub use store::{Ancestors, StoreError, StoreStats, VersionStore};
