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

//! Repository - High-Level Version Control Interface
//!
//! Owns the version store, branch table, staging area and pending approvals
//! of one workspace. Every operation validates its preconditions before
//! touching state, so a failed call leaves the repository unchanged.

use super::approval::{ApprovalLedger, ApprovalRequest, Redemption};
use super::config::RepositoryConfig;
use super::diff::RangeDiff;
use super::hash::ContentHasher;
use super::objects::{Change, ChangeType, Commit, CommitHash};
use super::refs::{Branch, BranchTable, RefError};
use super::snapshot::{RepositorySnapshot, SessionState, SnapshotError};
use super::staging::StagingArea;
use super::store::{StoreError, StoreStats, VersionStore};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Repository errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Nothing to commit: {reason}")]
    EmptyCommit { reason: &'static str },

    #[error("Branch already exists: {0}")]
    DuplicateBranch(String),

    #[error("Branch not found: {0}")]
    UnknownBranch(String),

    #[error("Uncommitted changes on '{branch}': {staged} staged, {working} unstaged")]
    UncommittedChanges {
        branch: String,
        staged: usize,
        working: usize,
    },

    #[error("Version not found: {0}")]
    UnknownVersion(String),

    #[error("Invalid branch name '{name}': {reason}")]
    InvalidBranchName { name: String, reason: String },

    #[error("Cannot delete the current branch: {0}")]
    CannotDeleteCurrentBranch(String),

    #[error("Hash collision: {0} already names a stored commit")]
    HashCollision(CommitHash),

    #[error("Approval token not found: {0}")]
    UnknownApproval(String),

    #[error("Approval token expired: {0}")]
    ApprovalExpired(String),

    #[error("Staged changes differ from those submitted for approval {0}")]
    StaleApproval(String),
}

impl From<RefError> for RepositoryError {
    fn from(err: RefError) -> Self {
        match err {
            RefError::NotFound(name) => RepositoryError::UnknownBranch(name),
            RefError::BranchExists(name) => RepositoryError::DuplicateBranch(name),
            RefError::InvalidName { name, reason } => {
                RepositoryError::InvalidBranchName { name, reason }
            }
            RefError::CurrentBranch(name) => RepositoryError::CannotDeleteCurrentBranch(name),
        }
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Collision(hash) => RepositoryError::HashCollision(hash),
        }
    }
}

/// How far `reset` reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetMode {
    /// Move the branch head only
    Soft,
    /// Move the branch head and clear staged and working sets
    Hard,
}

impl fmt::Display for ResetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetMode::Soft => write!(f, "soft"),
            ResetMode::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for ResetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "soft" => Ok(ResetMode::Soft),
            "hard" => Ok(ResetMode::Hard),
            other => Err(format!("unknown reset mode: {}", other)),
        }
    }
}

/// Commit history from the current head, newest first
#[derive(Debug, Clone, Serialize)]
pub struct History<'a> {
    pub commits: Vec<&'a Commit>,
    /// The walk stopped at a parent hash that is not in the store
    pub truncated: bool,
}

/// Result of a merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// Source had no commits the current branch lacks
    UpToDate { head: Option<CommitHash> },
    /// A merge commit was written
    Merged {
        commit: CommitHash,
        merged_commits: usize,
        changes: usize,
    },
}

/// Branch listing entry
#[derive(Debug, Clone, Serialize)]
pub struct BranchInfo {
    pub name: String,
    pub head: Option<CommitHash>,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Working tree summary
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub branch: String,
    pub head: Option<CommitHash>,
    pub staged: Vec<String>,
    pub working: Vec<String>,
    pub pending_approvals: usize,
}

impl Status {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.working.is_empty()
    }
}

/// Version control repository for one workspace
#[derive(Debug, Clone)]
pub struct Repository {
    /// State identifier carried into snapshots
    id: String,
    config: RepositoryConfig,
    hasher: Arc<dyn ContentHasher>,
    store: VersionStore,
    refs: BranchTable,
    staging: StagingArea,
    approvals: ApprovalLedger,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new(RepositoryConfig::default())
    }
}

impl Repository {
    /// Create an empty repository with a fresh state identifier
    pub fn new(config: RepositoryConfig) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), config)
    }

    /// Create an empty repository with a given state identifier
    pub fn with_id(id: impl Into<String>, config: RepositoryConfig) -> Self {
        Self {
            id: id.into(),
            hasher: config.hash_algorithm.hasher(),
            refs: BranchTable::new(&config.default_branch),
            store: VersionStore::new(),
            staging: StagingArea::new(),
            approvals: ApprovalLedger::new(),
            config,
        }
    }

    /// Restore a repository from its serialized state
    pub fn from_snapshot(
        snapshot: RepositorySnapshot,
        config: RepositoryConfig,
    ) -> Result<Self, SnapshotError> {
        snapshot.require_id()?;
        let RepositorySnapshot {
            id,
            commits,
            branches,
            current_branch,
            session,
        } = snapshot;

        let store = VersionStore::from_commits(commits).map_err(|err| match err {
            StoreError::Collision(hash) => SnapshotError::DuplicateCommit(hash),
        })?;

        let refs = BranchTable::from_parts(branches, &current_branch).map_err(|err| match err {
            RefError::BranchExists(name) => SnapshotError::DuplicateBranch(name),
            _ => SnapshotError::UnknownCurrentBranch(current_branch.clone()),
        })?;

        for branch in refs.iter() {
            if let Some(head) = &branch.head {
                if !store.contains(head.as_str()) {
                    warn!(branch = %branch.name, head = %head, "Branch head is not in the version store");
                }
            }
        }

        let (staging, approvals) = match session {
            Some(session) => (
                StagingArea::from_parts(session.staged, session.working),
                ApprovalLedger::from_requests(session.approvals),
            ),
            None => (StagingArea::new(), ApprovalLedger::new()),
        };

        debug!(id = %id, commits = store.len(), branches = refs.len(), "Restored repository");

        let repo = Self {
            id,
            hasher: config.hash_algorithm.hasher(),
            config,
            store,
            refs,
            staging,
            approvals,
        };
        for hash in repo.verify_commits() {
            warn!(hash = %hash, "Commit content does not match its hash");
        }
        Ok(repo)
    }

    /// Serialize the repository state. Expired approvals are left out.
    pub fn snapshot(&self) -> RepositorySnapshot {
        let now = Utc::now();
        let session = self.config.persist_session_changes.then(|| SessionState {
            staged: self.staging.staged_snapshot(),
            working: self.staging.working_snapshot(),
            approvals: self
                .approvals
                .iter()
                .filter(|r| !r.is_expired(now))
                .cloned()
                .collect(),
        });

        RepositorySnapshot {
            id: self.id.clone(),
            commits: self.store.iter().cloned().collect(),
            branches: self.refs.iter().cloned().collect(),
            current_branch: self.refs.current_name().to_string(),
            session,
        }
    }

    // === Change Tracking & Staging ===

    /// Record a detected change in the working set
    pub fn track_file_change(
        &mut self,
        path: &str,
        content: &str,
        previous_content: Option<&str>,
        change_type: ChangeType,
    ) -> &Change {
        let change = Change::track(
            path,
            content,
            previous_content.map(str::to_string),
            change_type,
        );
        debug!(path, %change_type, "Tracked change");
        self.staging.record(change)
    }

    /// Stage a change, replacing any working or staged entry for its path
    pub fn stage_change(&mut self, change: Change) {
        debug!(path = %change.path, "Staged change");
        self.staging.stage(change);
    }

    /// Stage the working-set entry for `path`
    pub fn stage_path(&mut self, path: &str) -> bool {
        self.staging.stage_path(path)
    }

    /// Stage every working-set entry
    pub fn stage_all(&mut self) -> usize {
        self.staging.stage_all()
    }

    /// Move a staged entry back to the working set. No-op if not staged.
    pub fn unstage_change(&mut self, path: &str) -> bool {
        let moved = self.staging.unstage(path);
        if moved {
            debug!(path, "Unstaged change");
        }
        moved
    }

    /// Drop a working-set entry
    pub fn discard_change(&mut self, path: &str) -> Option<Change> {
        self.staging.discard(path)
    }

    pub fn staged(&self) -> impl Iterator<Item = &Change> {
        self.staging.staged()
    }

    pub fn working(&self) -> impl Iterator<Item = &Change> {
        self.staging.working()
    }

    pub fn status(&self) -> Status {
        Status {
            branch: self.refs.current_name().to_string(),
            head: self.refs.current_head().cloned(),
            staged: self.staging.staged_paths(),
            working: self.staging.working_paths(),
            pending_approvals: self.approvals.len(),
        }
    }

    // === Commit ===

    /// Commit the staged set on the current branch
    pub fn commit(&mut self, message: &str, author: &str) -> Result<CommitHash, RepositoryError> {
        self.check_committable(message)?;

        let changes = self.staging.staged_snapshot();
        let count = changes.len();
        let hash = self.write_commit(message, author, changes)?;
        self.staging.clear_staged();

        info!(hash = %hash, branch = self.refs.current_name(), changes = count, "Committed");
        Ok(hash)
    }

    fn check_committable(&self, message: &str) -> Result<(), RepositoryError> {
        if !self.staging.has_staged() {
            return Err(RepositoryError::EmptyCommit {
                reason: "no staged changes",
            });
        }
        if message.trim().is_empty() {
            return Err(RepositoryError::EmptyCommit {
                reason: "blank commit message",
            });
        }
        Ok(())
    }

    /// Append a commit on top of the current head and advance the branch
    fn write_commit(
        &mut self,
        message: &str,
        author: &str,
        changes: Vec<Change>,
    ) -> Result<CommitHash, RepositoryError> {
        let parent = self.refs.current_head().cloned();
        let timestamp = self.next_timestamp(parent.as_ref());
        let commit = Commit::create(
            self.hasher.as_ref(),
            message,
            author,
            changes,
            parent,
            timestamp,
        );
        let hash = commit.hash.clone();

        self.store.append(commit)?;
        self.refs.advance_current(hash.clone());
        Ok(hash)
    }

    /// Wall-clock time, clamped to strictly after the parent's timestamp
    fn next_timestamp(&self, parent: Option<&CommitHash>) -> DateTime<Utc> {
        let now = Utc::now();
        match parent.and_then(|h| self.store.get(h.as_str())) {
            Some(p) if p.timestamp >= now => p.timestamp + Duration::microseconds(1),
            _ => now,
        }
    }

    // === Approval-Gated Commit ===

    /// Hold the staged set for out-of-band approval
    pub fn request_commit_approval(
        &mut self,
        message: &str,
        author: &str,
        approver: &str,
    ) -> Result<ApprovalRequest, RepositoryError> {
        self.check_committable(message)?;
        self.purge_expired_approvals();

        let request = self.approvals.issue(
            message,
            author,
            approver,
            self.staged_fingerprint(),
            self.staging.staged_paths(),
            Utc::now(),
            self.config.approval_ttl(),
        );
        debug!(token = %request.token, approver, "Approval requested");
        Ok(request)
    }

    /// Redeem an approval token and commit the staged set it covers
    pub fn commit_with_approval(&mut self, token: &str) -> Result<CommitHash, RepositoryError> {
        let (message, author, fingerprint) = match self.approvals.check(token, Utc::now()) {
            Ok(request) => (
                request.message.clone(),
                request.author.clone(),
                request.fingerprint.clone(),
            ),
            Err(Redemption::Unknown) => {
                return Err(RepositoryError::UnknownApproval(token.to_string()))
            }
            Err(Redemption::Expired(request)) => {
                warn!(token, expired_at = %request.expires_at, "Approval token expired");
                return Err(RepositoryError::ApprovalExpired(request.token));
            }
        };

        if fingerprint != self.staged_fingerprint() {
            return Err(RepositoryError::StaleApproval(token.to_string()));
        }

        let hash = self.commit(&message, &author)?;
        self.approvals.take(token);
        Ok(hash)
    }

    /// Withdraw a pending approval request
    pub fn cancel_approval(&mut self, token: &str) -> bool {
        self.approvals.cancel(token)
    }

    pub fn pending_approvals(&self) -> impl Iterator<Item = &ApprovalRequest> {
        self.approvals.iter()
    }

    /// Drop approval requests past their expiry, returning how many went
    pub fn purge_expired_approvals(&mut self) -> usize {
        let purged = self.approvals.purge_expired(Utc::now());
        if purged > 0 {
            debug!(purged, "Purged expired approvals");
        }
        purged
    }

    /// Hashes of commits whose content no longer matches their hash
    pub fn verify_commits(&self) -> Vec<CommitHash> {
        self.store
            .iter()
            .filter(|c| !c.verify(self.hasher.as_ref()))
            .map(|c| c.hash.clone())
            .collect()
    }

    fn staged_fingerprint(&self) -> String {
        let staged = serde_json::to_string(&self.staging.staged_snapshot()).unwrap_or_default();
        self.hasher.hash(&staged)
    }

    // === Branch Operations ===

    /// Create a branch at the current head
    pub fn create_branch(&mut self, name: &str) -> Result<(), RepositoryError> {
        let head = self.refs.current_head().cloned();
        self.refs.create(name, head)?;
        info!(branch = name, from = self.refs.current_name(), "Created branch");
        Ok(())
    }

    /// Make `name` the current branch. Requires clean staged and working sets.
    pub fn switch_branch(&mut self, name: &str) -> Result<(), RepositoryError> {
        if !self.refs.contains(name) {
            return Err(RepositoryError::UnknownBranch(name.to_string()));
        }
        if !self.staging.is_clean() {
            return Err(RepositoryError::UncommittedChanges {
                branch: self.refs.current_name().to_string(),
                staged: self.staging.staged().count(),
                working: self.staging.working().count(),
            });
        }

        self.refs.set_current(name)?;
        debug!(branch = name, "Switched branch");
        Ok(())
    }

    /// Delete a branch other than the current one
    pub fn delete_branch(&mut self, name: &str) -> Result<Branch, RepositoryError> {
        let branch = self.refs.delete(name)?;
        info!(branch = name, "Deleted branch");
        Ok(branch)
    }

    /// Merge `source` into the current branch.
    ///
    /// Changes of every source commit not reachable from the current head
    /// are concatenated, oldest first, into one merge commit. Paths touched
    /// on both sides are not reconciled.
    pub fn merge_branch(&mut self, source: &str) -> Result<MergeOutcome, RepositoryError> {
        let source_head = self
            .refs
            .get(source)
            .ok_or_else(|| RepositoryError::UnknownBranch(source.to_string()))?
            .head
            .clone();
        let target = self.refs.current_name().to_string();
        let target_head = self.refs.current_head().cloned();

        let (changes, merged_commits) = {
            let reachable: HashSet<&CommitHash> = self
                .store
                .ancestors(target_head.as_ref())
                .map(|c| &c.hash)
                .collect();

            let mut walk = self.store.ancestors(source_head.as_ref());
            let mut pending: Vec<&Commit> = walk
                .by_ref()
                .take_while(|c| !reachable.contains(&c.hash))
                .collect();
            if walk.truncated() {
                warn!(branch = source, "Source history is incomplete; merging what was reachable");
            }
            pending.reverse();

            let changes: Vec<Change> = pending
                .iter()
                .flat_map(|c| c.changes.iter().cloned())
                .collect();
            (changes, pending.len())
        };

        if merged_commits == 0 {
            debug!(source, target = %target, "Already up to date");
            return Ok(MergeOutcome::UpToDate { head: target_head });
        }

        let message = format!("Merge branch '{}' into {}", source, target);
        let author = self.config.default_author.clone();
        let change_count = changes.len();
        let commit = self.write_commit(&message, &author, changes)?;

        info!(source, target = %target, commit = %commit, merged_commits, "Merged branch");
        Ok(MergeOutcome::Merged {
            commit,
            merged_commits,
            changes: change_count,
        })
    }

    /// List all branches in name order
    pub fn list_branches(&self) -> Vec<BranchInfo> {
        let current = self.refs.current_name();
        self.refs
            .iter()
            .map(|b| BranchInfo {
                name: b.name.clone(),
                head: b.head.clone(),
                is_current: b.name == current,
                created_at: b.created_at,
                updated_at: b.updated_at,
            })
            .collect()
    }

    pub fn current_branch(&self) -> &str {
        self.refs.current_name()
    }

    pub fn branch_head(&self, name: &str) -> Option<&CommitHash> {
        self.refs.get(name).and_then(|b| b.head.as_ref())
    }

    /// Head of the current branch
    pub fn head(&self) -> Option<&CommitHash> {
        self.refs.current_head()
    }

    // === History & Diff ===

    /// Commits from the current head following parent links, newest first
    pub fn get_version_history(&self, limit: Option<usize>) -> History<'_> {
        let mut walk = self.store.ancestors(self.refs.current_head());
        let commits: Vec<&Commit> = walk.by_ref().take(limit.unwrap_or(usize::MAX)).collect();
        let truncated = walk.truncated();
        if truncated {
            warn!(
                branch = self.refs.current_name(),
                collected = commits.len(),
                "History walk stopped at a missing parent"
            );
        }
        History { commits, truncated }
    }

    /// Look up a commit by exact hash
    pub fn get_version(&self, hash: &str) -> Option<&Commit> {
        self.store.get(hash)
    }

    /// Resolve a branch name, exact hash or unique hash prefix
    pub fn resolve(&self, rev: &str) -> Result<&Commit, RepositoryError> {
        let unknown = || RepositoryError::UnknownVersion(rev.to_string());

        if let Some(head) = self.refs.get(rev).and_then(|b| b.head.as_ref()) {
            return self.store.get(head.as_str()).ok_or_else(unknown);
        }
        if let Some(commit) = self.store.get(rev) {
            return Ok(commit);
        }
        if rev.len() < 4 {
            return Err(unknown());
        }

        let mut matches = self.store.iter().filter(|c| c.hash.as_str().starts_with(rev));
        match (matches.next(), matches.next()) {
            (Some(commit), None) => Ok(commit),
            _ => Err(unknown()),
        }
    }

    /// Changes between `from` (exclusive) and `to` (inclusive), oldest first.
    ///
    /// Walks back from `to`; if `from` is not an ancestor the result covers
    /// everything reachable and is marked truncated.
    pub fn get_diff(&self, from: &str, to: &str) -> RangeDiff {
        let to_hash = CommitHash::from(to);
        let mut walked: Vec<&Commit> = Vec::new();
        let mut reached = from == to;

        if !reached {
            for commit in self.store.ancestors(Some(&to_hash)) {
                if commit.hash.as_str() == from {
                    reached = true;
                    break;
                }
                walked.push(commit);
            }
        }

        if !reached {
            warn!(from, to, walked = walked.len(), "Diff walk never reached the base commit");
        }

        RangeDiff {
            from: CommitHash::from(from),
            commits: walked.len(),
            changes: walked
                .iter()
                .rev()
                .flat_map(|c| c.changes.iter().cloned())
                .collect(),
            to: to_hash.clone(),
            truncated: !reached,
        }
    }

    /// Point the current branch at `hash`
    pub fn reset(&mut self, hash: &str, mode: ResetMode) -> Result<(), RepositoryError> {
        let target = self
            .store
            .get(hash)
            .map(|c| c.hash.clone())
            .ok_or_else(|| RepositoryError::UnknownVersion(hash.to_string()))?;

        self.refs.advance_current(target.clone());
        if mode == ResetMode::Hard {
            self.staging.clear();
        }

        info!(branch = self.refs.current_name(), head = %target, %mode, "Reset branch");
        Ok(())
    }

    // === Accessors ===

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn hasher(&self) -> &dyn ContentHasher {
        self.hasher.as_ref()
    }

    /// All commits in append order
    pub fn commits(&self) -> impl Iterator<Item = &Commit> {
        self.store.iter()
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Check if repository has no commits
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
