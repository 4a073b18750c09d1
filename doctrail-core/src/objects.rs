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

//! Version Object Types
//!
//! Changes and commits. Commits are immutable once created and identified by
//! a hash over their content.

use super::diff::LineDiff;
use super::hash::ContentHasher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

/// Commit hash token produced by a [`ContentHasher`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitHash(String);

impl CommitHash {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters (the full token for the default hasher)
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommitHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CommitHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for CommitHash {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Kind of path-level mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Add,
    #[default]
    Modify,
    Delete,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Add => write!(f, "add"),
            ChangeType::Modify => write!(f, "modify"),
            ChangeType::Delete => write!(f, "delete"),
        }
    }
}

impl std::str::FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" | "a" => Ok(ChangeType::Add),
            "modify" | "m" => Ok(ChangeType::Modify),
            "delete" | "d" => Ok(ChangeType::Delete),
            other => Err(format!("unknown change type: {}", other)),
        }
    }
}

/// A single path's mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub change_type: ChangeType,
    pub path: String,
    /// New content; absent for deletions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_content: Option<String>,
    /// Positional line diff rendered with [`LineDiff::to_text`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl Change {
    /// Build a change record, computing a line diff when both the previous
    /// and new content are known. Deletions carry no new content.
    pub fn track(
        path: impl Into<String>,
        content: impl Into<String>,
        previous_content: Option<String>,
        change_type: ChangeType,
    ) -> Self {
        let content = match change_type {
            ChangeType::Delete => None,
            _ => Some(content.into()),
        };
        let diff = match (&previous_content, &content) {
            (Some(old), Some(new)) => Some(LineDiff::positional(old, new).to_text()),
            _ => None,
        };

        Self {
            change_type,
            path: path.into(),
            content,
            previous_content,
            diff,
        }
    }

    pub fn add(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::track(path, content, None, ChangeType::Add)
    }

    pub fn modify(
        path: impl Into<String>,
        content: impl Into<String>,
        previous_content: Option<String>,
    ) -> Self {
        Self::track(path, content, previous_content, ChangeType::Modify)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::track(path, String::new(), None, ChangeType::Delete)
    }

    /// Structured line diff, if both sides are known
    pub fn line_diff(&self) -> Option<LineDiff> {
        match (&self.previous_content, &self.content) {
            (Some(old), Some(new)) => Some(LineDiff::positional(old, new)),
            _ => None,
        }
    }
}

/// Counts derived from a commit's changes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMetadata {
    /// Distinct paths touched
    pub file_count: usize,
    /// Number of `Add` changes
    pub additions: usize,
    /// Number of `Delete` changes
    pub deletions: usize,
}

impl CommitMetadata {
    /// `Modify` changes count toward neither additions nor deletions
    pub fn from_changes(changes: &[Change]) -> Self {
        let paths: HashSet<&str> = changes.iter().map(|c| c.path.as_str()).collect();
        Self {
            file_count: paths.len(),
            additions: changes
                .iter()
                .filter(|c| c.change_type == ChangeType::Add)
                .count(),
            deletions: changes
                .iter()
                .filter(|c| c.change_type == ChangeType::Delete)
                .count(),
        }
    }
}

/// Commit object - immutable changeset with parent link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Creation-unique identifier, not content derived
    pub id: String,
    pub hash: CommitHash,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub message: String,
    /// Absent for a root commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_hash: Option<CommitHash>,
    pub changes: Vec<Change>,
    pub metadata: CommitMetadata,
}

/// Fields covered by the commit hash, in hashing order
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashedContent<'a> {
    message: &'a str,
    author: &'a str,
    changes: &'a [Change],
    parent_hash: Option<&'a CommitHash>,
    timestamp: &'a DateTime<Utc>,
}

impl Commit {
    /// Create a commit, hashing its content with `hasher`
    pub fn create(
        hasher: &dyn ContentHasher,
        message: impl Into<String>,
        author: impl Into<String>,
        changes: Vec<Change>,
        parent_hash: Option<CommitHash>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let message = message.into();
        let author = author.into();
        let hash = Self::compute_hash(
            hasher,
            &message,
            &author,
            &changes,
            parent_hash.as_ref(),
            &timestamp,
        );
        let metadata = CommitMetadata::from_changes(&changes);

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            hash,
            timestamp,
            author,
            message,
            parent_hash,
            changes,
            metadata,
        }
    }

    fn compute_hash(
        hasher: &dyn ContentHasher,
        message: &str,
        author: &str,
        changes: &[Change],
        parent_hash: Option<&CommitHash>,
        timestamp: &DateTime<Utc>,
    ) -> CommitHash {
        let content = HashedContent {
            message,
            author,
            changes,
            parent_hash,
            timestamp,
        };
        let serialized = serde_json::to_string(&content).unwrap_or_default();
        CommitHash::new(hasher.hash(&serialized))
    }

    /// Recompute the hash from content and compare with the stored one
    pub fn verify(&self, hasher: &dyn ContentHasher) -> bool {
        Self::compute_hash(
            hasher,
            &self.message,
            &self.author,
            &self.changes,
            self.parent_hash.as_ref(),
            &self.timestamp,
        ) == self.hash
    }

    /// Check if this is a root commit
    pub fn is_root(&self) -> bool {
        self.parent_hash.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{Blake3Hasher, RollingHash32};

    #[test]
    fn test_track_computes_diff() {
        let change = Change::modify("notes.md", "hello world", Some("hello".to_string()));
        assert_eq!(change.diff.as_deref(), Some("-hello\n+hello world"));
        assert_eq!(change.line_diff().unwrap().additions(), 1);
    }

    #[test]
    fn test_track_without_previous_has_no_diff() {
        let change = Change::add("notes.md", "hello");
        assert_eq!(change.change_type, ChangeType::Add);
        assert_eq!(change.content.as_deref(), Some("hello"));
        assert!(change.diff.is_none());
    }

    #[test]
    fn test_delete_drops_content() {
        let change = Change::track("old.md", "ignored", Some("x".to_string()), ChangeType::Delete);
        assert!(change.content.is_none());
        assert!(change.diff.is_none());
        assert_eq!(change.previous_content.as_deref(), Some("x"));
    }

    #[test]
    fn test_metadata_counts() {
        let changes = vec![
            Change::add("a.md", "1"),
            Change::modify("b.md", "2", None),
            Change::delete("c.md"),
            Change::add("d.md", "4"),
        ];
        let meta = CommitMetadata::from_changes(&changes);
        assert_eq!(meta.file_count, 4);
        assert_eq!(meta.additions, 2);
        assert_eq!(meta.deletions, 1);
    }

    #[test]
    fn test_commit_hash_is_content_derived() {
        let ts = Utc::now();
        let changes = vec![Change::add("a.md", "hello")];
        let c1 = Commit::create(&RollingHash32, "init", "alice", changes.clone(), None, ts);
        let c2 = Commit::create(&RollingHash32, "init", "alice", changes.clone(), None, ts);
        let c3 = Commit::create(&RollingHash32, "init", "bob", changes, None, ts);

        assert_eq!(c1.hash, c2.hash);
        assert_ne!(c1.id, c2.id);
        assert_ne!(c1.hash, c3.hash);
        assert!(c1.is_root());
        assert!(c1.verify(&RollingHash32));
        assert!(!c1.verify(&Blake3Hasher));
    }

    #[test]
    fn test_commit_json_field_names() {
        let parent = CommitHash::from("0000abcd");
        let commit = Commit::create(
            &RollingHash32,
            "edit",
            "alice",
            vec![Change::modify("a.md", "2", Some("1".to_string()))],
            Some(parent),
            Utc::now(),
        );
        let json = serde_json::to_value(&commit).unwrap();
        assert_eq!(json["parentHash"], "0000abcd");
        assert_eq!(json["changes"][0]["changeType"], "modify");
        assert_eq!(json["changes"][0]["previousContent"], "1");
        assert_eq!(json["metadata"]["fileCount"], 1);
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_short_hash() {
        let hash = CommitHash::from("0123456789abcdef");
        assert_eq!(hash.short(), "01234567");
        assert_eq!(CommitHash::from("abc").short(), "abc");
    }
}
