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

//! Version Store - Append-Only Commit Log
//!
//! Commits are never modified or removed once appended. Lookups go through a
//! hash index; parent links form the commit DAG.

use super::objects::{Commit, CommitHash};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Hash collision: {0} already names a stored commit")]
    Collision(CommitHash),
}

/// Version store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub commit_count: usize,
    pub root_count: usize,
    pub change_count: usize,
}

/// In-memory append-only commit store
#[derive(Debug, Clone, Default)]
pub struct VersionStore {
    /// Commits in append order
    commits: Vec<Commit>,
    /// CommitHash -> position in `commits`
    index: HashMap<CommitHash, usize>,
}

impl VersionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from commits in append order
    pub fn from_commits(commits: Vec<Commit>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for commit in commits {
            store.append(commit)?;
        }
        Ok(store)
    }

    /// Append a commit. Fails without modifying the store if its hash is
    /// already taken.
    pub fn append(&mut self, commit: Commit) -> Result<&Commit, StoreError> {
        if self.index.contains_key(&commit.hash) {
            return Err(StoreError::Collision(commit.hash));
        }

        let position = self.commits.len();
        self.index.insert(commit.hash.clone(), position);
        self.commits.push(commit);
        Ok(&self.commits[position])
    }

    /// Get a commit by hash
    pub fn get(&self, hash: &str) -> Option<&Commit> {
        self.index.get(hash).map(|&i| &self.commits[i])
    }

    /// Check if a commit exists
    pub fn contains(&self, hash: &str) -> bool {
        self.index.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Iterate in append order
    pub fn iter(&self) -> impl Iterator<Item = &Commit> {
        self.commits.iter()
    }

    /// Walk parent links starting at `start` (inclusive)
    pub fn ancestors<'a>(&'a self, start: Option<&'a CommitHash>) -> Ancestors<'a> {
        Ancestors {
            store: self,
            next: start,
            remaining: self.commits.len(),
            truncated: false,
        }
    }

    /// Get store statistics
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            commit_count: self.commits.len(),
            root_count: self.commits.iter().filter(|c| c.is_root()).count(),
            change_count: self.commits.iter().map(|c| c.changes.len()).sum(),
        }
    }
}

/// Iterator over a commit and its first-parent ancestors
pub struct Ancestors<'a> {
    store: &'a VersionStore,
    next: Option<&'a CommitHash>,
    /// Bound on steps; a snapshot with a parent cycle cannot loop forever
    remaining: usize,
    truncated: bool,
}

impl<'a> Ancestors<'a> {
    /// True once the walk hit a hash that is not in the store
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Commit;

    fn next(&mut self) -> Option<&'a Commit> {
        let hash = self.next.take()?;
        if self.remaining == 0 {
            self.truncated = true;
            return None;
        }
        match self.store.get(hash.as_str()) {
            Some(commit) => {
                self.remaining -= 1;
                self.next = commit.parent_hash.as_ref();
                Some(commit)
            }
            None => {
                self.truncated = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::RollingHash32;
    use crate::objects::Change;
    use chrono::{Duration, Utc};

    fn chain(len: usize) -> Vec<Commit> {
        let base = Utc::now();
        let mut commits: Vec<Commit> = Vec::new();
        for i in 0..len {
            let parent = commits.last().map(|c| c.hash.clone());
            commits.push(Commit::create(
                &RollingHash32,
                format!("commit {}", i),
                "test",
                vec![Change::add(format!("f{}.md", i), "x")],
                parent,
                base + Duration::seconds(i as i64),
            ));
        }
        commits
    }

    #[test]
    fn test_append_and_get() {
        let mut store = VersionStore::new();
        let commit = chain(1).remove(0);
        let hash = commit.hash.clone();

        store.append(commit).unwrap();
        assert!(store.contains(hash.as_str()));
        assert_eq!(store.get(hash.as_str()).unwrap().message, "commit 0");
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_hash_rejected() {
        let commit = chain(1).remove(0);
        let mut store = VersionStore::new();
        store.append(commit.clone()).unwrap();

        let err = store.append(commit.clone()).unwrap_err();
        assert_eq!(err, StoreError::Collision(commit.hash));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_ancestors_walk() {
        let store = VersionStore::from_commits(chain(4)).unwrap();
        let head = store.iter().last().unwrap().hash.clone();

        let mut walk = store.ancestors(Some(&head));
        let messages: Vec<_> = walk.by_ref().map(|c| c.message.as_str()).collect();
        assert_eq!(messages, vec!["commit 3", "commit 2", "commit 1", "commit 0"]);
        assert!(!walk.truncated());
    }

    #[test]
    fn test_ancestors_missing_parent_truncates() {
        // Drop the root so commit 1 points at a hash that is not stored.
        let mut commits = chain(3);
        commits.remove(0);
        let store = VersionStore::from_commits(commits).unwrap();
        let head = store.iter().last().unwrap().hash.clone();

        let mut walk = store.ancestors(Some(&head));
        assert_eq!(walk.by_ref().count(), 2);
        assert!(walk.truncated());
    }

    #[test]
    fn test_ancestors_from_nothing() {
        let store = VersionStore::new();
        let mut walk = store.ancestors(None);
        assert!(walk.next().is_none());
        assert!(!walk.truncated());
    }

    #[test]
    fn test_stats() {
        let store = VersionStore::from_commits(chain(3)).unwrap();
        let stats = store.stats();
        assert_eq!(stats.commit_count, 3);
        assert_eq!(stats.root_count, 1);
        assert_eq!(stats.change_count, 3);
    }
}
