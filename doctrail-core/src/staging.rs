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

//! Working and Staging Area
//!
//! Two insertion-ordered change sets keyed by path. A path lives in at most
//! one of them at a time.

use super::objects::Change;
use indexmap::IndexMap;

#[derive(Debug, Clone, Default)]
pub struct StagingArea {
    /// Detected changes not yet staged
    working: IndexMap<String, Change>,
    /// Changes to include in the next commit
    staged: IndexMap<String, Change>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted change lists (later entries win per path)
    pub fn from_parts(staged: Vec<Change>, working: Vec<Change>) -> Self {
        let mut area = Self::new();
        for change in staged {
            area.stage(change);
        }
        for change in working {
            if !area.staged.contains_key(&change.path) {
                area.working.shift_remove(&change.path);
                area.working.insert(change.path.clone(), change);
            }
        }
        area
    }

    /// Record a detected change in the working set, dropping any staged
    /// entry for the same path
    pub fn record(&mut self, change: Change) -> &Change {
        self.staged.shift_remove(&change.path);
        self.working.shift_remove(&change.path);
        let path = change.path.clone();
        self.working.entry(path).or_insert(change)
    }

    /// Stage a change, replacing any entry for its path in either set
    pub fn stage(&mut self, change: Change) {
        self.working.shift_remove(&change.path);
        self.staged.shift_remove(&change.path);
        self.staged.insert(change.path.clone(), change);
    }

    /// Stage the working-set entry for `path`; false if there is none
    pub fn stage_path(&mut self, path: &str) -> bool {
        match self.working.shift_remove(path) {
            Some(change) => {
                self.stage(change);
                true
            }
            None => false,
        }
    }

    /// Stage every working-set entry in order, returning how many moved
    pub fn stage_all(&mut self) -> usize {
        let pending: Vec<Change> = self.working.drain(..).map(|(_, c)| c).collect();
        let count = pending.len();
        for change in pending {
            self.stage(change);
        }
        count
    }

    /// Move a staged entry back to the working set; false if not staged
    pub fn unstage(&mut self, path: &str) -> bool {
        match self.staged.shift_remove(path) {
            Some(change) => {
                self.working.insert(change.path.clone(), change);
                true
            }
            None => false,
        }
    }

    /// Drop a working-set entry
    pub fn discard(&mut self, path: &str) -> Option<Change> {
        self.working.shift_remove(path)
    }

    pub fn staged(&self) -> impl Iterator<Item = &Change> {
        self.staged.values()
    }

    pub fn working(&self) -> impl Iterator<Item = &Change> {
        self.working.values()
    }

    pub fn staged_paths(&self) -> Vec<String> {
        self.staged.keys().cloned().collect()
    }

    pub fn working_paths(&self) -> Vec<String> {
        self.working.keys().cloned().collect()
    }

    /// Owned copy of the staged set in staging order
    pub fn staged_snapshot(&self) -> Vec<Change> {
        self.staged.values().cloned().collect()
    }

    pub fn working_snapshot(&self) -> Vec<Change> {
        self.working.values().cloned().collect()
    }

    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    /// No staged and no working changes
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.working.is_empty()
    }

    pub fn clear_staged(&mut self) {
        self.staged.clear();
    }

    pub fn clear(&mut self) {
        self.staged.clear();
        self.working.clear();
    }
}
