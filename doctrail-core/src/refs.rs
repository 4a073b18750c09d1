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

//! Branch Table
//!
//! Named mutable pointers into the commit DAG. Exactly one branch is
//! current at any time.

use super::objects::CommitHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Reference errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefError {
    #[error("Branch not found: {0}")]
    NotFound(String),

    #[error("Branch already exists: {0}")]
    BranchExists(String),

    #[error("Invalid branch name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Cannot delete the current branch: {0}")]
    CurrentBranch(String),
}

/// Branch - mutable reference to a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub name: String,
    /// Current commit; absent until the first commit lands on the branch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<CommitHash>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Branch {
    /// Create a new branch
    pub fn new(name: impl Into<String>, head: Option<CommitHash>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            head,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Branch table with a current-branch marker
#[derive(Debug, Clone)]
pub struct BranchTable {
    branches: BTreeMap<String, Branch>,
    current: String,
}

impl BranchTable {
    /// Create a table holding only `default_branch`, marked current
    pub fn new(default_branch: &str) -> Self {
        let mut branches = BTreeMap::new();
        branches.insert(
            default_branch.to_string(),
            Branch::new(default_branch, None),
        );
        Self {
            branches,
            current: default_branch.to_string(),
        }
    }

    /// Rebuild from persisted branches
    pub fn from_parts(branches: Vec<Branch>, current: &str) -> Result<Self, RefError> {
        let mut table = BTreeMap::new();
        for branch in branches {
            if table.contains_key(&branch.name) {
                return Err(RefError::BranchExists(branch.name));
            }
            table.insert(branch.name.clone(), branch);
        }
        if !table.contains_key(current) {
            return Err(RefError::NotFound(current.to_string()));
        }
        Ok(Self {
            branches: table,
            current: current.to_string(),
        })
    }

    /// Name of the current branch
    pub fn current_name(&self) -> &str {
        &self.current
    }

    /// Head of the current branch
    pub fn current_head(&self) -> Option<&CommitHash> {
        self.branches
            .get(&self.current)
            .and_then(|b| b.head.as_ref())
    }

    /// Get a branch by name
    pub fn get(&self, name: &str) -> Option<&Branch> {
        self.branches.get(name)
    }

    /// Check if a branch exists
    pub fn contains(&self, name: &str) -> bool {
        self.branches.contains_key(name)
    }

    /// Create a branch pointing at `head`
    pub fn create(&mut self, name: &str, head: Option<CommitHash>) -> Result<&Branch, RefError> {
        validate_branch_name(name)?;
        if self.branches.contains_key(name) {
            return Err(RefError::BranchExists(name.to_string()));
        }
        Ok(self
            .branches
            .entry(name.to_string())
            .or_insert_with(|| Branch::new(name, head)))
    }

    /// Mark `name` as the current branch
    pub fn set_current(&mut self, name: &str) -> Result<(), RefError> {
        if !self.branches.contains_key(name) {
            return Err(RefError::NotFound(name.to_string()));
        }
        self.current = name.to_string();
        Ok(())
    }

    /// Move the current branch to `head`
    pub fn advance_current(&mut self, head: CommitHash) {
        if let Some(branch) = self.branches.get_mut(&self.current) {
            branch.head = Some(head);
            branch.updated_at = Utc::now();
        }
    }

    /// Delete a branch other than the current one
    pub fn delete(&mut self, name: &str) -> Result<Branch, RefError> {
        if name == self.current {
            return Err(RefError::CurrentBranch(name.to_string()));
        }
        self.branches
            .remove(name)
            .ok_or_else(|| RefError::NotFound(name.to_string()))
    }

    /// Iterate branches in name order
    pub fn iter(&self) -> impl Iterator<Item = &Branch> {
        self.branches.values()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

/// Validate branch name (similar to Git's rules)
pub fn validate_branch_name(name: &str) -> Result<(), RefError> {
    let invalid = |reason: &str| RefError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("empty name"));
    }

    if name.starts_with('.') || name.ends_with('.') {
        return Err(invalid("cannot start or end with '.'"));
    }

    if name.contains("..") {
        return Err(invalid("cannot contain '..'"));
    }

    if name.contains("//") || name.starts_with('/') || name.ends_with('/') {
        return Err(invalid("misplaced '/'"));
    }

    let invalid_chars = ['~', '^', ':', '\\', '?', '*', '['];
    for c in invalid_chars {
        if name.contains(c) {
            return Err(invalid(&format!("cannot contain '{}'", c)));
        }
    }

    if name.chars().any(char::is_whitespace) {
        return Err(invalid("cannot contain whitespace"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_has_current_default() {
        let table = BranchTable::new("main");
        assert_eq!(table.current_name(), "main");
        assert!(table.current_head().is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_create_and_advance() {
        let mut table = BranchTable::new("main");
        let oid = CommitHash::from("00000001");

        table.advance_current(oid.clone());
        table.create("feature", Some(oid.clone())).unwrap();
        table.set_current("feature").unwrap();
        table.advance_current(CommitHash::from("00000002"));

        assert_eq!(table.get("main").unwrap().head, Some(oid));
        assert_eq!(table.current_head(), Some(&CommitHash::from("00000002")));
    }

    #[test]
    fn test_duplicate_branch() {
        let mut table = BranchTable::new("main");
        assert_eq!(
            table.create("main", None).unwrap_err(),
            RefError::BranchExists("main".to_string())
        );
    }

    #[test]
    fn test_set_current_unknown() {
        let mut table = BranchTable::new("main");
        assert!(table.set_current("nope").is_err());
        assert_eq!(table.current_name(), "main");
    }

    #[test]
    fn test_delete_rules() {
        let mut table = BranchTable::new("main");
        table.create("old", None).unwrap();

        assert!(matches!(table.delete("main"), Err(RefError::CurrentBranch(_))));
        assert_eq!(table.delete("old").unwrap().name, "old");
        assert!(matches!(table.delete("old"), Err(RefError::NotFound(_))));
    }

    #[test]
    fn test_from_parts_requires_current() {
        let branches = vec![Branch::new("main", None)];
        assert!(BranchTable::from_parts(branches.clone(), "main").is_ok());
        assert!(matches!(
            BranchTable::from_parts(branches, "dev"),
            Err(RefError::NotFound(_))
        ));
    }

    #[test]
    fn test_branch_name_validation() {
        assert!(validate_branch_name("main").is_ok());
        assert!(validate_branch_name("feature/test").is_ok());
        assert!(validate_branch_name("v1.0.0").is_ok());

        assert!(validate_branch_name("").is_err());
        assert!(validate_branch_name(".hidden").is_err());
        assert!(validate_branch_name("bad..name").is_err());
        assert!(validate_branch_name("has space").is_err());
        assert!(validate_branch_name("what?").is_err());
        assert!(validate_branch_name("/lead").is_err());
    }
}
