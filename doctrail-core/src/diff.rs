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

//! Diff Engine - Positional Line Diff
//!
//! Lines are compared by index only: no longest-common-subsequence search
//! is attempted, so an inserted line shifts every following line into the
//! diff. Stored diffs depend on this exact output.

use super::objects::{Change, ChangeType, CommitHash};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Type of change for a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineChange {
    /// Line was added
    Added,
    /// Line was removed
    Removed,
}

/// A single line in a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    /// Change type
    pub change: LineChange,
    /// Line content (without newline)
    pub content: String,
    /// Line number in the old (removed) or new (added) content, 1-indexed
    pub line: usize,
}

/// Line-level diff between two versions of a path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDiff {
    pub lines: Vec<DiffLine>,
}

impl LineDiff {
    /// Compare `old` and `new` line by line at equal positions.
    ///
    /// For every position where the lines differ, the old line (if any) is
    /// emitted as removed, followed by the new line (if any) as added.
    pub fn positional(old: &str, new: &str) -> Self {
        let old_lines: Vec<&str> = old.split('\n').collect();
        let new_lines: Vec<&str> = new.split('\n').collect();
        let width = old_lines.len().max(new_lines.len());

        let mut lines = Vec::new();
        for i in 0..width {
            let old_line = old_lines.get(i).copied();
            let new_line = new_lines.get(i).copied();
            if old_line == new_line {
                continue;
            }
            if let Some(content) = old_line {
                lines.push(DiffLine {
                    change: LineChange::Removed,
                    content: content.to_string(),
                    line: i + 1,
                });
            }
            if let Some(content) = new_line {
                lines.push(DiffLine {
                    change: LineChange::Added,
                    content: content.to_string(),
                    line: i + 1,
                });
            }
        }

        Self { lines }
    }

    /// Check if there are any changes
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn additions(&self) -> usize {
        self.count(LineChange::Added)
    }

    pub fn removals(&self) -> usize {
        self.count(LineChange::Removed)
    }

    fn count(&self, change: LineChange) -> usize {
        self.lines.iter().filter(|l| l.change == change).count()
    }

    /// Render as `-old` / `+new` lines, the form stored on a [`Change`]
    pub fn to_text(&self) -> String {
        self.lines
            .iter()
            .map(|l| {
                let prefix = match l.change {
                    LineChange::Added => '+',
                    LineChange::Removed => '-',
                };
                format!("{}{}", prefix, l.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Format with file headers, in the style of a unified diff
    pub fn to_unified(&self, path: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("--- a/{}\n", path));
        output.push_str(&format!("+++ b/{}\n", path));
        for line in &self.lines {
            let prefix = match line.change {
                LineChange::Added => '+',
                LineChange::Removed => '-',
            };
            output.push(prefix);
            output.push_str(&line.content);
            output.push('\n');
        }
        output
    }
}

/// Accumulated changes between two commits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeDiff {
    /// Older end of the range (exclusive)
    pub from: CommitHash,
    /// Newer end of the range (inclusive)
    pub to: CommitHash,
    /// Changes of every commit walked, oldest first
    pub changes: Vec<Change>,
    /// Number of commits walked
    pub commits: usize,
    /// `from` was never reached: the walk stopped at a root or missing parent
    pub truncated: bool,
}

/// Diff statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub files_touched: usize,
    pub files_added: usize,
    pub files_modified: usize,
    pub files_deleted: usize,
}

impl RangeDiff {
    /// Check if there are any changes
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Summarize changes by type
    pub fn stats(&self) -> DiffStats {
        let paths: HashSet<&str> = self.changes.iter().map(|c| c.path.as_str()).collect();
        let mut stats = DiffStats {
            files_touched: paths.len(),
            ..DiffStats::default()
        };
        for change in &self.changes {
            match change.change_type {
                ChangeType::Add => stats.files_added += 1,
                ChangeType::Modify => stats.files_modified += 1,
                ChangeType::Delete => stats.files_deleted += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text() {
        let diff = LineDiff::positional("a\nb\nc", "a\nb\nc");
        assert!(diff.is_empty());
        assert_eq!(diff.to_text(), "");
    }

    #[test]
    fn test_single_line_replaced() {
        let diff = LineDiff::positional("line1\nline2\nline3", "line1\nmodified\nline3");
        assert_eq!(diff.to_text(), "-line2\n+modified");
        assert_eq!(diff.lines[0].line, 2);
    }

    #[test]
    fn test_insertion_shifts_following_lines() {
        // Positional comparison: every line after the insertion differs.
        let diff = LineDiff::positional("a\nb", "a\nx\nb");
        assert_eq!(diff.to_text(), "-b\n+x\n+b");
        assert_eq!(diff.additions(), 2);
        assert_eq!(diff.removals(), 1);
    }

    #[test]
    fn test_truncation_only_removes() {
        let diff = LineDiff::positional("a\nb\nc", "a");
        assert_eq!(diff.to_text(), "-b\n-c");
        assert_eq!(diff.additions(), 0);
    }

    #[test]
    fn test_empty_old_content() {
        let diff = LineDiff::positional("", "hello");
        assert_eq!(diff.to_text(), "-\n+hello");
    }

    #[test]
    fn test_unified_format() {
        let diff = LineDiff::positional("line1\nline2", "line1\nmodified");
        let unified = diff.to_unified("file.txt");
        assert!(unified.contains("--- a/file.txt"));
        assert!(unified.contains("+++ b/file.txt"));
        assert!(unified.contains("-line2"));
        assert!(unified.contains("+modified"));
    }

    #[test]
    fn test_range_stats() {
        let range = RangeDiff {
            from: CommitHash::from("a"),
            to: CommitHash::from("b"),
            changes: vec![
                Change::add("x.md", "1"),
                Change::modify("x.md", "2", Some("1".to_string())),
                Change::delete("y.md"),
            ],
            commits: 2,
            truncated: false,
        };
        let stats = range.stats();
        assert_eq!(stats.files_touched, 2);
        assert_eq!(stats.files_added, 1);
        assert_eq!(stats.files_modified, 1);
        assert_eq!(stats.files_deleted, 1);
    }
}
