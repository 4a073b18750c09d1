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

//! Property tests for staging, history and serialization

use doctrail_core::{
    Change, ChangeType, ContentHasher, Repository, RepositoryConfig, RepositorySnapshot,
    RollingHash32,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

const PATHS: &[&str] = &["a.md", "b.md", "docs/c.md", "d.txt", "notes/e.md"];

#[derive(Debug, Clone)]
enum StagingOp {
    Track(usize, String),
    Stage(usize),
    StageChange(usize, String),
    Unstage(usize),
    StageAll,
    Discard(usize),
}

fn staging_op() -> impl Strategy<Value = StagingOp> {
    let path = 0..PATHS.len();
    prop_oneof![
        (path.clone(), "[a-z ]{0,12}").prop_map(|(p, c)| StagingOp::Track(p, c)),
        path.clone().prop_map(StagingOp::Stage),
        (path.clone(), "[a-z ]{0,12}").prop_map(|(p, c)| StagingOp::StageChange(p, c)),
        path.clone().prop_map(StagingOp::Unstage),
        Just(StagingOp::StageAll),
        path.prop_map(StagingOp::Discard),
    ]
}

fn apply(repo: &mut Repository, op: &StagingOp) {
    match op {
        StagingOp::Track(p, content) => {
            repo.track_file_change(PATHS[*p], content, None, ChangeType::Modify);
        }
        StagingOp::Stage(p) => {
            repo.stage_path(PATHS[*p]);
        }
        StagingOp::StageChange(p, content) => {
            repo.stage_change(Change::add(PATHS[*p], content.as_str()));
        }
        StagingOp::Unstage(p) => {
            repo.unstage_change(PATHS[*p]);
        }
        StagingOp::StageAll => {
            repo.stage_all();
        }
        StagingOp::Discard(p) => {
            repo.discard_change(PATHS[*p]);
        }
    }
}

// Distinct path -> content pairs for one staged set
prop_compose! {
    fn staged_set()
        (entries in prop::collection::btree_map(0..PATHS.len(), "[ -~]{0,40}", 1..PATHS.len()))
        -> BTreeMap<usize, String>
    {
        entries
    }
}

fn commit_n(repo: &mut Repository, n: usize) {
    for i in 0..n {
        repo.stage_change(Change::add(format!("file-{}.md", i), format!("v{}", i)));
        repo.commit(&format!("commit {}", i), "prop").unwrap();
    }
}

proptest! {
    #[test]
    fn prop_path_never_in_both_sets(ops in prop::collection::vec(staging_op(), 0..60)) {
        let mut repo = Repository::default();
        for op in &ops {
            apply(&mut repo, op);
            let status = repo.status();
            for path in &status.staged {
                prop_assert!(!status.working.contains(path), "{} is staged and working after {:?}", path, op);
            }
        }
    }

    #[test]
    fn prop_commit_resolves_to_staged_changes(entries in staged_set()) {
        let mut repo = Repository::default();
        for (p, content) in &entries {
            repo.stage_change(Change::add(PATHS[*p], content.as_str()));
        }
        let staged: Vec<Change> = repo.staged().cloned().collect();

        let hash = repo.commit("snapshot", "prop").unwrap();
        let commit = repo.get_version(hash.as_str()).unwrap();
        prop_assert_eq!(&commit.changes, &staged);
        prop_assert_eq!(commit.metadata.file_count, entries.len());
    }

    #[test]
    fn prop_stage_then_unstage_restores_working(
        p in 0..PATHS.len(),
        content in "[a-z]{0,16}",
        noise in prop::collection::vec(0..PATHS.len(), 0..5),
    ) {
        let mut repo = Repository::default();
        repo.stage_change(Change::add(PATHS[p], content.as_str()));
        // Unstaging other, absent paths is a no-op
        for other in noise.iter().filter(|o| **o != p) {
            repo.unstage_change(PATHS[*other]);
        }
        repo.unstage_change(PATHS[p]);

        let status = repo.status();
        prop_assert!(status.staged.is_empty());
        prop_assert_eq!(status.working, vec![PATHS[p].to_string()]);
    }

    #[test]
    fn prop_unstage_absent_path_is_idempotent(ops in prop::collection::vec(staging_op(), 0..30), p in 0..PATHS.len()) {
        let mut repo = Repository::default();
        for op in &ops {
            apply(&mut repo, op);
        }
        repo.unstage_change(PATHS[p]);

        let staged: Vec<Change> = repo.staged().cloned().collect();
        let working: Vec<Change> = repo.working().cloned().collect();
        prop_assert!(!repo.unstage_change(PATHS[p]));
        prop_assert!(!repo.unstage_change(PATHS[p]));
        prop_assert_eq!(repo.staged().cloned().collect::<Vec<_>>(), staged);
        prop_assert_eq!(repo.working().cloned().collect::<Vec<_>>(), working);
    }

    #[test]
    fn prop_history_limit_and_order(n in 0usize..15, limit in 0usize..20) {
        let mut repo = Repository::default();
        commit_n(&mut repo, n);

        let history = repo.get_version_history(Some(limit));
        prop_assert_eq!(history.commits.len(), n.min(limit));
        prop_assert!(!history.truncated);
        if let Some(first) = history.commits.first() {
            prop_assert_eq!(Some(&first.hash), repo.head());
        }
        for pair in history.commits.windows(2) {
            prop_assert!(pair[0].timestamp > pair[1].timestamp);
            prop_assert_eq!(pair[0].parent_hash.as_ref(), Some(&pair[1].hash));
        }
    }

    #[test]
    fn prop_branch_is_snapshot_of_current_head(before in 1usize..5, after in 1usize..5) {
        let mut repo = Repository::default();
        commit_n(&mut repo, before);
        let head_at_creation = repo.head().cloned();
        repo.create_branch("snapshot").unwrap();

        for i in 0..after {
            repo.stage_change(Change::add(format!("later-{}.md", i), "x"));
            repo.commit("later", "prop").unwrap();
        }
        prop_assert_eq!(repo.branch_head("snapshot").cloned(), head_at_creation);
        prop_assert_ne!(repo.branch_head("snapshot"), repo.head());
    }

    #[test]
    fn prop_serialization_round_trip(n in 0usize..8, branch_at in 0usize..8) {
        let mut repo = Repository::default();
        commit_n(&mut repo, branch_at.min(n));
        repo.create_branch("side").unwrap();
        commit_n(&mut repo, n - branch_at.min(n));

        let json = repo.snapshot().to_json().unwrap();
        let restored = Repository::from_snapshot(
            RepositorySnapshot::from_json(&json).unwrap(),
            RepositoryConfig::default(),
        )
        .unwrap();

        prop_assert_eq!(restored.current_branch(), repo.current_branch());
        prop_assert_eq!(restored.branch_head("main"), repo.branch_head("main"));
        prop_assert_eq!(restored.branch_head("side"), repo.branch_head("side"));

        let original: Vec<_> = repo.get_version_history(None).commits.into_iter().cloned().collect();
        let replayed: Vec<_> = restored.get_version_history(None).commits.into_iter().cloned().collect();
        prop_assert_eq!(original, replayed);
    }

    #[test]
    fn prop_rolling_hash_shape(input in any::<String>()) {
        let hasher = RollingHash32;
        let hash = hasher.hash(&input);
        prop_assert_eq!(hash.len(), 8);
        prop_assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        prop_assert_eq!(hash, hasher.hash(&input));
    }
}
