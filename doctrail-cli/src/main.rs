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

//! Doctrail CLI
//!
//! Command-line interface for versioning workspace content.

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::{CliConfig, CONFIG_FILE_NAME};
use doctrail_core::{
    ApprovalNotifier, Change, ChangeType, Commit, CommitHash, LogNotifier, MergeOutcome,
    RangeDiff, Repository, ResetMode,
};
use doctrail_storage::Workspace;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "doctrail")]
#[command(about = "Doctrail - branching version control for workspace content", long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".doctrail")]
    dir: PathBuf,

    /// Config file (defaults to doctrail.toml in the workspace directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a workspace
    Init {
        /// Name of the initial branch
        #[arg(long)]
        branch: Option<String>,

        /// Default author for merge commits
        #[arg(long)]
        author: Option<String>,
    },

    /// Record a change in the working set
    Track {
        /// Path of the document
        path: String,

        /// New content
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,

        /// Read new content from a file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Previous content (defaults to the last committed content)
        #[arg(long)]
        previous: Option<String>,

        /// Change type: add, modify, delete
        #[arg(long = "type", default_value = "modify")]
        change_type: ChangeType,

        /// Stage the change immediately
        #[arg(long)]
        stage: bool,
    },

    /// Stage working-set changes
    Stage {
        /// Paths to stage
        paths: Vec<String>,

        /// Stage every working-set change
        #[arg(short, long, conflicts_with = "paths")]
        all: bool,
    },

    /// Move staged changes back to the working set
    Unstage {
        /// Paths to unstage
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Drop working-set changes
    Discard {
        /// Paths to discard
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Show branch, head and pending changes
    Status,

    /// Commit staged changes
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Author (defaults to the configured default author)
        #[arg(short, long)]
        author: Option<String>,
    },

    /// Approval-gated commits
    Approve {
        #[command(subcommand)]
        command: ApproveCommands,
    },

    /// Branch management
    Branch {
        #[command(subcommand)]
        command: BranchCommands,
    },

    /// Switch the current branch
    Switch {
        /// Branch name
        name: String,
    },

    /// Merge a branch into the current branch
    Merge {
        /// Source branch
        source: String,
    },

    /// Show commit history from the current head
    Log {
        /// Maximum number of commits
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show one commit
    Show {
        /// Commit hash, unique hash prefix, branch name or HEAD
        #[arg(default_value = "HEAD")]
        rev: String,

        /// Include line diffs
        #[arg(long)]
        diff: bool,
    },

    /// Show changes between two commits
    Diff {
        /// Older commit (exclusive)
        from: String,

        /// Newer commit (inclusive)
        #[arg(default_value = "HEAD")]
        to: String,
    },

    /// Move the current branch to another commit
    Reset {
        /// Target commit
        rev: String,

        /// soft keeps staged and working changes, hard drops them
        #[arg(long, default_value = "soft")]
        mode: ResetMode,
    },

    /// Write the workspace state as an export bundle
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the workspace state with an export bundle
    Import {
        /// Bundle file
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum ApproveCommands {
    /// Request approval for the staged changes
    Request {
        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Commit author
        #[arg(short, long)]
        author: Option<String>,

        /// Who must confirm the commit
        #[arg(long)]
        approver: String,
    },

    /// Confirm a request and commit
    Confirm {
        /// Approval token
        token: String,
    },

    /// Withdraw a pending request
    Cancel {
        /// Approval token
        token: String,
    },

    /// List pending requests
    List,
}

#[derive(Subcommand)]
enum BranchCommands {
    /// List branches
    List,

    /// Create a branch at the current head
    Create {
        /// Branch name
        name: String,
    },

    /// Delete a branch
    Delete {
        /// Branch name
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    let default_filter = if cli.verbose {
        "doctrail=debug"
    } else {
        "doctrail=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.dir.join(CONFIG_FILE_NAME));

    if let Commands::Init { branch, author } = &cli.command {
        return init_workspace(&cli.dir, &config_path, branch.clone(), author.clone(), cli.json)
            .await;
    }

    let config = CliConfig::load(&config_path)?;
    let store = config
        .storage
        .open(&cli.dir)
        .context("Failed to open state store")?;
    let mut ws = Workspace::open(store, config.session_repository())
        .await
        .context("Failed to open workspace")?;

    run(cli.command, &mut ws, cli.json).await
}

async fn init_workspace(
    dir: &Path,
    config_path: &Path,
    branch: Option<String>,
    author: Option<String>,
    json_output: bool,
) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create workspace directory {}", dir.display()))?;

    let mut config = CliConfig::load(config_path)?;
    if !config_path.exists() {
        if let Some(branch) = branch {
            config.repository.default_branch = branch;
        }
        if let Some(author) = author {
            config.repository.default_author = author;
        }
        config.repository.validate()?;
        tokio::fs::write(config_path, config.to_toml_string()?)
            .await
            .with_context(|| format!("Failed to write config {}", config_path.display()))?;
        info!(path = %config_path.display(), "Wrote config");
    }

    let store = config.storage.open(dir)?;
    let ws = Workspace::open(store, config.session_repository()).await?;
    ws.save().await.context("Failed to save workspace state")?;

    let repo = ws.repository();
    if json_output {
        println!(
            "{}",
            serde_json::json!({
                "id": repo.id(),
                "branch": repo.current_branch(),
                "store": ws.store().describe(),
            })
        );
    } else {
        println!("✓ Workspace initialized at {}", dir.display());
        println!("  ID:     {}", repo.id());
        println!("  Branch: {}", repo.current_branch());
        println!("  Store:  {}", ws.store().describe());
    }
    Ok(())
}

async fn run(command: Commands, ws: &mut Workspace, json_output: bool) -> Result<()> {
    match command {
        Commands::Init { .. } => unreachable!(), // Handled in main

        Commands::Track {
            path,
            content,
            file,
            previous,
            change_type,
            stage,
        } => {
            let content = match (content, file) {
                (Some(content), _) => content,
                (None, Some(file)) => tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("Failed to read {}", file.display()))?,
                (None, None) if change_type == ChangeType::Delete => String::new(),
                (None, None) => bail!("--content or --file is required for {} changes", change_type),
            };
            let previous = match previous {
                Some(previous) => Some(previous),
                None if change_type == ChangeType::Modify => {
                    last_committed_content(ws.repository(), &path)
                }
                None => None,
            };

            let change = ws
                .apply(|repo| {
                    let change = repo
                        .track_file_change(&path, &content, previous.as_deref(), change_type)
                        .clone();
                    if stage {
                        repo.stage_path(&path);
                    }
                    Ok(change)
                })
                .await?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&change)?);
            } else {
                let set = if stage { "staged" } else { "working set" };
                println!("✓ Tracked {} {} ({})", change.change_type, change.path, set);
                if let Some(diff) = &change.diff {
                    for line in diff.lines() {
                        println!("  {}", line);
                    }
                }
            }
        }

        Commands::Stage { paths, all } => {
            let staged: Vec<String> = ws
                .apply(|repo| {
                    if all {
                        let working = repo.working().map(|c| c.path.clone()).collect();
                        repo.stage_all();
                        return Ok(working);
                    }
                    Ok(paths.into_iter().filter(|p| repo.stage_path(p)).collect())
                })
                .await?;
            print_paths(json_output, "Staged", &staged)?;
        }

        Commands::Unstage { paths } => {
            let moved: Vec<String> = ws
                .apply(|repo| Ok(paths.into_iter().filter(|p| repo.unstage_change(p)).collect()))
                .await?;
            print_paths(json_output, "Unstaged", &moved)?;
        }

        Commands::Discard { paths } => {
            let dropped: Vec<String> = ws
                .apply(|repo| {
                    Ok(paths
                        .into_iter()
                        .filter(|p| repo.discard_change(p).is_some())
                        .collect())
                })
                .await?;
            print_paths(json_output, "Discarded", &dropped)?;
        }

        Commands::Status => {
            let repo = ws.repository();
            let status = repo.status();
            if json_output {
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }

            println!("On branch {}", status.branch);
            match &status.head {
                Some(head) => println!("Head: {}", head),
                None => println!("No commits yet"),
            }
            if !status.staged.is_empty() {
                println!("\nChanges staged for commit:");
                for change in repo.staged() {
                    println!("  {:<8} {}", change.change_type, change.path);
                }
            }
            if !status.working.is_empty() {
                println!("\nChanges not staged:");
                for change in repo.working() {
                    println!("  {:<8} {}", change.change_type, change.path);
                }
            }
            if status.is_clean() {
                println!("\nNothing to commit");
            }
            if status.pending_approvals > 0 {
                println!("\nPending approvals: {}", status.pending_approvals);
            }
        }

        Commands::Commit { message, author } => {
            let author = author.unwrap_or_else(|| ws.repository().config().default_author.clone());
            let hash = ws
                .apply(|repo| repo.commit(&message, &author))
                .await
                .context("Commit failed")?;
            print_commit_result(ws.repository(), &hash, json_output)?;
        }

        Commands::Approve { command } => handle_approve_command(command, ws, json_output).await?,

        Commands::Branch { command } => handle_branch_command(command, ws, json_output).await?,

        Commands::Switch { name } => {
            ws.apply(|repo| repo.switch_branch(&name))
                .await
                .context("Switch failed")?;
            if json_output {
                println!("{}", serde_json::json!({ "branch": name }));
            } else {
                println!("✓ Switched to branch {}", name);
            }
        }

        Commands::Merge { source } => {
            let outcome = ws
                .apply(|repo| repo.merge_branch(&source))
                .await
                .context("Merge failed")?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                match outcome {
                    MergeOutcome::UpToDate { .. } => println!("Already up to date"),
                    MergeOutcome::Merged {
                        commit,
                        merged_commits,
                        changes,
                    } => println!(
                        "✓ Merged {} into {} as {} ({} commits, {} changes)",
                        source,
                        ws.repository().current_branch(),
                        commit.short(),
                        merged_commits,
                        changes
                    ),
                }
            }
        }

        Commands::Log { limit } => {
            let history = ws.repository().get_version_history(limit);
            if json_output {
                println!("{}", serde_json::to_string_pretty(&history)?);
                return Ok(());
            }

            for commit in &history.commits {
                println!("commit {}", commit.hash);
                println!("Author: {}", commit.author);
                println!("Date:   {}", commit.timestamp.to_rfc3339());
                println!("\n    {}\n", commit.message);
            }
            if history.truncated {
                println!("(history incomplete: a parent commit is missing)");
            }
        }

        Commands::Show { rev, diff } => {
            let repo = ws.repository();
            let commit = resolve(repo, &rev)?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(commit)?);
            } else {
                print_commit(commit, diff);
            }
        }

        Commands::Diff { from, to } => {
            let repo = ws.repository();
            let from = resolve(repo, &from)?.hash.clone();
            let to = resolve(repo, &to)?.hash.clone();
            let range = repo.get_diff(from.as_str(), to.as_str());
            if json_output {
                println!("{}", serde_json::to_string_pretty(&range)?);
            } else {
                print_range(&range);
            }
        }

        Commands::Reset { rev, mode } => {
            let target = resolve(ws.repository(), &rev)?.hash.clone();
            ws.apply(|repo| repo.reset(target.as_str(), mode))
                .await
                .context("Reset failed")?;
            if json_output {
                println!("{}", serde_json::json!({ "head": target, "mode": mode }));
            } else {
                println!(
                    "✓ Reset {} to {} ({})",
                    ws.repository().current_branch(),
                    target.short(),
                    mode
                );
            }
        }

        Commands::Export { output } => {
            let bundle = ws.export()?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &bundle)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), bytes = bundle.len(), "Exported workspace");
                    if !json_output {
                        println!("✓ Exported to {}", path.display());
                    }
                }
                None => println!("{}", bundle),
            }
        }

        Commands::Import { path } => {
            let bundle = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            ws.import(&bundle).await.context("Import failed")?;

            let repo = ws.repository();
            if json_output {
                println!(
                    "{}",
                    serde_json::json!({ "id": repo.id(), "stats": repo.stats() })
                );
            } else {
                println!("✓ Imported {}", path.display());
                println!("  Commits:  {}", repo.stats().commit_count);
                println!("  Branches: {}", repo.list_branches().len());
            }
        }
    }

    Ok(())
}

async fn handle_approve_command(
    command: ApproveCommands,
    ws: &mut Workspace,
    json_output: bool,
) -> Result<()> {
    match command {
        ApproveCommands::Request {
            message,
            author,
            approver,
        } => {
            let author = author.unwrap_or_else(|| ws.repository().config().default_author.clone());
            let request = ws
                .apply(|repo| repo.request_commit_approval(&message, &author, &approver))
                .await
                .context("Approval request failed")?;
            LogNotifier.notify(&request)?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&request)?);
            } else {
                println!("✓ Approval requested from {}", request.approver);
                println!("  Token:   {}", request.token);
                println!("  Expires: {}", request.expires_at.to_rfc3339());
                println!("  Paths:   {}", request.staged_paths.join(", "));
            }
        }

        ApproveCommands::Confirm { token } => {
            let hash = ws
                .apply(|repo| repo.commit_with_approval(&token))
                .await
                .context("Approved commit failed")?;
            print_commit_result(ws.repository(), &hash, json_output)?;
        }

        ApproveCommands::Cancel { token } => {
            let cancelled = ws.apply(|repo| Ok(repo.cancel_approval(&token))).await?;
            if !cancelled {
                bail!("No pending approval {}", token);
            }
            if json_output {
                println!("{}", serde_json::json!({ "cancelled": token }));
            } else {
                println!("✓ Cancelled approval {}", token);
            }
        }

        ApproveCommands::List => {
            let purged = ws.apply(|repo| Ok(repo.purge_expired_approvals())).await?;
            if purged > 0 && !json_output {
                println!("Dropped {} expired approval(s).", purged);
            }
            let pending: Vec<_> = ws.repository().pending_approvals().collect();
            if json_output {
                println!("{}", serde_json::to_string_pretty(&pending)?);
            } else if pending.is_empty() {
                println!("No pending approvals.");
            } else {
                for request in pending {
                    println!(
                        "{}  {} -> {}  \"{}\" (expires {})",
                        request.token,
                        request.author,
                        request.approver,
                        request.message,
                        request.expires_at.to_rfc3339()
                    );
                }
            }
        }
    }
    Ok(())
}

async fn handle_branch_command(
    command: BranchCommands,
    ws: &mut Workspace,
    json_output: bool,
) -> Result<()> {
    match command {
        BranchCommands::List => {
            let branches = ws.repository().list_branches();
            if json_output {
                println!("{}", serde_json::to_string_pretty(&branches)?);
                return Ok(());
            }
            for branch in branches {
                let marker = if branch.is_current { '*' } else { ' ' };
                let head = branch
                    .head
                    .as_ref()
                    .map(|h| h.short().to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{} {:<24} {}", marker, branch.name, head);
            }
        }

        BranchCommands::Create { name } => {
            ws.apply(|repo| repo.create_branch(&name))
                .await
                .context("Branch creation failed")?;
            if json_output {
                println!(
                    "{}",
                    serde_json::json!({ "branch": name, "head": ws.repository().branch_head(&name) })
                );
            } else {
                println!("✓ Created branch {}", name);
            }
        }

        BranchCommands::Delete { name } => {
            let branch = ws
                .apply(|repo| repo.delete_branch(&name))
                .await
                .context("Branch deletion failed")?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&branch)?);
            } else {
                println!("✓ Deleted branch {}", branch.name);
            }
        }
    }
    Ok(())
}

/// Resolve `HEAD`, a branch name, a full hash or a unique hash prefix
fn resolve<'a>(repo: &'a Repository, rev: &str) -> Result<&'a Commit> {
    if rev.eq_ignore_ascii_case("HEAD") {
        let head = repo
            .head()
            .with_context(|| format!("Branch {} has no commits", repo.current_branch()))?;
        return repo
            .get_version(head.as_str())
            .with_context(|| format!("Head {} is not in the version store", head));
    }
    Ok(repo.resolve(rev)?)
}

/// Content of `path` as of the current head, if it was ever committed
fn last_committed_content(repo: &Repository, path: &str) -> Option<String> {
    let found = repo
        .get_version_history(None)
        .commits
        .into_iter()
        .find_map(|commit| commit.changes.iter().find(|c| c.path == path))
        .and_then(|change| change.content.clone());
    debug!(path, found = found.is_some(), "Looked up previous content");
    found
}

fn print_paths(json_output: bool, verb: &str, paths: &[String]) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(paths)?);
    } else if paths.is_empty() {
        println!("Nothing {}", verb.to_lowercase());
    } else {
        for path in paths {
            println!("✓ {} {}", verb, path);
        }
    }
    Ok(())
}

fn print_commit_result(repo: &Repository, hash: &CommitHash, json_output: bool) -> Result<()> {
    let commit = repo
        .get_version(hash.as_str())
        .with_context(|| format!("Commit {} missing after write", hash))?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(commit)?);
    } else {
        println!(
            "✓ [{} {}] {}",
            repo.current_branch(),
            commit.hash.short(),
            commit.message
        );
        println!(
            "  {} files, {} added, {} deleted",
            commit.metadata.file_count, commit.metadata.additions, commit.metadata.deletions
        );
    }
    Ok(())
}

fn print_commit(commit: &Commit, with_diff: bool) {
    println!("commit {}", commit.hash);
    if let Some(parent) = &commit.parent_hash {
        println!("Parent: {}", parent);
    }
    println!("Author: {}", commit.author);
    println!("Date:   {}", commit.timestamp.to_rfc3339());
    println!("\n    {}\n", commit.message);
    print_changes(&commit.changes, with_diff);
}

fn print_range(range: &RangeDiff) {
    let stats = range.stats();
    println!(
        "{}..{}: {} commits, {} files ({} added, {} modified, {} deleted)",
        range.from.short(),
        range.to.short(),
        range.commits,
        stats.files_touched,
        stats.files_added,
        stats.files_modified,
        stats.files_deleted
    );
    if range.truncated {
        println!("(base commit not reached; showing everything reachable)");
    }
    println!();
    print_changes(&range.changes, true);
}

fn print_changes(changes: &[Change], with_diff: bool) {
    for change in changes {
        println!("  {:<8} {}", change.change_type, change.path);
        if !with_diff {
            continue;
        }
        if let Some(diff) = change.line_diff() {
            for line in diff.to_unified(&change.path).lines() {
                println!("    {}", line);
            }
        }
    }
}
