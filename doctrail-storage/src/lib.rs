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

//! Doctrail Storage
//!
//! Persistence for doctrail repositories. The engine itself is synchronous;
//! this crate is its only async boundary.
//!
//! ## Backends
//!
//! - [`MemoryStateStore`]: process-local, for tests
//! - [`FileStateStore`]: one JSON file, atomically replaced on save
//! - [`RemoteStateStore`]: HTTP workspace API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use doctrail_core::{Change, RepositoryConfig};
//! use doctrail_storage::{FileStateStore, Workspace};
//!
//! let store = Box::new(FileStateStore::in_dir(".doctrail"));
//! let mut ws = Workspace::open(store, RepositoryConfig::default()).await?;
//! ws.apply(|repo| {
//!     repo.stage_change(Change::add("notes.md", "hello"));
//!     repo.commit("Add notes", "alice")
//! })
//! .await?;
//! ```

pub mod backend;
pub mod config;
pub mod local;
pub mod memory;
pub mod remote;
pub mod workspace;

pub use backend::{StateStore, StoreError};
pub use config::StorageConfig;
pub use local::{FileStateStore, STATE_FILE_NAME};
pub use memory::MemoryStateStore;
pub use remote::RemoteStateStore;
pub use workspace::{Workspace, WorkspaceError};
