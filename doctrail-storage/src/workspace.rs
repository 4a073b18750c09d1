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

//! Workspace - a repository bound to its state store
//!
//! Mutations run against a copy of the engine. The copy is serialized and
//! saved, and only a successful save replaces the live engine, so a failed
//! save never leaves memory ahead of storage.

use crate::backend::{StateStore, StoreError};
use doctrail_core::{
    ExportBundle, Repository, RepositoryConfig, RepositoryError, RepositorySnapshot,
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Workspace {
    repo: Repository,
    store: Box<dyn StateStore>,
}

impl Workspace {
    /// Bind an existing repository to a store without touching the store
    pub fn new(repo: Repository, store: Box<dyn StateStore>) -> Self {
        Self { repo, store }
    }

    /// Load the saved state, or start an empty repository if none exists
    pub async fn open(
        store: Box<dyn StateStore>,
        config: RepositoryConfig,
    ) -> Result<Self, StoreError> {
        let repo = match store.load().await? {
            Some(json) => {
                let snapshot = RepositorySnapshot::from_json(&json)?;
                let repo = Repository::from_snapshot(snapshot, config)?;
                debug!(store = %store.describe(), id = repo.id(), "Opened workspace");
                repo
            }
            None => {
                info!(store = %store.describe(), "No saved state, starting empty repository");
                Repository::new(config)
            }
        };
        Ok(Self { repo, store })
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    /// Persist the current state
    pub async fn save(&self) -> Result<(), StoreError> {
        let state = self.repo.snapshot().to_json()?;
        self.persist(&state).await
    }

    /// Run `op` and persist its result. On any failure the live engine is
    /// left as it was.
    pub async fn apply<T, F>(&mut self, op: F) -> Result<T, WorkspaceError>
    where
        F: FnOnce(&mut Repository) -> Result<T, RepositoryError>,
    {
        let mut next = self.repo.clone();
        let value = op(&mut next)?;

        let state = next.snapshot().to_json().map_err(StoreError::from)?;
        self.persist(&state).await?;

        self.repo = next;
        Ok(value)
    }

    /// Serialize the state as a versioned export bundle
    pub fn export(&self) -> Result<String, StoreError> {
        Ok(ExportBundle::new(self.repo.snapshot()).to_json()?)
    }

    /// Replace the state with an export bundle and persist it
    pub async fn import(&mut self, json: &str) -> Result<(), StoreError> {
        let state = ExportBundle::import(json)?;
        let repo = Repository::from_snapshot(state, self.repo.config().clone())?;

        let snapshot = repo.snapshot().to_json()?;
        self.persist(&snapshot).await?;

        info!(id = repo.id(), commits = repo.stats().commit_count, "Imported workspace state");
        self.repo = repo;
        Ok(())
    }

    async fn persist(&self, state: &str) -> Result<(), StoreError> {
        self.store.save(state).await.map_err(|e| {
            warn!(store = %self.store.describe(), error = %e, "Failed to save workspace state");
            e
        })
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("id", &self.repo.id())
            .field("store", &self.store.describe())
            .finish()
    }
}
