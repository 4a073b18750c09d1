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

//! Persistence port for serialized repository state
//!
//! A backend stores one opaque JSON document per workspace. It does not
//! interpret the document; validation happens when the engine restores it.

use async_trait::async_trait;
use doctrail_core::SnapshotError;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid state: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Invalid storage configuration: {0}")]
    Config(String),
}

/// Backend that holds the serialized state of one workspace
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Replace the stored state
    async fn save(&self, state: &str) -> Result<(), StoreError>;

    /// Fetch the stored state, `None` if nothing was saved yet
    async fn load(&self) -> Result<Option<String>, StoreError>;

    /// Short human-readable location, used in logs
    fn describe(&self) -> String;
}
