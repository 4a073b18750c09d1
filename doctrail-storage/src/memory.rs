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

//! In-process state store

use crate::backend::{StateStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Keeps the state in memory. Used by tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already-saved state
    pub fn with_state(state: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(Some(state.into())),
        }
    }

    /// Current stored state
    pub fn contents(&self) -> Option<String> {
        self.state.lock().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn save(&self, state: &str) -> Result<(), StoreError> {
        *self.state.lock() = Some(state.to_string());
        Ok(())
    }

    async fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.state.lock().clone())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_replaces_state() {
        let store = MemoryStateStore::new();
        assert_eq!(store.load().await.unwrap(), None);

        store.save("{\"v\":1}").await.unwrap();
        store.save("{\"v\":2}").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("{\"v\":2}"));
    }
}
