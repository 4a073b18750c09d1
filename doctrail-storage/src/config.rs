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

//! Backend selection

use crate::backend::{StateStore, StoreError};
use crate::local::FileStateStore;
use crate::memory::MemoryStateStore;
use crate::remote::RemoteStateStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which backend holds a workspace's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Memory,
    File {
        /// State file; defaults to `state.json` in the workspace directory
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
    Remote {
        base_url: String,
        workspace_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_token: Option<String>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::File { path: None }
    }
}

impl StorageConfig {
    /// Build the configured backend. Relative file paths resolve against
    /// `workspace_dir`.
    pub fn open(&self, workspace_dir: &Path) -> Result<Box<dyn StateStore>, StoreError> {
        let store: Box<dyn StateStore> = match self {
            StorageConfig::Memory => Box::new(MemoryStateStore::new()),
            StorageConfig::File { path: None } => Box::new(FileStateStore::in_dir(workspace_dir)),
            StorageConfig::File { path: Some(path) } => {
                Box::new(FileStateStore::new(workspace_dir.join(path)))
            }
            StorageConfig::Remote {
                base_url,
                workspace_id,
                api_token,
            } => {
                let store = RemoteStateStore::new(base_url.as_str(), workspace_id.as_str())?;
                match api_token {
                    Some(token) => Box::new(store.with_api_token(token.as_str())),
                    None => Box::new(store),
                }
            }
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backends() {
        let file: StorageConfig = toml::from_str("backend = \"file\"").unwrap();
        assert_eq!(file, StorageConfig::File { path: None });

        let remote: StorageConfig = toml::from_str(
            r#"
            backend = "remote"
            base_url = "https://docs.example.com/api"
            workspace_id = "team-handbook"
            "#,
        )
        .unwrap();
        assert!(matches!(remote, StorageConfig::Remote { api_token: None, .. }));
    }

    #[test]
    fn test_open_file_backend_in_workspace_dir() {
        let store = StorageConfig::default().open(Path::new("/tmp/ws")).unwrap();
        assert_eq!(store.describe(), "/tmp/ws/state.json");

        let custom = StorageConfig::File {
            path: Some(PathBuf::from("custom/trail.json")),
        };
        assert_eq!(
            custom.open(Path::new("/tmp/ws")).unwrap().describe(),
            "/tmp/ws/custom/trail.json"
        );
    }
}
