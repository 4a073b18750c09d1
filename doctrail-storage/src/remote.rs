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

//! Remote HTTP state store
//!
//! Talks to a workspace API:
//!
//! - `PUT {base}/workspaces/{id}/state` with the JSON state as body
//! - `GET {base}/workspaces/{id}/state`, where 404 means nothing saved yet
//!
//! The workspace id is sent as a single percent-encoded path segment.

use crate::backend::{StateStore, StoreError};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct RemoteStateStore {
    state_url: Url,
    workspace_id: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

impl RemoteStateStore {
    pub fn new(
        base_url: impl Into<String>,
        workspace_id: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let workspace_id = workspace_id.into();
        if workspace_id.trim().is_empty() {
            return Err(StoreError::Config("workspace id is empty".to_string()));
        }
        if workspace_id == "." || workspace_id == ".." {
            return Err(StoreError::Config(format!(
                "workspace id '{}' is not a valid path segment",
                workspace_id
            )));
        }

        let base_url = base_url.into();
        let mut state_url = Url::parse(&base_url)
            .map_err(|e| StoreError::Config(format!("invalid base url '{}': {}", base_url, e)))?;
        state_url
            .path_segments_mut()
            .map_err(|_| StoreError::Config(format!("base url '{}' cannot take a path", base_url)))?
            .pop_if_empty()
            .extend(["workspaces", workspace_id.as_str(), "state"]);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            state_url,
            workspace_id,
            api_token: None,
            client,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn state_url(&self) -> &Url {
        &self.state_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }
}

async fn status_error(response: reqwest::Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    StoreError::Status { status, body }
}

#[async_trait]
impl StateStore for RemoteStateStore {
    async fn save(&self, state: &str) -> Result<(), StoreError> {
        let response = self
            .authorize(self.client.put(self.state_url.clone()))
            .header("Content-Type", "application/json")
            .body(state.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        debug!(url = %self.state_url, bytes = state.len(), "Saved remote state");
        Ok(())
    }

    async fn load(&self) -> Result<Option<String>, StoreError> {
        let response = self
            .authorize(self.client.get(self.state_url.clone()))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(Some(response.text().await?))
    }

    fn describe(&self) -> String {
        self.state_url.to_string()
    }
}

impl std::fmt::Debug for RemoteStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStateStore")
            .field("state_url", &self.state_url.as_str())
            .field("workspace_id", &self.workspace_id)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_url_trims_slash() {
        let store = RemoteStateStore::new("https://api.example.com/v1/", "ws-1").unwrap();
        assert_eq!(
            store.state_url().as_str(),
            "https://api.example.com/v1/workspaces/ws-1/state"
        );
    }

    #[test]
    fn test_workspace_id_is_one_segment() {
        let store = RemoteStateStore::new("https://api.example.com", "team/a?b#c").unwrap();
        assert_eq!(
            store.state_url().as_str(),
            "https://api.example.com/workspaces/team%2Fa%3Fb%23c/state"
        );
        assert_eq!(store.state_url().path_segments().unwrap().count(), 3);
    }

    #[test]
    fn test_bad_base_url_rejected() {
        assert!(matches!(
            RemoteStateStore::new("not a url", "ws"),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            RemoteStateStore::new("mailto:ops@example.com", "ws"),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            RemoteStateStore::new("https://api.example.com", ".."),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_empty_workspace_id_rejected() {
        assert!(matches!(
            RemoteStateStore::new("https://api.example.com", " "),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_debug_hides_token() {
        let store = RemoteStateStore::new("http://localhost", "ws")
            .unwrap()
            .with_api_token("secret");
        assert!(!format!("{:?}", store).contains("secret"));
    }
}
