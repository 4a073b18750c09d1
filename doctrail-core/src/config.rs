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

//! Repository configuration
//!
//! Loaded from TOML; every key is optional and falls back to its default.

use super::hash::HashAlgorithm;
use super::refs::validate_branch_name;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default approval token lifetime (24 hours)
pub const DEFAULT_APPROVAL_TTL_SECS: u64 = 86_400;

/// Upper bound on approval lifetime (one year)
pub const MAX_APPROVAL_TTL_SECS: u64 = 365 * 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepositoryConfig {
    /// Branch created for a fresh repository
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Author recorded on merge commits
    #[serde(default = "default_author")]
    pub default_author: String,

    /// Commit hash algorithm
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,

    /// Lifetime of a commit approval token in seconds
    #[serde(default = "default_approval_ttl")]
    pub approval_ttl_secs: u64,

    /// Include staged/working sets and pending approvals in snapshots.
    ///
    /// Off by default: they belong to one editing session.
    #[serde(default)]
    pub persist_session_changes: bool,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_author() -> String {
    "system".to_string()
}

fn default_approval_ttl() -> u64 {
    DEFAULT_APPROVAL_TTL_SECS
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_branch: default_branch(),
            default_author: default_author(),
            hash_algorithm: HashAlgorithm::default(),
            approval_ttl_secs: default_approval_ttl(),
            persist_session_changes: false,
        }
    }
}

impl RepositoryConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_branch_name(&self.default_branch)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.default_author.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_author cannot be blank".to_string(),
            ));
        }

        if self.approval_ttl_secs == 0 || self.approval_ttl_secs > MAX_APPROVAL_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "approval_ttl_secs must be between 1 and {}",
                MAX_APPROVAL_TTL_SECS
            )));
        }

        Ok(())
    }

    pub fn approval_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.approval_ttl_secs.min(MAX_APPROVAL_TTL_SECS) as i64)
    }
}
