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

//! Commit Approval Gate
//!
//! A commit can be held until a confirmation token, delivered out of band
//! (for example by email), is presented back. The ledger only tracks pending
//! requests; the commit itself goes through the normal commit path.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A commit waiting for out-of-band confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    /// One-shot confirmation token
    pub token: String,
    pub message: String,
    pub author: String,
    /// Who must confirm (e.g. an email address)
    pub approver: String,
    /// Fingerprint of the staged set at request time
    pub fingerprint: String,
    pub staged_paths: Vec<String>,
    pub requested_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Why a token could not be redeemed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    Unknown,
    Expired(ApprovalRequest),
}

/// Delivers approval requests to the approver
pub trait ApprovalNotifier {
    fn notify(&self, request: &ApprovalRequest) -> Result<(), NotifyError>;
}

#[derive(Debug, Error)]
#[error("Failed to deliver approval {token}: {reason}")]
pub struct NotifyError {
    pub token: String,
    pub reason: String,
}

/// Notifier that only logs the request
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl ApprovalNotifier for LogNotifier {
    fn notify(&self, request: &ApprovalRequest) -> Result<(), NotifyError> {
        tracing::info!(
            token = %request.token,
            approver = %request.approver,
            paths = request.staged_paths.len(),
            "Commit approval requested"
        );
        Ok(())
    }
}

/// Pending approval requests keyed by token
#[derive(Debug, Clone, Default)]
pub struct ApprovalLedger {
    pending: BTreeMap<String, ApprovalRequest>,
}

impl ApprovalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_requests(requests: Vec<ApprovalRequest>) -> Self {
        Self {
            pending: requests
                .into_iter()
                .map(|r| (r.token.clone(), r))
                .collect(),
        }
    }

    /// Register a new request valid for `ttl`
    #[allow(clippy::too_many_arguments)]
    pub fn issue(
        &mut self,
        message: impl Into<String>,
        author: impl Into<String>,
        approver: impl Into<String>,
        fingerprint: String,
        staged_paths: Vec<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> ApprovalRequest {
        let request = ApprovalRequest {
            token: uuid::Uuid::new_v4().to_string(),
            message: message.into(),
            author: author.into(),
            approver: approver.into(),
            fingerprint,
            staged_paths,
            requested_at: now,
            expires_at: now + ttl,
        };
        self.pending.insert(request.token.clone(), request.clone());
        request
    }

    /// Check that `token` is pending and unexpired. The ledger is left
    /// untouched; expired requests go through [`purge_expired`](Self::purge_expired).
    pub fn check(&self, token: &str, now: DateTime<Utc>) -> Result<&ApprovalRequest, Redemption> {
        match self.pending.get(token) {
            None => Err(Redemption::Unknown),
            Some(request) if request.is_expired(now) => Err(Redemption::Expired(request.clone())),
            Some(request) => Ok(request),
        }
    }

    /// Consume a token
    pub fn take(&mut self, token: &str) -> Option<ApprovalRequest> {
        self.pending.remove(token)
    }

    pub fn cancel(&mut self, token: &str) -> bool {
        self.pending.remove(token).is_some()
    }

    /// Drop every expired request, returning how many were removed
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, r| !r.is_expired(now));
        before - self.pending.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApprovalRequest> {
        self.pending.values()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(ledger: &mut ApprovalLedger, now: DateTime<Utc>) -> ApprovalRequest {
        ledger.issue(
            "msg",
            "alice",
            "alice@example.com",
            "fp".to_string(),
            vec!["a.md".to_string()],
            now,
            Duration::hours(1),
        )
    }

    #[test]
    fn test_issue_and_check() {
        let mut ledger = ApprovalLedger::new();
        let now = Utc::now();
        let request = issue(&mut ledger, now);

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.check(&request.token, now).unwrap().message, "msg");
        assert_eq!(ledger.check("nope", now).unwrap_err(), Redemption::Unknown);
    }

    #[test]
    fn test_check_reports_expiry_without_removing() {
        let mut ledger = ApprovalLedger::new();
        let now = Utc::now();
        let request = issue(&mut ledger, now);

        let later = now + Duration::hours(2);
        assert!(matches!(
            ledger.check(&request.token, later),
            Err(Redemption::Expired(_))
        ));
        assert_eq!(ledger.len(), 1);

        assert_eq!(ledger.purge_expired(later), 1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_take_is_one_shot() {
        let mut ledger = ApprovalLedger::new();
        let request = issue(&mut ledger, Utc::now());

        assert!(ledger.take(&request.token).is_some());
        assert!(ledger.take(&request.token).is_none());
    }

    #[test]
    fn test_purge_and_cancel() {
        let mut ledger = ApprovalLedger::new();
        let now = Utc::now();
        let a = issue(&mut ledger, now - Duration::hours(3));
        let b = issue(&mut ledger, now);

        assert_eq!(ledger.purge_expired(now), 1);
        assert!(ledger.iter().all(|r| r.token != a.token));
        assert!(ledger.cancel(&b.token));
        assert!(!ledger.cancel(&b.token));
    }

    #[test]
    fn test_log_notifier() {
        let request = issue(&mut ApprovalLedger::new(), Utc::now());
        assert!(LogNotifier.notify(&request).is_ok());
    }
}
