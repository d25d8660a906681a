//! In-memory session provider for exercising the pipeline without AWS.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Result, SnapshotError};
use crate::policy::{ListedPolicy, PolicyListing, PolicyVersionDocument};
use crate::session::{PolicyApi, SessionProvider};

#[derive(Debug, Clone, Default)]
struct MockAccount {
    policies: Vec<(ListedPolicy, PolicyVersionDocument)>,
    truncated: bool,
    failing_arns: HashSet<String>,
    fail_listing: bool,
}

/// Session provider serving canned policies per profile.
///
/// Profiles that were never registered fail to authenticate, like a profile
/// missing from the AWS configuration would.
#[derive(Debug, Clone, Default)]
pub struct MockSessionProvider {
    accounts: HashMap<String, MockAccount>,
    opened: Arc<Mutex<Vec<String>>>,
}

impl MockSessionProvider {
    /// Create a provider with no profiles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile with no customer-managed policies.
    pub fn with_profile(mut self, profile: &str) -> Self {
        self.accounts.entry(profile.to_string()).or_default();
        self
    }

    /// Add a policy and the document its default version resolves to.
    pub fn with_policy(
        mut self,
        profile: &str,
        policy: ListedPolicy,
        document: PolicyVersionDocument,
    ) -> Self {
        self.accounts
            .entry(profile.to_string())
            .or_default()
            .policies
            .push((policy, document));
        self
    }

    /// Flag the profile's listing as truncated.
    pub fn with_truncated_listing(mut self, profile: &str) -> Self {
        self.accounts.entry(profile.to_string()).or_default().truncated = true;
        self
    }

    /// Make the listing call fail for `profile`.
    pub fn with_failing_listing(mut self, profile: &str) -> Self {
        self.accounts.entry(profile.to_string()).or_default().fail_listing = true;
        self
    }

    /// Make fetching the version of `arn` fail for `profile`.
    pub fn with_failing_policy(mut self, profile: &str, arn: &str) -> Self {
        self.accounts
            .entry(profile.to_string())
            .or_default()
            .failing_arns
            .insert(arn.to_string());
        self
    }

    /// Profiles sessions were opened for, in order.
    pub fn opened_sessions(&self) -> Vec<String> {
        self.opened
            .lock()
            .map(|opened| opened.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionProvider for MockSessionProvider {
    type Session = MockSession;

    async fn open(&self, profile: &str) -> Result<MockSession> {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(profile.to_string());
        }
        let account =
            self.accounts
                .get(profile)
                .cloned()
                .ok_or_else(|| SnapshotError::AuthenticationFailure {
                    profile: profile.to_string(),
                    reason: "profile not configured".to_string(),
                })?;
        Ok(MockSession {
            profile: profile.to_string(),
            account,
        })
    }
}

/// Session returned by [`MockSessionProvider`]
#[derive(Debug, Clone)]
pub struct MockSession {
    profile: String,
    account: MockAccount,
}

#[async_trait]
impl PolicyApi for MockSession {
    fn profile(&self) -> &str {
        &self.profile
    }

    async fn list_local_policies(&self) -> Result<PolicyListing> {
        if self.account.fail_listing {
            return Err(SnapshotError::ApiError {
                profile: self.profile.clone(),
                operation: "ListPolicies",
                reason: "AccessDenied".to_string(),
            });
        }
        Ok(PolicyListing {
            policies: self
                .account
                .policies
                .iter()
                .map(|(policy, _)| policy.clone())
                .collect(),
            truncated: self.account.truncated,
        })
    }

    async fn get_policy_version(
        &self,
        arn: &str,
        version_id: &str,
    ) -> Result<PolicyVersionDocument> {
        let not_found = || SnapshotError::ApiError {
            profile: self.profile.clone(),
            operation: "GetPolicyVersion",
            reason: format!("NoSuchEntity: {arn} {version_id}"),
        };
        if self.account.failing_arns.contains(arn) {
            return Err(not_found());
        }
        self.account
            .policies
            .iter()
            .find(|(policy, _)| policy.arn == arn && policy.default_version_id == version_id)
            .map(|(_, document)| document.clone())
            .ok_or_else(not_found)
    }
}
