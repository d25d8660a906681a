//! Profile-scoped sessions against the policy API.
//!
//! A session is opened for exactly one profile and carries that profile's
//! credentials; the pipeline never switches profiles on a live session.
//! [`AwsSessionProvider`] talks to AWS IAM; tests supply their own
//! [`SessionProvider`].

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_iam::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_iam::primitives::DateTimeFormat;
use aws_sdk_iam::types::{Policy, PolicyScopeType, PolicyVersion};

use crate::error::{Result, SnapshotError};
use crate::policy::{ListedPolicy, PolicyListing, PolicyVersionDocument, decode_policy_document};

/// Service error codes meaning the caller's credentials were rejected
const AUTH_ERROR_CODES: &[&str] = &[
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "UnrecognizedClientException",
    "MissingAuthenticationToken",
];

/// The two read-only policy operations a snapshot needs
#[async_trait]
pub trait PolicyApi: Send + Sync {
    /// Profile this session is scoped to
    fn profile(&self) -> &str;

    /// List customer-managed policies (first page only).
    async fn list_local_policies(&self) -> Result<PolicyListing>;

    /// Fetch one version of a policy.
    async fn get_policy_version(
        &self,
        arn: &str,
        version_id: &str,
    ) -> Result<PolicyVersionDocument>;
}

/// Opens sessions scoped to a named profile
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Session type handed to the pipeline
    type Session: PolicyApi;

    /// Authenticate as `profile`.
    async fn open(&self, profile: &str) -> Result<Self::Session>;
}

/// Session provider backed by the AWS SDK's profile resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsSessionProvider;

#[async_trait]
impl SessionProvider for AwsSessionProvider {
    type Session = IamSession;

    async fn open(&self, profile: &str) -> Result<IamSession> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(profile)
            .load()
            .await;

        // Resolve credentials up front so a broken profile fails here rather
        // than on its first API call.
        let credentials =
            sdk_config
                .credentials_provider()
                .ok_or_else(|| SnapshotError::AuthenticationFailure {
                    profile: profile.to_string(),
                    reason: "no credentials provider configured".to_string(),
                })?;
        credentials.provide_credentials().await.map_err(|e| {
            SnapshotError::AuthenticationFailure {
                profile: profile.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            }
        })?;

        tracing::debug!(
            profile = %profile,
            region = ?sdk_config.region(),
            "opened IAM session"
        );

        Ok(IamSession {
            profile: profile.to_string(),
            client: aws_sdk_iam::Client::new(&sdk_config),
        })
    }
}

/// An IAM client authenticated as one profile
#[derive(Debug, Clone)]
pub struct IamSession {
    profile: String,
    client: aws_sdk_iam::Client,
}

impl IamSession {
    fn api_error<E, R>(&self, operation: &'static str, err: SdkError<E, R>) -> SnapshotError
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug + 'static,
    {
        let reason = DisplayErrorContext(&err).to_string();
        if is_auth_error_code(err.code()) {
            SnapshotError::AuthenticationFailure {
                profile: self.profile.clone(),
                reason,
            }
        } else {
            SnapshotError::ApiError {
                profile: self.profile.clone(),
                operation,
                reason,
            }
        }
    }
}

#[async_trait]
impl PolicyApi for IamSession {
    fn profile(&self) -> &str {
        &self.profile
    }

    async fn list_local_policies(&self) -> Result<PolicyListing> {
        let output = self
            .client
            .list_policies()
            .scope(PolicyScopeType::Local)
            .send()
            .await
            .map_err(|e| self.api_error("ListPolicies", e))?;

        let policies = output
            .policies()
            .iter()
            .map(|policy| listed_policy(&self.profile, policy))
            .collect::<Result<Vec<_>>>()?;

        Ok(PolicyListing {
            policies,
            truncated: output.is_truncated(),
        })
    }

    async fn get_policy_version(
        &self,
        arn: &str,
        version_id: &str,
    ) -> Result<PolicyVersionDocument> {
        let output = self
            .client
            .get_policy_version()
            .policy_arn(arn)
            .version_id(version_id)
            .send()
            .await
            .map_err(|e| self.api_error("GetPolicyVersion", e))?;

        let version = output.policy_version().ok_or_else(|| {
            malformed(&self.profile, "GetPolicyVersion", "response missing PolicyVersion")
        })?;
        version_document(&self.profile, version)
    }
}

fn malformed(profile: &str, operation: &'static str, reason: &str) -> SnapshotError {
    SnapshotError::ApiError {
        profile: profile.to_string(),
        operation,
        reason: reason.to_string(),
    }
}

/// Convert one `ListPolicies` entry; every identifying field is required.
fn listed_policy(profile: &str, policy: &Policy) -> Result<ListedPolicy> {
    let field = |value: Option<&str>, name: &str| {
        value
            .map(str::to_string)
            .ok_or_else(|| malformed(profile, "ListPolicies", &format!("entry missing {name}")))
    };
    Ok(ListedPolicy {
        name: field(policy.policy_name(), "PolicyName")?,
        arn: field(policy.arn(), "Arn")?,
        default_version_id: field(policy.default_version_id(), "DefaultVersionId")?,
    })
}

fn version_document(profile: &str, version: &PolicyVersion) -> Result<PolicyVersionDocument> {
    let encoded = version
        .document()
        .ok_or_else(|| malformed(profile, "GetPolicyVersion", "response missing Document"))?;
    let version_id = version
        .version_id()
        .ok_or_else(|| malformed(profile, "GetPolicyVersion", "response missing VersionId"))?;
    let create_date = version
        .create_date()
        .map(|date| date.fmt(DateTimeFormat::DateTime))
        .transpose()
        .map_err(|e| SnapshotError::UnsupportedType(format!("CreateDate: {e}")))?;

    Ok(PolicyVersionDocument {
        document: decode_policy_document(encoded)?,
        version_id: version_id.to_string(),
        is_default_version: version.is_default_version(),
        create_date,
    })
}

fn is_auth_error_code(code: Option<&str>) -> bool {
    code.is_some_and(|code| AUTH_ERROR_CODES.contains(&code))
}
