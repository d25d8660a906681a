//! The snapshot pipeline: enumerate profiles, list policies, persist
//! documents.
//!
//! Stages run strictly one after another on the calling task. The first
//! error aborts the run; files written before it stay on disk.

use std::path::PathBuf;

use crate::config::SnapshotConfig;
use crate::error::Result;
use crate::policy::PolicyRecord;
use crate::profile::enumerate_profiles;
use crate::session::{PolicyApi, SessionProvider};
use crate::store::SnapshotStore;

/// Policies listed for one profile
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilePolicies {
    /// Profile name
    pub profile: String,
    /// Records in listing order
    pub policies: Vec<PolicyRecord>,
}

/// Profile name to listed policies, in profile enumeration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePolicyMap {
    entries: Vec<ProfilePolicies>,
}

impl ProfilePolicyMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the policies for `profile`, replacing any previous entry in place.
    pub fn insert(&mut self, profile: impl Into<String>, policies: Vec<PolicyRecord>) {
        let profile = profile.into();
        match self.entries.iter_mut().find(|e| e.profile == profile) {
            Some(entry) => entry.policies = policies,
            None => self.entries.push(ProfilePolicies { profile, policies }),
        }
    }

    /// Policies listed for `profile`.
    pub fn get(&self, profile: &str) -> Option<&[PolicyRecord]> {
        self.entries
            .iter()
            .find(|e| e.profile == profile)
            .map(|e| e.policies.as_slice())
    }

    /// Profile names in insertion order.
    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.profile.as_str())
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no profiles were listed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for ProfilePolicyMap {
    type Item = ProfilePolicies;
    type IntoIter = std::vec::IntoIter<ProfilePolicies>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Files written for one profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSnapshot {
    /// Profile name
    pub profile: String,
    /// Profile directory
    pub dir: PathBuf,
    /// Snapshot files, in listing order
    pub files: Vec<PathBuf>,
}

/// Outcome of a complete run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Configured profiles skipped by the exclusion set
    pub excluded: Vec<String>,
    /// Per-profile output
    pub profiles: Vec<ProfileSnapshot>,
}

impl RunSummary {
    /// Total number of policy files written.
    pub fn files_written(&self) -> usize {
        self.profiles.iter().map(|p| p.files.len()).sum()
    }
}

/// List the customer-managed policies visible to one session.
pub async fn list_session_policies<S: PolicyApi + ?Sized>(
    session: &S,
) -> Result<Vec<PolicyRecord>> {
    let listing = session.list_local_policies().await?;
    if listing.truncated {
        tracing::warn!(
            profile = %session.profile(),
            returned = listing.policies.len(),
            "policy listing truncated, only the first page was captured"
        );
    }
    Ok(listing.policies.into_iter().map(PolicyRecord::from).collect())
}

/// Open a session per profile and list its policies.
pub async fn list_policies<P: SessionProvider + ?Sized>(
    sessions: &P,
    profiles: &[String],
) -> Result<ProfilePolicyMap> {
    let mut map = ProfilePolicyMap::new();
    for profile in profiles {
        let session = sessions.open(profile).await?;
        let policies = list_session_policies(&session).await?;
        tracing::info!(profile = %profile, policies = policies.len(), "listed policies");
        map.insert(profile.clone(), policies);
    }
    Ok(map)
}

/// Fetch each listed policy's document and write it to the store.
pub async fn fetch_and_persist<P: SessionProvider + ?Sized>(
    sessions: &P,
    map: ProfilePolicyMap,
    store: &SnapshotStore,
) -> Result<Vec<ProfileSnapshot>> {
    let mut snapshots = Vec::with_capacity(map.len());
    for ProfilePolicies { profile, policies } in map {
        let dir = store.ensure_profile_dir(&profile)?;
        let session = sessions.open(&profile).await?;

        let mut files = Vec::with_capacity(policies.len());
        for record in policies {
            let document = session
                .get_policy_version(&record.arn, &record.default_version_id)
                .await?;
            let record = record.with_document(document);
            files.push(store.write_record(&dir, &record)?);
        }

        tracing::info!(profile = %profile, files = files.len(), "saved policy snapshots");
        snapshots.push(ProfileSnapshot {
            profile,
            dir,
            files,
        });
    }
    Ok(snapshots)
}

/// List and persist the policies of `profiles`.
pub async fn snapshot_profiles<P: SessionProvider + ?Sized>(
    sessions: &P,
    profiles: &[String],
    store: &SnapshotStore,
) -> Result<Vec<ProfileSnapshot>> {
    let map = list_policies(sessions, profiles).await?;
    fetch_and_persist(sessions, map, store).await
}

/// Run every stage for the profiles named in `config`.
///
/// `notify` receives one `excluded <name>` notice per excluded profile,
/// before any session is opened.
pub async fn run<P, F>(
    config: &SnapshotConfig,
    sessions: &P,
    mut notify: F,
) -> Result<RunSummary>
where
    P: SessionProvider + ?Sized,
    F: FnMut(&str),
{
    let selection = enumerate_profiles(config)?;
    for notice in selection.notices() {
        notify(&notice);
    }
    let store = SnapshotStore::new(config.output_root.clone());
    let profiles = snapshot_profiles(sessions, &selection.retained, &store).await?;
    Ok(RunSummary {
        excluded: selection.excluded,
        profiles,
    })
}
