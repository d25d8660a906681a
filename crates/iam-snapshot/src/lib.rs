//! iam-snapshot: customer-managed IAM policies, saved to disk per profile.
//!
//! A run reads the profile names from the AWS configuration file, opens a
//! session for each profile, lists its customer-managed policies and writes
//! every policy's default version document as sorted, indented JSON to
//! `<output root>/<profile>/<PolicyName>`.
//!
//! ```rust,ignore
//! use iam_snapshot::{AwsSessionProvider, SnapshotConfig};
//!
//! let config = SnapshotConfig::from_env().with_exclusions(["sandbox"]);
//! let summary = iam_snapshot::run(&config, &AwsSessionProvider, |notice| {
//!     println!("{notice}");
//! })
//! .await?;
//! println!("{} files written", summary.files_written());
//! ```

mod config;
mod error;
mod mock;
mod pipeline;
mod policy;
mod profile;
mod session;
mod store;

pub use config::{
    CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, DEFAULT_OUTPUT_ROOT, OUTPUT_ROOT_ENV, SnapshotConfig,
};
pub use error::{Result, SnapshotError};
pub use mock::{MockSession, MockSessionProvider};
pub use pipeline::{
    ProfilePolicies, ProfilePolicyMap, ProfileSnapshot, RunSummary, fetch_and_persist,
    list_policies, list_session_policies, run, snapshot_profiles,
};
pub use policy::{
    ListedPolicy, PolicyListing, PolicyRecord, PolicyVersionDocument, decode_policy_document,
};
pub use profile::{ProfileSelection, enumerate_profiles, read_profile_names, select_profiles};
pub use session::{AwsSessionProvider, IamSession, PolicyApi, SessionProvider};
pub use store::SnapshotStore;
