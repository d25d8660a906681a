//! Run configuration

use std::collections::BTreeSet;
use std::path::PathBuf;

/// Default location of the AWS configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/root/.aws/config";

/// Default root directory snapshots are written under
pub const DEFAULT_OUTPUT_ROOT: &str = "/etc/aws/aws-permissions";

/// Environment variable overriding the configuration file path.
///
/// This is the same variable the AWS SDK reads, so profile enumeration and
/// session credentials come from one file.
pub const CONFIG_PATH_ENV: &str = "AWS_CONFIG_FILE";

/// Environment variable overriding the output root
pub const OUTPUT_ROOT_ENV: &str = "IAM_SNAPSHOT_OUTPUT_DIR";

/// Settings for a single snapshot run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    /// INI-style file listing the configured profiles
    pub config_path: PathBuf,
    /// Directory holding one subdirectory per profile
    pub output_root: PathBuf,
    /// Profile names to skip
    pub exclusions: BTreeSet<String>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            exclusions: BTreeSet::new(),
        }
    }
}

impl SnapshotConfig {
    /// Build a config from the defaults, applying any environment overrides.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            config.config_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(OUTPUT_ROOT_ENV).filter(|p| !p.is_empty()) {
            config.output_root = PathBuf::from(path);
        }
        config
    }

    /// Replace the exclusion set.
    pub fn with_exclusions<I, S>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions = exclusions.into_iter().map(Into::into).collect();
        self
    }

    /// Directory a profile's policies are written to.
    pub fn profile_dir(&self, profile: &str) -> PathBuf {
        self.output_root.join(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SnapshotConfig::default();
        assert_eq!(config.config_path, PathBuf::from("/root/.aws/config"));
        assert_eq!(
            config.output_root,
            PathBuf::from("/etc/aws/aws-permissions")
        );
        assert!(config.exclusions.is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let config = SnapshotConfig::from_lookup(|key| match key {
            CONFIG_PATH_ENV => Some("/tmp/aws/config".to_string()),
            OUTPUT_ROOT_ENV => Some("/tmp/out".to_string()),
            _ => None,
        });
        assert_eq!(config.config_path, PathBuf::from("/tmp/aws/config"));
        assert_eq!(config.output_root, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let config = SnapshotConfig::from_lookup(|_| Some(String::new()));
        assert_eq!(config, SnapshotConfig::default());
    }

    #[test]
    fn test_exclusions_and_profile_dir() {
        let config = SnapshotConfig::default().with_exclusions(["test", "test", "sandbox"]);
        assert_eq!(config.exclusions.len(), 2);
        assert!(config.exclusions.contains("sandbox"));
        assert_eq!(
            config.profile_dir("prod"),
            PathBuf::from("/etc/aws/aws-permissions/prod")
        );
    }
}
