//! Profile enumeration from the AWS configuration file.
//!
//! Only section headers matter here. Each profile section is labeled
//! `[profile <name>]`; the AWS convention `[default]` names the `default`
//! profile. Section bodies (credentials, region) are left to the SDK when a
//! session is opened.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::config::SnapshotConfig;
use crate::error::{Result, SnapshotError};

const PROFILE_KIND: &str = "profile";
const DEFAULT_PROFILE: &str = "default";

/// Outcome of applying the exclusion set to the configured profiles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSelection {
    /// Profiles to snapshot, in file order
    pub retained: Vec<String>,
    /// Configured profiles that were skipped, in file order
    pub excluded: Vec<String>,
}

impl ProfileSelection {
    /// Human-readable notices, one per excluded profile.
    pub fn notices(&self) -> impl Iterator<Item = String> + '_ {
        self.excluded.iter().map(|name| format!("excluded {name}"))
    }
}

/// Read the configuration file and select the profiles to snapshot.
pub fn enumerate_profiles(config: &SnapshotConfig) -> Result<ProfileSelection> {
    let names = read_profile_names(&config.config_path)?;
    Ok(select_profiles(names, &config.exclusions))
}

/// Read the profile names configured in `path`, in file order.
pub fn read_profile_names(path: &Path) -> Result<Vec<String>> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| SnapshotError::ConfigurationUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    parse_profile_names(&contents).map_err(|reason| SnapshotError::ConfigurationUnavailable {
        path: path.to_path_buf(),
        reason,
    })
}

/// Split `names` into retained and excluded profiles.
pub fn select_profiles(names: Vec<String>, exclusions: &BTreeSet<String>) -> ProfileSelection {
    let mut selection = ProfileSelection::default();
    for name in names {
        if exclusions.contains(&name) {
            tracing::debug!(profile = %name, "excluded profile");
            selection.excluded.push(name);
        } else {
            selection.retained.push(name);
        }
    }
    selection
}

fn parse_profile_names(contents: &str) -> std::result::Result<Vec<String>, String> {
    let mut names = Vec::new();
    let mut seen_headers = HashSet::new();
    let mut in_section = false;

    for (index, raw) in contents.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if is_blank_or_comment(line) {
            continue;
        }

        if !line.starts_with('[') {
            if !in_section {
                return Err(format!("line {line_no}: entry outside of any section"));
            }
            continue;
        }

        let header = line
            .strip_prefix('[')
            .and_then(|rest| rest.split_once(']'))
            .filter(|(_, trailing)| is_blank_or_comment(trailing.trim()))
            .map(|(header, _)| header)
            .ok_or_else(|| format!("line {line_no}: unterminated section header"))?;
        if !seen_headers.insert(header.to_string()) {
            return Err(format!("line {line_no}: duplicate section [{header}]"));
        }
        in_section = true;

        let tokens: Vec<&str> = header.split_whitespace().collect();
        match tokens.as_slice() {
            [DEFAULT_PROFILE] => names.push(DEFAULT_PROFILE.to_string()),
            [PROFILE_KIND, name] => names.push((*name).to_string()),
            [kind, _] => {
                tracing::debug!(kind = %kind, "skipping non-profile section");
            }
            _ => {
                return Err(format!(
                    "line {line_no}: section [{header}] is not of the form [<kind> <name>]"
                ));
            }
        }
    }

    Ok(names)
}

fn is_blank_or_comment(text: &str) -> bool {
    text.is_empty() || text.starts_with('#') || text.starts_with(';')
}
