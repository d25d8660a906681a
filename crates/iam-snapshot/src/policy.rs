//! Policy records and their on-disk JSON form

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapshotError};

/// Indentation used for snapshot files
const INDENT: &[u8] = b"    ";

/// One entry of a customer-managed policy listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedPolicy {
    /// Policy name, unique within an account
    pub name: String,
    /// Policy ARN
    pub arn: String,
    /// Id of the version currently in effect
    pub default_version_id: String,
}

/// Response of a policy listing call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyListing {
    /// Policies in the order the provider returned them
    pub policies: Vec<ListedPolicy>,
    /// Whether the provider had more results than this page
    pub truncated: bool,
}

/// A fetched policy version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyVersionDocument {
    /// Permission statements
    pub document: serde_json::Value,
    /// Version id
    pub version_id: String,
    /// Whether this version is the policy's default
    pub is_default_version: bool,
    /// Creation time as ISO-8601 text
    pub create_date: Option<String>,
}

/// A customer-managed policy, optionally carrying its fetched document.
///
/// Records come out of the listing stage without a document; the detail
/// stage consumes each one and returns it populated via
/// [`PolicyRecord::with_document`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// Policy name, also the snapshot file name
    #[serde(rename = "PolicyName")]
    pub name: String,
    /// Policy ARN
    #[serde(rename = "PolicyArn")]
    pub arn: String,
    /// Version the document is fetched for
    #[serde(rename = "DefaultVersionId")]
    pub default_version_id: String,
    /// Fetched version, `None` until the detail stage has run
    #[serde(rename = "PolicyDocument")]
    pub document: Option<PolicyVersionDocument>,
}

impl From<ListedPolicy> for PolicyRecord {
    fn from(listed: ListedPolicy) -> Self {
        Self {
            name: listed.name,
            arn: listed.arn,
            default_version_id: listed.default_version_id,
            document: None,
        }
    }
}

impl PolicyRecord {
    /// Attach the fetched version document.
    pub fn with_document(self, document: PolicyVersionDocument) -> Self {
        Self {
            document: Some(document),
            ..self
        }
    }

    /// Whether the detail stage has populated this record.
    pub fn is_populated(&self) -> bool {
        self.document.is_some()
    }

    /// Render the snapshot file contents.
    ///
    /// Keys are sorted at every level and indented by four spaces, so the
    /// same record always renders to the same bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        // serde_json::Map is ordered by key
        let value = serde_json::to_value(self)?;
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        value.serialize(&mut serializer)?;
        Ok(out)
    }
}

/// Decode a policy document as returned by IAM (URL-encoded JSON).
pub fn decode_policy_document(encoded: &str) -> Result<serde_json::Value> {
    let decoded = urlencoding::decode(encoded)
        .map_err(|e| SnapshotError::UnsupportedType(format!("policy document: {e}")))?;
    Ok(serde_json::from_str(&decoded)?)
}
