//! End-to-end runs against a config file on disk and a mock policy API.

#![allow(clippy::unwrap_used)] // unwrap is acceptable in tests

use std::path::Path;
use std::sync::Once;

use serde_json::json;

use iam_snapshot::{
    ListedPolicy, MockSessionProvider, PolicyVersionDocument, SnapshotConfig, SnapshotError, run,
};

static INIT_TRACING: Once = Once::new();

fn init_tracing() {
    INIT_TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("iam_snapshot=debug")
            .with_test_writer()
            .init();
    });
}

const AWS_CONFIG: &str = "\
[profile prod]
region = us-east-1

[profile dev]
region = us-west-2

[profile test]
region = eu-central-1
";

fn listed(account: &str, name: &str) -> ListedPolicy {
    ListedPolicy {
        name: name.to_string(),
        arn: format!("arn:aws:iam::{account}:policy/{name}"),
        default_version_id: "v1".to_string(),
    }
}

fn version(resource: &str) -> PolicyVersionDocument {
    PolicyVersionDocument {
        document: json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Sid": "Scoped",
                "Effect": "Allow",
                "Action": ["s3:GetObject", "s3:ListBucket"],
                "Resource": resource
            }]
        }),
        version_id: "v1".to_string(),
        is_default_version: true,
        create_date: Some("2021-03-04T05:06:07Z".to_string()),
    }
}

fn setup(root: &Path) -> SnapshotConfig {
    let config_path = root.join("config");
    std::fs::write(&config_path, AWS_CONFIG).unwrap();
    SnapshotConfig {
        config_path,
        output_root: root.join("permissions"),
        ..SnapshotConfig::default()
    }
}

fn provider() -> MockSessionProvider {
    MockSessionProvider::new()
        .with_policy("prod", listed("111111111111", "Ops"), version("arn:aws:s3:::ops/*"))
        .with_policy("prod", listed("111111111111", "Audit"), version("*"))
        .with_profile("dev")
        .with_policy("test", listed("333333333333", "Scratch"), version("*"))
}

#[tokio::test]
async fn test_excluded_profile_is_never_touched() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let config = setup(tmp.path()).with_exclusions(["test"]);
    let provider = provider();
    let mut notices = Vec::new();

    let summary = run(&config, &provider, |notice| notices.push(notice.to_string()))
        .await
        .unwrap();

    assert_eq!(notices, vec!["excluded test"]);
    assert_eq!(summary.excluded, vec!["test"]);
    assert_eq!(
        summary
            .profiles
            .iter()
            .map(|p| p.profile.as_str())
            .collect::<Vec<_>>(),
        vec!["prod", "dev"]
    );
    assert_eq!(summary.files_written(), 2);
    assert!(!config.output_root.join("test").exists());
    assert!(!provider.opened_sessions().iter().any(|p| p == "test"));

    // Profile with no policies still gets its directory
    let dev = config.output_root.join("dev");
    assert!(dev.is_dir());
    assert_eq!(std::fs::read_dir(dev).unwrap().count(), 0);
}

#[tokio::test]
async fn test_written_file_round_trips() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let config = setup(tmp.path()).with_exclusions(["test"]);

    run(&config, &provider(), |_| {}).await.unwrap();

    let raw = std::fs::read_to_string(config.output_root.join("prod").join("Ops")).unwrap();
    assert!(raw.starts_with("{\n    \"DefaultVersionId\": \"v1\",\n"));

    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(
        object.keys().collect::<Vec<_>>(),
        vec!["DefaultVersionId", "PolicyArn", "PolicyDocument", "PolicyName"]
    );
    assert_eq!(object["PolicyArn"], "arn:aws:iam::111111111111:policy/Ops");
    assert_eq!(
        object["PolicyDocument"],
        serde_json::to_value(version("arn:aws:s3:::ops/*")).unwrap()
    );
    assert_eq!(
        object["PolicyDocument"]["CreateDate"],
        "2021-03-04T05:06:07Z"
    );
}

#[tokio::test]
async fn test_second_run_overwrites_identically() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let config = setup(tmp.path());
    let provider = provider();

    run(&config, &provider, |_| {}).await.unwrap();
    let first = std::fs::read(config.output_root.join("test").join("Scratch")).unwrap();

    let summary = run(&config, &provider, |_| {}).await.unwrap();
    let second = std::fs::read(config.output_root.join("test").join("Scratch")).unwrap();

    assert_eq!(first, second);
    assert_eq!(summary.files_written(), 3);
}

#[tokio::test]
async fn test_failure_leaves_earlier_profiles_on_disk() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let config = setup(tmp.path());
    let provider = MockSessionProvider::new()
        .with_policy("prod", listed("111111111111", "Ops"), version("*"))
        .with_policy("dev", listed("222222222222", "First"), version("*"))
        .with_policy("dev", listed("222222222222", "Second"), version("*"))
        .with_policy("dev", listed("222222222222", "Third"), version("*"))
        .with_failing_policy("dev", "arn:aws:iam::222222222222:policy/Second")
        .with_profile("test");

    let result = run(&config, &provider, |_| {}).await;

    assert!(matches!(result, Err(SnapshotError::ApiError { .. })));
    let root = &config.output_root;
    assert!(root.join("prod").join("Ops").is_file());
    assert!(root.join("dev").join("First").is_file());
    assert!(!root.join("dev").join("Second").exists());
    assert!(!root.join("dev").join("Third").exists());
    assert!(!root.join("test").exists());
}

#[tokio::test]
async fn test_missing_config_aborts_before_any_session() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let config = SnapshotConfig {
        config_path: tmp.path().join("missing"),
        output_root: tmp.path().join("permissions"),
        ..SnapshotConfig::default()
    };
    let provider = provider();
    let mut notified = 0;

    let result = run(&config, &provider, |_| notified += 1).await;

    assert!(matches!(
        result,
        Err(SnapshotError::ConfigurationUnavailable { .. })
    ));
    assert_eq!(notified, 0);
    assert!(provider.opened_sessions().is_empty());
    assert!(!config.output_root.exists());
}

#[tokio::test]
async fn test_notices_precede_failing_session() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let config = setup(tmp.path()).with_exclusions(["dev", "test"]);
    // prod is not registered, so its session fails to authenticate
    let provider = MockSessionProvider::new().with_profile("dev");
    let mut notices = Vec::new();

    let result = run(&config, &provider, |notice| notices.push(notice.to_string())).await;

    assert!(matches!(
        result,
        Err(SnapshotError::AuthenticationFailure { .. })
    ));
    assert_eq!(notices, vec!["excluded dev", "excluded test"]);
}

#[tokio::test]
async fn test_listing_failure_writes_nothing() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let config = setup(tmp.path());
    let provider = provider().with_failing_listing("dev");

    let result = run(&config, &provider, |_| {}).await;

    assert!(matches!(result, Err(SnapshotError::ApiError { .. })));
    assert!(!config.output_root.exists());
    assert_eq!(provider.opened_sessions(), vec!["prod", "dev"]);
}
