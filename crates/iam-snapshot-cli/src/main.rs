//! iam-snapshot CLI
//!
//! Saves the customer-managed IAM policies of every profile in the AWS
//! configuration file.
//!
//! Usage:
//!   iam-snapshot                    Snapshot every configured profile
//!   iam-snapshot -e test -e dev     Skip the `test` and `dev` profiles

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use iam_snapshot::{AwsSessionProvider, SnapshotConfig};

/// Save customer-managed IAM policies for each configured AWS profile
#[derive(Parser, Debug)]
#[command(name = "iam-snapshot")]
#[command(about = "Save customer-managed IAM policies for each AWS profile")]
struct Args {
    /// Profile to skip (repeatable)
    #[arg(short, long = "exclude", value_name = "NAME")]
    exclude: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the exclusion notices
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();
    let config = SnapshotConfig::from_env().with_exclusions(args.exclude);

    let summary = iam_snapshot::run(&config, &AwsSessionProvider, |notice| {
        println!("{notice}");
    })
    .await
    .context("policy snapshot aborted")?;

    tracing::info!(
        profiles = summary.profiles.len(),
        files = summary.files_written(),
        root = %config.output_root.display(),
        "snapshot complete"
    );

    Ok(())
}
