mod aws;
mod config;
mod diagnostics;
mod error;
mod linkage;
mod policy;
mod readiness;
mod resources;
mod responses;
mod scenario;
mod service;
#[cfg(test)]
mod testing;

use crate::aws::{AwsQueues, AwsTopics};
use crate::config::Args;
use crate::scenario::Provisioner;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sns_sqs_provisioner=info".into()),
        )
        .init();

    let sdk_config = args.load_sdk_config().await;
    let provisioner = Provisioner::new(
        Arc::new(AwsTopics::new(aws_sdk_sns::Client::new(&sdk_config))),
        Arc::new(AwsQueues::new(aws_sdk_sqs::Client::new(&sdk_config))),
        args.confirmation_gate(),
    );

    let request = args.run_request();
    tracing::info!(topic_name = %request.topic_name, strategy = ?request.strategy, "Starting");

    match provisioner.run(&request).await {
        Ok(report) => tracing::info!(
            topic_arn = %report.topic_arn,
            queue_url = %report.queue_url,
            queue_arn = ?report.queue_arn,
            email_subscribed = report.email_subscribed,
            message_id = ?report.published_message_id,
            received = report.received.len(),
            deleted = report.deleted_receipt_handle.is_some(),
            topic_deleted = report.topic_deleted,
            "Run complete"
        ),
        Err(err) => {
            for line in err.report_lines() {
                tracing::error!("{line}");
            }
        }
    }

    println!();
    println!("Press enter to exit...");
    readiness::wait_for_enter().await?;
    Ok(())
}
