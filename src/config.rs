use crate::linkage::SubscriptionStrategy;
use crate::readiness::{ConfirmationGate, ConsoleGate, PropagationPolicy, SubscriptionPollGate};
use crate::scenario::RunRequest;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// How an email subscription is confirmed before the run continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ConfirmMode {
    /// Wait for the operator to press enter.
    #[default]
    Console,
    /// Poll the topic until the subscription is no longer pending.
    Poll,
}

#[derive(Parser, Debug)]
#[command(name = "sns-sqs-provisioner")]
#[command(
    about = "Create an SNS topic and SQS queue, link them, and round-trip a test message",
    long_about = None
)]
pub struct Args {
    /// Name of the topic to create
    pub topic_name: String,

    /// Email address to subscribe; omit or pass "" to skip
    pub email: Option<String>,

    /// How the queue is subscribed to the topic
    #[arg(long, value_enum, default_value_t, env = "PROVISIONER_STRATEGY")]
    pub strategy: SubscriptionStrategy,

    /// How an email subscription is confirmed
    #[arg(long, value_enum, default_value_t, env = "PROVISIONER_CONFIRM")]
    pub confirm: ConfirmMode,

    /// Service endpoint override, e.g. a local emulator
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    pub endpoint_url: Option<Url>,

    /// Region override
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Upper bound on waiting for the subscription to become visible
    #[arg(long, default_value = "5000", env = "PROVISIONER_PROPAGATION_MAX_WAIT_MS")]
    pub propagation_max_wait_ms: u64,

    /// First interval between propagation checks; doubles up to 2s
    #[arg(
        long,
        default_value = "250",
        env = "PROVISIONER_PROPAGATION_INTERVAL_MS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub propagation_interval_ms: u64,

    /// Delete the topic once the test message has been handled
    #[arg(long, env = "PROVISIONER_DELETE_TOPIC")]
    pub delete_topic: bool,
}

impl Args {
    pub fn run_request(&self) -> RunRequest {
        RunRequest {
            topic_name: self.topic_name.clone(),
            email: self.email.as_deref().unwrap_or_default().trim().to_string(),
            strategy: self.strategy,
            propagation: PropagationPolicy {
                max_wait: Duration::from_millis(self.propagation_max_wait_ms),
                initial_interval: Duration::from_millis(self.propagation_interval_ms),
                ..PropagationPolicy::default()
            },
            delete_topic: self.delete_topic,
        }
    }

    pub fn confirmation_gate(&self) -> Arc<dyn ConfirmationGate> {
        match self.confirm {
            ConfirmMode::Console => Arc::new(ConsoleGate),
            ConfirmMode::Poll => Arc::new(SubscriptionPollGate::default()),
        }
    }

    /// `scheme://host:port` of the endpoint override, without path.
    pub fn endpoint(&self) -> Option<String> {
        self.endpoint_url.as_ref().map(|url| {
            format!(
                "{}://{}:{}",
                url.scheme(),
                url.host_str().unwrap_or_default(),
                url.port_or_known_default().unwrap_or(4566)
            )
        })
    }

    pub async fn load_sdk_config(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(endpoint) = self.endpoint() {
            tracing::info!(endpoint = %endpoint, "Using endpoint override");
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        loader.load().await
    }
}
