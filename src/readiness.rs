//! Waiting on things outside our control: a human confirming an email
//! subscription, and the services propagating a new subscription and policy.

use crate::error::ProvisionResult;
use crate::policy::Policy;
use crate::resources::Protocol;
use crate::service::{attribute, QueueService, TopicService};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;

/// Blocks until the owner of an email endpoint has confirmed the subscription.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn wait_for_confirmation(
        &self,
        topics: &dyn TopicService,
        topic_arn: &str,
        email: &str,
    ) -> ProvisionResult<()>;
}

/// Asks the operator to press enter once the confirmation link was clicked.
#[derive(Debug, Default)]
pub struct ConsoleGate;

#[async_trait]
impl ConfirmationGate for ConsoleGate {
    async fn wait_for_confirmation(
        &self,
        _topics: &dyn TopicService,
        _topic_arn: &str,
        email: &str,
    ) -> ProvisionResult<()> {
        println!();
        println!("Please check your email ({email}) and press enter when you are subscribed...");
        wait_for_enter().await?;
        Ok(())
    }
}

/// Reads and discards one line from stdin.
pub async fn wait_for_enter() -> std::io::Result<()> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(())
}

/// Polls the topic's subscriptions until the email endpoint is no longer pending.
#[derive(Debug, Clone)]
pub struct SubscriptionPollGate {
    pub interval: Duration,
}

impl Default for SubscriptionPollGate {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl ConfirmationGate for SubscriptionPollGate {
    async fn wait_for_confirmation(
        &self,
        topics: &dyn TopicService,
        topic_arn: &str,
        email: &str,
    ) -> ProvisionResult<()> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if email_confirmed(topics, topic_arn, email).await? {
                tracing::info!(email, attempt, "Email subscription confirmed");
                return Ok(());
            }
            tracing::info!(email, attempt, "Waiting for email subscription confirmation");
            tokio::time::sleep(self.interval).await;
        }
    }
}

async fn email_confirmed(
    topics: &dyn TopicService,
    topic_arn: &str,
    email: &str,
) -> ProvisionResult<bool> {
    let mut next_token = None;
    loop {
        let page = topics
            .list_subscriptions_by_topic(topic_arn, next_token)
            .await?;
        let confirmed = page.subscriptions.iter().any(|s| {
            s.protocol == Protocol::Email.as_str() && s.endpoint == email && !s.is_pending()
        });
        if confirmed {
            return Ok(true);
        }
        match page.next_token {
            Some(token) => next_token = Some(token),
            None => return Ok(false),
        }
    }
}

/// Shortest pause between propagation checks, whatever the policy says.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Bounds and backoff for the subscription propagation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationPolicy {
    pub max_wait: Duration,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for PropagationPolicy {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(5),
            initial_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(2),
        }
    }
}

/// Polls until the queue policy authorises the topic and the topic lists the
/// queue as a subscriber, or until `policy.max_wait` elapses.
///
/// Returns whether readiness was observed. Timing out is not an error.
pub async fn wait_for_link(
    topics: &dyn TopicService,
    queues: &dyn QueueService,
    topic_arn: &str,
    queue_url: &str,
    queue_arn: &str,
    policy: PropagationPolicy,
) -> ProvisionResult<bool> {
    let deadline = Instant::now() + policy.max_wait;
    let mut interval = policy.initial_interval.max(MIN_POLL_INTERVAL);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        if link_visible(topics, queues, topic_arn, queue_url, queue_arn).await? {
            tracing::info!(attempt, "Subscription and queue policy are visible");
            return Ok(true);
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(
                attempt,
                max_wait_ms = policy.max_wait.as_millis() as u64,
                "Subscription not confirmed visible before deadline, publishing anyway"
            );
            return Ok(false);
        }

        tokio::time::sleep(interval.min(deadline - now)).await;
        interval = (interval * 2)
            .min(policy.max_interval)
            .max(MIN_POLL_INTERVAL);
    }
}

async fn link_visible(
    topics: &dyn TopicService,
    queues: &dyn QueueService,
    topic_arn: &str,
    queue_url: &str,
    queue_arn: &str,
) -> ProvisionResult<bool> {
    let attributes = queues.get_queue_attributes(queue_url).await?;
    let policy_ok = match attributes.get(attribute::POLICY).map(|json| Policy::from_json(json)) {
        Some(Ok(policy)) => policy.allows_topic(topic_arn, queue_arn),
        Some(Err(err)) => {
            tracing::debug!(error = %err, "Queue policy not readable yet");
            false
        }
        None => false,
    };
    if !policy_ok {
        return Ok(false);
    }

    let mut next_token = None;
    loop {
        let page = topics
            .list_subscriptions_by_topic(topic_arn, next_token)
            .await?;
        if page
            .subscriptions
            .iter()
            .any(|s| s.protocol == Protocol::Sqs.as_str() && s.endpoint == queue_arn)
        {
            return Ok(true);
        }
        match page.next_token {
            Some(token) => next_token = Some(token),
            None => return Ok(false),
        }
    }
}
