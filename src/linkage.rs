use crate::error::{ProvisionError, ProvisionResult};
use crate::policy::{Policy, QueueAction, Statement};
use crate::resources::Protocol;
use crate::responses::Attributes;
use crate::service::{attribute, QueueService, TopicService};
use clap::ValueEnum;

/// How the queue is attached to the topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SubscriptionStrategy {
    /// Subscribe, then overwrite the queue policy with a hand-built document.
    #[default]
    ManualPolicy,
    /// One call that subscribes the queue and merges a send permission into its policy.
    Convenience,
}

/// Subscribes `queue_arn` to `topic_arn` and grants the topic access to the queue.
pub async fn link_queue(
    strategy: SubscriptionStrategy,
    topics: &dyn TopicService,
    queues: &dyn QueueService,
    topic_arn: &str,
    queue_url: &str,
    queue_arn: &str,
) -> ProvisionResult<Option<String>> {
    match strategy {
        SubscriptionStrategy::ManualPolicy => {
            subscribe_with_policy(topics, queues, topic_arn, queue_url, queue_arn).await
        }
        SubscriptionStrategy::Convenience => {
            subscribe_queue(topics, queues, topic_arn, queue_url).await
        }
    }
}

async fn subscribe_with_policy(
    topics: &dyn TopicService,
    queues: &dyn QueueService,
    topic_arn: &str,
    queue_url: &str,
    queue_arn: &str,
) -> ProvisionResult<Option<String>> {
    let subscription_arn = topics
        .subscribe(topic_arn, Protocol::Sqs, queue_arn)
        .await?;

    let policy = Policy::topic_delivery(
        topic_arn,
        queue_arn,
        &[QueueAction::SendMessage, QueueAction::ReceiveMessage],
    );
    tracing::warn!(
        queue_arn,
        topic_arn,
        "Queue policy grants all principals, restricted only by source ARN"
    );

    queues
        .set_queue_attributes(
            queue_url,
            Attributes::from([(attribute::POLICY.to_string(), policy.to_json()?)]),
        )
        .await?;

    Ok(subscription_arn)
}

/// Subscribes the queue at `queue_url` to `topic_arn`, adding a send permission
/// for the topic to whatever policy the queue already carries.
pub async fn subscribe_queue(
    topics: &dyn TopicService,
    queues: &dyn QueueService,
    topic_arn: &str,
    queue_url: &str,
) -> ProvisionResult<Option<String>> {
    let attributes = queues.get_queue_attributes(queue_url).await?;
    let queue_arn = attributes
        .get(attribute::QUEUE_ARN)
        .cloned()
        .ok_or(ProvisionError::MissingField {
            operation: "GetQueueAttributes",
            field: attribute::QUEUE_ARN,
        })?;

    let mut policy = match attributes.get(attribute::POLICY) {
        Some(json) if !json.is_empty() => Policy::from_json(json)?,
        _ => Policy::default(),
    };
    let statement = Statement::topic_delivery(topic_arn, &queue_arn, &[QueueAction::SendMessage]);

    if policy.allows_topic(topic_arn, &queue_arn) {
        tracing::debug!(queue_arn = %queue_arn, topic_arn, "Queue policy already allows topic");
    } else if policy.merge_statement(statement) {
        queues
            .set_queue_attributes(
                queue_url,
                Attributes::from([(attribute::POLICY.to_string(), policy.to_json()?)]),
            )
            .await?;
    } else {
        tracing::warn!(
            queue_arn = %queue_arn,
            topic_arn,
            "Queue policy has a statement with the same Sid that does not allow the topic, leaving it unchanged"
        );
    }

    let subscription_arn = topics
        .subscribe(topic_arn, Protocol::Sqs, &queue_arn)
        .await?;

    Ok(subscription_arn)
}
