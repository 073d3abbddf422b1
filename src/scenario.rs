//! The provisioning run: topic, optional email subscriber, queue, link,
//! publish, receive, delete.

use crate::diagnostics;
use crate::error::{ProvisionError, ProvisionResult};
use crate::linkage::{self, SubscriptionStrategy};
use crate::readiness::{self, ConfirmationGate, PropagationPolicy};
use crate::resources::{
    Protocol, Queue, ReceivedMessage, RunReport, Topic, QUEUE_NAME, RECEIVE_WAIT_SECONDS,
    TEST_BODY, TEST_SUBJECT, TOPIC_DISPLAY_NAME,
};
use crate::service::{attribute, QueueService, TopicService};
use std::sync::Arc;

/// Inputs for one run.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub topic_name: String,
    /// Empty skips the email subscription.
    pub email: String,
    pub strategy: SubscriptionStrategy,
    pub propagation: PropagationPolicy,
    pub delete_topic: bool,
}

pub struct Provisioner {
    topics: Arc<dyn TopicService>,
    queues: Arc<dyn QueueService>,
    gate: Arc<dyn ConfirmationGate>,
}

impl Provisioner {
    pub fn new(
        topics: Arc<dyn TopicService>,
        queues: Arc<dyn QueueService>,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Self {
        Self {
            topics,
            queues,
            gate,
        }
    }

    pub async fn run(&self, request: &RunRequest) -> ProvisionResult<RunReport> {
        let topic = self.create_topic(&request.topic_name).await?;
        let mut report = RunReport {
            topic_arn: topic.arn.clone(),
            ..RunReport::default()
        };

        diagnostics::retrieve_all_topics(self.topics.as_ref()).await?;

        if !request.email.is_empty() {
            self.subscribe_email(&topic, &request.email).await?;
            report.email_subscribed = true;
        }

        let queue = self.create_queue().await?;
        report.queue_url = queue.url.clone();
        report.queue_arn = queue.arn.clone();

        diagnostics::list_queues(self.queues.as_ref()).await?;

        match &queue.arn {
            Some(queue_arn) => {
                self.exchange_test_message(request, &topic, &queue.url, queue_arn, &mut report)
                    .await?;
            }
            None => tracing::warn!(
                queue_url = %queue.url,
                "Queue ARN not returned, skipping subscription and test message"
            ),
        }

        if request.delete_topic {
            tracing::info!(topic_arn = %topic.arn, "Deleting topic...");
            self.topics.delete_topic(&topic.arn).await?;
            report.topic_deleted = true;
        }

        Ok(report)
    }

    async fn create_topic(&self, name: &str) -> ProvisionResult<Topic> {
        let arn = self
            .topics
            .create_topic(name)
            .await?
            .ok_or(ProvisionError::MissingField {
                operation: "CreateTopic",
                field: "TopicArn",
            })?;
        tracing::info!(topic_arn = %arn, "Topic ready");

        self.topics
            .set_topic_attribute(&arn, attribute::DISPLAY_NAME, TOPIC_DISPLAY_NAME)
            .await?;

        Ok(Topic { arn })
    }

    async fn subscribe_email(&self, topic: &Topic, email: &str) -> ProvisionResult<()> {
        tracing::info!(email, "Subscribing email address to topic...");
        self.topics
            .subscribe(&topic.arn, Protocol::Email, email)
            .await?;

        self.gate
            .wait_for_confirmation(self.topics.as_ref(), &topic.arn, email)
            .await
    }

    async fn create_queue(&self) -> ProvisionResult<Queue> {
        let url = self
            .queues
            .create_queue(QUEUE_NAME)
            .await?
            .ok_or(ProvisionError::MissingField {
                operation: "CreateQueue",
                field: "QueueUrl",
            })?;

        let arn = self
            .queues
            .get_queue_attributes(&url)
            .await?
            .remove(attribute::QUEUE_ARN);
        tracing::info!(queue_url = %url, queue_arn = ?arn, "Queue ready");

        Ok(Queue { url, arn })
    }

    async fn exchange_test_message(
        &self,
        request: &RunRequest,
        topic: &Topic,
        queue_url: &str,
        queue_arn: &str,
        report: &mut RunReport,
    ) -> ProvisionResult<()> {
        let topics = self.topics.as_ref();
        let queues = self.queues.as_ref();

        let subscription_arn = linkage::link_queue(
            request.strategy,
            topics,
            queues,
            &topic.arn,
            queue_url,
            queue_arn,
        )
        .await?;
        tracing::info!(
            strategy = ?request.strategy,
            subscription_arn = ?subscription_arn,
            "Queue subscribed to topic"
        );

        readiness::wait_for_link(
            topics,
            queues,
            &topic.arn,
            queue_url,
            queue_arn,
            request.propagation,
        )
        .await?;

        tracing::info!("Publishing message to topic...");
        report.published_message_id = topics.publish(&topic.arn, TEST_SUBJECT, TEST_BODY).await?;

        let received = queues
            .receive_messages(queue_url, RECEIVE_WAIT_SECONDS)
            .await?;
        diagnostics::print_received(&received);

        report.deleted_receipt_handle = delete_first_received(queues, queue_url, &received).await?;
        report.received = received;
        Ok(())
    }
}

/// Deletes the first received message, if any. Later messages are left alone.
///
/// Returns the receipt handle that was deleted.
pub async fn delete_first_received(
    queues: &dyn QueueService,
    queue_url: &str,
    received: &[ReceivedMessage],
) -> ProvisionResult<Option<String>> {
    let Some(receipt_handle) = received.first().and_then(|m| m.receipt_handle.clone()) else {
        return Ok(None);
    };

    tracing::info!("Deleting the message.");
    queues.delete_message(queue_url, &receipt_handle).await?;
    Ok(Some(receipt_handle))
}
