//! The remote service boundary.
//!
//! Everything the provisioning run needs from the notification and queue
//! services goes through these two traits, so the orchestration can be driven
//! against the real AWS clients or an in-memory stand-in.

use crate::error::ServiceFault;
use crate::resources::{Protocol, ReceivedMessage};
use crate::responses::{Attributes, ListQueuesPage, ListSubscriptionsPage, ListTopicsPage};
use async_trait::async_trait;

pub type ServiceResult<T> = Result<T, ServiceFault>;

/// Publish/subscribe topic operations.
#[async_trait]
pub trait TopicService: Send + Sync {
    /// Returns the topic ARN. Creating an existing name returns the existing ARN.
    async fn create_topic(&self, name: &str) -> ServiceResult<Option<String>>;

    async fn set_topic_attribute(
        &self,
        topic_arn: &str,
        name: &str,
        value: &str,
    ) -> ServiceResult<()>;

    async fn get_topic_attributes(&self, topic_arn: &str) -> ServiceResult<Attributes>;

    async fn list_topics(&self, next_token: Option<String>) -> ServiceResult<ListTopicsPage>;

    /// Returns the subscription ARN, or `PendingConfirmation`.
    async fn subscribe(
        &self,
        topic_arn: &str,
        protocol: Protocol,
        endpoint: &str,
    ) -> ServiceResult<Option<String>>;

    async fn list_subscriptions_by_topic(
        &self,
        topic_arn: &str,
        next_token: Option<String>,
    ) -> ServiceResult<ListSubscriptionsPage>;

    /// Returns the message id assigned by the service.
    async fn publish(
        &self,
        topic_arn: &str,
        subject: &str,
        body: &str,
    ) -> ServiceResult<Option<String>>;

    async fn delete_topic(&self, topic_arn: &str) -> ServiceResult<()>;
}

/// Pull-based queue operations.
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Returns the queue URL.
    async fn create_queue(&self, name: &str) -> ServiceResult<Option<String>>;

    /// Fetches every attribute of the queue.
    async fn get_queue_attributes(&self, queue_url: &str) -> ServiceResult<Attributes>;

    async fn list_queues(&self, next_token: Option<String>) -> ServiceResult<ListQueuesPage>;

    async fn set_queue_attributes(
        &self,
        queue_url: &str,
        attributes: Attributes,
    ) -> ServiceResult<()>;

    async fn receive_messages(
        &self,
        queue_url: &str,
        wait_time_seconds: i32,
    ) -> ServiceResult<Vec<ReceivedMessage>>;

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> ServiceResult<()>;
}

/// Attribute names shared by the service calls and the stand-in.
pub mod attribute {
    pub const DISPLAY_NAME: &str = "DisplayName";
    pub const POLICY: &str = "Policy";
    pub const QUEUE_ARN: &str = "QueueArn";
}
