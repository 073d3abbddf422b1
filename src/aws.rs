use crate::error::{Service, ServiceFault};
use crate::resources::{Protocol, ReceivedMessage, Subscription};
use crate::responses::{Attributes, ListQueuesPage, ListSubscriptionsPage, ListTopicsPage};
use crate::service::{QueueService, ServiceResult, TopicService};
use async_trait::async_trait;
use aws_sdk_sns::Client as SnsClient;
use aws_sdk_sqs::Client as SqsClient;
use aws_sdk_sqs::types::{MessageSystemAttributeName, QueueAttributeName};

/// `TopicService` backed by the AWS SNS client.
#[derive(Debug, Clone)]
pub struct AwsTopics {
    client: SnsClient,
}

impl AwsTopics {
    pub fn new(client: SnsClient) -> Self {
        Self { client }
    }
}

/// `QueueService` backed by the AWS SQS client.
#[derive(Debug, Clone)]
pub struct AwsQueues {
    client: SqsClient,
}

impl AwsQueues {
    pub fn new(client: SqsClient) -> Self {
        Self { client }
    }
}

fn sns_fault<E>(operation: &'static str) -> impl FnOnce(aws_sdk_sns::error::SdkError<E>) -> ServiceFault
where
    E: aws_sdk_sns::error::ProvideErrorMetadata
        + aws_sdk_sns::operation::RequestId
        + std::error::Error
        + 'static,
{
    move |err| ServiceFault::from_sdk(Service::Sns, operation, err)
}

fn sqs_fault<E>(operation: &'static str) -> impl FnOnce(aws_sdk_sqs::error::SdkError<E>) -> ServiceFault
where
    E: aws_sdk_sqs::error::ProvideErrorMetadata
        + aws_sdk_sqs::operation::RequestId
        + std::error::Error
        + 'static,
{
    move |err| ServiceFault::from_sdk(Service::Sqs, operation, err)
}

#[async_trait]
impl TopicService for AwsTopics {
    async fn create_topic(&self, name: &str) -> ServiceResult<Option<String>> {
        let output = self
            .client
            .create_topic()
            .name(name)
            .send()
            .await
            .map_err(sns_fault("CreateTopic"))?;

        Ok(output.topic_arn().map(ToString::to_string))
    }

    async fn set_topic_attribute(
        &self,
        topic_arn: &str,
        name: &str,
        value: &str,
    ) -> ServiceResult<()> {
        self.client
            .set_topic_attributes()
            .topic_arn(topic_arn)
            .attribute_name(name)
            .attribute_value(value)
            .send()
            .await
            .map_err(sns_fault("SetTopicAttributes"))?;

        Ok(())
    }

    async fn get_topic_attributes(&self, topic_arn: &str) -> ServiceResult<Attributes> {
        let output = self
            .client
            .get_topic_attributes()
            .topic_arn(topic_arn)
            .send()
            .await
            .map_err(sns_fault("GetTopicAttributes"))?;

        Ok(output
            .attributes()
            .map(|attrs| {
                attrs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_topics(&self, next_token: Option<String>) -> ServiceResult<ListTopicsPage> {
        let output = self
            .client
            .list_topics()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(sns_fault("ListTopics"))?;

        Ok(ListTopicsPage {
            topic_arns: output
                .topics()
                .iter()
                .filter_map(|t| t.topic_arn().map(ToString::to_string))
                .collect(),
            next_token: output.next_token().map(ToString::to_string),
        })
    }

    async fn subscribe(
        &self,
        topic_arn: &str,
        protocol: Protocol,
        endpoint: &str,
    ) -> ServiceResult<Option<String>> {
        let output = self
            .client
            .subscribe()
            .topic_arn(topic_arn)
            .protocol(protocol.as_str())
            .endpoint(endpoint)
            .send()
            .await
            .map_err(sns_fault("Subscribe"))?;

        Ok(output.subscription_arn().map(ToString::to_string))
    }

    async fn list_subscriptions_by_topic(
        &self,
        topic_arn: &str,
        next_token: Option<String>,
    ) -> ServiceResult<ListSubscriptionsPage> {
        let output = self
            .client
            .list_subscriptions_by_topic()
            .topic_arn(topic_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(sns_fault("ListSubscriptionsByTopic"))?;

        Ok(ListSubscriptionsPage {
            subscriptions: output
                .subscriptions()
                .iter()
                .map(|s| Subscription {
                    protocol: s.protocol().unwrap_or_default().to_string(),
                    endpoint: s.endpoint().unwrap_or_default().to_string(),
                    subscription_arn: s.subscription_arn().unwrap_or_default().to_string(),
                })
                .collect(),
            next_token: output.next_token().map(ToString::to_string),
        })
    }

    async fn publish(
        &self,
        topic_arn: &str,
        subject: &str,
        body: &str,
    ) -> ServiceResult<Option<String>> {
        let output = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .subject(subject)
            .message(body)
            .send()
            .await
            .map_err(sns_fault("Publish"))?;

        Ok(output.message_id().map(ToString::to_string))
    }

    async fn delete_topic(&self, topic_arn: &str) -> ServiceResult<()> {
        self.client
            .delete_topic()
            .topic_arn(topic_arn)
            .send()
            .await
            .map_err(sns_fault("DeleteTopic"))?;

        Ok(())
    }
}

#[async_trait]
impl QueueService for AwsQueues {
    async fn create_queue(&self, name: &str) -> ServiceResult<Option<String>> {
        let output = self
            .client
            .create_queue()
            .queue_name(name)
            .send()
            .await
            .map_err(sqs_fault("CreateQueue"))?;

        Ok(output.queue_url().map(ToString::to_string))
    }

    async fn get_queue_attributes(&self, queue_url: &str) -> ServiceResult<Attributes> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::All)
            .send()
            .await
            .map_err(sqs_fault("GetQueueAttributes"))?;

        Ok(output
            .attributes()
            .map(|attrs| {
                attrs
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_queues(&self, next_token: Option<String>) -> ServiceResult<ListQueuesPage> {
        let output = self
            .client
            .list_queues()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(sqs_fault("ListQueues"))?;

        Ok(ListQueuesPage {
            queue_urls: output.queue_urls().to_vec(),
            next_token: output.next_token().map(ToString::to_string),
        })
    }

    async fn set_queue_attributes(
        &self,
        queue_url: &str,
        attributes: Attributes,
    ) -> ServiceResult<()> {
        let mut request = self.client.set_queue_attributes().queue_url(queue_url);
        for (name, value) in attributes {
            request = request.attributes(QueueAttributeName::from(name.as_str()), value);
        }
        request
            .send()
            .await
            .map_err(sqs_fault("SetQueueAttributes"))?;

        Ok(())
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        wait_time_seconds: i32,
    ) -> ServiceResult<Vec<ReceivedMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .wait_time_seconds(wait_time_seconds)
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .send()
            .await
            .map_err(sqs_fault("ReceiveMessage"))?;

        Ok(output
            .messages()
            .iter()
            .map(|msg| ReceivedMessage {
                message_id: msg.message_id().map(ToString::to_string),
                receipt_handle: msg.receipt_handle().map(ToString::to_string),
                md5_of_body: msg.md5_of_body().map(ToString::to_string),
                body: msg.body().map(ToString::to_string),
                attributes: msg
                    .attributes()
                    .map(|attrs| {
                        attrs
                            .iter()
                            .map(|(k, v)| (k.as_str().to_string(), v.clone()))
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> ServiceResult<()> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(sqs_fault("DeleteMessage"))?;

        Ok(())
    }
}
