//! In-memory stand-ins for the topic and queue services.

use crate::error::{ErrorType, Service, ServiceFault};
use crate::policy::Policy;
use crate::resources::{Protocol, ReceivedMessage, Subscription};
use crate::responses::{Attributes, ListQueuesPage, ListSubscriptionsPage, ListTopicsPage};
use crate::service::{attribute, QueueService, ServiceResult, TopicService};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const ACCOUNT: &str = "000000000000";
const REGION: &str = "us-east-1";

#[derive(Debug, Clone)]
pub struct TopicRecord {
    pub arn: String,
    pub attributes: Attributes,
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Clone)]
pub struct QueueRecord {
    pub arn: String,
    pub attributes: Attributes,
    pub messages: VecDeque<ReceivedMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic_arn: String,
    pub subject: String,
    pub body: String,
}

/// Every call made against the stand-ins, in order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

fn fault(service: Service, operation: &'static str) -> ServiceFault {
    ServiceFault {
        service,
        operation,
        message: format!("{operation} rejected by test"),
        status_code: Some(400),
        error_code: Some("InvalidParameter".to_string()),
        error_type: ErrorType::Sender,
        request_id: Some(Uuid::new_v4().to_string()),
    }
}

/// One page of `items` starting at the index carried in `next_token`.
fn page<T: Clone>(
    items: &[T],
    next_token: Option<String>,
    size: usize,
) -> (Vec<T>, Option<String>) {
    let start = next_token
        .and_then(|t| t.parse::<usize>().ok())
        .unwrap_or(0)
        .min(items.len());
    let end = (start + size).min(items.len());
    (
        items[start..end].to_vec(),
        (end < items.len()).then(|| end.to_string()),
    )
}

pub struct InMemoryTopics {
    topics: DashMap<String, TopicRecord>,
    queues: Arc<InMemoryQueues>,
    page_size: AtomicUsize,
    fail_on: Mutex<Option<&'static str>>,
    pub list_topics_tokens: Mutex<Vec<Option<String>>>,
    pub published: Mutex<Vec<Published>>,
    calls: CallLog,
}

impl InMemoryTopics {
    fn record(&self, operation: &'static str) -> ServiceResult<()> {
        self.calls.lock().unwrap().push(operation.to_string());
        if *self.fail_on.lock().unwrap() == Some(operation) {
            return Err(fault(Service::Sns, operation));
        }
        Ok(())
    }

    pub fn set_page_size(&self, size: usize) {
        self.page_size.store(size, Ordering::SeqCst);
    }

    pub fn fail_on(&self, operation: &'static str) {
        *self.fail_on.lock().unwrap() = Some(operation);
    }

    /// Marks every pending subscription for `endpoint` as confirmed.
    pub fn confirm(&self, endpoint: &str) {
        for mut topic in self.topics.iter_mut() {
            let topic_arn = topic.arn.clone();
            for sub in topic.subscriptions.iter_mut() {
                if sub.endpoint == endpoint && sub.is_pending() {
                    sub.subscription_arn = format!("{topic_arn}:{}", Uuid::new_v4());
                }
            }
        }
    }

    pub fn topic(&self, arn: &str) -> Option<TopicRecord> {
        self.topics
            .iter()
            .find(|t| t.arn == arn)
            .map(|t| t.value().clone())
    }

    fn sorted_arns(&self) -> Vec<String> {
        let mut arns: Vec<_> = self.topics.iter().map(|t| t.arn.clone()).collect();
        arns.sort();
        arns
    }

    fn name_of(arn: &str) -> &str {
        arn.split(':').last().unwrap_or_default()
    }
}

#[async_trait]
impl TopicService for InMemoryTopics {
    async fn create_topic(&self, name: &str) -> ServiceResult<Option<String>> {
        self.record("CreateTopic")?;
        let arn = format!("arn:aws:sns:{REGION}:{ACCOUNT}:{name}");
        self.topics
            .entry(name.to_string())
            .or_insert_with(|| TopicRecord {
                arn: arn.clone(),
                attributes: Attributes::from([("TopicArn".to_string(), arn.clone())]),
                subscriptions: vec![],
            });
        Ok(Some(arn))
    }

    async fn set_topic_attribute(
        &self,
        topic_arn: &str,
        name: &str,
        value: &str,
    ) -> ServiceResult<()> {
        self.record("SetTopicAttributes")?;
        match self.topics.get_mut(Self::name_of(topic_arn)) {
            Some(mut topic) => {
                topic.attributes.insert(name.to_string(), value.to_string());
                Ok(())
            }
            None => Err(fault(Service::Sns, "SetTopicAttributes")),
        }
    }

    async fn get_topic_attributes(&self, topic_arn: &str) -> ServiceResult<Attributes> {
        self.record("GetTopicAttributes")?;
        self.topics
            .get(Self::name_of(topic_arn))
            .map(|t| t.attributes.clone())
            .ok_or_else(|| fault(Service::Sns, "GetTopicAttributes"))
    }

    async fn list_topics(&self, next_token: Option<String>) -> ServiceResult<ListTopicsPage> {
        self.record("ListTopics")?;
        self.list_topics_tokens
            .lock()
            .unwrap()
            .push(next_token.clone());

        let (topic_arns, next_token) = page(
            &self.sorted_arns(),
            next_token,
            self.page_size.load(Ordering::SeqCst),
        );
        Ok(ListTopicsPage {
            topic_arns,
            next_token,
        })
    }

    async fn subscribe(
        &self,
        topic_arn: &str,
        protocol: Protocol,
        endpoint: &str,
    ) -> ServiceResult<Option<String>> {
        self.record("Subscribe")?;
        let Some(mut topic) = self.topics.get_mut(Self::name_of(topic_arn)) else {
            return Err(fault(Service::Sns, "Subscribe"));
        };
        let subscription_arn = match protocol {
            Protocol::Email => "PendingConfirmation".to_string(),
            Protocol::Sqs => format!("{topic_arn}:{}", Uuid::new_v4()),
        };
        topic.subscriptions.push(Subscription {
            protocol: protocol.as_str().to_string(),
            endpoint: endpoint.to_string(),
            subscription_arn: subscription_arn.clone(),
        });
        Ok(Some(subscription_arn))
    }

    async fn list_subscriptions_by_topic(
        &self,
        topic_arn: &str,
        next_token: Option<String>,
    ) -> ServiceResult<ListSubscriptionsPage> {
        self.record("ListSubscriptionsByTopic")?;
        let topic = self
            .topics
            .get(Self::name_of(topic_arn))
            .ok_or_else(|| fault(Service::Sns, "ListSubscriptionsByTopic"))?;
        let (subscriptions, next_token) = page(
            &topic.subscriptions,
            next_token,
            self.page_size.load(Ordering::SeqCst),
        );
        Ok(ListSubscriptionsPage {
            subscriptions,
            next_token,
        })
    }

    async fn publish(
        &self,
        topic_arn: &str,
        subject: &str,
        body: &str,
    ) -> ServiceResult<Option<String>> {
        self.record("Publish")?;
        let topic = self
            .topic(topic_arn)
            .ok_or_else(|| fault(Service::Sns, "Publish"))?;
        let message_id = Uuid::new_v4().to_string();

        self.published.lock().unwrap().push(Published {
            topic_arn: topic_arn.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });

        for subscription in topic
            .subscriptions
            .iter()
            .filter(|s| s.protocol == Protocol::Sqs.as_str())
        {
            let envelope = serde_json::json!({
                "Type": "Notification",
                "MessageId": message_id,
                "TopicArn": topic_arn,
                "Subject": subject,
                "Message": body,
            });
            self.queues
                .deliver(topic_arn, &subscription.endpoint, envelope.to_string());
        }

        Ok(Some(message_id))
    }

    async fn delete_topic(&self, topic_arn: &str) -> ServiceResult<()> {
        self.record("DeleteTopic")?;
        self.topics.remove(Self::name_of(topic_arn));
        Ok(())
    }
}

pub struct InMemoryQueues {
    queues: DashMap<String, QueueRecord>,
    page_size: AtomicUsize,
    policy_lag: AtomicUsize,
    fail_on: Mutex<Option<&'static str>>,
    scripted_receive: Mutex<Option<Vec<ReceivedMessage>>>,
    omit_queue_arn: Mutex<bool>,
    pub deleted: Mutex<Vec<(String, String)>>,
    calls: CallLog,
}

impl InMemoryQueues {
    fn record(&self, operation: &'static str) -> ServiceResult<()> {
        self.calls.lock().unwrap().push(operation.to_string());
        if *self.fail_on.lock().unwrap() == Some(operation) {
            return Err(fault(Service::Sqs, operation));
        }
        Ok(())
    }

    pub fn fail_on(&self, operation: &'static str) {
        *self.fail_on.lock().unwrap() = Some(operation);
    }

    pub fn set_page_size(&self, size: usize) {
        self.page_size.store(size, Ordering::SeqCst);
    }

    /// Hides the `Policy` attribute from the next `lag` attribute reads.
    pub fn set_policy_lag(&self, lag: usize) {
        self.policy_lag.store(lag, Ordering::SeqCst);
    }

    /// The next receive returns exactly `messages`, regardless of queue content.
    pub fn script_receive(&self, messages: Vec<ReceivedMessage>) {
        *self.scripted_receive.lock().unwrap() = Some(messages);
    }

    pub fn omit_queue_arn(&self) {
        *self.omit_queue_arn.lock().unwrap() = true;
    }

    pub fn arn_of(&self, queue_url: &str) -> Option<String> {
        self.queues.get(queue_url).map(|q| q.arn.clone())
    }

    pub fn record_of(&self, queue_url: &str) -> Option<QueueRecord> {
        self.queues.get(queue_url).map(|q| q.value().clone())
    }

    /// Enqueues `body` into the queue whose ARN is `queue_arn` if its policy lets
    /// `topic_arn` deliver.
    fn deliver(&self, topic_arn: &str, queue_arn: &str, body: String) {
        let Some(mut queue) = self.queues.iter_mut().find(|q| q.arn == queue_arn) else {
            return;
        };
        let allowed = queue
            .attributes
            .get(attribute::POLICY)
            .and_then(|json| Policy::from_json(json).ok())
            .is_some_and(|p| p.allows_topic(topic_arn, queue_arn));
        if allowed {
            queue.messages.push_back(ReceivedMessage {
                message_id: Some(Uuid::new_v4().to_string()),
                receipt_handle: None,
                md5_of_body: None,
                body: Some(body),
                attributes: Attributes::from([("SenderId".to_string(), ACCOUNT.to_string())]),
            });
        }
    }
}

#[async_trait]
impl QueueService for InMemoryQueues {
    async fn create_queue(&self, name: &str) -> ServiceResult<Option<String>> {
        self.record("CreateQueue")?;
        let url = format!("http://localhost:4566/{ACCOUNT}/{name}");
        self.queues.entry(url.clone()).or_insert_with(|| QueueRecord {
            arn: format!("arn:aws:sqs:{REGION}:{ACCOUNT}:{name}"),
            attributes: Attributes::new(),
            messages: VecDeque::new(),
        });
        Ok(Some(url))
    }

    async fn get_queue_attributes(&self, queue_url: &str) -> ServiceResult<Attributes> {
        self.record("GetQueueAttributes")?;
        let queue = self
            .queues
            .get(queue_url)
            .ok_or_else(|| fault(Service::Sqs, "GetQueueAttributes"))?;

        let mut attributes = queue.attributes.clone();
        if !*self.omit_queue_arn.lock().unwrap() {
            attributes.insert(attribute::QUEUE_ARN.to_string(), queue.arn.clone());
        }
        let hidden = self
            .policy_lag
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |lag| lag.checked_sub(1))
            .is_ok();
        if hidden {
            attributes.remove(attribute::POLICY);
        }
        Ok(attributes)
    }

    async fn list_queues(&self, next_token: Option<String>) -> ServiceResult<ListQueuesPage> {
        self.record("ListQueues")?;
        let mut urls: Vec<_> = self.queues.iter().map(|q| q.key().clone()).collect();
        urls.sort();
        let (queue_urls, next_token) =
            page(&urls, next_token, self.page_size.load(Ordering::SeqCst));
        Ok(ListQueuesPage {
            queue_urls,
            next_token,
        })
    }

    async fn set_queue_attributes(
        &self,
        queue_url: &str,
        attributes: Attributes,
    ) -> ServiceResult<()> {
        self.record("SetQueueAttributes")?;
        let mut queue = self
            .queues
            .get_mut(queue_url)
            .ok_or_else(|| fault(Service::Sqs, "SetQueueAttributes"))?;
        queue.attributes.extend(attributes);
        Ok(())
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        _wait_time_seconds: i32,
    ) -> ServiceResult<Vec<ReceivedMessage>> {
        self.record("ReceiveMessage")?;
        if let Some(scripted) = self.scripted_receive.lock().unwrap().take() {
            return Ok(scripted);
        }
        let mut queue = self
            .queues
            .get_mut(queue_url)
            .ok_or_else(|| fault(Service::Sqs, "ReceiveMessage"))?;
        Ok(queue
            .messages
            .iter_mut()
            .map(|msg| {
                msg.receipt_handle = Some(Uuid::new_v4().to_string());
                msg.clone()
            })
            .collect())
    }

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> ServiceResult<()> {
        self.record("DeleteMessage")?;
        self.deleted
            .lock()
            .unwrap()
            .push((queue_url.to_string(), receipt_handle.to_string()));
        if let Some(mut queue) = self.queues.get_mut(queue_url) {
            queue
                .messages
                .retain(|m| m.receipt_handle.as_deref() != Some(receipt_handle));
        }
        Ok(())
    }
}

/// A linked pair of stand-ins sharing one call log.
pub struct InMemory {
    pub topics: Arc<InMemoryTopics>,
    pub queues: Arc<InMemoryQueues>,
    calls: CallLog,
}

impl InMemory {
    pub fn new() -> Self {
        let calls = CallLog::default();
        let queues = Arc::new(InMemoryQueues {
            queues: DashMap::new(),
            page_size: AtomicUsize::new(100),
            policy_lag: AtomicUsize::new(0),
            fail_on: Mutex::new(None),
            scripted_receive: Mutex::new(None),
            omit_queue_arn: Mutex::new(false),
            deleted: Mutex::new(vec![]),
            calls: calls.clone(),
        });
        let topics = Arc::new(InMemoryTopics {
            topics: DashMap::new(),
            queues: queues.clone(),
            page_size: AtomicUsize::new(100),
            fail_on: Mutex::new(None),
            list_topics_tokens: Mutex::new(vec![]),
            published: Mutex::new(vec![]),
            calls: calls.clone(),
        });
        Self {
            topics,
            queues,
            calls,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| *c == operation).count()
    }
}
