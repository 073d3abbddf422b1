use crate::resources::Subscription;
use std::collections::BTreeMap;

// ListTopics
#[derive(Debug, Default)]
pub struct ListTopicsPage {
    pub topic_arns: Vec<String>,
    pub next_token: Option<String>,
}

// ListSubscriptionsByTopic
#[derive(Debug, Default)]
pub struct ListSubscriptionsPage {
    pub subscriptions: Vec<Subscription>,
    pub next_token: Option<String>,
}

// ListQueues
#[derive(Debug, Default)]
pub struct ListQueuesPage {
    pub queue_urls: Vec<String>,
    pub next_token: Option<String>,
}

// GetTopicAttributes / GetQueueAttributes
pub type Attributes = BTreeMap<String, String>;
