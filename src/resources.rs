use std::collections::BTreeMap;

// 1. Fixed resource identity
pub const QUEUE_NAME: &str = "MyExperimentQueue";
pub const TOPIC_DISPLAY_NAME: &str = "Sample Notifications";
pub const TEST_SUBJECT: &str = "Test";
pub const TEST_BODY: &str = "Testing testing 1 2 3";

/// Long-poll bound for the single receive call, in seconds.
pub const RECEIVE_WAIT_SECONDS: i32 = 20;

// 2. Remote handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Queue {
    pub url: String,
    pub arn: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Email,
    Sqs,
}

impl Protocol {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sqs => "sqs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub protocol: String,
    pub endpoint: String,
    /// `PendingConfirmation` until the endpoint owner confirms.
    pub subscription_arn: String,
}

impl Subscription {
    pub fn is_pending(&self) -> bool {
        self.subscription_arn == "PendingConfirmation"
    }
}

// 3. Messages
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceivedMessage {
    pub message_id: Option<String>,
    pub receipt_handle: Option<String>,
    pub md5_of_body: Option<String>,
    pub body: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

/// Outcome of a complete provisioning run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub topic_arn: String,
    pub email_subscribed: bool,
    pub queue_url: String,
    pub queue_arn: Option<String>,
    pub published_message_id: Option<String>,
    pub received: Vec<ReceivedMessage>,
    pub deleted_receipt_handle: Option<String>,
    pub topic_deleted: bool,
}
