use crate::error::ProvisionResult;
use crate::resources::ReceivedMessage;
use crate::service::{QueueService, TopicService};

/// Walks every page of `ListTopics` and prints each topic with its attributes.
///
/// Returns the topic ARNs in the order they were seen.
pub async fn retrieve_all_topics(topics: &dyn TopicService) -> ProvisionResult<Vec<String>> {
    tracing::info!("Retrieving all topics...");
    let mut seen = Vec::new();
    let mut next_token = None;

    loop {
        let page = topics.list_topics(next_token).await?;
        for topic_arn in page.topic_arns {
            tracing::info!(topic_arn = %topic_arn, "Topic");

            let attributes = topics.get_topic_attributes(&topic_arn).await?;
            for (key, value) in &attributes {
                tracing::info!(topic_arn = %topic_arn, "  -{key} : {value}");
            }
            seen.push(topic_arn);
        }

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    Ok(seen)
}

/// Prints the URL of every queue visible to the caller.
pub async fn list_queues(queues: &dyn QueueService) -> ProvisionResult<Vec<String>> {
    tracing::info!("Printing list of Amazon SQS queues.");
    let mut seen = Vec::new();
    let mut next_token = None;

    loop {
        let page = queues.list_queues(next_token).await?;
        for queue_url in page.queue_urls {
            tracing::info!(queue_url = %queue_url, "QueueUrl");
            seen.push(queue_url);
        }

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    Ok(seen)
}

/// Logs each received message's fields and attributes. Returns the lines logged.
pub fn print_received(messages: &[ReceivedMessage]) -> Vec<String> {
    let mut lines = Vec::new();
    if messages.is_empty() {
        lines.push("No messages received".to_string());
    } else {
        lines.push("Printing received message.".to_string());
    }

    for message in messages {
        for (label, value) in [
            ("MessageId", &message.message_id),
            ("ReceiptHandle", &message.receipt_handle),
            ("MD5OfBody", &message.md5_of_body),
            ("Body", &message.body),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                lines.push(format!("  {label}: {value}"));
            }
        }

        for (name, value) in &message.attributes {
            let value = if value.is_empty() { "(no value)" } else { value };
            lines.push(format!("  Attribute {name}: {value}"));
        }
    }

    for line in &lines {
        tracing::info!("{line}");
    }
    lines
}
