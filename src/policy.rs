//! Queue access policy documents.
//!
//! The document built here allows a topic to deliver into a queue. Its
//! principal is everyone (`{"AWS": "*"}`), narrowed only by a condition that
//! the request's source ARN equals the topic ARN. This broad-principal shape is
//! kept as-is; narrowing it would change which callers the queue accepts.
//!
//! The condition operator is `ArnEquals` where the SDK subscribe helpers emit
//! `ArnLike`; the two match identically for a topic ARN without wildcards.
//!
//! Policies read back from a queue may use members this module does not model
//! (`NotAction`, `NotPrincipal`, boolean or numeric condition values). Those are
//! carried through untouched so a merge never drops what another tool wrote.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const POLICY_VERSION: &str = "2012-10-17";
pub const SOURCE_ARN_KEY: &str = "aws:SourceArn";
pub const ARN_EQUALS: &str = "ArnEquals";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QueueAction {
    SendMessage,
    ReceiveMessage,
}

impl QueueAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SendMessage => "sqs:SendMessage",
            Self::ReceiveMessage => "sqs:ReceiveMessage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// Accepts both `"*"` and `{"AWS": ...}` when reading existing policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Principal {
    Wildcard(String),
    Mapped(BTreeMap<String, OneOrMany>),
}

impl Principal {
    pub fn all_users() -> Self {
        Self::Mapped(BTreeMap::from([(
            "AWS".to_string(),
            OneOrMany::One("*".to_string()),
        )]))
    }

    pub fn is_all_users(&self) -> bool {
        match self {
            Self::Wildcard(p) => p == "*",
            Self::Mapped(m) => m.get("AWS").is_some_and(|v| v.contains("*")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::One(v) => v == value,
            Self::Many(vs) => vs.iter().any(|v| v == value),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::One(v) => vec![v.as_str()],
            Self::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

/// Condition operator -> (condition key -> value or list of values).
///
/// Values stay raw JSON: operators like `Bool` and `NumericLessThan` take
/// booleans and numbers, not strings.
pub type Conditions = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub condition: Conditions,
    /// `NotAction`, `NotPrincipal`, `NotResource` and anything else not modelled.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Statement {
    /// Allow `actions` on `queue_arn` for messages whose source is `topic_arn`.
    pub fn topic_delivery(topic_arn: &str, queue_arn: &str, actions: &[QueueAction]) -> Self {
        let condition = BTreeMap::from([(
            ARN_EQUALS.to_string(),
            BTreeMap::from([(
                SOURCE_ARN_KEY.to_string(),
                Value::String(topic_arn.to_string()),
            )]),
        )]);

        Self {
            sid: Some(format!("topic-subscription-{topic_arn}")),
            effect: Effect::Allow,
            principal: Some(Principal::all_users()),
            action: Some(OneOrMany::Many(
                actions.iter().map(|a| a.as_str().to_string()).collect(),
            )),
            resource: Some(OneOrMany::One(queue_arn.to_string())),
            condition,
            extra: BTreeMap::new(),
        }
    }

    pub fn source_arns(&self) -> Vec<&str> {
        match self
            .condition
            .get(ARN_EQUALS)
            .and_then(|keys| keys.get(SOURCE_ARN_KEY))
        {
            Some(Value::String(arn)) => vec![arn.as_str()],
            Some(Value::Array(arns)) => arns.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Whether this statement lets `topic_arn` send into `queue_arn`.
    pub fn grants_delivery(&self, topic_arn: &str, queue_arn: &str) -> bool {
        self.effect == Effect::Allow
            && self.principal.as_ref().is_some_and(Principal::is_all_users)
            && self.resource.as_ref().is_some_and(|r| r.contains(queue_arn))
            && self.action.as_ref().is_some_and(|a| {
                a.contains(QueueAction::SendMessage.as_str()) || a.contains("sqs:*")
            })
            && self.source_arns().contains(&topic_arn)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Policy {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub statement: Vec<Statement>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            id: None,
            statement: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl Policy {
    /// Single-statement policy letting `topic_arn` use `actions` on `queue_arn`.
    pub fn topic_delivery(topic_arn: &str, queue_arn: &str, actions: &[QueueAction]) -> Self {
        Self {
            statement: vec![Statement::topic_delivery(topic_arn, queue_arn, actions)],
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Appends `statement` unless an equal one, or one with the same Sid, is
    /// already present. Sids must be unique within a queue policy.
    /// Returns whether the policy changed.
    pub fn merge_statement(&mut self, statement: Statement) -> bool {
        let sid_taken = statement
            .sid
            .as_ref()
            .is_some_and(|sid| self.statement.iter().any(|s| s.sid.as_ref() == Some(sid)));
        if sid_taken || self.statement.contains(&statement) {
            return false;
        }
        self.statement.push(statement);
        true
    }

    pub fn allows_topic(&self, topic_arn: &str, queue_arn: &str) -> bool {
        self.statement
            .iter()
            .any(|s| s.grants_delivery(topic_arn, queue_arn))
    }
}
