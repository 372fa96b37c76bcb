//! The events carried on the four external interfaces (`ControlRPC`,
//! worker/client-bound `Stream`, and `Direct`). These are the wire contract
//! described in the interface spec: every event is tagged by `op` and
//! carries a topic `name`. Message payloads are opaque at this layer —
//! serialization into a concrete type happens at the `Publisher`/
//! `Subscriber` edge, not here.

use crate::ids::{ClientId, Host, WorkerAddress};
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An opaque, equality-comparable, serializable topic key.
#[derive(Clone, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TopicName(Arc<str>);

impl TopicName {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({})", self.0)
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TopicName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TopicName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Per-subscriber payload carried alongside a worker address. Currently
/// always empty; the channel is typed so a future revision can attach
/// routing hints without a wire-format break.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubscriberInfo {}

/// Either endpoint kind that can register interest in a topic.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Who {
    Worker(WorkerAddress),
    Client(ClientId),
}

impl From<WorkerAddress> for Who {
    fn from(w: WorkerAddress) -> Self {
        Who::Worker(w)
    }
}

impl From<ClientId> for Who {
    fn from(c: ClientId) -> Self {
        Who::Client(c)
    }
}

/// Response to `pubsub_add_publisher`: a snapshot of the current worker
/// subscriber set plus whether the scheduler copy should be enabled.
#[derive(Clone, Debug, Default)]
pub struct AddPublisherResponse {
    pub subscribers: HashMap<WorkerAddress, SubscriberInfo>,
    pub publish_to_scheduler: bool,
}

/// Events sent from a worker or client to the scheduler's stream handler.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum SchedulerStreamEvent {
    #[serde(rename = "pubsub-add-subscriber")]
    AddSubscriber { name: TopicName, who: Who },
    #[serde(rename = "pubsub-remove-subscriber")]
    RemoveSubscriber { name: TopicName, who: Who },
    /// Client-side eager GC on drain; treated identically to
    /// `RemoveSubscriber { who: Who::Client(..) }` for that topic.
    #[serde(rename = "pubsub-remove-subscribers")]
    RemoveSubscribers { name: TopicName, client: ClientId },
    #[serde(rename = "pubsub-remove-publisher")]
    RemovePublisher {
        name: TopicName,
        worker: WorkerAddress,
    },
    #[serde(rename = "pubsub-msg")]
    Msg {
        name: TopicName,
        payload: Bytes,
        source: Option<Host>,
    },
}

/// Events sent from the scheduler to a publisher's worker.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum WorkerStreamEvent {
    #[serde(rename = "pubsub-add-subscriber")]
    AddSubscriber {
        name: TopicName,
        address: WorkerAddress,
        info: SubscriberInfo,
    },
    #[serde(rename = "pubsub-remove-subscriber")]
    RemoveSubscriber {
        name: TopicName,
        address: WorkerAddress,
    },
    #[serde(rename = "pubsub-publish-scheduler")]
    PublishScheduler { name: TopicName, publish: bool },
    #[serde(rename = "pubsub-msg")]
    Msg {
        name: TopicName,
        payload: Bytes,
    },
}

/// Events sent from the scheduler to a client subscriber.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum ClientStreamEvent {
    #[serde(rename = "pubsub-msg")]
    Msg {
        name: TopicName,
        payload: Bytes,
    },
}
