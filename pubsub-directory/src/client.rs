//! A client's local view of "topics I subscribe to". Clients never host
//! publishers directly against the directory (a client-hosted `Publisher`
//! routes every message through the scheduler, so it needs no local
//! bookkeeping here) and never receive `Direct` sends.

use crate::registry::{AnySubscriber, WeakRegistry};
use bytes::Bytes;
use pubsub_common::{ClientId, SchedulerStreamEvent, ToScheduler, TopicName};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// `ClientDirectory` state, keyed by topic. Owned exclusively by
/// [`ClientActor`].
#[derive(Default)]
pub struct ClientDirectory {
    local_subscribers: HashMap<TopicName, WeakRegistry<dyn AnySubscriber>>,
}

impl ClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_subscriber(&mut self, name: TopicName, subscriber: Weak<dyn AnySubscriber>) {
        self.local_subscribers.entry(name).or_default().insert(subscriber);
    }

    /// `pubsub-msg(name, msg)`. Delivers to every local subscriber; if the
    /// weak set has drained to empty as a result (or was already empty —
    /// matching the defaultdict-backed original, which always has an
    /// entry), eagerly tells the scheduler so it can drop this client from
    /// `client_subscribers[name]` without waiting for a finalizer pass.
    pub fn on_message(&mut self, name: TopicName, payload: Bytes, id: &ClientId, emit: impl Fn(SchedulerStreamEvent)) {
        let registry = self.local_subscribers.entry(name.clone()).or_default();
        registry.for_each_live(|s| s.deliver(payload.clone()));
        if registry.is_empty() {
            emit(SchedulerStreamEvent::RemoveSubscribers {
                name,
                client: id.clone(),
            });
        }
    }

    /// Finalizer-triggered consolidation pass: for each topic whose local
    /// subscriber set has emptied, tell the scheduler and drop our
    /// bookkeeping.
    fn cleanup(&mut self, id: &ClientId, emit: impl Fn(SchedulerStreamEvent)) {
        self.local_subscribers.retain(|name, registry| {
            if registry.is_empty() {
                emit(SchedulerStreamEvent::RemoveSubscriber {
                    name: name.clone(),
                    who: pubsub_common::Who::Client(id.clone()),
                });
                false
            } else {
                true
            }
        });
    }
}

enum Command {
    RegisterSubscriber(TopicName, Weak<dyn AnySubscriber>),
    Msg { name: TopicName, payload: Bytes },
    Cleanup,
}

/// Owns a [`ClientDirectory`] plus this client's outbound scheduler link.
pub struct ClientActor {
    id: ClientId,
    rx: mpsc::UnboundedReceiver<Command>,
    directory: ClientDirectory,
    scheduler_stream: Arc<dyn ToScheduler>,
}

impl ClientActor {
    pub fn spawn(id: ClientId, scheduler_stream: Arc<dyn ToScheduler>) -> ClientHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = ClientActor {
            id: id.clone(),
            rx,
            directory: ClientDirectory::new(),
            scheduler_stream: scheduler_stream.clone(),
        };
        tokio::spawn(actor.run());
        ClientHandle { id, tx, scheduler_stream }
    }

    async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                Command::RegisterSubscriber(name, s) => self.directory.register_subscriber(name, s),
                Command::Msg { name, payload } => {
                    let scheduler = self.scheduler_stream.clone();
                    let id = self.id.clone();
                    self.directory.on_message(name, payload, &id, |e| scheduler.send(e));
                }
                Command::Cleanup => {
                    let scheduler = self.scheduler_stream.clone();
                    let id = self.id.clone();
                    self.directory.cleanup(&id, |e| scheduler.send(e));
                }
            }
        }
        log::debug!("client {} directory actor exiting", self.id);
    }
}

/// Cheap, `Clone`-able capability bundle for a client host.
#[derive(Clone)]
pub struct ClientHandle {
    id: ClientId,
    tx: mpsc::UnboundedSender<Command>,
    scheduler_stream: Arc<dyn ToScheduler>,
}

impl ClientHandle {
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    pub fn scheduler_stream(&self) -> &Arc<dyn ToScheduler> {
        &self.scheduler_stream
    }

    pub fn register_subscriber(&self, name: TopicName, subscriber: Weak<dyn AnySubscriber>) {
        let _ = self.tx.send(Command::RegisterSubscriber(name, subscriber));
    }

    /// Entry point for `pubsub-msg` events relayed by the scheduler.
    pub fn receive(&self, name: TopicName, payload: Bytes) {
        let _ = self.tx.send(Command::Msg { name, payload });
    }

    pub fn schedule_cleanup(&self) {
        let _ = self.tx.send(Command::Cleanup);
    }
}

impl pubsub_common::Finalizer for ClientHandle {
    fn schedule_cleanup(&self) {
        ClientHandle::schedule_cleanup(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pubsub_common::TopicName;

    struct RecordingSubscriber {
        name: TopicName,
        received: Mutex<Vec<Bytes>>,
    }

    impl AnySubscriber for RecordingSubscriber {
        fn name(&self) -> &TopicName {
            &self.name
        }
        fn deliver(&self, payload: Bytes) {
            self.received.lock().push(payload);
        }
    }

    #[test]
    fn message_to_unknown_topic_triggers_eager_gc() {
        let mut dir = ClientDirectory::new();
        let mut emitted = Vec::new();
        dir.on_message(
            TopicName::new("T"),
            Bytes::from_static(b"x"),
            &ClientId::new("c1"),
            |e| emitted.push(e),
        );
        assert_eq!(emitted.len(), 1);
        assert!(matches!(emitted[0], SchedulerStreamEvent::RemoveSubscribers { .. }));
    }

    #[test]
    fn message_with_live_subscriber_does_not_gc() {
        let mut dir = ClientDirectory::new();
        let name = TopicName::new("T");
        let sub = Arc::new(RecordingSubscriber { name: name.clone(), received: Mutex::new(Vec::new()) });
        let weak: Weak<dyn AnySubscriber> = Arc::downgrade(&sub) as Weak<dyn AnySubscriber>;
        dir.register_subscriber(name.clone(), weak);

        let mut emitted = Vec::new();
        dir.on_message(name, Bytes::from_static(b"x"), &ClientId::new("c1"), |e| emitted.push(e));
        assert!(emitted.is_empty());
        assert_eq!(sub.received.lock().len(), 1);
    }
}
