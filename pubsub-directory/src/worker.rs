//! A worker's local view of "topics I publish, topics I subscribe to", plus
//! the fan-out of incoming messages to local subscribers and the cleanup
//! that runs when local endpoints vanish.

use crate::registry::{AnyPublisher, AnySubscriber, WeakRegistry};
use bytes::Bytes;
use pubsub_common::{
    ControlRpc, Direct, SchedulerStreamEvent, SubscriberInfo, ToScheduler, TopicName, Who,
    WorkerAddress, WorkerStreamEvent,
};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// `WorkerDirectory` state, keyed by topic. Owned exclusively by
/// [`WorkerActor`]; only ever mutated from its own task.
#[derive(Default)]
pub struct WorkerDirectory {
    local_publishers: HashMap<TopicName, WeakRegistry<dyn AnyPublisher>>,
    local_subscribers: HashMap<TopicName, WeakRegistry<dyn AnySubscriber>>,
    publish_to_scheduler: HashMap<TopicName, bool>,
}

impl WorkerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_publisher(&mut self, name: TopicName, publisher: Weak<dyn AnyPublisher>) {
        // A freshly-registered publisher picks up the current scheduler
        // copy flag immediately rather than waiting for the next broadcast.
        if let Some(publish) = self.publish_to_scheduler.get(&name) {
            if let Some(strong) = publisher.upgrade() {
                strong.set_publish_to_scheduler(*publish);
            }
        }
        self.local_publishers.entry(name).or_default().insert(publisher);
    }

    pub fn register_subscriber(&mut self, name: TopicName, subscriber: Weak<dyn AnySubscriber>) {
        self.local_subscribers.entry(name).or_default().insert(subscriber);
    }

    /// `pubsub-add-subscriber(name, address, info)`
    pub fn on_add_subscriber(&mut self, name: TopicName, address: WorkerAddress, info: SubscriberInfo) {
        if let Some(registry) = self.local_publishers.get_mut(&name) {
            registry.for_each_live(|p| p.set_subscriber(address.clone(), info.clone()));
        }
    }

    /// `pubsub-remove-subscriber(name, address)`
    pub fn on_remove_subscriber(&mut self, name: TopicName, address: WorkerAddress) {
        if let Some(registry) = self.local_publishers.get_mut(&name) {
            registry.for_each_live(|p| p.remove_subscriber(&address));
        }
    }

    /// `pubsub-publish-scheduler(name, publish)`
    pub fn on_publish_scheduler(&mut self, name: TopicName, publish: bool) {
        self.publish_to_scheduler.insert(name.clone(), publish);
        if let Some(registry) = self.local_publishers.get_mut(&name) {
            registry.for_each_live(|p| p.set_publish_to_scheduler(publish));
        }
    }

    /// `pubsub-msg(name, msg)`. Delivery happens synchronously and in
    /// registration order, so back-to-back messages preserve per-topic
    /// arrival order at every local subscriber without needing to await
    /// anything here.
    pub fn on_message(&mut self, name: TopicName, payload: Bytes) {
        if let Some(registry) = self.local_subscribers.get_mut(&name) {
            registry.for_each_live(|s| s.deliver(payload.clone()));
        }
    }

    /// Runs on every finalizer-triggered pass. For each topic: if the
    /// local subscriber set has emptied, tell the scheduler and drop our
    /// bookkeeping; same for the local publisher set.
    fn cleanup(&mut self, emit: impl Fn(SchedulerStreamEvent), worker: &WorkerAddress) {
        self.local_subscribers.retain(|name, registry| {
            if registry.is_empty() {
                emit(SchedulerStreamEvent::RemoveSubscriber {
                    name: name.clone(),
                    who: Who::Worker(worker.clone()),
                });
                false
            } else {
                true
            }
        });

        let mut drained_topics = Vec::new();
        self.local_publishers.retain(|name, registry| {
            if registry.is_empty() {
                emit(SchedulerStreamEvent::RemovePublisher {
                    name: name.clone(),
                    worker: worker.clone(),
                });
                drained_topics.push(name.clone());
                false
            } else {
                true
            }
        });
        for name in drained_topics {
            self.publish_to_scheduler.remove(&name);
        }
    }
}

enum Command {
    RegisterPublisher(TopicName, Weak<dyn AnyPublisher>),
    RegisterSubscriber(TopicName, Weak<dyn AnySubscriber>),
    Stream(WorkerStreamEvent),
    Cleanup,
}

/// Owns a [`WorkerDirectory`] plus this worker's outbound links, and
/// applies [`Command`]s to it one at a time on its own spawned task.
pub struct WorkerActor {
    address: WorkerAddress,
    rx: mpsc::UnboundedReceiver<Command>,
    directory: WorkerDirectory,
    scheduler_stream: Arc<dyn ToScheduler>,
}

impl WorkerActor {
    pub fn spawn(
        address: WorkerAddress,
        control: Arc<dyn ControlRpc>,
        direct: Arc<dyn Direct>,
        scheduler_stream: Arc<dyn ToScheduler>,
    ) -> WorkerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = WorkerActor {
            address: address.clone(),
            rx,
            directory: WorkerDirectory::new(),
            scheduler_stream: scheduler_stream.clone(),
        };
        tokio::spawn(actor.run());
        WorkerHandle {
            address,
            tx,
            control,
            direct,
            scheduler_stream,
        }
    }

    async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                Command::RegisterPublisher(name, p) => self.directory.register_publisher(name, p),
                Command::RegisterSubscriber(name, s) => self.directory.register_subscriber(name, s),
                Command::Stream(event) => self.apply(event),
                Command::Cleanup => {
                    let scheduler = self.scheduler_stream.clone();
                    self.directory.cleanup(|e| scheduler.send(e), &self.address);
                }
            }
        }
        log::debug!("worker {} directory actor exiting", self.address);
    }

    fn apply(&mut self, event: WorkerStreamEvent) {
        match event {
            WorkerStreamEvent::AddSubscriber { name, address, info } => {
                self.directory.on_add_subscriber(name, address, info)
            }
            WorkerStreamEvent::RemoveSubscriber { name, address } => {
                self.directory.on_remove_subscriber(name, address)
            }
            WorkerStreamEvent::PublishScheduler { name, publish } => {
                self.directory.on_publish_scheduler(name, publish)
            }
            WorkerStreamEvent::Msg { name, payload } => self.directory.on_message(name, payload),
        }
    }
}

/// Cheap, `Clone`-able capability bundle for a worker host: the directory
/// actor handle plus the outbound links a `Publisher`/`Subscriber` needs
/// (`ControlRpc` for registration, `Direct` for the fast path, and the
/// scheduler stream for control events and the slow path).
#[derive(Clone)]
pub struct WorkerHandle {
    address: WorkerAddress,
    tx: mpsc::UnboundedSender<Command>,
    control: Arc<dyn ControlRpc>,
    direct: Arc<dyn Direct>,
    scheduler_stream: Arc<dyn ToScheduler>,
}

impl WorkerHandle {
    pub fn address(&self) -> &WorkerAddress {
        &self.address
    }

    pub fn control(&self) -> &Arc<dyn ControlRpc> {
        &self.control
    }

    pub fn direct(&self) -> &Arc<dyn Direct> {
        &self.direct
    }

    pub fn scheduler_stream(&self) -> &Arc<dyn ToScheduler> {
        &self.scheduler_stream
    }

    pub fn register_publisher(&self, name: TopicName, publisher: Weak<dyn AnyPublisher>) {
        let _ = self.tx.send(Command::RegisterPublisher(name, publisher));
    }

    pub fn register_subscriber(&self, name: TopicName, subscriber: Weak<dyn AnySubscriber>) {
        let _ = self.tx.send(Command::RegisterSubscriber(name, subscriber));
    }

    /// Entry point for events arriving either from the scheduler's stream
    /// or (for `Msg`) directly from another worker on the fast path.
    pub fn receive(&self, event: WorkerStreamEvent) {
        let _ = self.tx.send(Command::Stream(event));
    }

    pub fn schedule_cleanup(&self) {
        let _ = self.tx.send(Command::Cleanup);
    }
}

impl pubsub_common::Finalizer for WorkerHandle {
    fn schedule_cleanup(&self) {
        WorkerHandle::schedule_cleanup(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct RecordingPublisher {
        name: TopicName,
        subs: Mutex<Vec<WorkerAddress>>,
        publish_flag: Mutex<bool>,
    }

    impl AnyPublisher for RecordingPublisher {
        fn name(&self) -> &TopicName {
            &self.name
        }
        fn set_subscriber(&self, address: WorkerAddress, _info: SubscriberInfo) {
            self.subs.lock().push(address);
        }
        fn remove_subscriber(&self, address: &WorkerAddress) {
            self.subs.lock().retain(|a| a != address);
        }
        fn set_publish_to_scheduler(&self, publish: bool) {
            *self.publish_flag.lock() = publish;
        }
    }

    #[test]
    fn add_subscriber_fans_out_to_live_local_publishers() {
        let mut dir = WorkerDirectory::new();
        let name = TopicName::new("T");
        let publisher = Arc::new(RecordingPublisher {
            name: name.clone(),
            subs: Mutex::new(Vec::new()),
            publish_flag: Mutex::new(false),
        });
        let weak: Weak<dyn AnyPublisher> = Arc::downgrade(&publisher) as Weak<dyn AnyPublisher>;
        dir.register_publisher(name.clone(), weak);

        dir.on_add_subscriber(name.clone(), WorkerAddress::new("w2"), SubscriberInfo::default());
        assert_eq!(publisher.subs.lock().clone(), vec![WorkerAddress::new("w2")]);

        dir.on_remove_subscriber(name, WorkerAddress::new("w2"));
        assert!(publisher.subs.lock().is_empty());
    }

    #[test]
    fn dropped_publisher_is_skipped_without_panicking() {
        let mut dir = WorkerDirectory::new();
        let name = TopicName::new("T");
        {
            let publisher = Arc::new(RecordingPublisher {
                name: name.clone(),
                subs: Mutex::new(Vec::new()),
                publish_flag: Mutex::new(false),
            });
            let weak: Weak<dyn AnyPublisher> = Arc::downgrade(&publisher) as Weak<dyn AnyPublisher>;
            dir.register_publisher(name.clone(), weak);
        }
        // publisher dropped; this must not panic and should compact the registry
        dir.on_add_subscriber(name, WorkerAddress::new("w2"), SubscriberInfo::default());
    }
}
