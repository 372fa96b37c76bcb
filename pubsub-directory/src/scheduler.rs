//! The scheduler's authoritative topic membership registry. Pure in-memory
//! maps, no persistence — a scheduler restart loses every topic and
//! requires endpoints to re-register on reconnect (out of scope here).
//!
//! All operations are O(|publishers| + |subscribers|) broadcast fan-outs
//! over the directly-held worker/client stream handles; there is no
//! further coordination with the rest of the cluster.

use bytes::Bytes;
use pubsub_common::{
    AddPublisherResponse, ClientId, ClientStreamEvent, Host, SchedulerStreamEvent, SubscriberInfo,
    ToClient, ToWorker, TopicName, Who, WorkerAddress, WorkerStreamEvent,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// One topic's membership as seen by the scheduler.
#[derive(Default)]
struct Topic {
    publishers: HashSet<WorkerAddress>,
    subscribers: HashSet<WorkerAddress>,
    client_subscribers: HashSet<ClientId>,
}

impl Topic {
    /// Retain the topic iff any of the three membership sets is non-empty,
    /// worker or client alike.
    fn is_empty(&self) -> bool {
        self.publishers.is_empty() && self.subscribers.is_empty() && self.client_subscribers.is_empty()
    }
}

/// The scheduler's view of the world: topic membership, plus the stream
/// handles needed to notify each member. Owned exclusively by
/// [`SchedulerActor`]; never touched from more than one task at a time.
#[derive(Default)]
pub struct SchedulerDirectory {
    topics: HashMap<TopicName, Topic>,
    workers: HashMap<WorkerAddress, Arc<dyn ToWorker>>,
    clients: HashMap<ClientId, Arc<dyn ToClient>>,
}

impl SchedulerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_worker(&mut self, addr: WorkerAddress, link: Arc<dyn ToWorker>) {
        self.workers.insert(addr, link);
    }

    pub fn register_client(&mut self, id: ClientId, link: Arc<dyn ToClient>) {
        self.clients.insert(id, link);
    }

    pub fn unregister_worker(&mut self, addr: &WorkerAddress) {
        self.workers.remove(addr);
    }

    pub fn unregister_client(&mut self, id: &ClientId) {
        self.clients.remove(id);
    }

    /// `pubsub_add_publisher(name, worker) -> { subscribers, publish_to_scheduler }`
    pub fn add_publisher(&mut self, name: TopicName, worker: WorkerAddress) -> AddPublisherResponse {
        let topic = self.topics.entry(name.clone()).or_default();
        topic.publishers.insert(worker);
        AddPublisherResponse {
            subscribers: topic
                .subscribers
                .iter()
                .map(|addr| (addr.clone(), SubscriberInfo::default()))
                .collect(),
            publish_to_scheduler: !topic.client_subscribers.is_empty(),
        }
    }

    /// `pubsub-add-subscriber(name, worker|client)`
    pub fn add_subscriber(&mut self, name: TopicName, who: Who) {
        match who {
            Who::Worker(worker) => {
                let publishers: Vec<WorkerAddress> = {
                    let topic = self.topics.entry(name.clone()).or_default();
                    topic.subscribers.insert(worker.clone());
                    topic.publishers.iter().cloned().collect()
                };
                for pub_addr in publishers {
                    self.notify_worker(
                        &pub_addr,
                        WorkerStreamEvent::AddSubscriber {
                            name: name.clone(),
                            address: worker.clone(),
                            info: SubscriberInfo::default(),
                        },
                    );
                }
            }
            Who::Client(client) => {
                // Notify publishers before recording the client (the
                // recording order within a delta window is unobservable).
                let publishers: Vec<WorkerAddress> = {
                    let topic = self.topics.entry(name.clone()).or_default();
                    topic.publishers.iter().cloned().collect()
                };
                for pub_addr in publishers {
                    self.notify_worker(
                        &pub_addr,
                        WorkerStreamEvent::PublishScheduler {
                            name: name.clone(),
                            publish: true,
                        },
                    );
                }
                self.topics.entry(name).or_default().client_subscribers.insert(client);
            }
        }
    }

    /// `pubsub-remove-publisher(name, worker)`
    pub fn remove_publisher(&mut self, name: TopicName, worker: WorkerAddress) {
        if let Some(topic) = self.topics.get_mut(&name) {
            topic.publishers.remove(&worker);
            self.gc_topic(&name);
        }
    }

    /// `pubsub-remove-subscriber(name, worker|client)`
    pub fn remove_subscriber(&mut self, name: TopicName, who: Who) {
        match who {
            Who::Worker(worker) => {
                if let Some(topic) = self.topics.get_mut(&name) {
                    topic.subscribers.remove(&worker);
                    for pub_addr in topic.publishers.clone() {
                        self.notify_worker(
                            &pub_addr,
                            WorkerStreamEvent::RemoveSubscriber {
                                name: name.clone(),
                                address: worker.clone(),
                            },
                        );
                    }
                }
            }
            Who::Client(client) => {
                if let Some(topic) = self.topics.get_mut(&name) {
                    topic.client_subscribers.remove(&client);
                    if topic.client_subscribers.is_empty() {
                        for pub_addr in topic.publishers.clone() {
                            self.notify_worker(
                                &pub_addr,
                                WorkerStreamEvent::PublishScheduler {
                                    name: name.clone(),
                                    publish: false,
                                },
                            );
                        }
                    }
                }
            }
        }
        self.gc_topic(&name);
    }

    /// `pubsub-msg(name, msg, source)`
    pub fn handle_message(&mut self, name: TopicName, payload: Bytes, source: Option<Host>) {
        let Some(topic) = self.topics.get(&name) else {
            return;
        };

        let mut gone = Vec::new();
        for client in topic.client_subscribers.iter() {
            let Some(link) = self.clients.get(client) else {
                gone.push(client.clone());
                continue;
            };
            if link
                .send(ClientStreamEvent::Msg {
                    name: name.clone(),
                    payload: payload.clone(),
                })
                .is_err()
            {
                gone.push(client.clone());
            }
        }
        for client in gone {
            self.remove_subscriber(name.clone(), Who::Client(client));
        }

        if source.as_ref().and_then(Host::as_client).is_some() {
            if let Some(topic) = self.topics.get(&name) {
                for worker in topic.subscribers.clone() {
                    self.notify_worker(
                        &worker,
                        WorkerStreamEvent::Msg {
                            name: name.clone(),
                            payload: payload.clone(),
                        },
                    );
                }
            }
        }
    }

    fn notify_worker(&self, addr: &WorkerAddress, event: WorkerStreamEvent) {
        if let Some(link) = self.workers.get(addr) {
            link.send(event);
        }
        // Send failures for worker destinations are swallowed: the
        // transport's own disconnect notification is expected to trigger
        // cleanup instead.
    }

    fn gc_topic(&mut self, name: &TopicName) {
        if self.topics.get(name).is_some_and(Topic::is_empty) {
            self.topics.remove(name);
        }
    }

    #[cfg(test)]
    pub(crate) fn subscriber_set(&self, name: &TopicName) -> HashSet<WorkerAddress> {
        self.topics.get(name).map(|t| t.subscribers.clone()).unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn has_topic(&self, name: &TopicName) -> bool {
        self.topics.contains_key(name)
    }
}

enum Command {
    AddPublisher {
        name: TopicName,
        worker: WorkerAddress,
        resp: oneshot::Sender<AddPublisherResponse>,
    },
    RegisterWorker(WorkerAddress, Arc<dyn ToWorker>),
    RegisterClient(ClientId, Arc<dyn ToClient>),
    UnregisterWorker(WorkerAddress),
    UnregisterClient(ClientId),
    Stream(SchedulerStreamEvent),
}

/// Owns a [`SchedulerDirectory`] and applies [`Command`]s to it one at a
/// time on its own spawned task — the "single-threaded cooperative event
/// loop" the design calls for.
pub struct SchedulerActor {
    rx: mpsc::UnboundedReceiver<Command>,
    directory: SchedulerDirectory,
}

impl SchedulerActor {
    pub fn spawn() -> SchedulerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = SchedulerActor {
            rx,
            directory: SchedulerDirectory::new(),
        };
        tokio::spawn(actor.run());
        SchedulerHandle { tx }
    }

    async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                Command::AddPublisher { name, worker, resp } => {
                    let result = self.directory.add_publisher(name, worker);
                    let _ = resp.send(result);
                }
                Command::RegisterWorker(addr, link) => self.directory.register_worker(addr, link),
                Command::RegisterClient(id, link) => self.directory.register_client(id, link),
                Command::UnregisterWorker(addr) => self.directory.unregister_worker(&addr),
                Command::UnregisterClient(id) => self.directory.unregister_client(&id),
                Command::Stream(event) => self.apply(event),
            }
        }
        log::debug!("scheduler directory actor exiting: all handles dropped");
    }

    fn apply(&mut self, event: SchedulerStreamEvent) {
        match event {
            SchedulerStreamEvent::AddSubscriber { name, who } => {
                self.directory.add_subscriber(name, who)
            }
            SchedulerStreamEvent::RemoveSubscriber { name, who } => {
                self.directory.remove_subscriber(name, who)
            }
            SchedulerStreamEvent::RemoveSubscribers { name, client } => {
                self.directory.remove_subscriber(name, Who::Client(client))
            }
            SchedulerStreamEvent::RemovePublisher { name, worker } => {
                self.directory.remove_publisher(name, worker)
            }
            SchedulerStreamEvent::Msg { name, payload, source } => {
                self.directory.handle_message(name, payload, source)
            }
        }
    }
}

/// Cheap, `Clone`-able handle to a running [`SchedulerActor`]. This is what
/// worker/client-side `ControlRpc`/`ToScheduler` implementations hold.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    pub async fn add_publisher(
        &self,
        name: TopicName,
        worker: WorkerAddress,
    ) -> AddPublisherResponse {
        let (resp_tx, resp_rx) = oneshot::channel();
        if self
            .tx
            .send(Command::AddPublisher { name, worker, resp: resp_tx })
            .is_err()
        {
            return AddPublisherResponse::default();
        }
        resp_rx.await.unwrap_or_default()
    }

    pub fn register_worker(&self, addr: WorkerAddress, link: Arc<dyn ToWorker>) {
        let _ = self.tx.send(Command::RegisterWorker(addr, link));
    }

    pub fn register_client(&self, id: ClientId, link: Arc<dyn ToClient>) {
        let _ = self.tx.send(Command::RegisterClient(id, link));
    }

    pub fn unregister_worker(&self, addr: WorkerAddress) {
        let _ = self.tx.send(Command::UnregisterWorker(addr));
    }

    pub fn unregister_client(&self, id: ClientId) {
        let _ = self.tx.send(Command::UnregisterClient(id));
    }

    pub fn send_stream_event(&self, event: SchedulerStreamEvent) {
        let _ = self.tx.send(Command::Stream(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubsub_common::Error;

    struct NullLink;
    impl ToWorker for NullLink {
        fn send(&self, _event: WorkerStreamEvent) {}
    }
    impl ToClient for NullLink {
        fn send(&self, _event: ClientStreamEvent) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn add_then_remove_subscriber_restores_prior_state() {
        let mut dir = SchedulerDirectory::new();
        let w = WorkerAddress::new("w1");
        let name = TopicName::new("T");
        dir.register_worker(w.clone(), Arc::new(NullLink));

        assert!(!dir.has_topic(&name));
        dir.add_subscriber(name.clone(), Who::Worker(w.clone()));
        assert_eq!(dir.subscriber_set(&name), HashSet::from([w.clone()]));

        dir.remove_subscriber(name.clone(), Who::Worker(w));
        assert!(!dir.has_topic(&name), "topic should be GC'd once empty");
    }

    #[test]
    fn registering_same_publisher_twice_is_idempotent() {
        let mut dir = SchedulerDirectory::new();
        let name = TopicName::new("T");
        let w = WorkerAddress::new("w1");

        let first = dir.add_publisher(name.clone(), w.clone());
        let second = dir.add_publisher(name.clone(), w);
        assert_eq!(first.publish_to_scheduler, second.publish_to_scheduler);
        assert_eq!(first.subscribers.len(), second.subscribers.len());
    }

    #[test]
    fn client_only_topic_is_retained() {
        // A topic with only client subscribers must not be eagerly deleted.
        let mut dir = SchedulerDirectory::new();
        let name = TopicName::new("T");
        let c = ClientId::new("c1");
        dir.register_client(c.clone(), Arc::new(NullLink));
        dir.add_subscriber(name.clone(), Who::Client(c));
        assert!(dir.has_topic(&name));
    }
}
