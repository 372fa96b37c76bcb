//! An in-process stand-in for the cluster's RPC/streaming transport, used
//! by tests and demos in place of a real network. `ControlRpc`,
//! `ToScheduler`, `ToWorker`, `ToClient`, and `Direct` are all implemented
//! as shared-map lookups plus a direct call into the target actor's
//! handle — nothing here crosses a process boundary or touches a socket.

use async_trait::async_trait;
use dashmap::DashMap;
use pubsub_common::{
    AddPublisherResponse, ClientId, ClientStreamEvent, ControlRpc, Direct, Error, Result,
    SchedulerStreamEvent, ToClient, ToScheduler, ToWorker, TopicName, WorkerAddress,
    WorkerStreamEvent,
};
use pubsub_directory::{ClientActor, ClientHandle, SchedulerActor, SchedulerHandle, WorkerActor, WorkerHandle};
use std::sync::Arc;

/// Shared scheduler plus every currently-registered worker/client handle.
/// Dropping a worker or client from the bus (see [`LocalBus::drop_worker`]/
/// [`LocalBus::drop_client`]) simulates a transport disconnect: subsequent
/// sends to it are silently no-ops, same as a real stream write into a
/// closed socket.
pub struct LocalBus {
    scheduler: SchedulerHandle,
    workers: DashMap<WorkerAddress, WorkerHandle>,
    clients: DashMap<ClientId, ClientHandle>,
}

impl LocalBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scheduler: SchedulerActor::spawn(),
            workers: DashMap::new(),
            clients: DashMap::new(),
        })
    }

    pub fn spawn_worker(self: &Arc<Self>, address: impl Into<WorkerAddress>) -> WorkerHandle {
        let address: WorkerAddress = address.into();
        let handle = WorkerActor::spawn(address.clone(), self.clone(), self.clone(), self.clone());
        let link: Arc<dyn ToWorker> = Arc::new(WorkerLink {
            bus: self.clone(),
            address: address.clone(),
        });
        self.scheduler.register_worker(address.clone(), link);
        self.workers.insert(address, handle.clone());
        handle
    }

    pub fn spawn_client(self: &Arc<Self>, id: impl Into<ClientId>) -> ClientHandle {
        let id: ClientId = id.into();
        let handle = ClientActor::spawn(id.clone(), self.clone());
        let link: Arc<dyn ToClient> = Arc::new(ClientLink {
            bus: self.clone(),
            id: id.clone(),
        });
        self.scheduler.register_client(id.clone(), link);
        self.clients.insert(id, handle.clone());
        handle
    }

    pub fn drop_worker(&self, address: &WorkerAddress) {
        log::debug!("simulating disconnect of worker {address}");
        self.workers.remove(address);
        self.scheduler.unregister_worker(address.clone());
    }

    pub fn drop_client(&self, id: &ClientId) {
        log::debug!("simulating disconnect of client {id}");
        self.clients.remove(id);
        self.scheduler.unregister_client(id.clone());
    }

    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }
}

#[async_trait]
impl ControlRpc for LocalBus {
    async fn add_publisher(&self, name: TopicName, worker: WorkerAddress) -> Result<AddPublisherResponse> {
        Ok(self.scheduler.add_publisher(name, worker).await)
    }
}

impl ToScheduler for LocalBus {
    fn send(&self, event: SchedulerStreamEvent) {
        self.scheduler.send_stream_event(event);
    }
}

impl Direct for LocalBus {
    fn send(&self, target: &WorkerAddress, event: WorkerStreamEvent) {
        if let Some(handle) = self.workers.get(target) {
            handle.receive(event);
        }
        // A missing destination is indistinguishable from an unreliable
        // send that got dropped in flight — exactly the contract `Direct`
        // documents.
    }
}

struct WorkerLink {
    bus: Arc<LocalBus>,
    address: WorkerAddress,
}

impl ToWorker for WorkerLink {
    fn send(&self, event: WorkerStreamEvent) {
        if let Some(handle) = self.bus.workers.get(&self.address) {
            handle.receive(event);
        }
    }
}

struct ClientLink {
    bus: Arc<LocalBus>,
    id: ClientId,
}

impl ToClient for ClientLink {
    fn send(&self, event: ClientStreamEvent) -> Result<()> {
        let ClientStreamEvent::Msg { name, payload } = event;
        match self.bus.clients.get(&self.id) {
            Some(handle) => {
                handle.receive(name, payload);
                Ok(())
            }
            None => Err(Error::PeerGone(self.id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pubsub_common::{Who};
    use std::time::Duration;

    #[tokio::test]
    async fn add_publisher_round_trip_sees_existing_subscriber() {
        let bus = LocalBus::new();
        let worker_a = bus.spawn_worker("a");
        let worker_b = bus.spawn_worker("b");
        let name = TopicName::new("T");

        worker_b.scheduler_stream().send(SchedulerStreamEvent::AddSubscriber {
            name: name.clone(),
            who: Who::Worker(worker_b.address().clone()),
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let response = worker_a.control().add_publisher(name, worker_a.address().clone()).await.unwrap();
        assert!(response.subscribers.contains_key(worker_b.address()));
    }

    #[tokio::test]
    async fn dropped_worker_stops_receiving_direct_sends() {
        let bus = LocalBus::new();
        let worker = bus.spawn_worker("w1");
        bus.drop_worker(worker.address());

        // Must not panic even though the destination is gone.
        let direct: Arc<dyn Direct> = bus.clone();
        direct.send(
            worker.address(),
            WorkerStreamEvent::Msg {
                name: TopicName::new("T"),
                payload: Bytes::from_static(b"x"),
            },
        );
    }
}
