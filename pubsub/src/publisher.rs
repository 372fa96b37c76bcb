//! The `Publisher<T>` endpoint: records the worker subscriber set, buffers
//! emits made before registration completes, and fans messages out on
//! `put`.

use crate::host::Home;
use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};
use pubsub_common::{Error, Host, Result, SchedulerStreamEvent, SubscriberInfo, TopicName, WorkerAddress, WorkerStreamEvent};
use pubsub_directory::AnyPublisher;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

struct PublisherState {
    subscribers: HashMap<WorkerAddress, SubscriberInfo>,
    publish_to_scheduler: bool,
    started: bool,
    pending: Vec<Bytes>,
}

impl Default for PublisherState {
    fn default() -> Self {
        Self {
            subscribers: HashMap::new(),
            publish_to_scheduler: false,
            started: false,
            pending: Vec::new(),
        }
    }
}

struct PublisherInner<T> {
    name: TopicName,
    home: Home,
    state: Mutex<PublisherState>,
    _marker: PhantomData<fn(T)>,
}

impl<T> PublisherInner<T> {
    /// Send one already-serialized payload according to the host's fan-out
    /// rule, with `state` already locked by the caller. Holding the lock
    /// across the send (rather than re-acquiring it here) is what keeps the
    /// pending-flush-then-send sequence atomic with respect to a
    /// concurrent `put`: as long as every send goes out while `state` is
    /// held, a flush in progress on one thread can't be overtaken by a
    /// newer `put` on another, which would otherwise deliver a later
    /// message ahead of the buffered earlier ones.
    fn send_locked(&self, state: &MutexGuard<'_, PublisherState>, payload: Bytes) {
        match &self.home {
            Home::Worker(worker) => {
                for addr in state.subscribers.keys() {
                    worker.direct().send(
                        addr,
                        WorkerStreamEvent::Msg {
                            name: self.name.clone(),
                            payload: payload.clone(),
                        },
                    );
                }
                if state.publish_to_scheduler {
                    worker.scheduler_stream().send(SchedulerStreamEvent::Msg {
                        name: self.name.clone(),
                        payload,
                        source: Some(Host::Worker(worker.address().clone())),
                    });
                }
            }
            Home::Client(client) => {
                client.scheduler_stream().send(SchedulerStreamEvent::Msg {
                    name: self.name.clone(),
                    payload,
                    source: Some(Host::Client(client.id().clone())),
                });
            }
        }
    }
}

impl<T: Send + 'static> AnyPublisher for PublisherInner<T> {
    fn name(&self) -> &TopicName {
        &self.name
    }

    fn set_subscriber(&self, address: WorkerAddress, info: SubscriberInfo) {
        self.state.lock().subscribers.insert(address, info);
    }

    fn remove_subscriber(&self, address: &WorkerAddress) {
        self.state.lock().subscribers.remove(address);
    }

    fn set_publish_to_scheduler(&self, publish: bool) {
        self.state.lock().publish_to_scheduler = publish;
    }
}

impl<T> Drop for PublisherInner<T> {
    fn drop(&mut self) {
        // A client-hosted publisher never registered with any directory
        // (the scheduler only tracks worker publisher addresses), so there
        // is nothing to clean up on that side.
        if matches!(self.home, Home::Worker(_)) {
            self.home.schedule_cleanup();
        }
    }
}

/// A handle to emit messages on a topic. Cheap to clone; every clone shares
/// the same registration state and subscriber view.
pub struct Publisher<T> {
    inner: Arc<PublisherInner<T>>,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Serialize + Send + 'static> Publisher<T> {
    /// Construct against an explicit host. Pushes the endpoint into the
    /// host's local publisher set and, for a worker host, schedules the
    /// `add_publisher` registration round trip in the background; `put`
    /// calls made before it resolves are buffered and flushed in order.
    pub fn new(name: impl Into<TopicName>, home: impl Into<Home>) -> Self {
        let name = name.into();
        let home = home.into();
        let inner = Arc::new(PublisherInner {
            name: name.clone(),
            home: home.clone(),
            state: Mutex::new(PublisherState::default()),
            _marker: PhantomData,
        });

        match &home {
            Home::Worker(worker) => {
                let weak: std::sync::Weak<dyn AnyPublisher> = Arc::downgrade(&inner) as std::sync::Weak<dyn AnyPublisher>;
                worker.register_publisher(name.clone(), weak);

                let worker = worker.clone();
                let inner = inner.clone();
                tokio::spawn(async move {
                    let response = match worker.control().add_publisher(inner.name.clone(), worker.address().clone()).await {
                        Ok(response) => response,
                        Err(err) => {
                            log::warn!("add_publisher registration failed for topic {}: {err}", inner.name);
                            Default::default()
                        }
                    };
                    // Hold the lock across the whole flush: a `put` that
                    // arrives mid-flush must block until every buffered
                    // message has gone out, so it can never be delivered
                    // ahead of them.
                    let mut state = inner.state.lock();
                    state.subscribers = response.subscribers;
                    state.publish_to_scheduler = response.publish_to_scheduler;
                    state.started = true;
                    let pending = std::mem::take(&mut state.pending);
                    for payload in pending {
                        inner.send_locked(&state, payload);
                    }
                });
            }
            Home::Client(_) => {
                // No registration round trip: every emission is relayed
                // through the scheduler, so the publisher is immediately
                // usable.
                inner.state.lock().started = true;
            }
        }

        Self { inner }
    }

    /// Resolve the host from `home` if given, else from the ambient
    /// [`crate::host::CurrentHost`]; fails eagerly if neither is available.
    pub fn with_context(
        name: impl Into<TopicName>,
        home: Option<Home>,
        ctx: &dyn crate::host::CurrentHost,
    ) -> Result<Self> {
        let name = name.into();
        let home = home.or_else(|| ctx.current_host()).ok_or_else(|| {
            Error::Misconfiguration(format!("no worker or client context available for topic {name}"))
        })?;
        Ok(Self::new(name, home))
    }

    /// Non-blocking. Buffers until registration completes, then serializes
    /// once and fans out to every known subscriber.
    ///
    /// Serialization happens before the lock is taken (it never needs
    /// `state`), but the started-check and the send itself happen under
    /// one continuous lock acquisition so a registration flush running
    /// concurrently on another task can never be interleaved with — or
    /// overtaken by — this call.
    pub fn put(&self, msg: T) {
        let payload = match serde_json::to_vec(&msg) {
            Ok(bytes) => Bytes::from(bytes),
            Err(err) => {
                log::warn!("failed to serialize message for topic {}: {err}", self.inner.name);
                return;
            }
        };

        let mut state = self.inner.state.lock();
        if !state.started {
            state.pending.push(payload);
            return;
        }
        self.inner.send_locked(&state, payload);
    }

    /// Current worker-subscriber view. May be stale during a delta window
    /// while a recent membership change is still propagating.
    pub fn subscribers(&self) -> HashMap<WorkerAddress, SubscriberInfo> {
        self.inner.state.lock().subscribers.clone()
    }

    pub fn publish_to_scheduler(&self) -> bool {
        self.inner.state.lock().publish_to_scheduler
    }

    pub fn name(&self) -> &TopicName {
        &self.inner.name
    }
}

impl<T> fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Pub: {}>", self.inner.name)
    }
}
